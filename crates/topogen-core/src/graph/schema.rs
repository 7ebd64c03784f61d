//! Static schema: the closed sets of entity and relation kinds, and the
//! identifying fields for each entity kind.

use std::fmt;

/// Entity kinds stored as graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// CMDB business.
    Business,
    Cluster,
    Namespace,
    Node,
    Pod,
    Service,
    Deployment,
    ReplicaSet,
    /// Metric definition attached to traffic relations.
    Metric,
}

impl EntityKind {
    /// All entity kinds, in generation dependency order.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Business,
        EntityKind::Cluster,
        EntityKind::Namespace,
        EntityKind::Node,
        EntityKind::Pod,
        EntityKind::Service,
        EntityKind::Deployment,
        EntityKind::ReplicaSet,
        EntityKind::Metric,
    ];

    /// Table name / identifier prefix on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Business => "biz",
            EntityKind::Cluster => "cluster",
            EntityKind::Namespace => "namespace",
            EntityKind::Node => "node",
            EntityKind::Pod => "pod",
            EntityKind::Service => "service",
            EntityKind::Deployment => "deployment",
            EntityKind::ReplicaSet => "replicaset",
            EntityKind::Metric => "metric",
        }
    }

    /// The identifying fields for this kind.
    ///
    /// All of them must be present and non-empty for identifier derivation
    /// to be collision-free; a missing field serializes as the empty string.
    pub fn index_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Business => &["bk_biz_id"],
            EntityKind::Cluster => &["bcs_cluster_id"],
            EntityKind::Namespace => &["bcs_cluster_id", "namespace"],
            EntityKind::Node => &["bcs_cluster_id", "node"],
            EntityKind::Pod => &["bcs_cluster_id", "namespace", "pod"],
            EntityKind::Service => &["bcs_cluster_id", "namespace", "service"],
            EntityKind::Deployment => &["bcs_cluster_id", "namespace", "deployment"],
            EntityKind::ReplicaSet => &["bcs_cluster_id", "namespace", "replicaset"],
            EntityKind::Metric => &["metric_name"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed relation kinds stored as graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// node -> pod (pod scheduled on node).
    NodeWithPod,
    /// pod -> service (pod backs service).
    PodWithService,
    /// deployment -> replicaset.
    DeploymentWithReplicaset,
    /// pod -> replicaset (pod owned by replicaset).
    PodWithReplicaset,
    /// pod -> pod traffic, selected for metric generation.
    PodToPod,
    /// traffic relation -> metric definition.
    RelationHasMetric,
}

impl RelationKind {
    /// Edge table name / identifier prefix on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::NodeWithPod => "node_with_pod",
            RelationKind::PodWithService => "pod_with_service",
            RelationKind::DeploymentWithReplicaset => "deployment_with_replicaset",
            RelationKind::PodWithReplicaset => "pod_with_replicaset",
            RelationKind::PodToPod => "pod_to_pod",
            RelationKind::RelationHasMetric => "relation_has_metric",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric types used by the fixed metric catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
