//! Topology generator: builds the resource graph in dependency order.
//!
//! Stages run strictly sequentially; each stage only reads registry
//! entries written by earlier stages. Any storage error aborts the whole
//! run - the generator is not resumable mid-run, and the documented
//! recovery is re-running from the start, which the idempotent upserts
//! make safe.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, TopologyConfig};
use crate::graph::{node_id, relation_id, EntityKind, Fields, MetricType, RelationKind};
use crate::metrics::{FLOW_ERROR_METRIC, FLOW_SECONDS_METRIC, FLOW_TOTAL_METRIC};
use crate::storage::{statements, StorageClient, StorageError};

/// Errors that can occur during a generation run.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A storage operation failed; the run stopped at this stage.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StorageError,
    },

    /// The configured topology cannot be generated as requested.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
}

impl GeneratorError {
    fn stage(stage: &'static str, source: StorageError) -> Self {
        GeneratorError::Stage { stage, source }
    }
}

/// The historical window resource ages and metric samples are drawn from.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window reaching `back_hours` into the past from now.
    pub fn ending_now(back_hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::hours(back_hours),
            end,
        }
    }

    /// `n` evenly spaced instants across the window, starting at `start`.
    pub fn points(&self, n: usize) -> Vec<DateTime<Utc>> {
        if n == 0 {
            return Vec::new();
        }
        let step = (self.end - self.start).num_milliseconds() / n as i64;
        (0..n)
            .map(|i| self.start + Duration::milliseconds(step * i as i64))
            .collect()
    }

    /// Uniform random instant inside the window.
    pub(crate) fn random_within<R: Rng>(&self, rng: &mut R) -> DateTime<Utc> {
        let span = (self.end - self.start).num_seconds();
        if span <= 0 {
            return self.start;
        }
        self.start + Duration::seconds(rng.gen_range(0..=span))
    }
}

/// Generates the resource graph against a storage backend.
///
/// Owns the in-memory resource registry (write-once per kind per run) and
/// the traffic-relation list consumed by the metric synthesizer. Neither
/// outlives the process; the backend holds the durable state.
pub struct TopologyGenerator {
    client: Box<dyn StorageClient>,
    topology: TopologyConfig,
    registry: HashMap<EntityKind, Vec<Fields>>,
    traffic: Vec<(Fields, Fields)>,
    rng: StdRng,
    window: TimeWindow,
}

impl TopologyGenerator {
    pub fn new(client: Box<dyn StorageClient>, config: &Config) -> Self {
        Self::with_rng(client, config, StdRng::from_entropy())
    }

    /// Generator with a fixed seed, for reproducible runs and tests.
    pub fn with_seed(client: Box<dyn StorageClient>, config: &Config, seed: u64) -> Self {
        Self::with_rng(client, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(client: Box<dyn StorageClient>, config: &Config, rng: StdRng) -> Self {
        Self {
            client,
            topology: config.topology.clone(),
            registry: HashMap::new(),
            traffic: Vec::new(),
            rng,
            window: TimeWindow::ending_now(config.topology.time_back_hours),
        }
    }

    /// Resources created so far for a kind, in creation order.
    pub fn resources(&self, kind: EntityKind) -> &[Fields] {
        self.registry.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The (source pod, target pod) pairs selected for traffic metrics.
    pub fn traffic_relations(&self) -> &[(Fields, Fields)] {
        &self.traffic
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Run every stage in dependency order.
    pub async fn generate_all(&mut self) -> Result<(), GeneratorError> {
        info!(
            "Starting topology generation for business {} ({})",
            self.topology.biz_name, self.topology.biz_id
        );

        self.create_business().await?;
        self.create_cluster().await?;
        self.create_namespace().await?;
        self.create_nodes().await?;
        self.create_pods().await?;
        self.create_services().await?;
        self.create_deployments().await?;
        self.create_static_relations().await?;
        self.create_dynamic_relations().await?;
        self.create_metric_definitions().await?;
        self.create_relation_metrics().await?;

        info!("Topology generation completed");
        Ok(())
    }

    /// Log per-kind resource counts and the traffic relation count.
    pub fn log_summary(&self) {
        info!("Generation summary:");
        for kind in EntityKind::ALL {
            info!("  {:<12} {:>5}", kind.as_str(), self.resources(kind).len());
        }
        info!("  {:<12} {:>5}", "traffic", self.traffic.len());
    }

    fn random_created_at(&mut self) -> DateTime<Utc> {
        self.window.random_within(&mut self.rng)
    }

    pub async fn create_business(&mut self) -> Result<(), GeneratorError> {
        let data = fields(json!({ "bk_biz_id": self.topology.biz_id }));
        let created_at = self.random_created_at();

        self.client
            .upsert_node(EntityKind::Business, &data, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("business", e))?;

        self.registry.insert(EntityKind::Business, vec![data]);
        info!(
            "Created business: {} (id={})",
            self.topology.biz_name, self.topology.biz_id
        );
        Ok(())
    }

    pub async fn create_cluster(&mut self) -> Result<(), GeneratorError> {
        let data = fields(json!({ "bcs_cluster_id": self.topology.cluster_id }));
        let created_at = self.random_created_at();

        self.client
            .upsert_node(EntityKind::Cluster, &data, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("cluster", e))?;

        self.registry.insert(EntityKind::Cluster, vec![data]);
        info!("Created cluster: {}", self.topology.cluster_id);
        Ok(())
    }

    pub async fn create_namespace(&mut self) -> Result<(), GeneratorError> {
        let data = fields(json!({
            "bcs_cluster_id": self.topology.cluster_id,
            "namespace": self.topology.namespace,
        }));
        let created_at = self.random_created_at();

        self.client
            .upsert_node(EntityKind::Namespace, &data, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("namespace", e))?;

        self.registry.insert(EntityKind::Namespace, vec![data]);
        info!("Created namespace: {}", self.topology.namespace);
        Ok(())
    }

    pub async fn create_nodes(&mut self) -> Result<(), GeneratorError> {
        let nodes: Vec<Fields> = (0..self.topology.num_nodes)
            .map(|i| {
                fields(json!({
                    "bcs_cluster_id": self.topology.cluster_id,
                    "node": format!("{}-node-{}", self.topology.biz_name, i),
                }))
            })
            .collect();

        let created_at = self.random_created_at();
        self.client
            .batch_upsert_nodes(EntityKind::Node, &nodes, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("nodes", e))?;

        info!("Created {} nodes", nodes.len());
        self.registry.insert(EntityKind::Node, nodes);
        Ok(())
    }

    pub async fn create_pods(&mut self) -> Result<(), GeneratorError> {
        let pods: Vec<Fields> = (0..self.topology.num_pods)
            .map(|i| {
                fields(json!({
                    "bcs_cluster_id": self.topology.cluster_id,
                    "namespace": self.topology.namespace,
                    "pod": format!("{}-pod-{:03}", self.topology.biz_name, i),
                }))
            })
            .collect();

        let created_at = self.random_created_at();
        self.client
            .batch_upsert_nodes(EntityKind::Pod, &pods, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("pods", e))?;

        info!("Created {} pods", pods.len());
        self.registry.insert(EntityKind::Pod, pods);
        Ok(())
    }

    pub async fn create_services(&mut self) -> Result<(), GeneratorError> {
        let services: Vec<Fields> = self
            .topology
            .services
            .iter()
            .map(|name| {
                fields(json!({
                    "bcs_cluster_id": self.topology.cluster_id,
                    "namespace": self.topology.namespace,
                    "service": format!("{}-{}", self.topology.biz_name, name),
                }))
            })
            .collect();

        let created_at = self.random_created_at();
        self.client
            .batch_upsert_nodes(EntityKind::Service, &services, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("services", e))?;

        info!("Created {} services", services.len());
        self.registry.insert(EntityKind::Service, services);
        Ok(())
    }

    pub async fn create_deployments(&mut self) -> Result<(), GeneratorError> {
        let deployments: Vec<Fields> = (0..self.topology.num_deployments)
            .map(|i| {
                let base = self
                    .topology
                    .services
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("app-{i}"));
                fields(json!({
                    "bcs_cluster_id": self.topology.cluster_id,
                    "namespace": self.topology.namespace,
                    "deployment": format!("{}-{}-deploy", self.topology.biz_name, base),
                }))
            })
            .collect();

        let created_at = self.random_created_at();
        self.client
            .batch_upsert_nodes(EntityKind::Deployment, &deployments, created_at, self.window.end)
            .await
            .map_err(|e| GeneratorError::stage("deployments", e))?;

        info!("Created {} deployments", deployments.len());
        self.registry.insert(EntityKind::Deployment, deployments);
        Ok(())
    }

    /// Static relations: pods onto nodes, pods into services, and the
    /// deployment -> replicaset -> pod chain.
    pub async fn create_static_relations(&mut self) -> Result<(), GeneratorError> {
        info!("Creating static relations...");
        self.relate_nodes_to_pods().await?;
        self.relate_pods_to_services().await?;
        self.create_deployment_chain().await?;
        Ok(())
    }

    /// Round-robin assignment of pods to nodes.
    async fn relate_nodes_to_pods(&mut self) -> Result<(), GeneratorError> {
        let nodes = self.registry.get(&EntityKind::Node).cloned().unwrap_or_default();
        let pods = self.registry.get(&EntityKind::Pod).cloned().unwrap_or_default();

        if !pods.is_empty() && nodes.is_empty() {
            return Err(GeneratorError::InvalidTopology(
                "cannot assign pods to zero nodes".to_string(),
            ));
        }

        for (i, pod) in pods.iter().enumerate() {
            let node = &nodes[i % nodes.len()];
            let created_at = self.random_created_at();

            self.client
                .upsert_relation(
                    RelationKind::NodeWithPod,
                    EntityKind::Node,
                    node,
                    EntityKind::Pod,
                    pod,
                    created_at,
                    self.window.end,
                    None,
                )
                .await
                .map_err(|e| GeneratorError::stage("node_with_pod", e))?;
        }

        info!("Created {} node_with_pod relations", pods.len());
        Ok(())
    }

    /// Pods partitioned evenly across services; the last service absorbs
    /// the remainder.
    async fn relate_pods_to_services(&mut self) -> Result<(), GeneratorError> {
        let services = self.registry.get(&EntityKind::Service).cloned().unwrap_or_default();
        let pods = self.registry.get(&EntityKind::Pod).cloned().unwrap_or_default();

        let mut count = 0;
        for (i, (start, end)) in
            partition_even(pods.len(), services.len(), "services")?.into_iter().enumerate()
        {
            for pod in &pods[start..end] {
                let created_at = self.random_created_at();
                self.client
                    .upsert_relation(
                        RelationKind::PodWithService,
                        EntityKind::Pod,
                        pod,
                        EntityKind::Service,
                        &services[i],
                        created_at,
                        self.window.end,
                        None,
                    )
                    .await
                    .map_err(|e| GeneratorError::stage("pod_with_service", e))?;
                count += 1;
            }
        }

        info!("Created {count} pod_with_service relations");
        Ok(())
    }

    /// One replicaset per deployment, pods partitioned evenly across
    /// deployments with the same remainder rule.
    async fn create_deployment_chain(&mut self) -> Result<(), GeneratorError> {
        let deployments = self
            .registry
            .get(&EntityKind::Deployment)
            .cloned()
            .unwrap_or_default();
        let pods = self.registry.get(&EntityKind::Pod).cloned().unwrap_or_default();

        let ranges = partition_even(pods.len(), deployments.len(), "deployments")?;
        let mut replicasets = Vec::with_capacity(deployments.len());
        let mut pod_count = 0;

        for (i, deploy) in deployments.iter().enumerate() {
            let rs = fields(json!({
                "bcs_cluster_id": field_str(deploy, "bcs_cluster_id"),
                "namespace": field_str(deploy, "namespace"),
                "replicaset": format!("{}-rs-001", field_str(deploy, "deployment")),
            }));

            let created_at = self.random_created_at();
            self.client
                .upsert_node(EntityKind::ReplicaSet, &rs, created_at, self.window.end)
                .await
                .map_err(|e| GeneratorError::stage("replicasets", e))?;

            self.client
                .upsert_relation(
                    RelationKind::DeploymentWithReplicaset,
                    EntityKind::Deployment,
                    deploy,
                    EntityKind::ReplicaSet,
                    &rs,
                    created_at,
                    self.window.end,
                    None,
                )
                .await
                .map_err(|e| GeneratorError::stage("deployment_with_replicaset", e))?;

            let (start, end) = ranges[i];
            for pod in &pods[start..end] {
                let created_at = self.random_created_at();
                self.client
                    .upsert_relation(
                        RelationKind::PodWithReplicaset,
                        EntityKind::Pod,
                        pod,
                        EntityKind::ReplicaSet,
                        &rs,
                        created_at,
                        self.window.end,
                        None,
                    )
                    .await
                    .map_err(|e| GeneratorError::stage("pod_with_replicaset", e))?;
                pod_count += 1;
            }

            replicasets.push(rs);
        }

        info!(
            "Created {} replicasets, {} deployment_with_replicaset relations, \
             {pod_count} pod_with_replicaset relations",
            replicasets.len(),
            deployments.len()
        );
        self.registry.insert(EntityKind::ReplicaSet, replicasets);
        Ok(())
    }

    /// Dynamic pod-to-pod traffic: each pod opens a connection to one
    /// distinct random target with the configured probability.
    pub async fn create_dynamic_relations(&mut self) -> Result<(), GeneratorError> {
        let pods = self.registry.get(&EntityKind::Pod).cloned().unwrap_or_default();

        for i in 0..pods.len() {
            let roll: f64 = self.rng.gen();
            if roll >= self.topology.traffic_probability {
                continue;
            }
            let Some(target) = pick_distinct_target(&mut self.rng, pods.len(), i) else {
                continue;
            };

            let created_at = self.random_created_at();
            self.client
                .upsert_relation(
                    RelationKind::PodToPod,
                    EntityKind::Pod,
                    &pods[i],
                    EntityKind::Pod,
                    &pods[target],
                    created_at,
                    self.window.end,
                    None,
                )
                .await
                .map_err(|e| GeneratorError::stage("pod_to_pod", e))?;

            self.traffic.push((pods[i].clone(), pods[target].clone()));
        }

        info!("Created {} pod_to_pod traffic relations", self.traffic.len());
        Ok(())
    }

    /// Fixed metric catalog for traffic relations.
    pub async fn create_metric_definitions(&mut self) -> Result<(), GeneratorError> {
        let catalog = vec![
            fields(json!({
                "metric_name": FLOW_TOTAL_METRIC,
                "metric_type": MetricType::Counter.as_str(),
                "unit": "count",
                "description": "Total volume of pod to pod traffic",
            })),
            fields(json!({
                "metric_name": FLOW_SECONDS_METRIC,
                "metric_type": MetricType::Gauge.as_str(),
                "unit": "seconds",
                "description": "Latency of pod to pod traffic",
            })),
            fields(json!({
                "metric_name": FLOW_ERROR_METRIC,
                "metric_type": MetricType::Counter.as_str(),
                "unit": "count",
                "description": "Error count of pod to pod traffic",
            })),
        ];

        let created_at = self.random_created_at();
        for metric in &catalog {
            self.client
                .upsert_node(EntityKind::Metric, metric, created_at, self.window.end)
                .await
                .map_err(|e| GeneratorError::stage("metric_definitions", e))?;
        }

        info!("Created {} metric definitions", catalog.len());
        self.registry.insert(EntityKind::Metric, catalog);
        Ok(())
    }

    /// Attach every metric definition to every traffic relation written
    /// this run, tagging each edge with its derived result table id.
    pub async fn create_relation_metrics(&mut self) -> Result<(), GeneratorError> {
        let metrics = self.registry.get(&EntityKind::Metric).cloned().unwrap_or_default();
        let traffic = self.traffic.clone();
        let run_ts = self.client.format_timestamp(self.window.end);

        let mut count = 0;
        for (source, target) in &traffic {
            let traffic_id = relation_id(
                RelationKind::PodToPod,
                EntityKind::Pod,
                source,
                EntityKind::Pod,
                target,
            );

            for metric in &metrics {
                let metric_id = node_id(EntityKind::Metric, metric);
                let result_table_id = format!(
                    "{}_{}",
                    self.topology.result_table_id,
                    field_str(metric, "metric_name")
                );

                let stmt = statements::relation_metric(
                    &traffic_id,
                    &metric_id,
                    &result_table_id,
                    &run_ts,
                    &run_ts,
                );
                self.client
                    .execute(&stmt)
                    .await
                    .map_err(|e| GeneratorError::stage("relation_has_metric", e))?;
                count += 1;
            }
        }

        info!("Created {count} relation_has_metric associations");
        Ok(())
    }
}

/// Build a field map from a JSON object literal.
fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

fn field_str<'a>(fields: &'a Fields, key: &str) -> &'a str {
    fields.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Split `total` items into `groups` contiguous ranges using integer
/// division; the final group absorbs the remainder. Zero groups with items
/// to place is a caller error.
fn partition_even(
    total: usize,
    groups: usize,
    what: &str,
) -> Result<Vec<(usize, usize)>, GeneratorError> {
    if groups == 0 {
        if total == 0 {
            return Ok(Vec::new());
        }
        return Err(GeneratorError::InvalidTopology(format!(
            "cannot partition {total} pods across zero {what}"
        )));
    }

    let per_group = total / groups;
    Ok((0..groups)
        .map(|i| {
            let start = i * per_group;
            let end = if i == groups - 1 { total } else { start + per_group };
            (start, end)
        })
        .collect())
}

/// Pick a random target index distinct from `source`, or `None` when there
/// is no other candidate.
fn pick_distinct_target<R: Rng>(rng: &mut R, n: usize, source: usize) -> Option<usize> {
    if n < 2 {
        return None;
    }
    let mut target = rng.gen_range(0..n - 1);
    if target >= source {
        target += 1;
    }
    Some(target)
}
