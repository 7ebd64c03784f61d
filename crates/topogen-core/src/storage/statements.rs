//! Statement construction shared by every backend.
//!
//! Both backends speak the same query dialect (the broker forwards the
//! statement verbatim inside its envelope), so the statement text is built
//! once here. The `created_at = created_at OR ...` clause is the write-time
//! conditional assignment that pins a record's creation timestamp to the
//! first run that wrote it; `updated_at` is overwritten on every write.

use crate::graph::{node_id, relation_id, EntityKind, Fields, RelationKind};

use super::escape::{quote_str, render_value};

/// Upsert statement for a single node.
pub(crate) fn upsert_node(
    kind: EntityKind,
    fields: &Fields,
    created_at: &str,
    updated_at: &str,
) -> String {
    let id = node_id(kind, fields);

    let mut set_parts: Vec<String> = fields
        .iter()
        .map(|(key, value)| format!("{} = {}", key, render_value(value)))
        .collect();
    set_parts.push(format!(
        "created_at = created_at OR type::datetime({})",
        quote_str(created_at)
    ));
    set_parts.push(format!("updated_at = type::datetime({})", quote_str(updated_at)));

    format!("UPSERT {}:`{}` SET {};", kind.as_str(), id, set_parts.join(", "))
}

/// Upserts for a batch of nodes, wrapped in a single transaction so the
/// batch commits all-or-nothing.
pub(crate) fn batch_upsert_nodes(
    kind: EntityKind,
    batch: &[Fields],
    created_at: &str,
    updated_at: &str,
) -> String {
    let statements: Vec<String> = batch
        .iter()
        .map(|fields| upsert_node(kind, fields, created_at, updated_at))
        .collect();

    format!(
        "BEGIN TRANSACTION;\n{}\nCOMMIT TRANSACTION;",
        statements.join("\n")
    )
}

/// Relate statement for a directed relation between two nodes.
///
/// The edge carries an explicit record id derived from both endpoints, so
/// re-running converges on one edge instead of accumulating duplicates.
/// Extra fields are overwritten unconditionally, unlike `created_at`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn upsert_relation(
    kind: RelationKind,
    source_kind: EntityKind,
    source: &Fields,
    target_kind: EntityKind,
    target: &Fields,
    created_at: &str,
    updated_at: &str,
    extra_fields: Option<&Fields>,
) -> String {
    let source_id = node_id(source_kind, source);
    let target_id = node_id(target_kind, target);
    let edge_id = relation_id(kind, source_kind, source, target_kind, target);

    let mut set_parts = vec![
        format!(
            "created_at = created_at OR type::datetime({})",
            quote_str(created_at)
        ),
        format!("updated_at = type::datetime({})", quote_str(updated_at)),
    ];
    if let Some(extra) = extra_fields {
        for (key, value) in extra {
            set_parts.push(format!("{} = {}", key, render_value(value)));
        }
    }

    format!(
        "RELATE {}:`{}`->{}:`{}`->{}:`{}` SET {};",
        source_kind.as_str(),
        source_id,
        kind.as_str(),
        edge_id,
        target_kind.as_str(),
        target_id,
        set_parts.join(", ")
    )
}

/// Relate statement attaching a metric definition to a traffic relation.
///
/// The source here is an edge record, not a node, so this cannot go
/// through [`upsert_relation`]; the stable edge id keeps it idempotent all
/// the same.
pub(crate) fn relation_metric(
    traffic_relation_id: &str,
    metric_id: &str,
    result_table_id: &str,
    created_at: &str,
    updated_at: &str,
) -> String {
    let edge_id = format!(
        "{}:{}|{}",
        RelationKind::RelationHasMetric.as_str(),
        traffic_relation_id,
        metric_id
    );

    format!(
        "RELATE {}:`{}`->{}:`{}`->{}:`{}` SET result_table_id = {}, \
         created_at = created_at OR type::datetime({}), updated_at = type::datetime({});",
        RelationKind::PodToPod.as_str(),
        traffic_relation_id,
        RelationKind::RelationHasMetric.as_str(),
        edge_id,
        EntityKind::Metric.as_str(),
        metric_id,
        quote_str(result_table_id),
        quote_str(created_at),
        quote_str(updated_at)
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn upsert_node_pins_created_at_and_overwrites_updated_at() {
        let pod = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "p1"}));
        let stmt = upsert_node(EntityKind::Pod, &pod, "2026-08-01T00:00:00Z", "2026-08-06T12:00:00Z");

        assert!(stmt.starts_with("UPSERT pod:`pod:bcs_cluster_id=c1,namespace=ns,pod=p1` SET"));
        assert!(stmt.contains("created_at = created_at OR type::datetime('2026-08-01T00:00:00Z')"));
        assert!(stmt.contains("updated_at = type::datetime('2026-08-06T12:00:00Z')"));
        // No conditional on updated_at.
        assert!(!stmt.contains("updated_at = updated_at OR"));
    }

    #[test]
    fn upsert_node_escapes_string_values() {
        let node = fields(json!({"bcs_cluster_id": "c'1", "node": "n1"}));
        let stmt = upsert_node(EntityKind::Node, &node, "t", "t");
        assert!(stmt.contains("bcs_cluster_id = 'c\\'1'"));
    }

    #[test]
    fn batch_wraps_one_transaction() {
        let batch = vec![
            fields(json!({"bcs_cluster_id": "c1", "node": "n0"})),
            fields(json!({"bcs_cluster_id": "c1", "node": "n1"})),
        ];
        let stmt = batch_upsert_nodes(EntityKind::Node, &batch, "t0", "t1");

        assert!(stmt.starts_with("BEGIN TRANSACTION;"));
        assert!(stmt.ends_with("COMMIT TRANSACTION;"));
        assert_eq!(stmt.matches("UPSERT node:").count(), 2);
        assert_eq!(stmt.matches("BEGIN TRANSACTION").count(), 1);
    }

    #[test]
    fn relation_carries_stable_edge_id() {
        let node = fields(json!({"bcs_cluster_id": "c1", "node": "n1"}));
        let pod = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "p1"}));
        let stmt = upsert_relation(
            RelationKind::NodeWithPod,
            EntityKind::Node,
            &node,
            EntityKind::Pod,
            &pod,
            "t0",
            "t1",
            None,
        );

        assert!(stmt.contains(
            "->node_with_pod:`node_with_pod:bcs_cluster_id=c1,node=n1|bcs_cluster_id=c1,namespace=ns,pod=p1`->"
        ));
        assert!(stmt.contains("created_at = created_at OR"));
    }

    #[test]
    fn relation_extra_fields_are_unconditional() {
        let a = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "a"}));
        let b = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "b"}));
        let extra = fields(json!({"weight": 3}));
        let stmt = upsert_relation(
            RelationKind::PodToPod,
            EntityKind::Pod,
            &a,
            EntityKind::Pod,
            &b,
            "t0",
            "t1",
            Some(&extra),
        );

        assert!(stmt.contains("weight = 3"));
        assert!(!stmt.contains("weight = weight OR"));
    }

    #[test]
    fn relation_metric_tags_result_table() {
        let stmt = relation_metric(
            "pod_to_pod:x|y",
            "metric:metric_name=pod_to_pod_flow_total",
            "2_bkmonitor_bkop_2_pod_to_pod_flow_total",
            "t0",
            "t1",
        );

        assert!(stmt.starts_with("RELATE pod_to_pod:`pod_to_pod:x|y`->relation_has_metric:"));
        assert!(stmt.contains("result_table_id = '2_bkmonitor_bkop_2_pod_to_pod_flow_total'"));
        assert!(stmt.contains("created_at = created_at OR"));
    }
}
