//! Deterministic identifier derivation for nodes and relations.
//!
//! A node identifier is `<kind>:<field>=<value>,...` with the identifying
//! fields sorted alphabetically. A relation identifier is
//! `<kind>:<source pairs>|<target pairs>`. Sorting before joining means the
//! same logical entity yields a byte-identical identifier regardless of
//! field insertion order, which is the sole mechanism preventing duplicate
//! rows across repeated runs. External queries depend on this exact shape.

use serde_json::Value;

use super::schema::{EntityKind, RelationKind};
use super::Fields;

/// Derive the identifier for a node of the given kind.
///
/// A missing identifying field serializes as the empty string rather than
/// failing. That keeps derivation total, but two entities missing the same
/// field can collide - callers are expected to supply every index field.
pub fn node_id(kind: EntityKind, fields: &Fields) -> String {
    format!("{}:{}", kind.as_str(), index_pairs(kind, fields))
}

/// Derive the identifier for a directed relation between two nodes.
pub fn relation_id(
    kind: RelationKind,
    source_kind: EntityKind,
    source: &Fields,
    target_kind: EntityKind,
    target: &Fields,
) -> String {
    format!(
        "{}:{}|{}",
        kind.as_str(),
        index_pairs(source_kind, source),
        index_pairs(target_kind, target)
    )
}

/// Render the sorted `field=value` pairs for a kind's identifying fields.
fn index_pairs(kind: EntityKind, fields: &Fields) -> String {
    let mut keys: Vec<&str> = kind.index_fields().to_vec();
    keys.sort_unstable();

    let pairs: Vec<String> = keys
        .iter()
        .map(|key| format!("{}={}", key, field_text(fields.get(*key))))
        .collect();
    pairs.join(",")
}

/// Scalar field value as identifier text. Absent and null both render empty.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn node_id_is_deterministic_across_field_order() {
        let a = fields(json!({
            "bcs_cluster_id": "BCS-K8S-00002",
            "namespace": "bkop",
            "pod": "bkop-pod-001",
        }));
        let b = fields(json!({
            "pod": "bkop-pod-001",
            "namespace": "bkop",
            "bcs_cluster_id": "BCS-K8S-00002",
        }));

        assert_eq!(node_id(EntityKind::Pod, &a), node_id(EntityKind::Pod, &b));
        assert_eq!(
            node_id(EntityKind::Pod, &a),
            "pod:bcs_cluster_id=BCS-K8S-00002,namespace=bkop,pod=bkop-pod-001"
        );
    }

    #[test]
    fn node_id_ignores_extraneous_fields() {
        let plain = fields(json!({"bcs_cluster_id": "c1", "node": "n1"}));
        let extra = fields(json!({
            "bcs_cluster_id": "c1",
            "node": "n1",
            "region": "eu-west",
            "cpu_cores": 16,
        }));

        assert_eq!(
            node_id(EntityKind::Node, &plain),
            node_id(EntityKind::Node, &extra)
        );
    }

    #[test]
    fn node_id_differs_when_any_index_field_differs() {
        let a = fields(json!({"bcs_cluster_id": "c1", "node": "n1"}));
        let b = fields(json!({"bcs_cluster_id": "c1", "node": "n2"}));
        let c = fields(json!({"bcs_cluster_id": "c2", "node": "n1"}));

        assert_ne!(node_id(EntityKind::Node, &a), node_id(EntityKind::Node, &b));
        assert_ne!(node_id(EntityKind::Node, &a), node_id(EntityKind::Node, &c));
    }

    #[test]
    fn missing_index_field_renders_empty() {
        // Documented degradation: derivation stays total but collisions
        // become possible between entities missing the same field.
        let partial = fields(json!({"bcs_cluster_id": "c1"}));
        assert_eq!(node_id(EntityKind::Node, &partial), "node:bcs_cluster_id=c1,node=");

        let also_partial = fields(json!({"bcs_cluster_id": "c1", "node": ""}));
        assert_eq!(
            node_id(EntityKind::Node, &partial),
            node_id(EntityKind::Node, &also_partial)
        );
    }

    #[test]
    fn numeric_field_values_render_bare() {
        let with_int = fields(json!({"bk_biz_id": 2}));
        assert_eq!(node_id(EntityKind::Business, &with_int), "biz:bk_biz_id=2");
    }

    #[test]
    fn relation_id_joins_source_and_target_pairs() {
        let node = fields(json!({"bcs_cluster_id": "c1", "node": "n1"}));
        let pod = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "p1"}));

        assert_eq!(
            relation_id(RelationKind::NodeWithPod, EntityKind::Node, &node, EntityKind::Pod, &pod),
            "node_with_pod:bcs_cluster_id=c1,node=n1|bcs_cluster_id=c1,namespace=ns,pod=p1"
        );
    }

    #[test]
    fn relation_id_is_direction_sensitive() {
        let a = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "a"}));
        let b = fields(json!({"bcs_cluster_id": "c1", "namespace": "ns", "pod": "b"}));

        let forward =
            relation_id(RelationKind::PodToPod, EntityKind::Pod, &a, EntityKind::Pod, &b);
        let reverse =
            relation_id(RelationKind::PodToPod, EntityKind::Pod, &b, EntityKind::Pod, &a);
        assert_ne!(forward, reverse);
    }
}
