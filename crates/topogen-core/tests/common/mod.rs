//! In-memory storage backend for generator tests.
//!
//! Implements the full client contract with the same idempotence
//! semantics the real backends enforce at write time: `created_at` is
//! kept when a row already exists, `updated_at` and all other fields are
//! overwritten. Batches apply all-or-nothing. Failure injection knobs
//! simulate backend errors mid-run.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use topogen_core::graph::{node_id, relation_id, EntityKind, Fields, RelationKind};
use topogen_core::storage::{StorageClient, StorageError};

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MockState {
    pub nodes: BTreeMap<String, StoredRow>,
    pub relations: BTreeMap<String, StoredRow>,
    pub statements: Vec<String>,
    pub fail_batch_for: Option<EntityKind>,
    pub fail_relation_for: Option<RelationKind>,
}

/// Cloneable handle onto shared in-memory storage.
#[derive(Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<MockState>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Make every batch upsert for `kind` fail atomically.
    pub fn fail_batches_for(&self, kind: EntityKind) {
        self.state().fail_batch_for = Some(kind);
    }

    /// Make every relation upsert of `kind` fail.
    pub fn fail_relations_for(&self, kind: RelationKind) {
        self.state().fail_relation_for = Some(kind);
    }

    pub fn node_count(&self, kind: EntityKind) -> usize {
        let prefix = format!("{}:", kind.as_str());
        self.state()
            .nodes
            .keys()
            .filter(|id| id.starts_with(&prefix))
            .count()
    }

    pub fn relation_count(&self, kind: RelationKind) -> usize {
        let prefix = format!("{}:", kind.as_str());
        self.state()
            .relations
            .keys()
            .filter(|id| id.starts_with(&prefix))
            .count()
    }

    /// Relation ids of `kind` grouped by their target side, as group sizes.
    pub fn relation_group_sizes(&self, kind: RelationKind) -> Vec<usize> {
        let prefix = format!("{}:", kind.as_str());
        let mut groups: BTreeMap<String, usize> = BTreeMap::new();
        for id in self.state().relations.keys() {
            if let Some(rest) = id.strip_prefix(&prefix) {
                if let Some((_, target)) = rest.split_once('|') {
                    *groups.entry(target.to_string()).or_insert(0) += 1;
                }
            }
        }
        let mut sizes: Vec<usize> = groups.into_values().collect();
        sizes.sort_unstable();
        sizes
    }

    /// Statements attaching metric definitions to traffic relations.
    pub fn relation_metric_statement_count(&self) -> usize {
        self.state()
            .statements
            .iter()
            .filter(|s| s.contains("->relation_has_metric"))
            .count()
    }

    fn upsert_row(
        rows: &mut BTreeMap<String, StoredRow>,
        id: String,
        fields: Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) {
        rows.entry(id)
            .and_modify(|row| {
                // created_at = created_at OR <supplied>
                row.fields = fields.clone();
                row.updated_at = updated_at;
            })
            .or_insert(StoredRow {
                fields,
                created_at,
                updated_at,
            });
    }
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn execute(&self, statement: &str) -> Result<Vec<Value>, StorageError> {
        self.state().statements.push(statement.to_string());
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert_node(
        &self,
        kind: EntityKind,
        fields: &Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Value>, StorageError> {
        let id = node_id(kind, fields);
        let mut state = self.state();
        Self::upsert_row(&mut state.nodes, id, fields.clone(), created_at, updated_at);
        Ok(Vec::new())
    }

    async fn batch_upsert_nodes(
        &self,
        kind: EntityKind,
        batch: &[Fields],
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Value>, StorageError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state();
        if state.fail_batch_for == Some(kind) {
            // Atomic: nothing from the batch is applied.
            return Err(StorageError::Batch(format!(
                "injected failure for {kind} batch"
            )));
        }
        for fields in batch {
            let id = node_id(kind, fields);
            Self::upsert_row(&mut state.nodes, id, fields.clone(), created_at, updated_at);
        }
        Ok(Vec::new())
    }

    async fn upsert_relation(
        &self,
        kind: RelationKind,
        source_kind: EntityKind,
        source: &Fields,
        target_kind: EntityKind,
        target: &Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        extra_fields: Option<&Fields>,
    ) -> Result<Vec<Value>, StorageError> {
        let mut state = self.state();
        if state.fail_relation_for == Some(kind) {
            return Err(StorageError::query(
                "ERR",
                format!("injected failure for {kind} relation"),
            ));
        }

        let id = relation_id(kind, source_kind, source, target_kind, target);
        let fields = extra_fields.cloned().unwrap_or_default();
        Self::upsert_row(&mut state.relations, id, fields, created_at, updated_at);
        Ok(Vec::new())
    }
}
