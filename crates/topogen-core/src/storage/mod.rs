//! Storage client contract and backend implementations.
//!
//! Every backend exposes the same five operations with identical
//! idempotence semantics: re-issuing a write for the same logical entity
//! converges on one row whose `created_at` is pinned to the first write.
//! Backends differ only in transport - [`SurrealClient`] talks directly to
//! the database's query endpoint, [`BkBaseClient`] routes the same
//! statement through an intermediary API that injects its own
//! authentication envelope.

mod bkbase;
mod error;
pub(crate) mod escape;
pub(crate) mod statements;
mod surreal;

pub use bkbase::BkBaseClient;
pub use error::StorageError;
pub use surreal::SurrealClient;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::Config;
use crate::graph::{EntityKind, Fields, RelationKind};

/// Wire format for timestamps: UTC, second precision. Both backends use
/// it verbatim and it must round-trip exactly through `execute`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Per-request ceiling for backend HTTP calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Abstract storage client.
///
/// The three upsert operations are provided in terms of [`execute`] and the
/// shared statement builders, so every backend inherits identical
/// pre/post-conditions; backends implement transport (`execute`, `ping`).
///
/// [`execute`]: StorageClient::execute
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Run a backend-native statement, returning one result payload per
    /// application statement. Backend error records surface as
    /// [`StorageError::Query`].
    async fn execute(&self, statement: &str) -> Result<Vec<Value>, StorageError>;

    /// Cheap connectivity check, run before any generation starts.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Canonical wire encoding for a time value.
    fn format_timestamp(&self, t: DateTime<Utc>) -> String {
        t.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Upsert a single node. Safe to repeat unboundedly with the same
    /// `(kind, fields)`: one logical row, `created_at` pinned to the first
    /// call, `updated_at` reflecting the latest.
    async fn upsert_node(
        &self,
        kind: EntityKind,
        fields: &Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Value>, StorageError> {
        let stmt = statements::upsert_node(
            kind,
            fields,
            &self.format_timestamp(created_at),
            &self.format_timestamp(updated_at),
        );
        self.execute(&stmt).await
    }

    /// Upsert a batch of nodes as one atomic unit: all succeed or none do.
    /// An empty batch is a no-op, not an error.
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

        let stmt = statements::batch_upsert_nodes(
            kind,
            batch,
            &self.format_timestamp(created_at),
            &self.format_timestamp(updated_at),
        );
        self.execute(&stmt).await.map_err(|err| match err {
            // The transaction rolled back as a whole; report it as such.
            StorageError::Query { status, message } => {
                StorageError::Batch(format!("{status} - {message}"))
            }
            other => other,
        })
    }

    /// Upsert a directed relation between two nodes. Timestamps follow the
    /// conditional rule; `extra_fields` are overwritten on every call.
    #[allow(clippy::too_many_arguments)]
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
        let stmt = statements::upsert_relation(
            kind,
            source_kind,
            source,
            target_kind,
            target,
            &self.format_timestamp(created_at),
            &self.format_timestamp(updated_at),
            extra_fields,
        );
        self.execute(&stmt).await
    }
}

/// Storage backend selection.
///
/// Concrete clients are built by a configuration-time factory; nothing
/// downstream of construction inspects the backend again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Direct connection to the SurrealDB query endpoint.
    #[default]
    Native,
    /// Access through the BKBase unified query API.
    BkBase,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::BkBase => "bkbase",
        }
    }

    /// Build the storage client for this backend from resolved config.
    ///
    /// The BKBase client validates its required settings here and fails
    /// with [`StorageError::Configuration`] before any network call.
    pub fn build(self, config: &Config) -> Result<Box<dyn StorageClient>, StorageError> {
        match self {
            Backend::Native => Ok(Box::new(SurrealClient::new(&config.surreal))),
            Backend::BkBase => Ok(Box::new(BkBaseClient::new(&config.bkbase)?)),
        }
    }
}

impl FromStr for Backend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Backend::Native),
            "bkbase" => Ok(Backend::BkBase),
            other => Err(StorageError::Configuration(format!(
                "Unknown storage backend: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_str() {
        assert_eq!("native".parse::<Backend>().unwrap(), Backend::Native);
        assert_eq!("bkbase".parse::<Backend>().unwrap(), Backend::BkBase);
        assert!(matches!(
            "mysql".parse::<Backend>(),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn timestamp_format_is_utc_second_precision() {
        use chrono::TimeZone;

        struct Probe;

        #[async_trait]
        impl StorageClient for Probe {
            async fn execute(&self, _statement: &str) -> Result<Vec<Value>, StorageError> {
                Ok(Vec::new())
            }
            async fn ping(&self) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let t = Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 15).unwrap();
        assert_eq!(Probe.format_timestamp(t), "2026-08-06T09:30:15Z");
    }
}
