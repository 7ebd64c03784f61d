//! Resource graph data model: entity/relation kinds and identifier derivation.
//!
//! Every record written to the backend is addressed by a deterministic
//! string identifier derived from its identifying fields. Deriving the same
//! identifier for the same logical entity on every run is what makes all
//! writes idempotent - there is no read-before-write anywhere.

mod ident;
mod schema;

pub use ident::{node_id, relation_id};
pub use schema::{EntityKind, MetricType, RelationKind};

/// Field map for a single entity or relation instance.
///
/// Values are scalars (string, integer, or float). Non-identifying fields
/// are written to the backend but ignored by identifier derivation.
pub type Fields = serde_json::Map<String, serde_json::Value>;
