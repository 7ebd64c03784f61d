//! Core library for topogen: populates a SurrealDB-backed resource graph
//! with synthetic but internally consistent cluster topology - business,
//! cluster, namespace, nodes, pods, services, deployments, replicasets,
//! the relations connecting them - plus metric definitions and synthetic
//! time series for pod-to-pod traffic.
//!
//! All writes are idempotent: identifiers are derived deterministically
//! from identifying fields ([`graph`]), and every upsert pins `created_at`
//! to the first write via a conditional assignment at the storage boundary
//! ([`storage`]). Re-running the generator converges on the same graph.
//!
//! # Components
//!
//! - [`config`] - layered configuration (files, environment)
//! - [`graph`] - entity/relation schema and identifier derivation
//! - [`storage`] - the [`StorageClient`] contract and its two backends
//! - [`generator`] - the staged topology generator
//! - [`metrics`] - the traffic metric synthesizer and sample output

pub mod config;
pub mod generator;
pub mod graph;
pub mod metrics;
pub mod storage;

pub use config::{Config, ConfigError};
pub use generator::{GeneratorError, TimeWindow, TopologyGenerator};
pub use graph::{node_id, relation_id, EntityKind, Fields, RelationKind};
pub use metrics::{write_samples, MetricSeries, MetricSynthesizer, MetricsError};
pub use storage::{Backend, BkBaseClient, StorageClient, StorageError, SurrealClient};
