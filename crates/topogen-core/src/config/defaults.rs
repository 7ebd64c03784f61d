//! Default values for topogen configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Backend Defaults
// ============================================================================

/// Default storage backend.
pub const DEFAULT_BACKEND: &str = "native";

// SurrealDB defaults
/// Default SurrealDB HTTP endpoint.
pub const DEFAULT_SURREAL_URL: &str = "http://localhost:8000";
/// Default SurrealDB username.
pub const DEFAULT_SURREAL_USER: &str = "root";
/// Default SurrealDB password.
pub const DEFAULT_SURREAL_PASS: &str = "root";
/// Default SurrealDB namespace.
pub const DEFAULT_SURREAL_NS: &str = "test";
/// Default SurrealDB database.
pub const DEFAULT_SURREAL_DB: &str = "test";

// BKBase defaults (no defaults for credentials or endpoint)
/// Default BKBase authentication method.
pub const DEFAULT_BKBASE_AUTH_METHOD: &str = "user";
/// Default BKBase preferred storage engine.
pub const DEFAULT_BKBASE_PREFER_STORAGE: &str = "surrealdb";

// ============================================================================
// Topology Defaults
// ============================================================================

/// Default business id.
pub const DEFAULT_BIZ_ID: &str = "2";
/// Default business name, used as the resource name prefix.
pub const DEFAULT_BIZ_NAME: &str = "bkop";
/// Default cluster id.
pub const DEFAULT_CLUSTER_ID: &str = "BCS-K8S-00002";
/// Default namespace.
pub const DEFAULT_NAMESPACE: &str = "bkop";
/// Default result table id prefix for metric series.
pub const DEFAULT_RESULT_TABLE_ID: &str = "2_bkmonitor_bkop_2";
/// Default service names.
pub const DEFAULT_SERVICES: &[&str] = &["api", "web", "worker"];
/// Default number of nodes.
pub const DEFAULT_NUM_NODES: usize = 3;
/// Default number of pods.
pub const DEFAULT_NUM_PODS: usize = 10;
/// Default number of deployments.
pub const DEFAULT_NUM_DEPLOYMENTS: usize = 3;
/// Default probability that a pod opens traffic to another pod.
pub const DEFAULT_TRAFFIC_PROBABILITY: f64 = 0.4;
/// Default historical window for resource ages, in hours.
pub const DEFAULT_TIME_BACK_HOURS: i64 = 1;

// ============================================================================
// Metric Defaults
// ============================================================================

/// Default per-step increment range for the flow total counter.
pub const DEFAULT_FLOW_TOTAL_MIN: i64 = 10;
pub const DEFAULT_FLOW_TOTAL_MAX: i64 = 1000;

/// Default latency range in seconds for the flow seconds gauge.
pub const DEFAULT_FLOW_SECONDS_MIN: f64 = 0.01;
pub const DEFAULT_FLOW_SECONDS_MAX: f64 = 2.0;

/// Default per-point error rate range.
pub const DEFAULT_ERROR_RATE_MIN: f64 = 0.0;
pub const DEFAULT_ERROR_RATE_MAX: f64 = 0.1;

/// Default number of evenly spaced sample points per series.
pub const DEFAULT_METRIC_TIME_POINTS: usize = 12;

/// Default path for the generated metric samples document.
pub const DEFAULT_OUTPUT_PATH: &str = "./metric_samples.json";

// ============================================================================
// Config Files
// ============================================================================

/// Base configuration file name.
pub const CONFIG_FILE: &str = "topogen.toml";

/// Local override file name (not meant for version control).
pub const LOCAL_CONFIG_FILE: &str = "topogen.local.toml";
