//! Configuration management for topogen.
//!
//! Configuration is loaded from layered sources with the following
//! priority (highest wins):
//! 1. Environment variables
//! 2. Local override file `topogen.local.toml`
//! 3. Backend-specific file `topogen.<backend>.toml`
//! 4. Base file `topogen.toml` (or `~/.config/topogen/config.toml`)
//! 5. Built-in defaults
//!
//! The core components receive only the resolved scalar values; nothing
//! below this module reads the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Backend;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage backend name: "native" or "bkbase".
    pub backend: String,

    /// Direct SurrealDB connection settings.
    pub surreal: SurrealConfig,

    /// BKBase unified query API settings.
    pub bkbase: BkBaseConfig,

    /// Topology generation knobs.
    pub topology: TopologyConfig,

    /// Metric synthesis knobs.
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from the current directory and the environment.
    pub fn load(backend_hint: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), backend_hint)
    }

    /// Load configuration rooted at `dir`.
    ///
    /// `backend_hint` (the command line flag) takes precedence over the
    /// `STORAGE_BACKEND` environment variable, which takes precedence over
    /// the base file's `backend` key.
    pub fn load_from(dir: &Path, backend_hint: Option<&str>) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::value::Table::new());

        // Base layer: project-local file first, user config as fallback.
        let base = dir.join(CONFIG_FILE);
        if base.exists() {
            merge_into(&mut merged, read_toml(&base)?);
        } else if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("topogen").join("config.toml");
            if user_config.exists() {
                merge_into(&mut merged, read_toml(&user_config)?);
            }
        }

        // Backend selection decides which backend-specific file applies.
        let backend = backend_hint
            .map(str::to_string)
            .or_else(|| std::env::var("STORAGE_BACKEND").ok())
            .or_else(|| {
                merged
                    .get("backend")
                    .and_then(toml::Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());

        let backend_file = dir.join(format!("topogen.{backend}.toml"));
        if backend_file.exists() {
            merge_into(&mut merged, read_toml(&backend_file)?);
        }

        let local = dir.join(LOCAL_CONFIG_FILE);
        if local.exists() {
            merge_into(&mut merged, read_toml(&local)?);
        }

        let mut config: Config = merged.try_into()?;
        config.backend = backend;
        config.apply_env_overrides();

        Ok(config)
    }

    /// The resolved storage backend.
    pub fn storage_backend(&self) -> Result<Backend, ConfigError> {
        self.backend
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{e}")))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // SurrealDB overrides
        if let Ok(url) = std::env::var("SURREAL_URL") {
            self.surreal.url = url;
        }
        if let Ok(user) = std::env::var("SURREAL_USER") {
            self.surreal.username = user;
        }
        if let Ok(pass) = std::env::var("SURREAL_PASS") {
            self.surreal.password = pass;
        }
        if let Ok(ns) = std::env::var("SURREAL_NS") {
            self.surreal.namespace = ns;
        }
        if let Ok(db) = std::env::var("SURREAL_DB") {
            self.surreal.database = db;
        }

        // BKBase overrides
        if let Ok(url) = std::env::var("BKBASE_API_URL") {
            self.bkbase.api_url = url;
        }
        if let Ok(user) = std::env::var("BKBASE_USERNAME") {
            self.bkbase.username = user;
        }
        if let Ok(code) = std::env::var("BKBASE_APP_CODE") {
            self.bkbase.app_code = code;
        }
        if let Ok(secret) = std::env::var("BKBASE_APP_SECRET") {
            self.bkbase.app_secret = secret;
        }
        if let Ok(table) = std::env::var("BKBASE_RESULT_TABLE_ID") {
            self.bkbase.result_table_id = table;
        }
        if let Ok(method) = std::env::var("BKBASE_AUTH_METHOD") {
            self.bkbase.auth_method = method;
        }
        if let Ok(storage) = std::env::var("BKBASE_PREFER_STORAGE") {
            self.bkbase.prefer_storage = storage;
        }

        // Topology overrides
        if let Ok(id) = std::env::var("BIZ_ID") {
            self.topology.biz_id = id;
        }
        if let Ok(name) = std::env::var("BIZ_NAME") {
            self.topology.biz_name = name;
        }
        if let Ok(id) = std::env::var("CLUSTER_ID") {
            self.topology.cluster_id = id;
        }
        if let Ok(ns) = std::env::var("NAMESPACE") {
            self.topology.namespace = ns;
        }
        if let Ok(table) = std::env::var("RESULT_TABLE_ID") {
            self.topology.result_table_id = table;
        }
        if let Ok(n) = std::env::var("NUM_NODES") {
            if let Ok(n) = n.parse() {
                self.topology.num_nodes = n;
            }
        }
        if let Ok(n) = std::env::var("NUM_PODS") {
            if let Ok(n) = n.parse() {
                self.topology.num_pods = n;
            }
        }
        if let Ok(n) = std::env::var("NUM_DEPLOYMENTS") {
            if let Ok(n) = n.parse() {
                self.topology.num_deployments = n;
            }
        }
        if let Ok(p) = std::env::var("POD_TO_POD_TRAFFIC_PROBABILITY") {
            if let Ok(p) = p.parse() {
                self.topology.traffic_probability = p;
            }
        }
        if let Ok(h) = std::env::var("DEFAULT_TIME_BACK_HOURS") {
            if let Ok(h) = h.parse() {
                self.topology.time_back_hours = h;
            }
        }

        // Metric overrides
        if let Ok(v) = std::env::var("FLOW_TOTAL_MIN") {
            if let Ok(v) = v.parse() {
                self.metrics.flow_total_min = v;
            }
        }
        if let Ok(v) = std::env::var("FLOW_TOTAL_MAX") {
            if let Ok(v) = v.parse() {
                self.metrics.flow_total_max = v;
            }
        }
        if let Ok(v) = std::env::var("FLOW_SECONDS_MIN") {
            if let Ok(v) = v.parse() {
                self.metrics.flow_seconds_min = v;
            }
        }
        if let Ok(v) = std::env::var("FLOW_SECONDS_MAX") {
            if let Ok(v) = v.parse() {
                self.metrics.flow_seconds_max = v;
            }
        }
        if let Ok(v) = std::env::var("FLOW_ERROR_RATE_MIN") {
            if let Ok(v) = v.parse() {
                self.metrics.error_rate_min = v;
            }
        }
        if let Ok(v) = std::env::var("FLOW_ERROR_RATE_MAX") {
            if let Ok(v) = v.parse() {
                self.metrics.error_rate_max = v;
            }
        }
        if let Ok(n) = std::env::var("METRIC_TIME_POINTS") {
            if let Ok(n) = n.parse() {
                self.metrics.time_points = n;
            }
        }
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// Read a TOML file into a value tree.
fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge `overlay` into `base`, table-by-table; overlay scalars win.
fn merge_into(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) if existing.is_table() && value.is_table() => {
                        merge_into(existing, value);
                    }
                    _ => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Direct SurrealDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrealConfig {
    /// HTTP endpoint of the SurrealDB server.
    pub url: String,

    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    pub namespace: String,

    pub database: String,
}

impl Default for SurrealConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SURREAL_URL.to_string(),
            username: DEFAULT_SURREAL_USER.to_string(),
            password: DEFAULT_SURREAL_PASS.to_string(),
            namespace: DEFAULT_SURREAL_NS.to_string(),
            database: DEFAULT_SURREAL_DB.to_string(),
        }
    }
}

/// BKBase unified query API settings.
///
/// Endpoint and credentials carry no defaults; the client validates them
/// at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BkBaseConfig {
    pub api_url: String,

    pub username: String,

    pub app_code: String,

    #[serde(skip_serializing)]
    pub app_secret: String,

    /// Result table routed by the query API.
    pub result_table_id: String,

    pub auth_method: String,

    pub prefer_storage: String,
}

impl Default for BkBaseConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            username: String::new(),
            app_code: String::new(),
            app_secret: String::new(),
            result_table_id: String::new(),
            auth_method: DEFAULT_BKBASE_AUTH_METHOD.to_string(),
            prefer_storage: DEFAULT_BKBASE_PREFER_STORAGE.to_string(),
        }
    }
}

/// Topology generation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub biz_id: String,

    /// Name prefix for every generated resource.
    pub biz_name: String,

    pub cluster_id: String,

    pub namespace: String,

    /// Result table id prefix tagged onto relation-metric edges.
    pub result_table_id: String,

    /// Service names; also seeds deployment names.
    pub services: Vec<String>,

    pub num_nodes: usize,

    pub num_pods: usize,

    pub num_deployments: usize,

    /// Probability that a pod opens traffic to another pod.
    pub traffic_probability: f64,

    /// How far back the historical window for resource ages reaches.
    pub time_back_hours: i64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            biz_id: DEFAULT_BIZ_ID.to_string(),
            biz_name: DEFAULT_BIZ_NAME.to_string(),
            cluster_id: DEFAULT_CLUSTER_ID.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            result_table_id: DEFAULT_RESULT_TABLE_ID.to_string(),
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            num_nodes: DEFAULT_NUM_NODES,
            num_pods: DEFAULT_NUM_PODS,
            num_deployments: DEFAULT_NUM_DEPLOYMENTS,
            traffic_probability: DEFAULT_TRAFFIC_PROBABILITY,
            time_back_hours: DEFAULT_TIME_BACK_HOURS,
        }
    }
}

/// Metric synthesis knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub flow_total_min: i64,
    pub flow_total_max: i64,

    pub flow_seconds_min: f64,
    pub flow_seconds_max: f64,

    pub error_rate_min: f64,
    pub error_rate_max: f64,

    /// Number of evenly spaced sample points per series.
    pub time_points: usize,

    /// Where the metric samples document is written.
    pub output_path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            flow_total_min: DEFAULT_FLOW_TOTAL_MIN,
            flow_total_max: DEFAULT_FLOW_TOTAL_MAX,
            flow_seconds_min: DEFAULT_FLOW_SECONDS_MIN,
            flow_seconds_max: DEFAULT_FLOW_SECONDS_MAX,
            error_rate_min: DEFAULT_ERROR_RATE_MIN,
            error_rate_max: DEFAULT_ERROR_RATE_MAX,
            time_points: DEFAULT_METRIC_TIME_POINTS,
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.surreal.url, DEFAULT_SURREAL_URL);
        assert_eq!(config.topology.num_pods, DEFAULT_NUM_PODS);
        assert_eq!(config.topology.services, vec!["api", "web", "worker"]);
        assert_eq!(config.metrics.time_points, DEFAULT_METRIC_TIME_POINTS);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
backend = "bkbase"

[surreal]
url = "http://surreal.internal:8000"

[topology]
num_pods = 25
services = ["gateway", "api"]

[metrics]
time_points = 24
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend, "bkbase");
        assert_eq!(config.surreal.url, "http://surreal.internal:8000");
        // Unset fields keep their defaults.
        assert_eq!(config.surreal.namespace, DEFAULT_SURREAL_NS);
        assert_eq!(config.topology.num_pods, 25);
        assert_eq!(config.topology.services, vec!["gateway", "api"]);
        assert_eq!(config.metrics.time_points, 24);
    }

    #[test]
    fn test_merge_prefers_overlay_scalars() {
        let mut base: toml::Value = toml::from_str(
            r#"
[topology]
num_pods = 10
num_nodes = 3
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[topology]
num_pods = 20
"#,
        )
        .unwrap();

        merge_into(&mut base, overlay);
        let config: Config = base.try_into().unwrap();
        assert_eq!(config.topology.num_pods, 20);
        assert_eq!(config.topology.num_nodes, 3);
    }

    #[test]
    fn test_default_config_string_round_trips() {
        let rendered = Config::default_config_string();
        let config: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(config.topology.num_pods, DEFAULT_NUM_PODS);
    }
}
