//! Synthetic time-series generation for traffic relations.
//!
//! Pure over the generator's traffic-relation list: no I/O against the
//! graph store. The produced sample sets are handed to an external sink;
//! [`write_samples`] persists them as a JSON document for inspection or
//! downstream ingestion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{Config, MetricsConfig};
use crate::generator::TimeWindow;
use crate::graph::Fields;

/// Cumulative traffic volume counter.
pub const FLOW_TOTAL_METRIC: &str = "pod_to_pod_flow_total";
/// Traffic latency gauge.
pub const FLOW_SECONDS_METRIC: &str = "pod_to_pod_flow_seconds";
/// Traffic error counter.
pub const FLOW_ERROR_METRIC: &str = "pod_to_pod_flow_error";

/// Errors that can occur when persisting metric samples.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to write samples to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize samples: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single sample value; counters are integers, gauges floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Int(i64),
    Float(f64),
}

/// A timestamped sample. Timestamps are unix milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: i64,
    pub value: SampleValue,
}

/// One labeled series for one metric on one traffic relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub result_table_id: String,
    pub labels: BTreeMap<String, String>,
    pub values: Vec<MetricSample>,
}

/// Produces bounded synthetic series for each traffic relation.
pub struct MetricSynthesizer {
    metrics: MetricsConfig,
    result_table_id: String,
    window: TimeWindow,
    rng: StdRng,
}

impl MetricSynthesizer {
    pub fn new(config: &Config, window: TimeWindow) -> Self {
        Self::with_rng(config, window, StdRng::from_entropy())
    }

    /// Synthesizer with a fixed seed, for reproducible output and tests.
    pub fn with_seed(config: &Config, window: TimeWindow, seed: u64) -> Self {
        Self::with_rng(config, window, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, window: TimeWindow, rng: StdRng) -> Self {
        Self {
            metrics: config.metrics.clone(),
            result_table_id: config.topology.result_table_id.clone(),
            window,
            rng,
        }
    }

    /// Generate the three series for every traffic relation.
    pub fn synthesize(&mut self, traffic: &[(Fields, Fields)]) -> Vec<MetricSeries> {
        let points = self.window.points(self.metrics.time_points);
        let timestamps: Vec<i64> = points.iter().map(|t| t.timestamp_millis()).collect();

        let mut series = Vec::with_capacity(traffic.len() * 3);
        for (source, target) in traffic {
            let labels = relation_labels(source, target);

            // Cumulative request counter.
            let mut cumulative = 0i64;
            let totals: Vec<i64> = timestamps
                .iter()
                .map(|_| {
                    cumulative += self
                        .rng
                        .gen_range(self.metrics.flow_total_min..=self.metrics.flow_total_max);
                    cumulative
                })
                .collect();
            series.push(self.series(
                FLOW_TOTAL_METRIC,
                labels.clone(),
                timestamps
                    .iter()
                    .zip(&totals)
                    .map(|(ts, v)| MetricSample {
                        timestamp: *ts,
                        value: SampleValue::Int(*v),
                    })
                    .collect(),
            ));

            // Latency gauge, independent per point, millisecond precision.
            let seconds: Vec<MetricSample> = timestamps
                .iter()
                .map(|ts| {
                    let latency: f64 = self
                        .rng
                        .gen_range(self.metrics.flow_seconds_min..=self.metrics.flow_seconds_max);
                    MetricSample {
                        timestamp: *ts,
                        value: SampleValue::Float((latency * 1000.0).round() / 1000.0),
                    }
                })
                .collect();
            series.push(self.series(FLOW_SECONDS_METRIC, labels.clone(), seconds));

            // Error counter derived from the cumulative total at each
            // point with a fresh per-point rate. The result shares the
            // counter type but is not itself cumulative; preserved as-is
            // for compatibility with existing consumers.
            let errors: Vec<MetricSample> = timestamps
                .iter()
                .zip(&totals)
                .map(|(ts, total)| {
                    let rate: f64 = self
                        .rng
                        .gen_range(self.metrics.error_rate_min..=self.metrics.error_rate_max);
                    MetricSample {
                        timestamp: *ts,
                        value: SampleValue::Int((*total as f64 * rate).floor() as i64),
                    }
                })
                .collect();
            series.push(self.series(FLOW_ERROR_METRIC, labels, errors));
        }

        series
    }

    fn series(
        &self,
        metric: &str,
        labels: BTreeMap<String, String>,
        values: Vec<MetricSample>,
    ) -> MetricSeries {
        MetricSeries {
            metric: metric.to_string(),
            result_table_id: format!("{}_{}", self.result_table_id, metric),
            labels,
            values,
        }
    }
}

/// Source/target labels identifying the traffic relation.
fn relation_labels(source: &Fields, target: &Fields) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for (prefix, fields) in [("source", source), ("target", target)] {
        for key in ["bcs_cluster_id", "namespace", "pod"] {
            labels.insert(
                format!("{prefix}_{key}"),
                fields.get(key).and_then(Value::as_str).unwrap_or("").to_string(),
            );
        }
    }
    labels
}

/// Write the samples document as pretty JSON to `path`.
pub fn write_samples(path: impl AsRef<Path>, series: &[MetricSeries]) -> Result<(), MetricsError> {
    let path = path.as_ref();
    let document = serde_json::to_string_pretty(series)?;
    std::fs::write(path, document).map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
