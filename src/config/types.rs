use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub spool: SpoolConfig,
    pub collector: CollectorConfig,
    #[serde(default)]
    pub drain: DrainConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Directory holding the batch files. Owned exclusively by the spool.
    pub path: PathBuf,
    /// Maximum number of batches kept on disk.
    pub capacity: usize,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_retention_seconds")]
    pub retention_seconds: u64,
}

fn default_sweep_interval_seconds() -> u64 {
    24 * 60 * 60
}

fn default_retention_seconds() -> u64 {
    48 * 60 * 60
}

impl SpoolConfig {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            sweep_interval_seconds: default_sweep_interval_seconds(),
            retention_seconds: default_retention_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub url: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    /// Sent as `Content-Encoding` with every batch, e.g. `gzip` when the
    /// producer hands us compressed payloads.
    #[serde(default)]
    pub content_encoding: Option<String>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainConfig {
    #[serde(with = "humantime_serde", default = "default_drain_interval")]
    pub interval: Duration,
    #[serde(default = "default_max_batches_per_pass")]
    pub max_batches_per_pass: usize,
}

fn default_drain_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_max_batches_per_pass() -> usize {
    100
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            interval: default_drain_interval(),
            max_batches_per_pass: default_max_batches_per_pass(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:7110".to_string()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}
