//! Driver configuration.
//!
//! Both structs deserialize from JSON with every field optional; missing
//! fields take the defaults below.

use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use serde::Deserialize;

/// Settings shared by single-block and batch inspection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Blocks in flight at once during a batch.
    pub max_concurrency: usize,
    /// Bound on each provider call, in seconds.
    pub request_timeout_secs: u64,
    /// Persist every classified trace alongside the derived events.
    pub write_classified_traces: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            request_timeout_secs: 500,
            write_classified_traces: true,
        }
    }
}

impl InspectorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings of the head-tailing listener.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Blocks to stay behind the head so short reorgs settle first.
    pub lag: u64,
    /// Sleep between polls when no block is ready, in seconds.
    pub poll_interval_secs: u64,
    /// GET after every inspected block, if set.
    pub healthcheck_url: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            lag: 5,
            poll_interval_secs: 5,
            healthcheck_url: None,
        }
    }
}

impl ListenerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Reads a JSON config file into `T`.
///
/// # Errors
/// Returns error if the file cannot be read or does not parse as `T`.
pub fn load_json<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&json).wrap_err_with(|| format!("invalid config {}", path.display()))
}
