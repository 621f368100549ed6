//! Worker configuration loaded from TOML.

use anyhow::{Context, Result};
use compact_str::{CompactString, format_compact};
use protocol::utils::expand_env_vars;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Default coordinator address.
pub const DEFAULT_COORDINATOR: &str = "127.0.0.1:5000";

/// Worker configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Coordinator address (`host:port`).
    pub coordinator: String,
    /// Worker identity; defaults to `worker-<pid>`.
    pub id: Option<CompactString>,
    /// Milliseconds sampled for the load sent with `register`.
    pub warmup_ms: u64,
    /// Milliseconds each periodic load sample spans.
    pub sample_ms: u64,
    /// Milliseconds to pause after each load report.
    pub pause_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator: DEFAULT_COORDINATOR.to_owned(),
            id: None,
            warmup_ms: 500,
            sample_ms: 1000,
            pause_ms: 1000,
        }
    }
}

impl WorkerConfig {
    /// Parse a TOML string, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = expand_env_vars(toml_str);
        Ok(toml::from_str(&expanded)?)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// The configured id, or `worker-<pid>`.
    pub fn worker_id(&self) -> CompactString {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format_compact!("worker-{}", std::process::id()),
        }
    }

    /// Report loop timings.
    pub fn timing(&self) -> ReportTiming {
        ReportTiming {
            warmup: Duration::from_millis(self.warmup_ms),
            sample: Duration::from_millis(self.sample_ms),
            pause: Duration::from_millis(self.pause_ms),
        }
    }
}

/// Timings of the load report loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTiming {
    /// Span of the sample sent with `register`.
    pub warmup: Duration,
    /// Span of each periodic sample.
    pub sample: Duration,
    /// Pause after each report.
    pub pause: Duration,
}

impl Default for ReportTiming {
    fn default() -> Self {
        WorkerConfig::default().timing()
    }
}
