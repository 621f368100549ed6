//! Coordinator configuration loaded from TOML.

use anyhow::{Context, Result, bail};
use compact_str::CompactString;
use protocol::utils::expand_env_vars;
use protocol::{DEFAULT_TASK_DURATION, DEFAULT_WORK};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Top-level coordinator configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Listen address (`host:port`).
    pub bind: String,
    /// Seconds between scheduler ticks.
    pub interval_secs: f64,
    /// Seconds without any message after which a worker is evicted.
    pub stale_after_secs: f64,
    /// Duration in seconds attached to every dispatched task.
    pub task_duration_secs: f64,
    /// Work descriptor attached to every dispatched task.
    pub work: CompactString,
    /// Seconds a task send may take before it counts as failed.
    pub dispatch_timeout_secs: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            interval_secs: 5.0,
            stale_after_secs: 15.0,
            task_duration_secs: DEFAULT_TASK_DURATION,
            work: CompactString::const_new(DEFAULT_WORK),
            dispatch_timeout_secs: 5.0,
        }
    }
}

impl CoordinatorConfig {
    /// Parse a TOML string, expanding `${ENV_VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Reject durations the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("interval_secs", self.interval_secs),
            ("stale_after_secs", self.stale_after_secs),
            ("dispatch_timeout_secs", self.dispatch_timeout_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                bail!("{name} must be a positive number of seconds, got {secs}");
            }
        }
        if !self.task_duration_secs.is_finite() || self.task_duration_secs < 0.0 {
            bail!(
                "task_duration_secs must not be negative, got {}",
                self.task_duration_secs
            );
        }
        Ok(())
    }

    /// Scheduler tick interval.
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    /// Staleness threshold for eviction.
    pub fn stale_after(&self) -> Duration {
        secs(self.stale_after_secs)
    }

    /// Upper bound on a single task send.
    pub fn dispatch_timeout(&self) -> Duration {
        secs(self.dispatch_timeout_secs)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
