//! Command-line interface for `droverd`.

use crate::{config::CoordinatorConfig, serve::serve};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Drover coordinator.
#[derive(Parser, Debug)]
#[command(
    name = "droverd",
    version,
    about = "Dispatch simulated work to the least-loaded connected worker"
)]
pub struct Cli {
    /// TOML configuration file. Flags override values from the file.
    #[arg(long, env = "DROVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address (host:port).
    #[arg(long)]
    pub bind: Option<String>,

    /// Seconds between scheduler ticks.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Seconds of silence after which a worker is evicted.
    #[arg(long)]
    pub stale_after: Option<f64>,

    /// Duration in seconds attached to each dispatched task.
    #[arg(long)]
    pub task_duration: Option<f64>,
}

impl Cli {
    /// Merge the configuration file (if any) with command-line overrides.
    pub fn resolve(&self) -> Result<CoordinatorConfig> {
        let mut config = match &self.config {
            Some(path) => CoordinatorConfig::load(path)?,
            None => CoordinatorConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind.clone_from(bind);
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(stale_after) = self.stale_after {
            config.stale_after_secs = stale_after;
        }
        if let Some(task_duration) = self.task_duration {
            config.task_duration_secs = task_duration;
        }
        config.validate()?;
        Ok(config)
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let config = self.resolve()?;
        tracing::debug!("resolved configuration: {config:?}");

        let handle = serve(&config).await?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("received ctrl-c, shutting down");
        handle.shutdown().await?;
        tracing::info!("coordinator shut down");
        Ok(())
    }
}
