//! Command-line interface for `drover-worker`.

use crate::{agent::WorkerAgent, config::WorkerConfig, sensor::ProcStat};
use anyhow::{Context, Result};
use clap::Parser;
use compact_str::CompactString;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpStream;

/// Drover worker.
#[derive(Parser, Debug)]
#[command(
    name = "drover-worker",
    version,
    about = "Report CPU load to a drover coordinator and execute its tasks"
)]
pub struct Cli {
    /// TOML configuration file. Flags override values from the file.
    #[arg(long, env = "DROVER_WORKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Coordinator address (host:port).
    #[arg(long)]
    pub coordinator: Option<String>,

    /// Worker identity. Defaults to `worker-<pid>`.
    #[arg(long)]
    pub id: Option<CompactString>,
}

impl Cli {
    /// Merge the configuration file (if any) with command-line overrides.
    pub fn resolve(&self) -> Result<WorkerConfig> {
        let mut config = match &self.config {
            Some(path) => WorkerConfig::load(path)?,
            None => WorkerConfig::default(),
        };
        if let Some(coordinator) = &self.coordinator {
            config.coordinator.clone_from(coordinator);
        }
        if let Some(id) = &self.id {
            config.id = Some(id.clone());
        }
        Ok(config)
    }

    /// Connect and work until the coordinator hangs up or ctrl-c.
    pub async fn run(self) -> Result<()> {
        let config = self.resolve()?;
        let id = config.worker_id();

        let stream = TcpStream::connect(&config.coordinator)
            .await
            .with_context(|| format!("failed to connect to master at {}", config.coordinator))?;
        tracing::info!("connected to master at {} as {id}", config.coordinator);

        let (reader, writer) = stream.into_split();
        let agent = WorkerAgent::new(id, Arc::new(ProcStat::new()), config.timing());

        tokio::select! {
            () = agent.run(reader, writer) => {
                tracing::info!("connection ended");
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("exiting worker");
            }
        }
        Ok(())
    }
}
