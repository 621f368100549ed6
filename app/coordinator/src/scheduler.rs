//! Periodic task dispatch.
//!
//! Each tick evicts stale workers, picks the least-loaded one and sends it a
//! task. Selection looks at reported load only; there is no notion of a
//! worker being busy, so a worker whose load report lags can be picked for
//! overlapping tasks.

use crate::{config::CoordinatorConfig, registry::WorkerRegistry};
use compact_str::CompactString;
use protocol::{Message, Task};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The registry was empty after eviction.
    Idle,
    /// A task was written to the selected worker.
    Dispatched {
        /// Selected worker.
        id: CompactString,
        /// Id of the dispatched task.
        task_id: u64,
        /// Load the worker was selected with.
        load: f64,
    },
    /// The send failed, the worker was removed and its channel closed. The
    /// task is dropped.
    Failed {
        /// Selected worker.
        id: CompactString,
        /// Id the task would have had.
        task_id: u64,
    },
}

/// Dispatches one task per tick to the least-loaded worker.
pub struct Scheduler {
    registry: Arc<WorkerRegistry>,
    interval: Duration,
    stale_after: Duration,
    dispatch_timeout: Duration,
    work: CompactString,
    task_duration: f64,
    next_task_id: u64,
}

impl Scheduler {
    /// Create a scheduler over `registry` using the timings in `config`.
    pub fn new(registry: Arc<WorkerRegistry>, config: &CoordinatorConfig) -> Self {
        Self {
            registry,
            interval: config.interval().max(MIN_INTERVAL),
            stale_after: config.stale_after(),
            dispatch_timeout: config.dispatch_timeout(),
            work: config.work.clone(),
            task_duration: config.task_duration_secs,
            next_task_id: 0,
        }
    }

    /// Id the next successfully dispatched task will carry.
    pub fn next_task_id(&self) -> u64 {
        self.next_task_id
    }

    /// Run one scheduling round.
    pub async fn tick(&mut self) -> TickOutcome {
        for id in self.registry.evict_stale(Instant::now(), self.stale_after) {
            tracing::warn!("removing stale worker {id}");
        }

        let Some(worker) = self.registry.select_minimum() else {
            tracing::warn!("no workers available to assign task");
            return TickOutcome::Idle;
        };

        let task_id = self.next_task_id;
        let msg = Message::Task(Task {
            task_id,
            work: self.work.clone(),
            duration: self.task_duration,
        });

        // The registry lock is released; only this worker's channel is held.
        let error = match tokio::time::timeout(self.dispatch_timeout, worker.channel.send(&msg))
            .await
        {
            Ok(Ok(())) => {
                self.next_task_id += 1;
                tracing::info!(
                    "assigned task {task_id} to {} (load={:.2}%)",
                    worker.id,
                    worker.last_load
                );
                return TickOutcome::Dispatched {
                    id: worker.id,
                    task_id,
                    load: worker.last_load,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.dispatch_timeout),
        };

        tracing::warn!("failed to send task {task_id} to {}: {error}", worker.id);
        self.registry.remove(&worker.id);
        // A partial frame may be on the wire. Close it so the worker sees
        // the connection end instead of misaligned frames.
        if let Err(e) = tokio::time::timeout(self.dispatch_timeout, worker.channel.shutdown())
            .await
            .unwrap_or_else(|_| Err(std::io::ErrorKind::TimedOut.into()))
        {
            tracing::debug!("failed to close channel of {}: {e}", worker.id);
        }
        TickOutcome::Failed {
            id: worker.id,
            task_id,
        }
    }

    /// Tick every interval until `shutdown` fires or its sender is dropped.
    ///
    /// The first tick happens one interval after start.
    pub async fn run(mut self, mut shutdown: watch::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    tracing::info!("scheduler shutting down");
                    break;
                }
            }
        }
    }
}
