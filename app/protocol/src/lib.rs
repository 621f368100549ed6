//! Drover wire protocol shared between the coordinator and its workers.
//!
//! Every message is a JSON object discriminated by its `type` field and
//! carried in one length-prefixed frame (see [`codec`]).

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use codec::{FrameError, FrameWriter};

pub mod codec;
pub mod utils;

/// Work descriptor attached to tasks when none is configured.
pub const DEFAULT_WORK: &str = "compute_pi";

/// Task duration in seconds when a `task` message omits it.
pub const DEFAULT_TASK_DURATION: f64 = 3.0;

/// A unit of simulated work dispatched by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Coordinator-global task counter value.
    #[serde(rename = "taskId")]
    pub task_id: u64,
    /// Opaque identifier of the simulated operation.
    #[serde(default = "default_work")]
    pub work: CompactString,
    /// Seconds the worker should spend executing the task.
    #[serde(default = "default_duration")]
    pub duration: f64,
}

impl Task {
    /// Execution time as a [`Duration`]. Negative or non-finite values
    /// collapse to zero.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration).unwrap_or_default()
    }
}

/// Messages exchanged over a worker connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// First message a worker sends after connecting.
    Register {
        /// Worker identity; the coordinator falls back to the peer address.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CompactString>,
        /// CPU load percentage sampled during warm-up.
        #[serde(default)]
        load: f64,
    },
    /// Periodic load report.
    Load {
        /// Worker identity; the coordinator falls back to the peer address.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CompactString>,
        /// CPU load percentage over the last sample interval.
        #[serde(default)]
        load: f64,
    },
    /// Completion notice for a task.
    Done {
        /// Worker identity.
        #[serde(default)]
        id: CompactString,
        /// Identifier of the completed task.
        #[serde(rename = "taskId")]
        task_id: u64,
    },
    /// Task dispatched by the coordinator.
    Task(Task),
}

impl Message {
    /// The wire discriminator of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Load { .. } => "load",
            Self::Done { .. } => "done",
            Self::Task(_) => "task",
        }
    }
}

impl From<Task> for Message {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

fn default_work() -> CompactString {
    CompactString::const_new(DEFAULT_WORK)
}

fn default_duration() -> f64 {
    DEFAULT_TASK_DURATION
}
