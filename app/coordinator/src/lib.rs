//! Drover coordinator: keeps a registry of connected workers and their
//! self-reported load, and periodically dispatches a task to the least-loaded
//! one.

pub mod cli;
pub mod config;
pub mod receiver;
pub mod registry;
pub mod scheduler;
pub mod serve;

pub use cli::Cli;
pub use config::CoordinatorConfig;
pub use receiver::ConnectionReceiver;
pub use registry::{Upsert, WorkerRecord, WorkerRegistry};
pub use scheduler::{Scheduler, TickOutcome};
pub use serve::{ServeHandle, accept_loop, serve};
