//! Drover worker: connects to a coordinator, reports CPU load once a
//! second and executes the simulated tasks it is sent.

pub use agent::WorkerAgent;
pub use cli::Cli;
pub use config::WorkerConfig;
pub use sensor::{CpuTimes, LoadSensor, ProcStat};

pub mod agent;
pub mod cli;
pub mod config;
pub mod sensor;
pub mod workload;
