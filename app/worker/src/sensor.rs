//! CPU load sampling.
//!
//! A sample reads the cumulative CPU counters, waits, reads them again and
//! turns the deltas into a busy percentage. Nothing is carried between
//! samples.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

/// Cumulative CPU time counters, in scheduler ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    /// Sum of all accounted time.
    pub total: u64,
    /// Time spent idle.
    pub idle: u64,
}

/// Source of cumulative CPU counters.
pub trait LoadSensor: Send + Sync {
    /// Read the current counters.
    fn read_times(&self) -> io::Result<CpuTimes>;
}

/// Reads the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone)]
pub struct ProcStat {
    path: PathBuf,
}

impl ProcStat {
    /// Sensor over the system `/proc/stat`.
    pub fn new() -> Self {
        Self::at("/proc/stat")
    }

    /// Sensor over a stat file at a custom path.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for ProcStat {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSensor for ProcStat {
    fn read_times(&self) -> io::Result<CpuTimes> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_proc_stat(&content)
    }
}

/// Parse the first line of `/proc/stat`: total is the sum of every field,
/// idle is the fourth.
pub fn parse_proc_stat(content: &str) -> io::Result<CpuTimes> {
    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_owned());

    let line = content.lines().next().ok_or_else(|| invalid("empty stat file"))?;
    let mut fields = line.split_whitespace();
    if fields.next() != Some("cpu") {
        return Err(invalid("missing aggregate cpu line"));
    }

    let values = fields
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(&format!("bad cpu counter: {e}")))?;
    let idle = *values.get(3).ok_or_else(|| invalid("cpu line has fewer than 4 fields"))?;

    Ok(CpuTimes {
        total: values.iter().sum(),
        idle,
    })
}

/// Busy percentage between two readings: `(1 - idle/total) * 100`.
///
/// Returns 0 when no time elapsed. Counters that went backwards count as
/// no elapsed time.
pub fn cpu_percent(before: CpuTimes, after: CpuTimes) -> f64 {
    let total = after.total.saturating_sub(before.total);
    if total == 0 {
        return 0.0;
    }
    let idle = after.idle.saturating_sub(before.idle).min(total);
    (1.0 - idle as f64 / total as f64) * 100.0
}

/// Sample `sensor` across `interval`.
pub async fn sample<S>(sensor: &S, interval: Duration) -> io::Result<f64>
where
    S: LoadSensor + ?Sized,
{
    let before = sensor.read_times()?;
    tokio::time::sleep(interval).await;
    let after = sensor.read_times()?;
    Ok(cpu_percent(before, after))
}
