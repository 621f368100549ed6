//! Simulated CPU-bound work.

use std::hint::black_box;
use std::time::{Duration, Instant};
use tokio::task::JoinError;

/// Spin the current thread for `duration`, returning the number of rounds
/// completed.
pub fn busy_for(duration: Duration) -> u64 {
    let deadline = Instant::now() + duration;
    let mut rounds = 0u64;
    while Instant::now() < deadline {
        black_box((0..2000u64).map(|i| i * i).sum::<u64>());
        rounds += 1;
    }
    rounds
}

/// Run [`busy_for`] on the blocking pool and wait for it.
///
/// Only the awaiting task is held up; other tasks on the runtime keep
/// running.
pub async fn execute(duration: Duration) -> Result<u64, JoinError> {
    tokio::task::spawn_blocking(move || busy_for(duration)).await
}
