//! Worker registry.
//!
//! Maps worker ids to their connection and last reported load. Every
//! operation takes the same lock, so none of them observes another half
//! applied. The lock is never held across an await.

use compact_str::CompactString;
use protocol::FrameWriter;
use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use tokio::time::Instant;

/// A live worker.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    /// Registry key.
    pub id: CompactString,
    /// Write handle of the connection the worker was first seen on.
    pub channel: FrameWriter,
    /// Peer address of that connection.
    pub addr: SocketAddr,
    /// Last reported load percentage, in `[0, 100]`.
    pub last_load: f64,
    /// Time of the most recent message from this worker.
    pub last_seen: Instant,
    /// Insertion order, used to break load ties.
    seq: u64,
}

/// Whether an upsert created a record or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sight of this id.
    Inserted,
    /// The id was already registered.
    Updated,
}

/// Concurrent worker registry guarded by a single lock.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    workers: BTreeMap<CompactString, WorkerRecord>,
    next_seq: u64,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a load report from `id`.
    ///
    /// Creates the record bound to `channel` and `addr` if the id is new;
    /// otherwise only the load and last-seen time change. Loads are clamped
    /// to `[0, 100]`, and non-finite loads are stored as 0.
    pub fn upsert(
        &self,
        id: &str,
        load: f64,
        now: Instant,
        channel: &FrameWriter,
        addr: SocketAddr,
    ) -> Upsert {
        let load = sanitize_load(load);
        let mut inner = self.lock();
        if let Some(record) = inner.workers.get_mut(id) {
            record.last_load = load;
            record.last_seen = record.last_seen.max(now);
            return Upsert::Updated;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let id = CompactString::from(id);
        inner.workers.insert(
            id.clone(),
            WorkerRecord {
                id,
                channel: channel.clone(),
                addr,
                last_load: load,
                last_seen: now,
                seq,
            },
        );
        Upsert::Inserted
    }

    /// Remove a worker. Absent ids are not an error.
    pub fn remove(&self, id: &str) -> Option<WorkerRecord> {
        self.lock().workers.remove(id)
    }

    /// Remove every worker not heard from for longer than `threshold`
    /// before `now`, returning the removed ids in insertion order.
    pub fn evict_stale(&self, now: Instant, threshold: Duration) -> Vec<CompactString> {
        let mut inner = self.lock();
        let mut stale: Vec<_> = inner
            .workers
            .values()
            .filter(|r| now.saturating_duration_since(r.last_seen) > threshold)
            .map(|r| (r.seq, r.id.clone()))
            .collect();
        stale.sort_unstable_by_key(|(seq, _)| *seq);

        for (_, id) in &stale {
            inner.workers.remove(id);
        }
        stale.into_iter().map(|(_, id)| id).collect()
    }

    /// The worker with the lowest load, earliest-inserted on ties.
    pub fn select_minimum(&self) -> Option<WorkerRecord> {
        self.lock()
            .workers
            .values()
            .min_by(|a, b| {
                a.last_load
                    .total_cmp(&b.last_load)
                    .then(a.seq.cmp(&b.seq))
            })
            .cloned()
    }

    /// Snapshot of a single worker.
    pub fn get(&self, id: &str) -> Option<WorkerRecord> {
        self.lock().workers.get(id).cloned()
    }

    /// Registered ids in insertion order.
    pub fn ids(&self) -> Vec<CompactString> {
        let inner = self.lock();
        let mut records: Vec<_> = inner.workers.values().collect();
        records.sort_unstable_by_key(|r| r.seq);
        records.into_iter().map(|r| r.id.clone()).collect()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.lock().workers.len()
    }

    /// Whether no worker is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().workers.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("registry lock poisoned")
    }
}

fn sanitize_load(load: f64) -> f64 {
    if load.is_finite() {
        load.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
