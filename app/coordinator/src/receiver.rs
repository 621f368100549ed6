//! Per-connection receive loop.

use crate::registry::{Upsert, WorkerRegistry};
use compact_str::{CompactString, format_compact};
use protocol::codec::{self, FrameError};
use protocol::{FrameWriter, Message};
use std::{net::SocketAddr, sync::Arc};
use tokio::io::AsyncRead;
use tokio::time::Instant;

/// Consumes messages from one worker connection and applies them to the
/// registry.
///
/// When the connection closes or a read fails, the last worker id seen on
/// it is removed from the registry.
pub struct ConnectionReceiver {
    registry: Arc<WorkerRegistry>,
    channel: FrameWriter,
    addr: SocketAddr,
    worker_id: Option<CompactString>,
}

impl ConnectionReceiver {
    /// Create a receiver for the connection at `addr` whose write half is
    /// `channel`.
    pub fn new(registry: Arc<WorkerRegistry>, channel: FrameWriter, addr: SocketAddr) -> Self {
        Self {
            registry,
            channel,
            addr,
            worker_id: None,
        }
    }

    /// The last worker id established on this connection.
    pub fn worker_id(&self) -> Option<&str> {
        self.worker_id.as_deref()
    }

    /// Read messages until the connection closes or fails.
    pub async fn run<R: AsyncRead + Unpin>(mut self, mut reader: R) {
        loop {
            let msg: Message = match codec::read_message(&mut reader).await {
                Ok(msg) => msg,
                Err(FrameError::ConnectionClosed) => break,
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("discarding malformed frame from {}: {e}", self.addr);
                    continue;
                }
                Err(e) => {
                    tracing::debug!("read error from {}: {e}", self.addr);
                    break;
                }
            };
            self.handle(msg);
        }

        if let Some(id) = self.worker_id.take()
            && self.registry.remove(&id).is_some()
        {
            tracing::info!("worker {id} disconnected");
        }
    }

    /// Apply a single message.
    pub fn handle(&mut self, msg: Message) {
        match msg {
            Message::Register { id, load } => {
                let id = self.resolve_id(id);
                if self.report(&id, load) == Upsert::Inserted {
                    tracing::info!("registered worker {id} from {}", self.addr);
                } else {
                    tracing::debug!("worker {id} re-registered (load={load:.2}%)");
                }
            }
            Message::Load { id, load } => {
                let id = self.resolve_id(id);
                if self.report(&id, load) == Upsert::Inserted {
                    tracing::info!("registered worker {id} from {} on first load report", self.addr);
                } else {
                    tracing::debug!("load update: {id} -> {load:.2}%");
                }
            }
            Message::Done { id, task_id } => {
                tracing::info!("worker {id} completed task {task_id}");
            }
            other => {
                tracing::debug!("ignoring {} message from {}", other.kind(), self.addr);
            }
        }
    }

    fn report(&mut self, id: &CompactString, load: f64) -> Upsert {
        let outcome = self
            .registry
            .upsert(id, load, Instant::now(), &self.channel, self.addr);
        self.worker_id = Some(id.clone());
        outcome
    }

    fn resolve_id(&self, id: Option<CompactString>) -> CompactString {
        match id {
            Some(id) if !id.is_empty() => id,
            _ => format_compact!("{}:{}", self.addr.ip(), self.addr.port()),
        }
    }
}
