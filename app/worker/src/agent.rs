//! The worker side of a coordinator connection.
//!
//! Two loops share the connection. The report loop sends `register` and then
//! a `load` message per sample; the task loop reads tasks, runs them one at a
//! time and answers each with `done`. Neither loop writes to the socket
//! itself: both enqueue messages for a single writer task, so frames from the
//! two loops never interleave.

use crate::{
    config::ReportTiming,
    sensor::{self, LoadSensor},
    workload,
};
use compact_str::CompactString;
use protocol::codec::{self, FrameError};
use protocol::Message;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// A worker bound to one coordinator connection.
pub struct WorkerAgent {
    id: CompactString,
    sensor: Arc<dyn LoadSensor>,
    timing: ReportTiming,
}

impl WorkerAgent {
    /// Create an agent reporting as `id`.
    pub fn new(id: impl Into<CompactString>, sensor: Arc<dyn LoadSensor>, timing: ReportTiming) -> Self {
        Self {
            id: id.into(),
            sensor,
            timing,
        }
    }

    /// The id this agent reports as.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drive the connection until the coordinator closes it or a read fails.
    ///
    /// The report loop is stopped when the task loop ends; if the report
    /// loop stops first (send or sensor failure) tasks are still executed.
    pub async fn run<R, W>(self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();

        // Sender task: the only writer on the connection.
        let send_task = tokio::spawn(sender_loop(writer, rx));

        let report_task = tokio::spawn(report_loop(
            self.id.clone(),
            Arc::clone(&self.sensor),
            self.timing,
            tx.clone(),
        ));

        task_loop(&self.id, reader, tx).await;

        report_task.abort();
        let _ = report_task.await;
        let _ = send_task.await;
    }
}

/// Reads messages from the queue and writes them to the socket.
async fn sender_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Message>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        if let Err(e) = codec::write_message(&mut writer, &msg).await {
            tracing::error!("failed to write {} message: {e}", msg.kind());
            return;
        }
    }
    let _ = writer.shutdown().await;
}

/// Sends `register`, then a `load` report per sample until a send or a
/// sensor read fails.
async fn report_loop(
    id: CompactString,
    sensor: Arc<dyn LoadSensor>,
    timing: ReportTiming,
    tx: mpsc::UnboundedSender<Message>,
) {
    let initial = match sensor::sample(sensor.as_ref(), timing.warmup).await {
        Ok(load) => load,
        Err(e) => {
            tracing::warn!("initial load sample failed, registering with 0%: {e}");
            0.0
        }
    };
    let register = Message::Register {
        id: Some(id.clone()),
        load: initial,
    };
    if tx.send(register).is_err() {
        tracing::warn!("connection closed before registration");
        return;
    }

    loop {
        let load = match sensor::sample(sensor.as_ref(), timing.sample).await {
            Ok(load) => load,
            Err(e) => {
                tracing::error!("load sensor failed, stopping load reports: {e}");
                return;
            }
        };
        let report = Message::Load {
            id: Some(id.clone()),
            load,
        };
        if tx.send(report).is_err() {
            tracing::warn!("connection closed by master");
            return;
        }
        tracing::debug!("sent load {load:.2}% to master");
        tokio::time::sleep(timing.pause).await;
    }
}

/// Reads tasks and executes them one at a time, answering each with `done`.
async fn task_loop<R>(id: &CompactString, mut reader: R, tx: mpsc::UnboundedSender<Message>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let msg: Message = match codec::read_message(&mut reader).await {
            Ok(msg) => msg,
            Err(FrameError::ConnectionClosed) => {
                tracing::info!("master closed connection");
                return;
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!("discarding malformed frame: {e}");
                continue;
            }
            Err(e) => {
                tracing::warn!("read error: {e}");
                return;
            }
        };

        let task = match msg {
            Message::Task(task) => task,
            other => {
                tracing::debug!("ignoring {} message", other.kind());
                continue;
            }
        };

        tracing::info!(
            "received task {} ({}, {}s): executing simulated workload",
            task.task_id,
            task.work,
            task.duration
        );
        if let Err(e) = workload::execute(task.duration()).await {
            tracing::error!("task {} workload aborted: {e}", task.task_id);
        }
        tracing::info!("task {} done", task.task_id);

        let done = Message::Done {
            id: id.clone(),
            task_id: task.task_id,
        };
        if tx.send(done).is_err() {
            tracing::warn!("could not report completion of task {}", task.task_id);
        }
    }
}
