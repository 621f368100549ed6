//! TCP accept loop and the serve entrypoint used by the binary.

use crate::{
    config::CoordinatorConfig, receiver::ConnectionReceiver, registry::WorkerRegistry,
    scheduler::Scheduler,
};
use anyhow::{Context, Result};
use protocol::FrameWriter;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle returned by [`serve`]. Holds the bound address and shutdown
/// trigger.
pub struct ServeHandle {
    /// Address the coordinator is listening on.
    pub local_addr: SocketAddr,
    /// Registry shared by all connections and the scheduler.
    pub registry: Arc<WorkerRegistry>,
    shutdown_tx: Option<watch::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServeHandle {
    /// Stop accepting connections and scheduling, and wait for both to end.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        for task in self.tasks.drain(..) {
            task.await?;
        }
        Ok(())
    }
}

/// Bind the listener and start the accept loop and the scheduler.
///
/// Bind failure is returned as an error; everything after that runs in the
/// background until [`ServeHandle::shutdown`].
pub async fn serve(config: &CoordinatorConfig) -> Result<ServeHandle> {
    config.validate()?;
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    tracing::info!("load balancer listening on {local_addr}");

    let registry = Arc::new(WorkerRegistry::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let accept = tokio::spawn(accept_loop(
        listener,
        Arc::clone(&registry),
        shutdown_rx.clone(),
    ));
    let scheduler = Scheduler::new(Arc::clone(&registry), config);
    let schedule = tokio::spawn(scheduler.run(shutdown_rx));

    Ok(ServeHandle {
        local_addr,
        registry,
        shutdown_tx: Some(shutdown_tx),
        tasks: vec![accept, schedule],
    })
}

/// Accept connections on `listener` until shutdown is signalled, spawning a
/// [`ConnectionReceiver`] for each.
pub async fn accept_loop(
    listener: TcpListener,
    registry: Arc<WorkerRegistry>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let registry = Arc::clone(&registry);
                        tokio::spawn(handle_connection(stream, addr, registry));
                    }
                    Err(e) => {
                        tracing::error!("failed to accept connection: {e}");
                    }
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("accept loop shutting down");
                break;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: Arc<WorkerRegistry>) {
    tracing::debug!("accepted connection from {addr}");
    let (reader, writer) = stream.into_split();
    let channel = FrameWriter::new(writer);
    ConnectionReceiver::new(registry, channel, addr)
        .run(reader)
        .await;
}
