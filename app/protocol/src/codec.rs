//! Length-prefixed framing codec for the worker TCP transport.
//!
//! Wire format: `[u32 BE length][JSON payload]`. The length is the byte count
//! of the JSON payload only (not including the 4-byte header).

use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, io, pin::Pin, sync::Arc};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Maximum frame size: 16 MiB.
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Errors that can occur during frame read/write.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Frame exceeds the maximum allowed size.
    #[error("frame too large: {size} bytes (max {max})", max = MAX_FRAME_SIZE)]
    TooLarge { size: u32 },
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The connection was closed (EOF during read).
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream is still aligned on a frame boundary.
    ///
    /// Only payload decode failures qualify: the whole frame was consumed
    /// before parsing, so the next read starts at the next header.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// Write a typed message as a length-prefixed JSON frame.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode a message as header and payload in one buffer.
fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let data = serde_json::to_vec(msg)?;
    let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { size: len });
    }
    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&data);
    Ok(frame)
}

/// Read a length-prefixed JSON frame and deserialize into a typed message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::ConnectionClosed);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { size: len });
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    let msg = serde_json::from_slice(&buf)?;
    Ok(msg)
}

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

struct Gate {
    writer: BoxedWriter,
    /// Set while a frame is in flight and left set if the write fails or is
    /// dropped half way, since the stream is no longer on a frame boundary.
    broken: bool,
}

/// Cloneable handle to the write half of a connection.
///
/// All clones share one gate: each [`FrameWriter::send`] holds it for the
/// whole frame, so concurrent senders never interleave bytes on the wire.
///
/// A send that fails or is cancelled mid-frame breaks the writer for every
/// clone; later sends fail with [`io::ErrorKind::BrokenPipe`].
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<Gate>>,
}

impl FrameWriter {
    /// Wrap a writer.
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        let writer: BoxedWriter = Box::pin(writer);
        Self {
            inner: Arc::new(Mutex::new(Gate {
                writer,
                broken: false,
            })),
        }
    }

    /// Write one message as a single frame.
    pub async fn send<T: Serialize>(&self, msg: &T) -> Result<(), FrameError> {
        let frame = encode_frame(msg)?;
        let mut gate = self.inner.lock().await;
        if gate.broken {
            return Err(broken_pipe().into());
        }
        gate.broken = true;
        gate.writer.write_all(&frame).await?;
        gate.writer.flush().await?;
        gate.broken = false;
        Ok(())
    }

    /// Mark the writer broken and shut down the write direction of the
    /// underlying stream.
    pub async fn shutdown(&self) -> io::Result<()> {
        let mut gate = self.inner.lock().await;
        gate.broken = true;
        gate.writer.shutdown().await
    }

    /// Whether a failed or interrupted send has left the stream unusable.
    pub async fn is_broken(&self) -> bool {
        self.inner.lock().await.broken
    }

    /// Whether both handles refer to the same underlying writer.
    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        "frame writer is broken by an earlier failed write",
    )
}

impl fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWriter")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}
