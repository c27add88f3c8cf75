//! Link runtime: background reader plus the frame consumer API.
//!
//! [`SerialLink::open`] splits a transport into halves and spawns two tasks:
//! 1. the link reader, which owns the [`Deframer`] and pushes every frame it
//!    yields onto an unbounded FIFO delivery queue
//! 2. the writer task (see [`crate::writer`])
//!
//! The application pulls frames with [`SerialLink::receive`] and stops
//! everything with [`SerialLink::close`].
//!
//! The delivery queue is unbounded: a consumer that stops calling `receive`
//! lets it grow without limit.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use gx8006_link::link::{LinkConfig, SerialLink};
//!
//! let mut link = SerialLink::open(transport, LinkConfig::default());
//! while let Some(frame) = link.receive(Some(Duration::from_secs(1))).await? {
//!     println!("CMD=0x{:02x}", frame.command());
//! }
//! link.close().await?;
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{LinkError, Result};
use crate::protocol::{encode_frame, Deframer, DeframerStats, Frame, MAX_FRAME_LEN, MIN_FRAME_LEN};
use crate::writer::{spawn_writer_task, WriterConfig, WriterHandle};

/// Default size of a single transport read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Why the link reader stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTermination {
    /// `close()` was called or the link was dropped.
    Closed,
    /// The transport reported end of stream.
    EndOfStream,
    /// The transport failed with the given error.
    Failed(String),
}

/// Configuration for a link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bytes requested per transport read.
    pub read_buffer_size: usize,
    /// Largest total frame length accepted and sent.
    pub max_frame_len: usize,
    /// Writer task settings.
    pub writer: WriterConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_len: MAX_FRAME_LEN,
            writer: WriterConfig::default(),
        }
    }
}

/// An open UART link.
pub struct SerialLink {
    /// Delivery queue, consumer side.
    frames: mpsc::UnboundedReceiver<Frame>,
    /// Handle for outbound frames.
    writer: WriterHandle,
    /// Tells the reader to stop.
    shutdown_tx: oneshot::Sender<()>,
    /// Set once the reader has stopped.
    termination: watch::Receiver<Option<LinkTermination>>,
    /// Latest deframer counters.
    stats: watch::Receiver<DeframerStats>,
    max_payload_len: usize,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<Result<()>>,
}

impl SerialLink {
    /// Start the link over `io`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<T>(io: T, config: LinkConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);

        let deframer = Deframer::with_max_frame_len(config.max_frame_len);
        let max_payload_len = deframer.max_frame_len() - MIN_FRAME_LEN;

        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (termination_tx, termination) = watch::channel(None);
        let (stats_tx, stats) = watch::channel(DeframerStats::default());

        let (writer, writer_task) = spawn_writer_task(write_half, config.writer);

        let read_buffer_size = config.read_buffer_size.max(1);
        let reader_task = tokio::spawn(async move {
            let reason = read_loop(
                read_half,
                deframer,
                &frames_tx,
                shutdown_rx,
                &stats_tx,
                read_buffer_size,
            )
            .await;
            tracing::info!("Link reader stopped: {:?}", reason);
            // Publish the reason before the queue reports closed.
            termination_tx.send_replace(Some(reason));
            drop(frames_tx);
        });

        tracing::info!(
            "Link opened, read buffer {} bytes, max frame {} bytes",
            read_buffer_size,
            max_payload_len + MIN_FRAME_LEN
        );

        Self {
            frames,
            writer,
            shutdown_tx,
            termination,
            stats,
            max_payload_len,
            reader_task,
            writer_task,
        }
    }

    /// Wait up to `timeout` for the next frame.
    ///
    /// - `Ok(Some(frame))`: the next frame in arrival order
    /// - `Ok(None)`: nothing arrived within `timeout`
    /// - `Err(ConnectionClosed)`: the reader has stopped and every frame it
    ///   produced has already been returned
    ///
    /// A `None` timeout waits without bound.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Frame>> {
        let next = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.frames.recv()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            },
            None => self.frames.recv().await,
        };

        next.map(Some).ok_or(LinkError::ConnectionClosed)
    }

    /// Encode and write a frame, waiting for the write to complete.
    pub async fn send(&self, command: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload_len {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload_len,
            });
        }

        let bytes = Bytes::from(encode_frame(command, payload));
        self.writer.send(bytes).await?;
        tracing::debug!(
            "Sent frame with CMD=0x{:02x}, length={}",
            command,
            payload.len() + MIN_FRAME_LEN
        );
        Ok(())
    }

    /// Why the reader stopped, or `None` while it is running.
    pub fn termination(&self) -> Option<LinkTermination> {
        self.termination.borrow().clone()
    }

    /// Wait until the reader stops and return why.
    pub async fn terminated(&mut self) -> LinkTermination {
        match self.termination.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or(LinkTermination::Closed),
            // The reader task ended without publishing (it panicked).
            Err(_) => LinkTermination::Failed("link reader task aborted".to_string()),
        }
    }

    /// Snapshot of the deframer counters.
    pub fn stats(&self) -> DeframerStats {
        *self.stats.borrow()
    }

    /// Stop the reader, wait for both tasks and release the transport.
    ///
    /// Returns why the reader stopped; a reader that had already failed
    /// reports that failure rather than `Closed`.
    pub async fn close(self) -> Result<LinkTermination> {
        let SerialLink {
            frames,
            writer,
            shutdown_tx,
            termination,
            reader_task,
            writer_task,
            ..
        } = self;

        // The reader may already be gone; that is fine.
        let _ = shutdown_tx.send(());
        reader_task.await.map_err(join_error)?;
        drop(frames);

        // Dropping the last handle lets the writer shut the write half down.
        drop(writer);
        match writer_task.await.map_err(join_error)? {
            Ok(()) => {}
            Err(e) => tracing::warn!("Writer had stopped with error: {}", e),
        }

        let reason = termination
            .borrow()
            .clone()
            .unwrap_or(LinkTermination::Closed);
        tracing::info!("Link closed");
        Ok(reason)
    }
}

fn join_error(e: tokio::task::JoinError) -> LinkError {
    LinkError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Link reader loop - reads bytes, deframes, and queues frames in order.
async fn read_loop<R>(
    mut reader: R,
    mut deframer: Deframer,
    frames: &mpsc::UnboundedSender<Frame>,
    mut shutdown: oneshot::Receiver<()>,
    stats: &watch::Sender<DeframerStats>,
    read_buffer_size: usize,
) -> LinkTermination
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = tokio::select! {
            // Fires on close() and when the link is dropped.
            _ = &mut shutdown => return LinkTermination::Closed,
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::warn!("Transport reached end of stream");
                    return LinkTermination::EndOfStream;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("Transport read error: {}", e);
                    return LinkTermination::Failed(e.to_string());
                }
            },
        };

        for frame in deframer.push(&buf[..n]) {
            if frames.send(frame).is_err() {
                // Consumer is gone.
                return LinkTermination::Closed;
            }
        }
        stats.send_replace(deframer.stats());
    }
}
