//! Dedicated writer task for outbound frames.
//!
//! All writes to the transport go through one task that receives encoded
//! frames via an mpsc channel, so callers never share the write half.
//! Each frame carries a oneshot sender through which the task reports the
//! outcome of the write that contained it.
//!
//! ```text
//! send() ─┐
//! send() ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► Transport
//! send() ─┘          ◄── oneshot result ────────┘
//! ```

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{LinkError, Result};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 16;

/// An encoded frame waiting to be written.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Complete wire bytes, checksum included.
    pub bytes: Bytes,
    /// Receives the outcome of the write.
    done: oneshot::Sender<std::io::Result<()>>,
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for sending frames to the writer task.
///
/// Cheaply cloneable. The task exits once every handle is dropped.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue encoded frame bytes and wait until they are written.
    ///
    /// Returns the transport's I/O error if the write failed, or
    /// `ConnectionClosed` if the writer task is gone.
    pub async fn send(&self, bytes: Bytes) -> Result<()> {
        let (done, result) = oneshot::channel();
        self.tx
            .send(OutboundFrame { bytes, done })
            .await
            .map_err(|_| LinkError::ConnectionClosed)?;

        match result.await {
            Ok(outcome) => outcome.map_err(LinkError::Io),
            Err(_) => Err(LinkError::ConnectionClosed),
        }
    }

    /// Check whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The JoinHandle resolves once all handles are dropped (after shutting
/// down the writer) or after the first failed write.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives frames and writes them to the transport.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(frame) => frame,
            None => {
                // Every handle dropped: clean shutdown.
                if let Err(e) = writer.shutdown().await {
                    tracing::debug!("Writer shutdown error: {}", e);
                }
                return Ok(());
            }
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        let (frames, waiters): (Vec<Bytes>, Vec<_>) =
            batch.into_iter().map(|f| (f.bytes, f.done)).unzip();

        match write_batch(&mut writer, &frames).await {
            Ok(()) => {
                for done in waiters {
                    let _ = done.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::error!("Transport write failed: {}", e);
                for done in waiters {
                    let _ = done.send(Err(std::io::Error::new(e.kind(), e.to_string())));
                }
                return Err(LinkError::Io(e));
            }
        }
    }
}

/// Write a batch of frames using scatter/gather I/O (write_vectored).
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total_size: usize = batch.iter().map(|b| b.len()).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            ));
        }
        total_written += written;
    }

    writer.flush().await
}

/// Build IoSlice array for the data after `skip_bytes` already written.
fn build_remaining_slices(batch: &[Bytes], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len());
    let mut offset = 0;

    for frame in batch {
        let end = offset + frame.len();
        if skip_bytes < end && !frame.is_empty() {
            let start_in_frame = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&frame[start_in_frame..]));
        }
        offset = end;
    }

    slices
}
