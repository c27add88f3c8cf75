//! Audio capture session state machine.
//!
//! Driven by [`STREAM_CMD`] frames:
//!
//! ```text
//!            start                 start (stale sink closed first)
//!   IDLE ─────────────► STREAMING ◄──────┐
//!    ▲                   │  │  └──────────┘
//!    │      finish       │  │ data: append payload[1..]
//!    └───────────────────┘  └──────────┘
//! ```
//!
//! The sink is an `Option`: data or finish with no session open is
//! dropped without touching any sink.

use crate::error::SinkError;
use crate::protocol::Frame;

use super::status::{SessionStatus, STREAM_CMD};
use super::stream_sink::{SinkFactory, StreamSink};

/// What a frame did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Not a stream frame, or a status this component does not act on.
    Ignored,
    /// A new session was opened.
    Started,
    /// A start arrived while streaming: the old sink was closed and a new one opened.
    Restarted,
    /// A chunk of `bytes` encoded bytes was handed to the sink.
    Appended { bytes: usize },
    /// The session was closed after `chunks` data chunks.
    Finished { chunks: u64 },
    /// Data or finish with no open session, or a stream frame with no status byte.
    Dropped,
}

/// Reassembles start / data / finish frames into one sink per session.
pub struct SessionReassembler<F: SinkFactory> {
    factory: F,
    sink: Option<F::Sink>,
    chunks: u64,
}

impl<F: SinkFactory> SessionReassembler<F> {
    /// Create an idle reassembler that opens sinks through `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sink: None,
            chunks: 0,
        }
    }

    /// Feed one frame.
    ///
    /// Sink errors are returned to the caller; the reassembler stays usable.
    pub fn handle(&mut self, frame: &Frame) -> Result<SessionEvent, SinkError> {
        if frame.command() != STREAM_CMD {
            return Ok(SessionEvent::Ignored);
        }

        let status = match frame.status() {
            Some(code) => SessionStatus::from(code),
            None => {
                tracing::warn!("Stream frame without status byte, dropping");
                return Ok(SessionEvent::Dropped);
            }
        };

        match status {
            SessionStatus::Start => self.start(),
            SessionStatus::Data => self.append(&frame.body()),
            SessionStatus::Finish => self.finish(),
            other => {
                tracing::debug!("Ignoring stream status 0x{:02x}", other.code());
                Ok(SessionEvent::Ignored)
            }
        }
    }

    fn start(&mut self) -> Result<SessionEvent, SinkError> {
        let restarted = match self.sink.take() {
            Some(stale) => {
                tracing::warn!(
                    "Start while a session is open, closing previous session after {} chunks",
                    self.chunks
                );
                if let Err(e) = stale.close() {
                    tracing::error!("Failed to close previous session: {}", e);
                }
                true
            }
            None => false,
        };
        self.chunks = 0;

        // On failure we stay idle.
        let sink = self.factory.open()?;
        self.sink = Some(sink);
        tracing::info!("Capture session started");

        Ok(if restarted {
            SessionEvent::Restarted
        } else {
            SessionEvent::Started
        })
    }

    fn append(&mut self, chunk: &[u8]) -> Result<SessionEvent, SinkError> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => {
                tracing::warn!("Data chunk of {} bytes with no open session, dropping", chunk.len());
                return Ok(SessionEvent::Dropped);
            }
        };

        sink.append(chunk)?;
        self.chunks += 1;
        tracing::debug!("Appended chunk {} ({} bytes)", self.chunks, chunk.len());
        Ok(SessionEvent::Appended { bytes: chunk.len() })
    }

    fn finish(&mut self) -> Result<SessionEvent, SinkError> {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => {
                tracing::warn!("Finish with no open session, ignoring");
                return Ok(SessionEvent::Dropped);
            }
        };

        let chunks = std::mem::take(&mut self.chunks);
        // Idle even if close fails.
        sink.close()?;
        tracing::info!("Capture session finished after {} chunks", chunks);
        Ok(SessionEvent::Finished { chunks })
    }

    /// Close a still-open session, e.g. when the process is stopping.
    ///
    /// Returns `true` if a sink was closed.
    pub fn shutdown(&mut self) -> Result<bool, SinkError> {
        match self.sink.take() {
            Some(sink) => {
                tracing::warn!("Closing unfinished session after {} chunks", self.chunks);
                self.chunks = 0;
                sink.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Check whether a session is open.
    pub fn is_streaming(&self) -> bool {
        self.sink.is_some()
    }

    /// Data chunks appended in the current session.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }
}

impl<F: SinkFactory> Drop for SessionReassembler<F> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Failed to close session on drop: {}", e);
        }
    }
}
