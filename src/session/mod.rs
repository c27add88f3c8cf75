//! Session module - the audio capture sub-protocol on top of frames.
//!
//! Provides:
//! - [`SessionStatus`] - status byte of [`STREAM_CMD`] frames
//! - [`StreamSink`] / [`SinkFactory`] - the output collaborator
//! - [`SessionReassembler`] - the start / data / finish state machine
//!
//! # Example
//!
//! ```
//! use gx8006_link::error::SinkError;
//! use gx8006_link::protocol::Frame;
//! use gx8006_link::session::{SessionEvent, SessionReassembler, StreamSink, STREAM_CMD};
//!
//! struct Collect(Vec<u8>);
//!
//! impl StreamSink for Collect {
//!     fn append(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
//!         self.0.extend_from_slice(chunk);
//!         Ok(())
//!     }
//!     fn close(self) -> Result<(), SinkError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut session = SessionReassembler::new(|| Ok::<_, SinkError>(Collect(Vec::new())));
//! let event = session.handle(&Frame::from_parts(STREAM_CMD, &[0x00])).unwrap();
//! assert_eq!(event, SessionEvent::Started);
//! ```

mod reassembler;
mod status;
mod stream_sink;

pub use reassembler::{SessionEvent, SessionReassembler};
pub use status::{SessionStatus, STREAM_CMD};
pub use stream_sink::{SinkFactory, StreamSink};
