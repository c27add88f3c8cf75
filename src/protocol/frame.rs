//! Frame struct with typed accessors.
//!
//! A [`Frame`] is one validated `(command, payload)` pair. The payload is a
//! `bytes::Bytes` slice of the receive buffer, so handing frames through the
//! delivery queue does not copy them.
//!
//! # Example
//!
//! ```
//! use gx8006_link::protocol::Frame;
//!
//! let frame = Frame::from_parts(0x05, &[0x01, 0xAA]);
//! assert_eq!(frame.command(), 0x05);
//! assert_eq!(frame.payload(), &[0x01, 0xAA]);
//! ```

use bytes::Bytes;

use super::wire_format::{encode_frame, MIN_FRAME_LEN};

/// A validated link-layer frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Application command byte.
    pub command: u8,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from command and payload.
    pub fn new(command: u8, payload: Bytes) -> Self {
        Self { command, payload }
    }

    /// Create a frame from a command and raw bytes (copies data).
    pub fn from_parts(command: u8, payload: &[u8]) -> Self {
        Self {
            command,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the command byte.
    #[inline]
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Length of this frame on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        MIN_FRAME_LEN + self.payload.len()
    }

    /// First payload byte, used by sub-protocols as a status discriminator.
    #[inline]
    pub fn status(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Payload after the status byte (zero-copy).
    pub fn body(&self) -> Bytes {
        if self.payload.is_empty() {
            Bytes::new()
        } else {
            self.payload.slice(1..)
        }
    }

    /// Encode this frame back to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(self.command, &self.payload)
    }
}
