//! Wire format encoding and checksum.
//!
//! Every frame on the UART looks like this:
//! ```text
//! ┌───────┬───────┬──────────┬──────┬──────────┬─────┬─────────┬──────────┐
//! │ SYNC1 │ SYNC2 │ RESERVED │ TYPE │ LEN      │ CMD │ PAYLOAD │ CHECKSUM │
//! │ 0x55  │ 0xAA  │ 0x00     │ 0x92 │ uint16 BE│ u8  │ LEN-1   │ u8       │
//! └───────┴───────┴──────────┴──────┴──────────┴─────┴─────────┴──────────┘
//! ```
//!
//! `LEN` counts the command byte plus the payload. The checksum is the
//! 8-bit truncated sum of every byte before it.

use bytes::{BufMut, BytesMut};

/// First sync byte.
pub const SYNC1: u8 = 0x55;

/// Second sync byte.
pub const SYNC2: u8 = 0xAA;

/// Reserved byte, always written as zero and not checked on receive.
pub const RESERVED: u8 = 0x00;

/// Fixed frame type byte.
pub const FRAME_TYPE: u8 = 0x92;

/// Bytes before the command byte: sync, reserved, type, length.
pub const HEADER_SIZE: usize = 6;

/// Smallest possible frame: header, command and checksum with no payload.
pub const MIN_FRAME_LEN: usize = 8;

/// Largest total frame length accepted by default (61 KiB).
pub const MAX_FRAME_LEN: usize = 61 * 1024;

/// Largest total frame length the 16-bit length field can describe.
pub const ABSOLUTE_MAX_FRAME_LEN: usize = MIN_FRAME_LEN + u16::MAX as usize - 1;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - 1;

/// Largest payload that fits in a frame of [`MAX_FRAME_LEN`].
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - MIN_FRAME_LEN;

/// Sum all bytes modulo 256.
///
/// # Example
///
/// ```
/// use gx8006_link::protocol::checksum;
///
/// assert_eq!(checksum(&[]), 0);
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// ```
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Total length of a frame whose `LEN` field holds `cmd_payload_len`.
///
/// A zero `LEN` yields 7, which is below [`MIN_FRAME_LEN`] and therefore
/// rejected by the deframer.
#[inline]
pub fn frame_len_for(cmd_payload_len: u16) -> usize {
    MIN_FRAME_LEN + cmd_payload_len as usize - 1
}

/// Fixed-size frame prefix, peeked from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The two sync bytes as received.
    pub sync: [u8; 2],
    /// Reserved byte as received.
    pub reserved: u8,
    /// Frame type byte as received.
    pub frame_type: u8,
    /// Length of command plus payload.
    pub cmd_payload_len: u16,
}

impl Header {
    /// Header for an outbound frame carrying `payload_len` bytes of payload.
    pub fn for_payload(payload_len: u16) -> Self {
        Self {
            sync: [SYNC1, SYNC2],
            reserved: RESERVED,
            frame_type: FRAME_TYPE,
            cmd_payload_len: payload_len + 1,
        }
    }

    /// Encode header to bytes (Big Endian length).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = self.cmd_payload_len.to_be_bytes();
        [
            self.sync[0],
            self.sync[1],
            self.reserved,
            self.frame_type,
            len[0],
            len[1],
        ]
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short. No field is validated here.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            sync: [buf[0], buf[1]],
            reserved: buf[2],
            frame_type: buf[3],
            cmd_payload_len: u16::from_be_bytes([buf[4], buf[5]]),
        })
    }

    /// Check the two sync bytes.
    #[inline]
    pub fn has_sync(&self) -> bool {
        self.sync == [SYNC1, SYNC2]
    }

    /// Check the fixed type byte.
    #[inline]
    pub fn has_valid_type(&self) -> bool {
        self.frame_type == FRAME_TYPE
    }

    /// Total frame length implied by the length field.
    #[inline]
    pub fn frame_len(&self) -> usize {
        frame_len_for(self.cmd_payload_len)
    }
}

/// Encode a complete frame into a new buffer.
///
/// # Panics
///
/// Panics if `payload` is longer than [`MAX_PAYLOAD_LEN`]; callers that take
/// payloads from outside validate the length first.
///
/// # Example
///
/// ```
/// use gx8006_link::protocol::encode_frame;
///
/// let bytes = encode_frame(0x10, &[]);
/// assert_eq!(bytes, vec![0x55, 0xAA, 0x00, 0x92, 0x00, 0x01, 0x10, 0xA2]);
/// ```
pub fn encode_frame(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(MIN_FRAME_LEN + payload.len());
    encode_frame_into(&mut buf, command, payload);
    buf.to_vec()
}

/// Append a complete frame to an existing buffer.
///
/// # Panics
///
/// Panics if `payload` is longer than [`MAX_PAYLOAD_LEN`].
pub fn encode_frame_into(buf: &mut BytesMut, command: u8, payload: &[u8]) {
    assert!(
        payload.len() <= MAX_PAYLOAD_LEN,
        "payload of {} bytes does not fit the length field",
        payload.len()
    );

    let start = buf.len();
    buf.reserve(MIN_FRAME_LEN + payload.len());
    buf.put_slice(&Header::for_payload(payload.len() as u16).encode());
    buf.put_u8(command);
    buf.put_slice(payload);
    let sum = checksum(&buf[start..]);
    buf.put_u8(sum);
}
