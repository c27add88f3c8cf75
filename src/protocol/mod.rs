//! Protocol module - wire format, deframing, and frame types.
//!
//! This module implements the UART link layer:
//! - frame encoding and the 8-bit additive checksum
//! - a resynchronizing deframer for the raw byte stream
//! - the `Frame` value handed to the application

mod deframer;
mod frame;
mod wire_format;

pub use deframer::{Deframer, DeframerStats};
pub use frame::Frame;
pub use wire_format::{
    checksum, encode_frame, encode_frame_into, frame_len_for, Header, ABSOLUTE_MAX_FRAME_LEN,
    DEFAULT_MAX_PAYLOAD_LEN, FRAME_TYPE, HEADER_SIZE, MAX_FRAME_LEN, MAX_PAYLOAD_LEN,
    MIN_FRAME_LEN, RESERVED, SYNC1, SYNC2,
};
