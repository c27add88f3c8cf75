//! Error types for gx8006-link.
//!
//! Framing problems (lost sync, bad fixed byte, bad length, checksum
//! mismatch) are not errors at this level: the deframer absorbs them and
//! only counts them in [`DeframerStats`](crate::protocol::DeframerStats).

use thiserror::Error;

/// Main error type for link and capture operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured.
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Endpoint string could not be understood.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Outbound payload does not fit in a single frame.
    #[error("Payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The link reader or writer has stopped.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failure in the output artifact.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors raised by a stream sink while opening, appending or closing.
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O error on the output artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The chunk could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output format parameters are unusable.
    #[error("Invalid output format: {0}")]
    InvalidFormat(String),
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
