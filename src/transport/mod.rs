//! Transport module - where the UART byte stream comes from.
//!
//! Provides:
//! - [`Endpoint`] parsing (serial device path, `tcp://`, `unix://`)
//! - [`Transport`], one `AsyncRead + AsyncWrite` over any of them

mod serial;

pub use serial::{Endpoint, Transport};
