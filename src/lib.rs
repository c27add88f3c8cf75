//! # gx8006-link
//!
//! UART link layer and audio capture session reassembly for the GX8006
//! offline voice module.
//!
//! ## Architecture
//!
//! ```text
//! transport bytes ─► link reader ─► Deframer ─► delivery queue ─► receive()
//!                                                                   │
//!                          WavSink ◄── SessionReassembler ◄─────────┘
//! ```
//!
//! - **Link layer** ([`protocol`], [`link`]): checksummed frames recovered
//!   from an arbitrarily split, possibly corrupted byte stream
//! - **Session layer** ([`session`], [`sink`]): start / data / finish frames
//!   of the audio stream command turned into one output file per capture
//!
//! ## Example
//!
//! ```ignore
//! use gx8006_link::{CaptureConfig, SerialLink, SessionReassembler, WavSinkFactory};
//! use gx8006_link::transport::Transport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CaptureConfig::default();
//!     let transport = Transport::connect(&config.endpoint()?, config.baudrate).await?;
//!     let mut link = SerialLink::open(transport, config.link_config());
//!     let mut session = SessionReassembler::new(WavSinkFactory::for_codec(
//!         &config.output_dir,
//!         config.audio_format(),
//!         config.format,
//!     )?);
//!
//!     while let Ok(next) = link.receive(Some(config.receive_timeout())).await {
//!         if let Some(frame) = next {
//!             session.handle(&frame)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod transport;
pub mod writer;

pub use config::CaptureConfig;
pub use error::{LinkError, SinkError};
pub use link::{LinkConfig, LinkTermination, SerialLink};
pub use protocol::Frame;
pub use session::{SessionEvent, SessionReassembler};
pub use sink::WavSinkFactory;
