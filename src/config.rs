//! Capture configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file
//! (or none at all) works.
//!
//! ```json
//! {
//!   "endpoint": "/dev/ttyUSB0",
//!   "baudrate": 921600,
//!   "output_dir": "files",
//!   "sample_rate": 16000,
//!   "format": "opus"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LinkError, Result};
use crate::link::{LinkConfig, DEFAULT_READ_BUFFER_SIZE};
use crate::sink::{AudioFormat, Codec, StreamDecoder};
use crate::transport::Endpoint;

/// Settings for the capture process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Transport endpoint (device path, `tcp://host:port`, `unix:///path`).
    pub endpoint: String,
    /// Line rate applied when opening a serial device.
    pub baudrate: u32,
    /// Directory receiving one WAV file per session.
    pub output_dir: PathBuf,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Capture channel count.
    pub channels: u16,
    /// Duration of one encoded chunk in milliseconds.
    pub frame_ms: u32,
    /// Encoding of the captured chunks.
    pub format: Codec,
    /// Bytes requested per transport read.
    pub read_buffer_size: usize,
    /// How long one `receive` call waits before checking for shutdown.
    pub receive_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            endpoint: "/dev/ttyUSB0".to_string(),
            baudrate: 921_600,
            output_dir: PathBuf::from("files"),
            sample_rate: 16_000,
            channels: 1,
            frame_ms: 40,
            format: Codec::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            receive_timeout_ms: 1000,
        }
    }
}

impl CaptureConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CaptureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LinkError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        StreamDecoder::new(self.format, self.audio_format())
            .map_err(|e| LinkError::Config(e.to_string()))?;
        if self.baudrate == 0 {
            return Err(LinkError::Config("baudrate must be > 0".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(LinkError::Config("read_buffer_size must be > 0".to_string()));
        }
        if self.receive_timeout_ms == 0 {
            return Err(LinkError::Config("receive_timeout_ms must be > 0".to_string()));
        }
        Endpoint::parse(&self.endpoint)?;
        Ok(())
    }

    /// Parsed transport endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }

    /// Audio layout for decoders and writers.
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frame_ms: self.frame_ms,
        }
    }

    /// Link settings derived from this configuration.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            read_buffer_size: self.read_buffer_size,
            ..LinkConfig::default()
        }
    }

    /// Timeout for one `receive` call.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}
