//! Sink module - capture sessions written to WAV files.
//!
//! A [`WavSink`] decodes each chunk with a [`ChunkDecoder`] and appends the
//! samples to a [`WavWriter`]. [`WavSinkFactory`] creates one file per
//! session in an output directory.

mod decoder;
#[cfg(feature = "opus")]
mod opus_codec;
mod wav;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use decoder::{AudioFormat, ChunkDecoder, Codec, Pcm16Decoder, StreamDecoder};
#[cfg(feature = "opus")]
pub use opus_codec::OpusDecoder;
pub use wav::WavWriter;

use crate::error::SinkError;
use crate::session::{SinkFactory, StreamSink};

/// One capture session being written to disk.
pub struct WavSink<D> {
    decoder: D,
    writer: WavWriter,
    path: PathBuf,
}

impl<D: ChunkDecoder> WavSink<D> {
    /// Create the file at `path` for `format`.
    pub fn create(path: PathBuf, format: AudioFormat, decoder: D) -> Result<Self, SinkError> {
        format.validate()?;
        let writer = WavWriter::create(&path, format.sample_rate, format.channels)?;
        Ok(Self {
            decoder,
            writer,
            path,
        })
    }

    /// Path of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<D: ChunkDecoder> StreamSink for WavSink<D> {
    fn append(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        let samples = self.decoder.decode(chunk)?;
        self.writer.write_samples(&samples)
    }

    fn close(self) -> Result<(), SinkError> {
        let bytes = self.writer.data_bytes();
        self.writer.finish()?;
        tracing::info!("Wrote {} ({} data bytes)", self.path.display(), bytes);
        Ok(())
    }
}

/// Opens a new timestamped WAV file for each session.
pub struct WavSinkFactory<D> {
    output_dir: PathBuf,
    format: AudioFormat,
    decoder: D,
    sequence: u32,
}

impl<D: ChunkDecoder + Clone> WavSinkFactory<D> {
    /// Each session gets a clone of `decoder`.
    pub fn new(output_dir: impl Into<PathBuf>, format: AudioFormat, decoder: D) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            decoder,
            sequence: 0,
        }
    }

    fn next_path(&mut self) -> PathBuf {
        self.sequence = self.sequence.wrapping_add(1);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.output_dir
            .join(format!("gx8006_capture_{}_{:03}.wav", millis, self.sequence))
    }
}

impl WavSinkFactory<Pcm16Decoder> {
    /// Factory writing raw 16-bit PCM captures.
    pub fn pcm(output_dir: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self::new(output_dir, format, Pcm16Decoder::new(format))
    }
}

impl WavSinkFactory<StreamDecoder> {
    /// Factory decoding chunks with `codec`.
    pub fn for_codec(
        output_dir: impl Into<PathBuf>,
        format: AudioFormat,
        codec: Codec,
    ) -> Result<Self, SinkError> {
        let decoder = StreamDecoder::new(codec, format)?;
        Ok(Self::new(output_dir, format, decoder))
    }
}

impl<D: ChunkDecoder + Clone> SinkFactory for WavSinkFactory<D> {
    type Sink = WavSink<D>;

    fn open(&mut self) -> Result<WavSink<D>, SinkError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.next_path();
        tracing::info!("Opening capture file {}", path.display());
        WavSink::create(path, self.format, self.decoder.clone())
    }
}
