//! Minimal 16-bit PCM WAV writer.
//!
//! Writes a RIFF header with placeholder sizes up front and patches the
//! sizes in [`WavWriter::finish`].

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::SinkError;

const HEADER_LEN: u32 = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Offset of the RIFF chunk size field.
const RIFF_SIZE_OFFSET: u64 = 4;
/// Offset of the data chunk size field.
const DATA_SIZE_OFFSET: u64 = 40;

/// Streaming WAV file writer.
pub struct WavWriter {
    file: BufWriter<File>,
    data_bytes: u32,
}

impl WavWriter {
    /// Create `path` and write the header.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<Self, SinkError> {
        if channels == 0 {
            return Err(SinkError::InvalidFormat("channels must be > 0".to_string()));
        }
        if sample_rate == 0 {
            return Err(SinkError::InvalidFormat("sample_rate must be > 0".to_string()));
        }

        let mut file = BufWriter::new(File::create(path.as_ref())?);

        let block_align: u16 = channels.saturating_mul(BITS_PER_SAMPLE / 8);
        let byte_rate: u32 = sample_rate.saturating_mul(block_align as u32);

        file.write_all(b"RIFF")?;
        file.write_all(&0u32.to_le_bytes())?; // patched in finish()
        file.write_all(b"WAVE")?;

        file.write_all(b"fmt ")?;
        file.write_all(&16u32.to_le_bytes())?;
        file.write_all(&1u16.to_le_bytes())?; // PCM
        file.write_all(&channels.to_le_bytes())?;
        file.write_all(&sample_rate.to_le_bytes())?;
        file.write_all(&byte_rate.to_le_bytes())?;
        file.write_all(&block_align.to_le_bytes())?;
        file.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;

        file.write_all(b"data")?;
        file.write_all(&0u32.to_le_bytes())?; // patched in finish()

        Ok(Self {
            file,
            data_bytes: 0,
        })
    }

    /// Append interleaved samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }

        self.file.write_all(&buf)?;
        self.data_bytes = self.data_bytes.saturating_add(buf.len() as u32);
        Ok(())
    }

    /// Bytes of sample data written so far.
    pub fn data_bytes(&self) -> u32 {
        self.data_bytes
    }

    /// Patch the header sizes and flush.
    pub fn finish(mut self) -> Result<(), SinkError> {
        let riff_size = (HEADER_LEN - 8).saturating_add(self.data_bytes);
        self.file.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.file.write_all(&riff_size.to_le_bytes())?;

        self.file.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.file.write_all(&self.data_bytes.to_le_bytes())?;

        self.file.flush()?;
        Ok(())
    }
}
