//! Opus chunk decoder, the module's microphone stream format.

use crate::error::SinkError;

use super::decoder::{AudioFormat, ChunkDecoder};

/// Sample rates libopus decodes to.
const OPUS_SAMPLE_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

/// Decodes one Opus packet per chunk into `frame_samples()` samples per channel.
///
/// The libopus state is created on the first chunk. A clone starts with
/// fresh state, so every session decodes independently.
pub struct OpusDecoder {
    format: AudioFormat,
    inner: Option<opus::Decoder>,
}

impl OpusDecoder {
    /// Create a decoder for `format`.
    pub fn new(format: AudioFormat) -> Result<Self, SinkError> {
        format.validate()?;
        if !OPUS_SAMPLE_RATES.contains(&format.sample_rate) {
            return Err(SinkError::InvalidFormat(format!(
                "Opus cannot decode at {} Hz",
                format.sample_rate
            )));
        }
        opus_channels(format.channels)?;
        Ok(Self {
            format,
            inner: None,
        })
    }
}

impl Clone for OpusDecoder {
    fn clone(&self) -> Self {
        Self {
            format: self.format,
            inner: None,
        }
    }
}

fn opus_channels(channels: u16) -> Result<opus::Channels, SinkError> {
    match channels {
        1 => Ok(opus::Channels::Mono),
        2 => Ok(opus::Channels::Stereo),
        n => Err(SinkError::InvalidFormat(format!(
            "Opus supports 1 or 2 channels, got {}",
            n
        ))),
    }
}

fn opus_error(e: opus::Error) -> SinkError {
    SinkError::Decode(format!("opus: {}", e))
}

impl ChunkDecoder for OpusDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<i16>, SinkError> {
        // An empty packet would make libopus conceal a lost frame.
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        if self.inner.is_none() {
            let decoder = opus::Decoder::new(
                self.format.sample_rate,
                opus_channels(self.format.channels)?,
            )
            .map_err(opus_error)?;
            self.inner = Some(decoder);
        }
        let decoder = match self.inner.as_mut() {
            Some(decoder) => decoder,
            None => return Err(SinkError::Decode("opus decoder unavailable".to_string())),
        };

        let channels = self.format.channels as usize;
        let mut pcm = vec![0i16; self.format.frame_samples() * channels];
        let samples = decoder.decode(chunk, &mut pcm, false).map_err(opus_error)?;
        pcm.truncate(samples * channels);
        Ok(pcm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_tone(format: AudioFormat) -> Vec<u8> {
        let mut encoder = opus::Encoder::new(
            format.sample_rate,
            opus_channels(format.channels).unwrap(),
            opus::Application::Voip,
        )
        .unwrap();
        let samples: Vec<i16> = (0..format.frame_samples() * format.channels as usize)
            .map(|i| ((i % 64) as i16 - 32) * 256)
            .collect();
        let mut packet = vec![0u8; 1500];
        let len = encoder.encode(&samples, &mut packet).unwrap();
        packet.truncate(len);
        packet
    }

    #[test]
    fn test_decode_one_frame() {
        let format = AudioFormat::default();
        let packet = encode_tone(format);

        let mut decoder = OpusDecoder::new(format).unwrap();
        let pcm = decoder.decode(&packet).unwrap();
        assert_eq!(pcm.len(), format.frame_samples());

        // Consecutive chunks keep decoding at the same size.
        assert_eq!(decoder.decode(&packet).unwrap().len(), 640);
    }

    #[test]
    fn test_decode_stereo() {
        let format = AudioFormat {
            channels: 2,
            ..AudioFormat::default()
        };
        let packet = encode_tone(format);

        let mut decoder = OpusDecoder::new(format).unwrap();
        assert_eq!(decoder.decode(&packet).unwrap().len(), 2 * 640);
    }

    #[test]
    fn test_empty_chunk_yields_no_samples() {
        let mut decoder = OpusDecoder::new(AudioFormat::default()).unwrap();
        assert!(decoder.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_clone_starts_fresh() {
        let format = AudioFormat::default();
        let mut decoder = OpusDecoder::new(format).unwrap();
        decoder.decode(&encode_tone(format)).unwrap();

        let copy = decoder.clone();
        assert!(copy.inner.is_none());
    }

    #[test]
    fn test_rejects_unsupported_rate() {
        let format = AudioFormat {
            sample_rate: 44_100,
            ..AudioFormat::default()
        };
        assert!(matches!(OpusDecoder::new(format), Err(SinkError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_three_channels() {
        let format = AudioFormat {
            channels: 3,
            ..AudioFormat::default()
        };
        assert!(matches!(OpusDecoder::new(format), Err(SinkError::InvalidFormat(_))));
    }
}
