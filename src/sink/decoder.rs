//! Chunk decoders: encoded capture chunk in, PCM samples out.
//!
//! The codec is picked per capture with [`Codec`]. The module streams its
//! microphone as Opus; [`Pcm16Decoder`] covers raw PCM streams.

use serde::Deserialize;

use crate::error::SinkError;

#[cfg(feature = "opus")]
use super::opus_codec::OpusDecoder;

/// Sample layout of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Duration of one encoded chunk in milliseconds.
    pub frame_ms: u32,
}

impl AudioFormat {
    /// Samples per channel in one chunk.
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as u64 * self.frame_ms as u64 / 1000) as usize
    }

    /// Reject parameters no writer can represent.
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.sample_rate == 0 {
            return Err(SinkError::InvalidFormat("sample_rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(SinkError::InvalidFormat("channels must be > 0".to_string()));
        }
        if self.frame_ms == 0 {
            return Err(SinkError::InvalidFormat("frame_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_ms: 40,
        }
    }
}

/// Turns one encoded chunk into interleaved 16-bit samples.
pub trait ChunkDecoder {
    /// Decode a single chunk.
    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<i16>, SinkError>;
}

/// Little-endian 16-bit PCM passthrough.
#[derive(Debug, Clone)]
pub struct Pcm16Decoder {
    format: AudioFormat,
}

impl Pcm16Decoder {
    /// Create a decoder for `format`.
    pub fn new(format: AudioFormat) -> Self {
        Self { format }
    }
}

impl ChunkDecoder for Pcm16Decoder {
    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<i16>, SinkError> {
        if chunk.len() % 2 != 0 {
            return Err(SinkError::Decode(format!(
                "PCM chunk of {} bytes is not a whole number of samples",
                chunk.len()
            )));
        }

        let channels = self.format.channels.max(1) as usize;
        let samples = chunk.len() / 2;
        if samples % channels != 0 {
            return Err(SinkError::Decode(format!(
                "{} samples not divisible by {} channels",
                samples, channels
            )));
        }

        Ok(chunk
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}

/// Encoding of the chunks inside data frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// One Opus packet per chunk.
    Opus,
    /// Little-endian 16-bit PCM.
    Pcm,
}

impl Default for Codec {
    fn default() -> Self {
        if cfg!(feature = "opus") {
            Codec::Opus
        } else {
            Codec::Pcm
        }
    }
}

/// Decoder selected at runtime from a [`Codec`].
#[derive(Clone)]
pub enum StreamDecoder {
    Pcm(Pcm16Decoder),
    #[cfg(feature = "opus")]
    Opus(OpusDecoder),
}

impl StreamDecoder {
    /// Build the decoder for `codec` at `format`.
    pub fn new(codec: Codec, format: AudioFormat) -> Result<Self, SinkError> {
        format.validate()?;
        match codec {
            Codec::Pcm => Ok(StreamDecoder::Pcm(Pcm16Decoder::new(format))),
            #[cfg(feature = "opus")]
            Codec::Opus => Ok(StreamDecoder::Opus(OpusDecoder::new(format)?)),
            #[cfg(not(feature = "opus"))]
            Codec::Opus => Err(SinkError::InvalidFormat(
                "built without the opus feature".to_string(),
            )),
        }
    }
}

impl ChunkDecoder for StreamDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<i16>, SinkError> {
        match self {
            StreamDecoder::Pcm(decoder) => decoder.decode(chunk),
            #[cfg(feature = "opus")]
            StreamDecoder::Opus(decoder) => decoder.decode(chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_samples() {
        assert_eq!(AudioFormat::default().frame_samples(), 640);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let format = AudioFormat {
            sample_rate: 0,
            ..AudioFormat::default()
        };
        assert!(matches!(format.validate(), Err(SinkError::InvalidFormat(_))));
        assert!(AudioFormat::default().validate().is_ok());
    }

    #[test]
    fn test_pcm_decode() {
        let mut decoder = Pcm16Decoder::new(AudioFormat::default());
        let samples = decoder.decode(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn test_pcm_decode_empty() {
        let mut decoder = Pcm16Decoder::new(AudioFormat::default());
        assert!(decoder.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_pcm_decode_odd_length() {
        let mut decoder = Pcm16Decoder::new(AudioFormat::default());
        assert!(matches!(decoder.decode(&[0x01]), Err(SinkError::Decode(_))));
    }

    #[test]
    fn test_pcm_decode_partial_stereo_frame() {
        let format = AudioFormat {
            channels: 2,
            ..AudioFormat::default()
        };
        let mut decoder = Pcm16Decoder::new(format);
        assert!(decoder.decode(&[0, 0, 0, 0]).is_ok());
        assert!(decoder.decode(&[0, 0]).is_err());
    }

    #[test]
    fn test_codec_from_json() {
        let codec: Codec = serde_json::from_str("\"pcm\"").unwrap();
        assert_eq!(codec, Codec::Pcm);
        let codec: Codec = serde_json::from_str("\"opus\"").unwrap();
        assert_eq!(codec, Codec::Opus);
        assert!(serde_json::from_str::<Codec>("\"mp3\"").is_err());
    }

    #[test]
    fn test_stream_decoder_pcm() {
        let mut decoder = StreamDecoder::new(Codec::Pcm, AudioFormat::default()).unwrap();
        assert_eq!(decoder.decode(&[0x02, 0x00]).unwrap(), vec![2]);
    }

    #[cfg(feature = "opus")]
    #[test]
    fn test_default_codec_is_opus() {
        assert_eq!(Codec::default(), Codec::Opus);
        let decoder = StreamDecoder::new(Codec::default(), AudioFormat::default()).unwrap();
        assert!(matches!(decoder, StreamDecoder::Opus(_)));
    }

    #[cfg(feature = "opus")]
    #[test]
    fn test_stream_decoder_opus_rejects_rate() {
        let format = AudioFormat {
            sample_rate: 11_025,
            ..AudioFormat::default()
        };
        assert!(matches!(
            StreamDecoder::new(Codec::Opus, format),
            Err(SinkError::InvalidFormat(_))
        ));
    }
}
