//! Resynchronizing deframer for the UART byte stream.
//!
//! Uses `bytes::BytesMut` for the receive buffer. The deframer keeps no
//! parse state besides the buffer itself: every pass re-derives the frame
//! position from the buffered bytes, dropping one byte at a time until a
//! plausible header is at the front.
//!
//! # Example
//!
//! ```
//! use gx8006_link::protocol::{encode_frame, Deframer};
//!
//! let mut deframer = Deframer::new();
//! let bytes = encode_frame(0x05, &[0x00]);
//!
//! // Garbage before the frame is skipped.
//! assert!(deframer.push(&[0x13, 0x37]).is_empty());
//! let frames = deframer.push(&bytes);
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].command(), 0x05);
//! ```

use bytes::{Buf, BytesMut};

use super::wire_format::{
    checksum, Header, ABSOLUTE_MAX_FRAME_LEN, HEADER_SIZE, MAX_FRAME_LEN, MIN_FRAME_LEN,
};
use super::Frame;

/// Counters describing what the deframer has seen. Diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeframerStats {
    /// Frames emitted.
    pub frames: u64,
    /// Bytes dropped while searching for a valid header.
    pub resync_bytes: u64,
    /// Candidate frames discarded for a bad checksum.
    pub checksum_failures: u64,
}

/// Outcome of a single extraction step.
enum Step {
    /// Not enough bytes to decide.
    NeedMore,
    /// Something was discarded; try again.
    Discarded,
    /// A valid frame was removed from the buffer.
    Frame(Frame),
}

/// Buffer for accumulating incoming bytes and extracting valid frames.
pub struct Deframer {
    /// Bytes received but not yet parsed.
    buffer: BytesMut,
    /// Largest total frame length accepted.
    max_frame_len: usize,
    stats: DeframerStats,
}

impl Deframer {
    /// Create a new deframer with default settings.
    ///
    /// Default capacity: 4KB, max frame length: 61KB.
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    /// Create a new deframer with a custom maximum frame length.
    ///
    /// The value is clamped to what the 16-bit length field can express.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            max_frame_len: max_frame_len.clamp(MIN_FRAME_LEN, ABSOLUTE_MAX_FRAME_LEN),
            stats: DeframerStats::default(),
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// This is the main API for processing incoming data from the transport.
    /// Any trailing partial frame stays buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(data);
        self.extract()
    }

    /// Run one extraction pass over the buffered bytes.
    ///
    /// Terminates because every step either shrinks the buffer or stops.
    pub fn extract(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();

        loop {
            match self.step() {
                Step::NeedMore => break,
                Step::Discarded => continue,
                Step::Frame(frame) => frames.push(frame),
            }
        }

        frames
    }

    fn step(&mut self) -> Step {
        if self.buffer.len() < MIN_FRAME_LEN {
            return Step::NeedMore;
        }

        let header = match Header::decode(&self.buffer) {
            Some(header) => header,
            None => return Step::NeedMore,
        };

        if !header.has_sync() {
            self.drop_byte();
            return Step::Discarded;
        }

        if !header.has_valid_type() {
            tracing::warn!(
                "Invalid fixed byte 0x{:02x}, dropping data",
                header.frame_type
            );
            self.drop_byte();
            return Step::Discarded;
        }

        let frame_len = header.frame_len();
        if frame_len > self.max_frame_len || frame_len < MIN_FRAME_LEN {
            // Re-scan byte by byte rather than trusting a corrupt length.
            tracing::warn!("Invalid frame length {}, dropping data", frame_len);
            self.drop_byte();
            return Step::Discarded;
        }

        if self.buffer.len() < frame_len {
            return Step::NeedMore;
        }

        let raw = self.buffer.split_to(frame_len).freeze();
        let received = raw[frame_len - 1];
        let calculated = checksum(&raw[..frame_len - 1]);

        if received != calculated {
            tracing::error!(
                "Checksum mismatch, dropping frame, received: 0x{:02x}, calculated: 0x{:02x}",
                received,
                calculated
            );
            self.stats.checksum_failures += 1;
            return Step::Discarded;
        }

        let frame = Frame::new(raw[HEADER_SIZE], raw.slice(HEADER_SIZE + 1..frame_len - 1));
        self.stats.frames += 1;
        tracing::debug!(
            "Deframed CMD=0x{:02x}, payload length={}",
            frame.command,
            frame.payload_len()
        );

        Step::Frame(frame)
    }

    fn drop_byte(&mut self) {
        self.buffer.advance(1);
        self.stats.resync_bytes += 1;
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer. Statistics are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Largest total frame length this deframer accepts.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> DeframerStats {
        self.stats
    }
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_frame, MAX_PAYLOAD_LEN};

    /// Deterministic filler that never contains the first sync byte.
    fn garbage(n: usize) -> Vec<u8> {
        let mut state: u32 = 0x1234_5678;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (state >> 16) as u8 {
                    0x55 => 0x54,
                    b => b,
                }
            })
            .collect()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut deframer = Deframer::new();
        let frames = deframer.push(&encode_frame(0x05, b"\x01hello"));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command(), 0x05);
        assert_eq!(frames[0].payload(), b"\x01hello");
        assert!(deframer.is_empty());
        assert_eq!(deframer.stats().frames, 1);
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut deframer = Deframer::new();

        let mut combined = Vec::new();
        combined.extend(encode_frame(1, b"first"));
        combined.extend(encode_frame(2, b"second"));
        combined.extend(encode_frame(3, b"third"));

        let frames = deframer.push(&combined);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].command(), 1);
        assert_eq!(frames[1].command(), 2);
        assert_eq!(frames[2].command(), 3);
        assert!(deframer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut deframer = Deframer::new();
        let bytes = encode_frame(1, b"test");

        assert!(deframer.push(&bytes[..5]).is_empty());
        assert_eq!(deframer.len(), 5);

        let frames = deframer.push(&bytes[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"test");
        assert!(deframer.is_empty());
    }

    #[test]
    fn test_fragmented_payload_is_retained() {
        let mut deframer = Deframer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let bytes = encode_frame(1, payload);

        let partial_len = HEADER_SIZE + 10;
        assert!(deframer.push(&bytes[..partial_len]).is_empty());
        assert_eq!(deframer.len(), partial_len);

        let frames = deframer.push(&bytes[partial_len..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let mut deframer = Deframer::new();
        let frames = deframer.push(&encode_frame(0x7F, b""));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command(), 0x7F);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn test_roundtrip_all_commands() {
        let mut deframer = Deframer::new();

        for cmd in 0..=255u8 {
            let payloads: [&[u8]; 2] = [&[], &[cmd]];
            for payload in payloads {
                let frames = deframer.push(&encode_frame(cmd, payload));
                assert_eq!(frames, vec![Frame::from_parts(cmd, payload)]);
            }
        }
        assert!(deframer.is_empty());
    }

    #[test]
    fn test_roundtrip_max_payload() {
        let payload = vec![0xAB; MAX_PAYLOAD_LEN];
        let mut deframer = Deframer::with_max_frame_len(ABSOLUTE_MAX_FRAME_LEN);

        for cmd in [0x00, 0x05, 0xFF] {
            let frames = deframer.push(&encode_frame(cmd, &payload));
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].command(), cmd);
            assert_eq!(frames[0].payload(), &payload[..]);
        }
    }

    #[test]
    fn test_default_limit_rejects_oversized_frame() {
        let payload = vec![0xAB; MAX_FRAME_LEN - MIN_FRAME_LEN + 1];
        let mut deframer = Deframer::new();

        let frames = deframer.push(&encode_frame(0x01, &payload));

        assert!(frames.is_empty());
        assert!(deframer.stats().resync_bytes > 0);
    }

    #[test]
    fn test_largest_default_frame_accepted() {
        let payload = vec![0x01; MAX_FRAME_LEN - MIN_FRAME_LEN];
        let mut deframer = Deframer::new();

        let frames = deframer.push(&encode_frame(0x01, &payload));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].wire_len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_zero_length_field_rejected() {
        let mut deframer = Deframer::new();
        // LEN = 0 gives a frame length of 7, below the minimum.
        let mut bytes = vec![0x55, 0xAA, 0x00, 0x92, 0x00, 0x00, 0x05, 0x00];
        bytes.extend(encode_frame(0x05, b"\x02"));

        let frames = deframer.push(&bytes);
        assert_eq!(frames, vec![Frame::from_parts(0x05, b"\x02")]);
    }

    #[test]
    fn test_resync_after_garbage() {
        for n in [0usize, 1, 7, 1000] {
            let mut deframer = Deframer::new();
            let mut bytes = garbage(n);
            bytes.extend(encode_frame(0x05, b"\x01payload"));

            let frames = deframer.push(&bytes);

            assert_eq!(frames.len(), 1, "garbage length {}", n);
            assert_eq!(frames[0].payload(), b"\x01payload");
            assert!(deframer.is_empty());
            assert_eq!(deframer.stats().resync_bytes, n as u64);
        }
    }

    #[test]
    fn test_false_sync_with_bad_type_is_skipped() {
        let mut deframer = Deframer::new();
        let mut bytes = vec![0x55, 0xAA, 0x00, 0x93, 0x00, 0x01, 0x05, 0x00];
        bytes.extend(encode_frame(0x05, b"\x00"));

        let frames = deframer.push(&bytes);

        assert_eq!(frames, vec![Frame::from_parts(0x05, b"\x00")]);
        assert_eq!(deframer.stats().resync_bytes, 8);
    }

    #[test]
    fn test_checksum_mismatch_drops_frame() {
        let mut deframer = Deframer::new();
        let mut bad = encode_frame(0x05, b"\x01bad");
        let last = bad.len() - 1;
        bad[last] = bad[last].wrapping_add(1);

        let mut bytes = bad;
        bytes.extend(encode_frame(0x05, b"\x01good"));

        let frames = deframer.push(&bytes);

        assert_eq!(frames, vec![Frame::from_parts(0x05, b"\x01good")]);
        assert_eq!(deframer.stats().checksum_failures, 1);
    }

    #[test]
    fn test_corrupted_frame_never_emitted() {
        let original = Frame::from_parts(0x05, b"\x01opus-chunk-bytes");
        let bytes = original.to_bytes();

        for pos in 0..bytes.len() - 1 {
            for mask in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = bytes.clone();
                corrupted[pos] ^= mask;

                let mut deframer = Deframer::new();
                let frames = deframer.push(&corrupted);

                assert!(
                    frames.iter().all(|f| *f != original),
                    "corruption at {} with mask 0x{:02x} went unnoticed",
                    pos,
                    mask
                );
            }
        }
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let mut stream = garbage(13);
        stream.extend(encode_frame(0x05, b"\x00"));
        let mut corrupted = encode_frame(0x05, b"\x01lost");
        corrupted[9] ^= 0x40;
        stream.extend(corrupted);
        stream.extend(garbage(3));
        stream.extend(encode_frame(0x05, b"\x01kept"));
        stream.extend(encode_frame(0x05, b"\x02"));
        stream.extend(&encode_frame(0x09, b"partial")[..6]);

        let mut reference = Deframer::new();
        let expected = reference.push(&stream);
        assert_eq!(expected.len(), 3);

        // Every two-way split.
        for split in 0..=stream.len() {
            let mut deframer = Deframer::new();
            let mut frames = deframer.push(&stream[..split]);
            frames.extend(deframer.push(&stream[split..]));
            assert_eq!(frames, expected, "split at {}", split);
            assert_eq!(deframer.len(), reference.len());
        }

        // Uneven chunk sizes, including single bytes.
        for chunk_size in [1usize, 2, 3, 5, 8, 17] {
            let mut deframer = Deframer::new();
            let frames: Vec<Frame> = stream
                .chunks(chunk_size)
                .flat_map(|chunk| deframer.push(chunk))
                .collect();
            assert_eq!(frames, expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_short_buffer_waits() {
        let mut deframer = Deframer::new();
        // Seven bytes, not even a sync byte: nothing is decided yet.
        assert!(deframer.push(&[0x00; 7]).is_empty());
        assert_eq!(deframer.len(), 7);
        assert_eq!(deframer.stats().resync_bytes, 0);
    }

    #[test]
    fn test_clear_resets_buffer() {
        let mut deframer = Deframer::new();
        let bytes = encode_frame(1, b"test");
        deframer.push(&bytes[..9]);
        assert!(!deframer.is_empty());

        deframer.clear();

        assert!(deframer.is_empty());
        assert_eq!(deframer.push(&bytes).len(), 1);
    }

    #[test]
    fn test_max_frame_len_is_clamped() {
        assert_eq!(Deframer::with_max_frame_len(0).max_frame_len(), MIN_FRAME_LEN);
        assert_eq!(
            Deframer::with_max_frame_len(usize::MAX).max_frame_len(),
            ABSOLUTE_MAX_FRAME_LEN
        );
    }
}
