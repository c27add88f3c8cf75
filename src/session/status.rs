//! Status byte of the audio stream sub-protocol.

/// Command byte carrying the audio capture stream.
pub const STREAM_CMD: u8 = 0x05;

/// First payload byte of a [`STREAM_CMD`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Capture begins (0x00).
    Start,
    /// Remaining bytes are one codec-encoded chunk (0x01).
    Data,
    /// Capture ends (0x02).
    Finish,
    /// Complete utterance in one frame (0x03).
    FullFrame,
    /// Module woke up (0x04).
    Wakeup,
    /// Module went to sleep (0x05).
    Sleep,
    /// Anything else.
    Other(u8),
}

impl SessionStatus {
    /// Wire value of this status.
    pub fn code(self) -> u8 {
        match self {
            SessionStatus::Start => 0x00,
            SessionStatus::Data => 0x01,
            SessionStatus::Finish => 0x02,
            SessionStatus::FullFrame => 0x03,
            SessionStatus::Wakeup => 0x04,
            SessionStatus::Sleep => 0x05,
            SessionStatus::Other(code) => code,
        }
    }
}

impl From<u8> for SessionStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => SessionStatus::Start,
            0x01 => SessionStatus::Data,
            0x02 => SessionStatus::Finish,
            0x03 => SessionStatus::FullFrame,
            0x04 => SessionStatus::Wakeup,
            0x05 => SessionStatus::Sleep,
            other => SessionStatus::Other(other),
        }
    }
}
