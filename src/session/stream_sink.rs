//! Capabilities the reassembler needs from an output artifact.

use crate::error::SinkError;

/// Decodes chunks and appends them to a persistent artifact.
pub trait StreamSink {
    /// Decode `chunk` and append the result.
    fn append(&mut self, chunk: &[u8]) -> Result<(), SinkError>;

    /// Finalize the artifact. Consumes the sink, so it is closed at most once.
    fn close(self) -> Result<(), SinkError>;
}

/// Creates a fresh sink for every capture session.
pub trait SinkFactory {
    /// Sink type produced.
    type Sink: StreamSink;

    /// Open the output for a new session.
    fn open(&mut self) -> Result<Self::Sink, SinkError>;
}

impl<F, S> SinkFactory for F
where
    F: FnMut() -> Result<S, SinkError>,
    S: StreamSink,
{
    type Sink = S;

    fn open(&mut self) -> Result<S, SinkError> {
        self()
    }
}
