//! Error types for MIME operations.

use std::fmt;
use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Point in the line-breaking pipeline at which a sink write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStage {
    /// Forwarding the bytes buffered from earlier writes.
    PartialLine,
    /// Forwarding the slice of new input that completes the line.
    Excess,
    /// Forwarding the CRLF line terminator.
    Terminator,
}

impl fmt::Display for FlushStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialLine => write!(f, "partial line"),
            Self::Excess => write!(f, "excess segment"),
            Self::Terminator => write!(f, "line terminator"),
        }
    }
}

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid MIME header.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid mailbox or address list.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid RFC 5322 date.
    #[error("Invalid date {value:?}: {source}")]
    InvalidDate {
        /// The raw header value.
        value: String,
        /// Underlying chrono error.
        source: chrono::ParseError,
    },

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Missing required header.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A line breaker was used without an output sink.
    #[error("No output sink configured for line breaker")]
    NoSink,

    /// The line breaker's sink rejected a write.
    #[error("Failed to write {stage} to sink ({buffered} bytes buffered): {source}")]
    SinkWrite {
        /// Which flush failed.
        stage: FlushStage,
        /// Bytes held in the line buffer when the failure happened.
        buffered: usize,
        /// Underlying sink error.
        source: io::Error,
    },
}

impl Error {
    /// Returns the underlying sink error, if this is a sink failure.
    #[must_use]
    pub fn sink_error(&self) -> Option<&io::Error> {
        match self {
            Self::SinkWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::NoSink => io::ErrorKind::NotConnected,
            Error::SinkWrite { source, .. } => source.kind(),
            _ => io::ErrorKind::InvalidData,
        };
        Self::new(kind, err)
    }
}
