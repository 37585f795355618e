//! Error types for message composition and EML import.

use std::io;

use mailpress_mime::TransferEncoding;

use crate::msg::{AddrHeader, Msg};

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition and import errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The EML source could not be opened or read.
    #[error("failed to open EML source: {0}")]
    Open(#[source] io::Error),

    /// The RFC 5322 reader rejected the input.
    #[error("failed to parse EML: {0}")]
    HeaderParse(#[source] mailpress_mime::Error),

    /// An address header holds a malformed mailbox.
    #[error("failed to parse \"{header}:\" header: {source}")]
    AddressParse {
        /// Header that failed.
        header: AddrHeader,
        /// Underlying parser error.
        source: mailpress_mime::Error,
    },

    /// The `Date` header is present but malformed.
    #[error("failed to parse EML date: {0}")]
    DateParse(#[source] mailpress_mime::Error),

    /// The `Content-Type` header is missing or malformed.
    #[error("failed to extract content type: {0}")]
    ContentTypeParse(#[source] mailpress_mime::Error),

    /// The body could not be decoded with its declared transfer encoding.
    #[error("failed to read {encoding} body: {source}")]
    BodyDecode {
        /// Declared transfer encoding.
        encoding: TransferEncoding,
        /// Underlying decoder error.
        source: mailpress_mime::Error,
    },
}

/// A failed import together with everything extracted before the failure.
///
/// Nothing is rolled back: fields set before the failing stage stay set.
#[derive(Debug, thiserror::Error)]
#[error("failed to import EML message")]
pub struct PartialImport {
    /// The partially populated message.
    pub message: Box<Msg>,
    /// The first error encountered.
    #[source]
    pub error: Error,
}

impl PartialImport {
    pub(crate) fn new(message: Msg, error: Error) -> Self {
        Self {
            message: Box::new(message),
            error,
        }
    }

    /// Splits into the partial message and the error.
    #[must_use]
    pub fn into_parts(self) -> (Msg, Error) {
        (*self.message, self.error)
    }
}
