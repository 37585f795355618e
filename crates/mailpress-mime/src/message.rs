//! Raw RFC 5322 message reading and transfer encodings.

use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Content-Transfer-Encoding values understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII. The RFC 2045 default when the header is absent.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Binary (no encoding).
    Binary,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Parses a transfer encoding token, case-insensitively.
    ///
    /// Returns `None` for tokens this crate does not know (e.g. `x-uuencode`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Some(Self::SevenBit),
            "8bit" => Some(Self::EightBit),
            "binary" => Some(Self::Binary),
            "quoted-printable" => Some(Self::QuotedPrintable),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    /// Returns true if the body is stored as-is on the wire.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }

    /// Returns the header token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message split into its header block and undecoded body.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Message headers.
    pub headers: Headers,
    /// Body bytes exactly as they follow the blank line.
    pub body: Vec<u8>,
}

impl RawMessage {
    /// Reads a raw RFC 5322 message.
    ///
    /// The header block ends at the first empty line (CRLF or LF). A message
    /// without an empty line is all headers and has an empty body.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or the header block is
    /// malformed.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Parse("empty message".to_string()));
        }

        let (header_block, body) = split_header_block(data);
        let headers = Headers::parse(&String::from_utf8_lossy(header_block))?;

        Ok(Self {
            headers,
            body: body.to_vec(),
        })
    }
}

/// Splits at the first empty line. The empty line belongs to neither part.
fn split_header_block(data: &[u8]) -> (&[u8], &[u8]) {
    let mut offset = 0;
    for line in data.split_inclusive(|b| *b == b'\n') {
        if line == b"\r\n" || line == b"\n" {
            return (&data[..offset], &data[offset + line.len()..]);
        }
        offset += line.len();
    }
    (data, &data[data.len()..])
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(
            TransferEncoding::parse("7bit"),
            Some(TransferEncoding::SevenBit)
        );
        assert_eq!(
            TransferEncoding::parse(" Base64 "),
            Some(TransferEncoding::Base64)
        );
        assert_eq!(
            TransferEncoding::parse("QUOTED-PRINTABLE"),
            Some(TransferEncoding::QuotedPrintable)
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), None);
    }

    #[test]
    fn test_transfer_encoding_identity() {
        assert!(TransferEncoding::EightBit.is_identity());
        assert!(TransferEncoding::default().is_identity());
        assert!(!TransferEncoding::Base64.is_identity());
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
    }

    #[test]
    fn test_raw_message_crlf() {
        let raw = b"Subject: Hi\r\nFrom: a@example.com\r\n\r\nline one\r\n\r\nline two\r\n";
        let msg = RawMessage::parse(raw).unwrap();
        assert_eq!(msg.headers.get("subject"), Some("Hi"));
        assert_eq!(msg.body, b"line one\r\n\r\nline two\r\n");
    }

    #[test]
    fn test_raw_message_lf() {
        let msg = RawMessage::parse(b"Subject: Hi\n\nbody").unwrap();
        assert_eq!(msg.headers.get("Subject"), Some("Hi"));
        assert_eq!(msg.body, b"body");
    }

    #[test]
    fn test_raw_message_headers_only() {
        let msg = RawMessage::parse(b"Subject: Hi\r\n").unwrap();
        assert_eq!(msg.headers.len(), 1);
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_raw_message_binary_body() {
        let msg = RawMessage::parse(b"X-Test: 1\r\n\r\n\xff\xfe\x00").unwrap();
        assert_eq!(msg.body, b"\xff\xfe\x00");
    }

    #[test]
    fn test_raw_message_errors() {
        assert!(RawMessage::parse(b"").is_err());
        assert!(RawMessage::parse(b"this is not a header\r\n\r\nbody").is_err());
    }
}
