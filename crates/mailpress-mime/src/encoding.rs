//! MIME transfer encoding and decoding utilities.
//!
//! Supports Base64 (with RFC 2045 line wrapping), Quoted-Printable and
//! RFC 2047 encoded words.

use crate::error::{Error, Result};
use crate::linebreak::LineBreaker;
use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::write::EncoderWriter;
use std::io::Write;

/// Base64 encoder whose output is wrapped into 76 column CRLF lines.
pub type Base64Writer<W> = EncoderWriter<'static, GeneralPurpose, LineBreaker<W>>;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Wraps `sink` in a streaming Base64 encoder followed by a [`LineBreaker`].
///
/// Call `finish()` on the returned writer to flush the final quantum, then
/// [`LineBreaker::close`] on the breaker it returns.
pub fn base64_writer<W: Write>(sink: W) -> Base64Writer<W> {
    EncoderWriter::new(LineBreaker::new(sink), &STANDARD)
}

/// Encodes data as Base64 wrapped to MIME body lines.
///
/// # Errors
///
/// Returns an error if the encoder pipeline fails. Writing into memory does
/// not fail in practice.
pub fn encode_base64_wrapped(data: &[u8]) -> Result<String> {
    let mut encoder = base64_writer(Vec::with_capacity(data.len() * 4 / 3 + 4));
    encoder
        .write_all(data)
        .map_err(|e| Error::InvalidEncoding(e.to_string()))?;
    let mut breaker = encoder
        .finish()
        .map_err(|e| Error::InvalidEncoding(e.to_string()))?;
    breaker.close()?;

    let out = breaker.into_inner().unwrap_or_default();
    String::from_utf8(out).map_err(|e| Error::InvalidEncoding(e.to_string()))
}

/// Decodes a Base64 body. Line breaks are ignored.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045 §6.7).
///
/// Trailing whitespace on each line is transport padding and is dropped.
/// A line ending in `=` is a soft break and is joined with the next one.
/// Hard line breaks are kept as they appear in the input.
///
/// # Errors
///
/// Returns an error if an `=` is not followed by two hex digits.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let lines = data.split_inclusive(|b| *b == b'\n');

    for raw in lines {
        let (line, ending): (&[u8], &[u8]) = if let Some(l) = raw.strip_suffix(b"\r\n") {
            (l, b"\r\n")
        } else if let Some(l) = raw.strip_suffix(b"\n") {
            (l, b"\n")
        } else {
            (raw, b"")
        };
        let line = line.trim_ascii_end();

        let (line, soft_break) = line
            .strip_suffix(b"=")
            .map_or((line, false), |l| (l, true));

        decode_qp_line(line, &mut result)?;
        if !soft_break {
            result.extend_from_slice(ending);
        }
    }

    Ok(result)
}

fn decode_qp_line(line: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut bytes = line.iter().copied();
    while let Some(b) = bytes.next() {
        if b != b'=' {
            out.push(b);
            continue;
        }
        match (bytes.next().and_then(hex_value), bytes.next().and_then(hex_value)) {
            (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
            _ => {
                return Err(Error::InvalidEncoding(
                    "Invalid quoted-printable escape sequence".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Decodes RFC 2047 encoded words (`=?charset?B|Q?text?=`) in a phrase.
///
/// Whitespace between two adjacent encoded words is dropped. Words in
/// charsets other than UTF-8, US-ASCII and ISO-8859-1, and words that fail
/// to decode, are kept as written.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    if !text.contains("=?") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut prev_encoded = false;
    for (i, word) in text.split(' ').enumerate() {
        let decoded = decode_encoded_word(word);
        if i > 0 && !(prev_encoded && decoded.is_some()) {
            out.push(' ');
        }
        prev_encoded = decoded.is_some();
        out.push_str(decoded.as_deref().unwrap_or(word));
    }
    out
}

fn decode_encoded_word(word: &str) -> Option<String> {
    let inner = word.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut parts = inner.splitn(3, '?');
    let (charset, encoding, payload) = (parts.next()?, parts.next()?, parts.next()?);
    // RFC 2231 language suffix: `utf-8*en`
    let charset = charset.split('*').next().unwrap_or_default();

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes()).ok()?,
        "Q" | "q" => decode_q(payload)?,
        _ => return None,
    };

    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("us-ascii") {
        String::from_utf8(bytes).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") || charset.eq_ignore_ascii_case("latin1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        None
    }
}

/// The `Q` encoding: quoted-printable with `_` standing for a space.
fn decode_q(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = hex_value(bytes.next()?)?;
                let lo = hex_value(bytes.next()?)?;
                out.push((hi << 4) | lo);
            }
            _ => out.push(b),
        }
    }
    Some(out)
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
