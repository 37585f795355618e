//! Integration tests for the base64 wrapping pipeline.
//!
//! Output is checked against the wire format: every line at most 76
//! characters, CRLF terminated, and decodable back to the input.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use mailpress_mime::encoding::{base64_writer, decode_base64, encode_base64, encode_base64_wrapped};
use mailpress_mime::{CRLF, Error, FlushStage, LINE_WIDTH, LineBreaker, RawMessage};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wire_lines(wire: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = wire.split(|b| *b == b'\n').collect();
    assert_eq!(lines.pop(), Some(&b""[..]), "output must end with a line break");
    lines
}

#[test]
fn test_wrapped_output_shape() {
    init_tracing();
    let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let wrapped = encode_base64_wrapped(&payload).unwrap();

    let lines = wire_lines(wrapped.as_bytes());
    for line in &lines {
        let text = line.strip_suffix(b"\r").unwrap();
        assert!(text.len() <= LINE_WIDTH);
    }
    let (last, full) = lines.split_last().unwrap();
    assert!(full.iter().all(|line| line.len() == LINE_WIDTH + 1));
    assert!(last.len() <= LINE_WIDTH + 1);

    assert_eq!(decode_base64(wrapped.as_bytes()).unwrap(), payload);
}

#[test]
fn test_wrapped_matches_unwrapped_encoding() {
    let payload = b"The quick brown fox jumps over the lazy dog. ".repeat(9);
    let wrapped = encode_base64_wrapped(&payload).unwrap();
    let flat: String = wrapped.split(['\r', '\n']).collect();
    assert_eq!(flat, encode_base64(&payload));
}

#[test]
fn test_streaming_writes_in_small_chunks() {
    init_tracing();
    let payload = vec![0xA5u8; 300];
    let mut encoder = base64_writer(Vec::new());
    for chunk in payload.chunks(7) {
        encoder.write_all(chunk).unwrap();
    }
    let mut breaker = encoder.finish().unwrap();
    breaker.close().unwrap();

    let wire = breaker.into_inner().unwrap();
    assert!(wire.ends_with(CRLF));
    assert_eq!(decode_base64(&wire).unwrap(), payload);
}

#[test]
fn test_detached_breaker_rejects_writes() {
    let mut breaker: LineBreaker<Vec<u8>> = LineBreaker::detached();
    assert!(matches!(breaker.write_chunk(b"short"), Err(Error::NoSink)));
    breaker.close().unwrap();
}

#[test]
fn test_sink_failure_names_stage() {
    struct Refusing;

    impl Write for Refusing {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("refused"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut breaker = LineBreaker::new(Refusing);
    assert_eq!(breaker.write_chunk(&[b'A'; 10]).unwrap(), 10);
    let err = breaker.write_chunk(&[b'A'; 80]).unwrap_err();
    assert!(matches!(
        err,
        Error::SinkWrite {
            stage: FlushStage::PartialLine,
            buffered: 10,
            ..
        }
    ));
    assert_eq!(err.sink_error().unwrap().to_string(), "refused");
    assert!(Error::NoSink.sink_error().is_none());
    assert_eq!(breaker.buffered(), 10);
}

#[test]
fn test_wrapped_body_survives_message_parse() {
    let payload = "Grüße aus dem Büro. ".repeat(10);
    let wrapped = encode_base64_wrapped(payload.as_bytes()).unwrap();
    let raw = format!(
        "Content-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: base64\r\n\r\n{wrapped}"
    );

    let message = RawMessage::parse(raw.as_bytes()).unwrap();
    assert_eq!(
        message.headers.get("content-transfer-encoding"),
        Some("base64")
    );
    let decoded = decode_base64(&message.body).unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), payload);
}
