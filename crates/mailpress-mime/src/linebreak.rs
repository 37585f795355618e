//! Line wrapping for base64 transfer-encoded bodies.
//!
//! RFC 2045 §6.8 limits encoded lines to 76 characters. [`LineBreaker`] sits
//! between a base64 encoder and the real output and re-chunks the encoded
//! stream into CRLF terminated lines as it is produced.
//!
//! # Example
//!
//! ```
//! use mailpress_mime::LineBreaker;
//!
//! let mut lb = LineBreaker::new(Vec::new());
//! lb.write_chunk(&[b'A'; 100])?;
//! lb.close()?;
//!
//! let out = lb.into_inner().unwrap_or_default();
//! assert_eq!(out.len(), 100 + 2 * 2);
//! assert_eq!(&out[76..78], b"\r\n");
//! # Ok::<(), mailpress_mime::Error>(())
//! ```

use std::io::{self, Write};

use crate::error::{Error, FlushStage, Result};

/// Maximum number of encoded characters per line.
pub const LINE_WIDTH: usize = 76;

/// Line terminator emitted after every line.
pub const CRLF: &[u8; 2] = b"\r\n";

/// Writer decorator that splits its input into [`LINE_WIDTH`] wide lines.
///
/// Bytes that do not yet fill a line are held in a fixed buffer until more
/// input arrives or [`LineBreaker::close`] is called. Nothing in the input is
/// inspected; the breaker only inserts [`CRLF`] every [`LINE_WIDTH`] bytes.
///
/// After a sink failure the breaker must be discarded: depending on which
/// flush failed, retrying may either replay or lose already forwarded bytes.
#[derive(Debug)]
pub struct LineBreaker<W> {
    sink: Option<W>,
    line: [u8; LINE_WIDTH],
    used: usize,
}

impl<W> Default for LineBreaker<W> {
    fn default() -> Self {
        Self::detached()
    }
}

impl<W> LineBreaker<W> {
    /// Creates a line breaker that forwards to `sink`.
    #[must_use]
    pub const fn new(sink: W) -> Self {
        Self {
            sink: Some(sink),
            line: [0; LINE_WIDTH],
            used: 0,
        }
    }

    /// Creates a line breaker without a sink. Every write fails.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            sink: None,
            line: [0; LINE_WIDTH],
            used: 0,
        }
    }

    /// Number of bytes waiting for a full line.
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.used
    }

    /// Returns a reference to the sink.
    #[must_use]
    pub const fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    /// Consumes the breaker and returns the sink.
    ///
    /// Buffered bytes are discarded; call [`LineBreaker::close`] first.
    pub fn into_inner(self) -> Option<W> {
        self.sink
    }
}

impl<W: Write> LineBreaker<W> {
    /// Accepts `data`, forwarding every completed line to the sink.
    ///
    /// Returns `data.len()` on success. A single call may emit zero, one or
    /// several lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSink`] if the breaker has no sink, and
    /// [`Error::SinkWrite`] as soon as any forward to the sink fails.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<usize> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::NoSink);
        };

        let mut rest = data;
        loop {
            if self.used + rest.len() < LINE_WIDTH {
                self.line[self.used..self.used + rest.len()].copy_from_slice(rest);
                self.used += rest.len();
                return Ok(data.len());
            }

            sink.write_all(&self.line[..self.used])
                .map_err(|source| Error::SinkWrite {
                    stage: FlushStage::PartialLine,
                    buffered: self.used,
                    source,
                })?;

            let excess = LINE_WIDTH - self.used;
            self.used = 0;
            sink.write_all(&rest[..excess])
                .map_err(|source| Error::SinkWrite {
                    stage: FlushStage::Excess,
                    buffered: 0,
                    source,
                })?;
            sink.write_all(CRLF).map_err(|source| Error::SinkWrite {
                stage: FlushStage::Terminator,
                buffered: 0,
                source,
            })?;

            tracing::trace!(remaining = rest.len() - excess, "line flushed");
            rest = &rest[excess..];
        }
    }

    /// Flushes the incomplete last line, if any, followed by [`CRLF`].
    ///
    /// Closing an empty breaker never touches the sink, so closing twice or
    /// closing a detached breaker succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWrite`] if the sink rejects the final line.
    pub fn close(&mut self) -> Result<()> {
        if self.used == 0 {
            return Ok(());
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::NoSink);
        };

        sink.write_all(&self.line[..self.used])
            .map_err(|source| Error::SinkWrite {
                stage: FlushStage::PartialLine,
                buffered: self.used,
                source,
            })?;
        self.used = 0;
        sink.write_all(CRLF).map_err(|source| Error::SinkWrite {
            stage: FlushStage::Terminator,
            buffered: 0,
            source,
        })
    }
}

impl<W: Write> Write for LineBreaker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf).map_err(Into::into)
    }

    /// Flushes the sink. Never emits the incomplete line, since that would
    /// break the line width; use [`LineBreaker::close`] at end of stream.
    fn flush(&mut self) -> io::Result<()> {
        self.sink.as_mut().map_or(Ok(()), Write::flush)
    }
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
    use proptest::prelude::*;

    /// Sink that rejects every write, including empty ones.
    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "supposed to always fail"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink that records the size of every write it receives.
    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Vec<u8>>,
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink that accepts data but rejects every line terminator.
    #[derive(Default)]
    struct TerminatorRejectingSink {
        data: Vec<u8>,
    }

    impl Write for TerminatorRejectingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf == CRLF {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "no terminators"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn strip_newlines(data: &[u8]) -> Vec<u8> {
        data.iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect()
    }

    fn wrap(data: &[u8]) -> Vec<u8> {
        let mut lb = LineBreaker::new(Vec::new());
        lb.write_chunk(data).unwrap();
        lb.close().unwrap();
        lb.into_inner().unwrap()
    }

    #[test]
    fn test_short_write_is_buffered() {
        let mut lb = LineBreaker::new(Vec::new());
        assert_eq!(lb.write_chunk(b"testdata").unwrap(), 8);
        assert_eq!(lb.buffered(), 8);
        assert!(lb.get_ref().unwrap().is_empty());

        lb.close().unwrap();
        assert_eq!(lb.into_inner().unwrap(), b"testdata\r\n");
    }

    #[test]
    fn test_exact_line_is_flushed_immediately() {
        let mut lb = LineBreaker::new(Vec::new());
        lb.write_chunk(&[b'x'; LINE_WIDTH]).unwrap();
        assert_eq!(lb.buffered(), 0);

        let mut expected = vec![b'x'; LINE_WIDTH];
        expected.extend_from_slice(CRLF);
        assert_eq!(lb.get_ref().unwrap(), &expected);
    }

    #[test]
    fn test_long_write_emits_several_lines() {
        let data: Vec<u8> = (0..200u8).map(|i| b'A' + i % 26).collect();
        let out = wrap(&data);

        let lines: Vec<&[u8]> = out.split(|b| *b == b'\n').collect();
        // 76 + 76 + 48, then the empty tail after the last '\n'
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].len(), LINE_WIDTH + 1);
        assert_eq!(lines[1].len(), LINE_WIDTH + 1);
        assert_eq!(lines[2].len(), 48 + 1);
        assert!(lines[3].is_empty());
        assert_eq!(strip_newlines(&out), data);
    }

    #[test]
    fn test_write_chunking_to_sink() {
        let mut lb = LineBreaker::new(RecordingSink::default());
        lb.write_chunk(&[b'a'; 50]).unwrap();
        lb.write_chunk(&[b'b'; 30]).unwrap();

        let sink = lb.get_ref().unwrap();
        let sizes: Vec<usize> = sink.writes.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 26, 2]);
        assert_eq!(lb.buffered(), 4);
    }

    #[test]
    fn test_close_empty_is_noop() {
        let mut lb = LineBreaker::new(RecordingSink::default());
        lb.close().unwrap();
        lb.close().unwrap();
        assert!(lb.get_ref().unwrap().writes.is_empty());
    }

    #[test]
    fn test_close_twice_flushes_once() {
        let mut lb = LineBreaker::new(Vec::new());
        lb.write_chunk(b"abc").unwrap();
        lb.close().unwrap();
        lb.close().unwrap();
        assert_eq!(lb.into_inner().unwrap(), b"abc\r\n");
    }

    #[test]
    fn test_detached_fails_write_but_closes() {
        let mut lb: LineBreaker<Vec<u8>> = LineBreaker::detached();
        assert!(matches!(lb.write_chunk(b"short"), Err(Error::NoSink)));
        assert!(matches!(lb.write_chunk(b""), Err(Error::NoSink)));
        assert_eq!(lb.buffered(), 0);
        lb.close().unwrap();
    }

    #[test]
    fn test_failing_sink_buffers_short_input() {
        let mut lb = LineBreaker::new(FailingSink);
        assert_eq!(lb.write_chunk(b"testdata").unwrap(), 8);

        let err = lb.close().unwrap_err();
        match err {
            Error::SinkWrite {
                stage,
                buffered,
                ref source,
            } => {
                assert_eq!(stage, FlushStage::PartialLine);
                assert_eq!(buffered, 8);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failing_sink_on_long_input() {
        let mut lb = LineBreaker::new(FailingSink);
        lb.write_chunk(b"verylong").unwrap();

        let err = lb.write_chunk(&[b'z'; 100]).unwrap_err();
        assert!(matches!(
            err,
            Error::SinkWrite {
                stage: FlushStage::PartialLine,
                buffered: 8,
                ..
            }
        ));
        // The failed flush leaves the counter untouched.
        assert_eq!(lb.buffered(), 8);
    }

    #[test]
    fn test_failing_sink_excess_stage() {
        // Nothing buffered, so the empty partial-line flush never reaches the sink.
        let mut lb = LineBreaker::new(FailingSink);
        let err = lb.write_chunk(&[b'z'; 80]).unwrap_err();
        assert!(matches!(
            err,
            Error::SinkWrite {
                stage: FlushStage::Excess,
                ..
            }
        ));
        assert_eq!(lb.buffered(), 0);
        lb.close().unwrap();
    }

    #[test]
    fn test_terminator_stage_on_write() {
        let mut lb = LineBreaker::new(TerminatorRejectingSink::default());
        let err = lb.write_chunk(&[b'q'; 80]).unwrap_err();
        assert!(matches!(
            err,
            Error::SinkWrite {
                stage: FlushStage::Terminator,
                buffered: 0,
                ..
            }
        ));
        assert_eq!(err.sink_error().unwrap().kind(), io::ErrorKind::WriteZero);
        // The full line reached the sink before the terminator failed.
        assert_eq!(lb.buffered(), 0);
        assert_eq!(lb.get_ref().unwrap().data, vec![b'q'; LINE_WIDTH]);
    }

    #[test]
    fn test_terminator_stage_on_close() {
        let mut lb = LineBreaker::new(TerminatorRejectingSink::default());
        lb.write_chunk(b"tail").unwrap();

        let err = lb.close().unwrap_err();
        assert!(matches!(
            err,
            Error::SinkWrite {
                stage: FlushStage::Terminator,
                buffered: 0,
                ..
            }
        ));
        // The partial line was handed over, so nothing is left to flush.
        assert_eq!(lb.buffered(), 0);
        assert_eq!(lb.get_ref().unwrap().data, b"tail");
        lb.close().unwrap();
    }

    #[test]
    fn test_io_write_error_kinds() {
        let mut lb: LineBreaker<Vec<u8>> = LineBreaker::detached();
        let err = lb.write(b"abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        let mut lb = LineBreaker::new(FailingSink);
        let err = lb.write_all(&[b'q'; 90]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_io_write_with_base64_encoder() {
        use base64::engine::general_purpose::STANDARD;
        use base64::write::EncoderWriter;
        use base64::Engine;

        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut encoder = EncoderWriter::new(LineBreaker::new(Vec::new()), &STANDARD);
        encoder.write_all(&data).unwrap();
        let mut lb = encoder.finish().unwrap();
        lb.close().unwrap();
        let out = lb.into_inner().unwrap();

        assert_eq!(strip_newlines(&out), STANDARD.encode(&data).into_bytes());
    }

    proptest! {
        #[test]
        fn prop_round_trip_without_newlines(data in proptest::collection::vec(any::<u8>().prop_filter("no CR/LF", |b| *b != b'\r' && *b != b'\n'), 0..600)) {
            let out = wrap(&data);
            prop_assert_eq!(strip_newlines(&out), data);
        }

        #[test]
        fn prop_lines_are_full_width(data in "[A-Za-z0-9+/=]{0,600}") {
            let out = wrap(data.as_bytes());
            prop_assert!(out.is_empty() || out.ends_with(CRLF));

            let text = String::from_utf8(out).unwrap();
            let lines: Vec<&str> = text.split_terminator("\r\n").collect();
            for (i, line) in lines.iter().enumerate() {
                prop_assert!(!line.contains('\r') && !line.contains('\n'));
                if i + 1 < lines.len() {
                    prop_assert_eq!(line.len(), LINE_WIDTH);
                } else {
                    prop_assert!(!line.is_empty() && line.len() <= LINE_WIDTH);
                }
            }
        }

        #[test]
        fn prop_chunking_is_associative(
            data in "[A-Za-z0-9+/]{0,400}",
            cuts in proptest::collection::vec(0usize..400, 0..8),
        ) {
            let bytes = data.as_bytes();
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(bytes.len())).collect();
            cuts.sort_unstable();

            let mut lb = LineBreaker::new(Vec::new());
            let mut start = 0;
            for cut in cuts {
                lb.write_chunk(&bytes[start..cut]).unwrap();
                start = cut;
            }
            lb.write_chunk(&bytes[start..]).unwrap();
            lb.close().unwrap();

            prop_assert_eq!(lb.into_inner().unwrap(), wrap(bytes));
        }
    }
}
