//! EML (raw RFC 5322 message) import.
//!
//! An import runs two stages over a single [`Msg`]:
//!
//! 1. **Headers**: address headers, the date and a fixed set of generic
//!    headers are copied into the message.
//! 2. **Body**: the `Content-Type` and `Content-Transfer-Encoding` headers
//!    select a decoder and the decoded text becomes the message body.
//!
//! A failing stage stops the import, but whatever was extracted before the
//! failure is handed back in [`PartialImport`].
//!
//! ```
//! use mailpress_compose::eml;
//!
//! let raw = b"From: a@example.com\r\n\
//!             Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n\
//!             Content-Type: text/plain; charset=utf-8\r\n\
//!             Content-Transfer-Encoding: quoted-printable\r\n\
//!             \r\n\
//!             Hello=20World";
//!
//! let msg = eml::from_bytes(raw)?;
//! assert_eq!(msg.body().map(|b| b.content.as_str()), Some("Hello World"));
//! # Ok::<(), mailpress_compose::PartialImport>(())
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use mailpress_mime::encoding::{decode_base64, decode_quoted_printable};
use mailpress_mime::{ContentType, Headers, RawMessage, TransferEncoding};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, PartialImport, Result};
use crate::msg::{AddrHeader, Header, Msg};

/// Generic headers copied verbatim into the message when present.
pub const IMPORTED_HEADERS: [Header; 16] = [
    Header::ContentType,
    Header::Importance,
    Header::InReplyTo,
    Header::ListUnsubscribe,
    Header::ListUnsubscribePost,
    Header::MessageId,
    Header::MimeVersion,
    Header::Organization,
    Header::Precedence,
    Header::Priority,
    Header::References,
    Header::Subject,
    Header::UserAgent,
    Header::XMailer,
    Header::XMsMailPriority,
    Header::XPriority,
];

const DATE: &str = "Date";
const CONTENT_TYPE: &str = "Content-Type";
const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
const TEXT_PLAIN: &str = "text/plain";

/// How a body is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyDecoder {
    Verbatim,
    QuotedPrintable,
    Base64,
}

impl BodyDecoder {
    /// Decoder table keyed by media type and transfer encoding.
    ///
    /// `None` means the combination is not imported. An absent
    /// `Content-Transfer-Encoding` arrives here as `7bit`.
    fn select(media_type: &str, encoding: TransferEncoding) -> Option<Self> {
        match (media_type, encoding) {
            (TEXT_PLAIN, enc) if enc.is_identity() => Some(Self::Verbatim),
            (TEXT_PLAIN, TransferEncoding::QuotedPrintable) => Some(Self::QuotedPrintable),
            (TEXT_PLAIN, TransferEncoding::Base64) => Some(Self::Base64),
            _ => None,
        }
    }

    fn decode(self, body: &[u8]) -> mailpress_mime::Result<Vec<u8>> {
        match self {
            Self::Verbatim => Ok(body.to_vec()),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::Base64 => decode_base64(body),
        }
    }
}

/// Imports EML messages into [`Msg`] values.
#[derive(Debug, Clone, Default)]
pub struct EmlImporter<C = SystemClock> {
    clock: C,
}

impl EmlImporter {
    /// Creates an importer that stamps undated messages with the system time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> EmlImporter<C> {
    /// Creates an importer that takes the fallback date from `clock`.
    #[must_use]
    pub const fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Imports the `.eml` file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PartialImport`] with the first error and the message as far
    /// as it was filled: [`Error::Open`] if the file cannot be read, and any
    /// error of [`EmlImporter::import_bytes`].
    pub fn import_file(&self, path: impl AsRef<Path>) -> std::result::Result<Msg, PartialImport> {
        let path = path.as_ref();
        debug!(path = %path.display(), "importing EML file");

        let file = File::open(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to open EML file");
            PartialImport::new(Msg::new(), Error::Open(e))
        })?;
        self.import_reader(file)
    }

    /// Reads `reader` to the end and imports the result.
    ///
    /// # Errors
    ///
    /// Returns [`PartialImport`] with [`Error::Open`] if reading fails, and
    /// any error of [`EmlImporter::import_bytes`].
    pub fn import_reader(&self, mut reader: impl Read) -> std::result::Result<Msg, PartialImport> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| PartialImport::new(Msg::new(), Error::Open(e)))?;
        self.import_bytes(&data)
    }

    /// Imports a raw message held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`PartialImport`] with [`Error::HeaderParse`] if the header
    /// block is malformed, or the first error of the header stage
    /// ([`EmlImporter::import_headers`]) or body stage
    /// ([`EmlImporter::import_body`]). The body stage is skipped when the
    /// header stage fails.
    pub fn import_bytes(&self, data: &[u8]) -> std::result::Result<Msg, PartialImport> {
        let raw = RawMessage::parse(data)
            .map_err(|e| PartialImport::new(Msg::new(), Error::HeaderParse(e)))?;

        let mut msg = Msg::new();
        let outcome = self
            .import_headers(&raw.headers, &mut msg)
            .and_then(|()| self.import_body(&raw.headers, &raw.body, &mut msg));

        match outcome {
            Ok(()) => Ok(msg),
            Err(error) => {
                warn!(%error, "EML import stopped early");
                Err(PartialImport::new(msg, error))
            }
        }
    }

    /// Copies address headers, the date and the generic headers into `msg`.
    ///
    /// Empty headers count as absent. A missing `Date` is replaced by the
    /// clock's current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] for a malformed `From`/`To`/`Cc`/`Bcc`
    /// and [`Error::DateParse`] for a malformed `Date`. Fields set before the
    /// failure remain set.
    pub fn import_headers(&self, headers: &Headers, msg: &mut Msg) -> Result<()> {
        if let Some(from) = headers.get_non_empty(AddrHeader::From.as_str()) {
            msg.set_from(from)?;
        }

        for header in [AddrHeader::To, AddrHeader::Cc, AddrHeader::Bcc] {
            let Some(value) = headers.get_non_empty(header.as_str()) else {
                continue;
            };
            let list = mailpress_mime::parse_address_list(value)
                .map_err(|source| Error::AddressParse { header, source })?;
            let canonical: Vec<String> = list.iter().map(ToString::to_string).collect();
            msg.set_addr_header(header, &canonical)?;
        }

        match headers.get_non_empty(DATE) {
            Some(value) => {
                let date = mailpress_mime::parse_date(value).map_err(Error::DateParse)?;
                msg.set_date_with_value(date);
            }
            None => {
                debug!("no Date header, using current time");
                msg.set_date_with_value(self.clock.now().fixed_offset());
            }
        }

        for header in IMPORTED_HEADERS {
            if let Some(value) = headers.get_non_empty(header.as_str()) {
                msg.set_gen_header(header, value);
            }
        }

        Ok(())
    }

    /// Decodes `body` according to the declared content type and transfer
    /// encoding and stores it in `msg`.
    ///
    /// Only `text/plain` bodies with an identity, quoted-printable or base64
    /// transfer encoding are imported. Any other combination leaves the body
    /// unset without an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContentTypeParse`] if `Content-Type` is missing or
    /// malformed and [`Error::BodyDecode`] if the decoder rejects the body.
    pub fn import_body(&self, headers: &Headers, body: &[u8], msg: &mut Msg) -> Result<()> {
        let content_type = headers
            .get_non_empty(CONTENT_TYPE)
            .ok_or_else(|| mailpress_mime::Error::MissingHeader(CONTENT_TYPE.to_string()))
            .and_then(ContentType::parse)
            .map_err(Error::ContentTypeParse)?;

        if let Some(charset) = content_type.charset() {
            msg.set_charset(charset);
        }

        let encoding = headers
            .get_non_empty(CONTENT_TRANSFER_ENCODING)
            .map_or(Some(TransferEncoding::SevenBit), TransferEncoding::parse);
        let media_type = content_type.media_type();

        let selected = encoding
            .and_then(|enc| BodyDecoder::select(&media_type, enc).map(|dec| (dec, enc)));
        let Some((decoder, encoding)) = selected else {
            debug!(
                %media_type,
                ?encoding,
                "body not imported for this content type and encoding"
            );
            return Ok(());
        };

        msg.set_encoding(encoding);
        debug!(%media_type, %encoding, ?decoder, "decoding body");

        let decoded = decoder
            .decode(body)
            .map_err(|source| Error::BodyDecode { encoding, source })?;
        let text = String::from_utf8_lossy(&decoded).into_owned();
        msg.set_body_string(content_type, text);

        Ok(())
    }
}

/// Imports the `.eml` file at `path` with the system clock.
///
/// # Errors
///
/// See [`EmlImporter::import_file`].
pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Msg, PartialImport> {
    EmlImporter::new().import_file(path)
}

/// Imports a raw message from `reader` with the system clock.
///
/// # Errors
///
/// See [`EmlImporter::import_reader`].
pub fn from_reader(reader: impl Read) -> std::result::Result<Msg, PartialImport> {
    EmlImporter::new().import_reader(reader)
}

/// Imports a raw message held in memory with the system clock.
///
/// # Errors
///
/// See [`EmlImporter::import_bytes`].
pub fn from_bytes(data: &[u8]) -> std::result::Result<Msg, PartialImport> {
    EmlImporter::new().import_bytes(data)
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
    use crate::clock::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap()
    }

    fn importer() -> EmlImporter<FixedClock> {
        EmlImporter::with_clock(FixedClock::new(fixed_now()))
    }

    fn addresses(list: &[mailpress_mime::Mailbox]) -> Vec<&str> {
        list.iter().map(|m| m.address.as_str()).collect()
    }

    #[test]
    fn test_select_decoder_table() {
        use TransferEncoding::{Base64, Binary, EightBit, QuotedPrintable, SevenBit};

        for identity in [SevenBit, EightBit, Binary] {
            assert_eq!(
                BodyDecoder::select("text/plain", identity),
                Some(BodyDecoder::Verbatim)
            );
        }
        assert_eq!(
            BodyDecoder::select("text/plain", QuotedPrintable),
            Some(BodyDecoder::QuotedPrintable)
        );
        assert_eq!(
            BodyDecoder::select("text/plain", Base64),
            Some(BodyDecoder::Base64)
        );
        assert_eq!(BodyDecoder::select("text/html", Base64), None);
        assert_eq!(BodyDecoder::select("multipart/mixed", SevenBit), None);
    }

    #[test]
    fn test_import_quoted_printable() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "To: b@example.com, c@example.com\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Hello=20World"
        );

        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.get_from().unwrap().address.as_str(), "a@example.com");
        assert_eq!(
            addresses(msg.get_to()),
            vec!["b@example.com", "c@example.com"]
        );
        assert_eq!(msg.charset(), Some("utf-8"));
        assert_eq!(msg.encoding(), Some(TransferEncoding::QuotedPrintable));
        assert_eq!(msg.body().unwrap().content, "Hello World");
    }

    #[test]
    fn test_import_base64() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: BASE64\r\n",
            "\r\n",
            "SGVsbG8s\r\n",
            "IFdvcmxkIQ==\r\n"
        );

        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.encoding(), Some(TransferEncoding::Base64));
        assert_eq!(msg.body().unwrap().content, "Hello, World!");
        assert_eq!(msg.charset(), None);
    }

    #[test]
    fn test_import_plain_without_encoding() {
        let raw = "Content-Type: text/plain; charset=us-ascii\n\nline one\nline two\n";

        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.encoding(), Some(TransferEncoding::SevenBit));
        assert_eq!(msg.body().unwrap().content, "line one\nline two\n");
    }

    #[test]
    fn test_import_plain_8bit() {
        let raw = "Content-Type: text/plain\r\nContent-Transfer-Encoding: 8bit\r\n\r\nGrüße";

        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.encoding(), Some(TransferEncoding::EightBit));
        assert_eq!(msg.body().unwrap().content, "Grüße");
    }

    #[test]
    fn test_import_unsupported_combinations_are_ignored() {
        let html = "Content-Type: text/html\r\n\r\n<p>hi</p>";
        let msg = importer().import_bytes(html.as_bytes()).unwrap();
        assert!(msg.body().is_none());
        assert!(msg.encoding().is_none());

        let uu = "Content-Type: text/plain\r\nContent-Transfer-Encoding: x-uuencode\r\n\r\nbegin";
        let msg = importer().import_bytes(uu.as_bytes()).unwrap();
        assert!(msg.body().is_none());
    }

    #[test]
    fn test_import_charset_recorded_for_ignored_types() {
        let raw = "Content-Type: multipart/alternative; boundary=x; charset=iso-8859-1\r\n\r\n--x--";
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.charset(), Some("iso-8859-1"));
        assert!(msg.body().is_none());
    }

    #[test]
    fn test_import_missing_date_uses_clock() {
        let raw = "Content-Type: text/plain\r\n\r\nbody";
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.date(), Some(fixed_now().fixed_offset()));
    }

    #[test]
    fn test_import_date_keeps_offset() {
        let raw = "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\nContent-Type: text/plain\r\n\r\n";
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        let date = msg.date().unwrap();
        assert_eq!(date.offset().local_minus_utc(), 7200);
        assert_eq!(date.to_rfc2822(), "Tue, 1 Jul 2003 10:52:37 +0200");
    }

    #[test]
    fn test_import_date_with_wrong_weekday() {
        let raw = "Date: Mon, 1 Jul 2003 10:52:37 +0200\r\nContent-Type: text/plain\r\n\r\nx";
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(
            msg.date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:37 +0200"
        );
        assert_eq!(msg.body().unwrap().content, "x");
    }

    #[test]
    fn test_import_recipients_with_stray_commas() {
        let raw = concat!(
            "To: b@example.com, c@example.com,\r\n",
            "Cc: b@example.com,, c@example.com\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n"
        );
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(
            addresses(msg.get_to()),
            vec!["b@example.com", "c@example.com"]
        );
        assert_eq!(
            addresses(msg.get_cc()),
            vec!["b@example.com", "c@example.com"]
        );
    }

    #[test]
    fn test_import_encoded_display_name() {
        let raw = "From: =?utf-8?Q?J=C3=B6rg?= <jorg@example.com>\r\nContent-Type: text/plain\r\n\r\n";
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.get_from().unwrap().name.as_deref(), Some("Jörg"));
    }

    #[test]
    fn test_import_invalid_date() {
        let raw = "From: a@example.com\r\nDate: yesterday-ish\r\nContent-Type: text/plain\r\n\r\nbody";
        let (msg, error) = importer().import_bytes(raw.as_bytes()).unwrap_err().into_parts();
        assert!(matches!(error, Error::DateParse(_)));
        assert_eq!(msg.get_from().unwrap().address.as_str(), "a@example.com");
        assert!(msg.body().is_none());
    }

    #[test]
    fn test_import_missing_content_type_keeps_headers() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "To: b@example.com\r\n",
            "Subject: Partial\r\n",
            "\r\n",
            "body"
        );
        let (msg, error) = importer().import_bytes(raw.as_bytes()).unwrap_err().into_parts();
        assert!(matches!(
            error,
            Error::ContentTypeParse(mailpress_mime::Error::MissingHeader(_))
        ));
        assert_eq!(msg.get_from().unwrap().address.as_str(), "a@example.com");
        assert_eq!(addresses(msg.get_to()), vec!["b@example.com"]);
        assert_eq!(msg.get_gen_header(Header::Subject), Some("Partial"));
        assert!(msg.body().is_none());
    }

    #[test]
    fn test_import_malformed_content_type() {
        let raw = "Subject: x\r\nContent-Type: text\r\n\r\nbody";
        let err = importer().import_bytes(raw.as_bytes()).unwrap_err();
        assert!(matches!(err.error, Error::ContentTypeParse(_)));
        assert_eq!(err.message.get_gen_header(Header::ContentType), Some("text"));
    }

    #[test]
    fn test_import_invalid_from() {
        let raw = "From: a@example.com, b@example.com\r\nSubject: x\r\nContent-Type: text/plain\r\n\r\n";
        let (msg, error) = importer().import_bytes(raw.as_bytes()).unwrap_err().into_parts();
        assert!(matches!(
            error,
            Error::AddressParse {
                header: AddrHeader::From,
                ..
            }
        ));
        // Generic headers come after addresses and were never reached.
        assert!(msg.gen_headers().is_empty());
    }

    #[test]
    fn test_import_invalid_cc_keeps_to() {
        let raw = "To: b@example.com\r\nCc: nobody\r\nContent-Type: text/plain\r\n\r\n";
        let (msg, error) = importer().import_bytes(raw.as_bytes()).unwrap_err().into_parts();
        assert!(matches!(
            error,
            Error::AddressParse {
                header: AddrHeader::Cc,
                ..
            }
        ));
        assert_eq!(addresses(msg.get_to()), vec!["b@example.com"]);
        assert!(msg.get_cc().is_empty());
    }

    #[test]
    fn test_import_named_recipients() {
        let raw = concat!(
            "From: \"Doe, Jane\" <jane@example.com>\r\n",
            "Cc: Bob <bob@example.com>, undisclosed:;\r\n",
            "Bcc: <hidden@example.com>\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n"
        );
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.get_from().unwrap().name.as_deref(), Some("Doe, Jane"));
        assert_eq!(msg.get_cc()[0].name.as_deref(), Some("Bob"));
        assert_eq!(addresses(msg.get_bcc()), vec!["hidden@example.com"]);
    }

    #[test]
    fn test_import_copies_only_known_headers() {
        let raw = concat!(
            "Subject: Greetings\r\n",
            "Message-ID: <123@example.com>\r\n",
            "X-Mailer: mailpress\r\n",
            "X-MSMail-Priority: High\r\n",
            "List-Unsubscribe-Post: List-Unsubscribe=One-Click\r\n",
            "X-Custom: dropped\r\n",
            "Received: from somewhere\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n"
        );
        let msg = importer().import_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.get_gen_header(Header::Subject), Some("Greetings"));
        assert_eq!(
            msg.get_gen_header(Header::MessageId),
            Some("<123@example.com>")
        );
        assert_eq!(msg.get_gen_header(Header::XMailer), Some("mailpress"));
        assert_eq!(msg.get_gen_header(Header::XMsMailPriority), Some("High"));
        assert_eq!(
            msg.get_gen_header(Header::ListUnsubscribePost),
            Some("List-Unsubscribe=One-Click")
        );
        assert_eq!(
            msg.get_gen_header(Header::ContentType),
            Some("text/plain")
        );
        assert_eq!(msg.gen_headers().len(), 6);
    }

    #[test]
    fn test_import_bad_quoted_printable() {
        let raw = "Subject: x\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\nbad=ZZ";
        let (msg, error) = importer().import_bytes(raw.as_bytes()).unwrap_err().into_parts();
        assert!(matches!(
            error,
            Error::BodyDecode {
                encoding: TransferEncoding::QuotedPrintable,
                ..
            }
        ));
        assert_eq!(msg.encoding(), Some(TransferEncoding::QuotedPrintable));
        assert!(msg.body().is_none());
    }

    #[test]
    fn test_import_bad_base64() {
        let raw = "Content-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!notbase64";
        let err = importer().import_bytes(raw.as_bytes()).unwrap_err();
        assert!(matches!(err.error, Error::BodyDecode { .. }));
    }

    #[test]
    fn test_import_header_parse_failure() {
        let err = importer().import_bytes(b"garbage without colon\r\n\r\n").unwrap_err();
        assert!(matches!(err.error, Error::HeaderParse(_)));
        assert!(err.message.get_from().is_none());

        let err = importer().import_bytes(b"").unwrap_err();
        assert!(matches!(err.error, Error::HeaderParse(_)));
    }

    #[test]
    fn test_import_non_utf8_body_is_lossy() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\r\nContent-Transfer-Encoding: 8bit\r\n\r\ncaf\xe9";
        let msg = importer().import_bytes(raw).unwrap();
        assert_eq!(msg.body().unwrap().content, "caf\u{fffd}");
        assert_eq!(msg.charset(), Some("iso-8859-1"));
    }

    #[test]
    fn test_import_reader() {
        let raw = "Content-Type: text/plain\r\n\r\nfrom a reader";
        let msg = importer().import_reader(raw.as_bytes()).unwrap();
        assert_eq!(msg.body().unwrap().content, "from a reader");
    }

    #[test]
    fn test_import_missing_file() {
        let err = importer()
            .import_file("/nonexistent/dir/message.eml")
            .unwrap_err();
        assert!(matches!(err.error, Error::Open(_)));
        assert!(err.message.body().is_none());
    }
}
