//! Integration tests for EML import from disk.
//!
//! Messages are written to temporary `.eml` files and imported through the
//! public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use mailpress_compose::{AddrHeader, EmlImporter, Error, FixedClock, Header, eml};
use mailpress_mime::TransferEncoding;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_eml(content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".eml")
        .tempfile()
        .expect("create temp file");
    file.write_all(content).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

const NEWSLETTER: &str = "\
From: \"Mail Press\" <news@example.com>\r
To: reader@example.org\r
Cc: Editor <editor@example.com>, archive@example.com\r
Date: Fri, 8 Mar 2024 17:45:00 -0500\r
Subject: Weekly digest\r
Message-ID: <digest-42@example.com>\r
MIME-Version: 1.0\r
List-Unsubscribe: <mailto:unsubscribe@example.com>\r
X-Tracking: dropped\r
Content-Type: text/plain; charset=\"UTF-8\"\r
Content-Transfer-Encoding: quoted-printable\r
\r
This week in the digest: caf=C3=A9 openings and a very long line that has =\r
been soft wrapped.\r
";

#[test]
fn test_import_file_success() {
    init_tracing();
    let file = write_eml(NEWSLETTER.as_bytes());

    let msg = eml::from_file(file.path()).unwrap();

    let from = msg.get_from().unwrap();
    assert_eq!(from.name.as_deref(), Some("Mail Press"));
    assert_eq!(from.address.as_str(), "news@example.com");
    assert_eq!(msg.get_to().len(), 1);
    assert_eq!(msg.get_addr_header(AddrHeader::Cc).len(), 2);
    assert!(msg.get_bcc().is_empty());

    let date = msg.date().unwrap();
    assert_eq!(date.offset().local_minus_utc(), -5 * 3600);
    assert_eq!(
        date.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2024, 3, 8, 22, 45, 0).unwrap()
    );

    assert_eq!(msg.get_gen_header(Header::Subject), Some("Weekly digest"));
    assert_eq!(
        msg.get_gen_header(Header::ListUnsubscribe),
        Some("<mailto:unsubscribe@example.com>")
    );
    assert_eq!(msg.get_gen_header(Header::MimeVersion), Some("1.0"));
    assert!(
        !msg.gen_headers()
            .values()
            .any(|value| value.as_str() == "dropped")
    );

    assert_eq!(msg.charset(), Some("UTF-8"));
    assert_eq!(msg.encoding(), Some(TransferEncoding::QuotedPrintable));
    let body = msg.body().unwrap();
    assert_eq!(body.content_type.media_type(), "text/plain");
    assert_eq!(
        body.content,
        "This week in the digest: café openings and a very long line that has been soft wrapped.\r\n"
    );
}

#[test]
fn test_import_file_with_fixed_clock() {
    init_tracing();
    let file = write_eml(b"From: a@example.com\nContent-Type: text/plain\n\nundated\n");
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    let msg = EmlImporter::with_clock(FixedClock::new(at))
        .import_file(file.path())
        .unwrap();

    assert_eq!(msg.date(), Some(at.fixed_offset()));
    assert_eq!(msg.encoding(), Some(TransferEncoding::SevenBit));
    assert_eq!(msg.body().unwrap().content, "undated\n");
}

#[test]
fn test_import_missing_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.eml");

    let partial = eml::from_file(&path).unwrap_err();
    assert!(matches!(partial.error, Error::Open(_)));
    assert!(partial.message.get_from().is_none());
    assert!(partial.message.body().is_none());
}

#[test]
fn test_import_malformed_header_block() {
    init_tracing();
    let file = write_eml(b" leading continuation\r\nSubject: x\r\n\r\nbody");

    let partial = eml::from_file(file.path()).unwrap_err();
    assert!(matches!(partial.error, Error::HeaderParse(_)));
    assert!(partial.message.gen_headers().is_empty());
}

#[test]
fn test_import_partial_on_body_failure() {
    init_tracing();
    let file = write_eml(
        b"From: a@example.com\r\n\
          To: b@example.com\r\n\
          Subject: Broken attachment\r\n\
          Content-Type: text/plain; charset=utf-8\r\n\
          Content-Transfer-Encoding: base64\r\n\
          \r\n\
          ###\r\n",
    );

    let (msg, error) = eml::from_file(file.path()).unwrap_err().into_parts();
    assert!(matches!(
        error,
        Error::BodyDecode {
            encoding: TransferEncoding::Base64,
            ..
        }
    ));
    assert_eq!(msg.get_from().unwrap().address.as_str(), "a@example.com");
    assert_eq!(
        msg.get_gen_header(Header::Subject),
        Some("Broken attachment")
    );
    assert_eq!(msg.charset(), Some("utf-8"));
    assert_eq!(msg.encoding(), Some(TransferEncoding::Base64));
    assert!(msg.body().is_none());
}

#[test]
fn test_error_display_names_header() {
    let partial = eml::from_bytes(b"To: not an address\r\nContent-Type: text/plain\r\n\r\n").unwrap_err();
    assert_eq!(partial.to_string(), "failed to import EML message");
    assert!(
        partial
            .error
            .to_string()
            .starts_with("failed to parse \"To:\" header")
    );
}

#[test]
fn test_import_from_reader() {
    let msg = eml::from_reader(std::io::Cursor::new(NEWSLETTER)).unwrap();
    assert_eq!(msg.get_to()[0].address.as_str(), "reader@example.org");
}
