//! Message model filled in by composition code and by the EML importer.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use mailpress_mime::{ContentType, Mailbox, TransferEncoding};

use crate::error::{Error, Result};

/// Address headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrHeader {
    /// `From`.
    From,
    /// `To`.
    To,
    /// `Cc`.
    Cc,
    /// `Bcc`.
    Bcc,
}

impl AddrHeader {
    /// Returns the header name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::From => "From",
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
        }
    }
}

impl fmt::Display for AddrHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic (non-address) headers carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Header {
    ContentType,
    Importance,
    InReplyTo,
    ListUnsubscribe,
    ListUnsubscribePost,
    MessageId,
    MimeVersion,
    Organization,
    Precedence,
    Priority,
    References,
    Subject,
    UserAgent,
    XMailer,
    XMsMailPriority,
    XPriority,
}

impl Header {
    /// Returns the canonical header name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContentType => "Content-Type",
            Self::Importance => "Importance",
            Self::InReplyTo => "In-Reply-To",
            Self::ListUnsubscribe => "List-Unsubscribe",
            Self::ListUnsubscribePost => "List-Unsubscribe-Post",
            Self::MessageId => "Message-ID",
            Self::MimeVersion => "MIME-Version",
            Self::Organization => "Organization",
            Self::Precedence => "Precedence",
            Self::Priority => "Priority",
            Self::References => "References",
            Self::Subject => "Subject",
            Self::UserAgent => "User-Agent",
            Self::XMailer => "X-Mailer",
            Self::XMsMailPriority => "X-MSMail-Priority",
            Self::XPriority => "X-Priority",
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character set tag, e.g. `utf-8`. Stored as declared, not normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset(String);

impl Charset {
    /// Returns the charset name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Charset {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Charset {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Content type the body was declared with.
    pub content_type: ContentType,
    /// Decoded text.
    pub content: String,
}

/// A structured email message.
#[derive(Debug, Clone)]
pub struct Msg {
    addr_headers: HashMap<AddrHeader, Vec<Mailbox>>,
    gen_headers: HashMap<Header, String>,
    date: Option<DateTime<FixedOffset>>,
    charset: Option<Charset>,
    encoding: Option<TransferEncoding>,
    mime_version: String,
    body: Option<Body>,
}

impl Default for Msg {
    fn default() -> Self {
        Self {
            addr_headers: HashMap::new(),
            gen_headers: HashMap::new(),
            date: None,
            charset: None,
            encoding: None,
            mime_version: "1.0".to_string(),
            body: None,
        }
    }
}

impl Msg {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `From` mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] unless `addr` is exactly one mailbox.
    pub fn set_from(&mut self, addr: &str) -> Result<()> {
        self.set_addr_header(AddrHeader::From, [addr])
    }

    /// Sets the `To` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] if any entry is not a single mailbox.
    pub fn set_to<I, S>(&mut self, addrs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_addr_header(AddrHeader::To, addrs)
    }

    /// Sets the `Cc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] if any entry is not a single mailbox.
    pub fn set_cc<I, S>(&mut self, addrs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_addr_header(AddrHeader::Cc, addrs)
    }

    /// Sets the `Bcc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] if any entry is not a single mailbox.
    pub fn set_bcc<I, S>(&mut self, addrs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_addr_header(AddrHeader::Bcc, addrs)
    }

    /// Validates every entry and replaces the header's mailboxes.
    ///
    /// The header is left untouched if any entry fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] on the first invalid entry.
    pub fn set_addr_header<I, S>(&mut self, header: AddrHeader, addrs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mailboxes = addrs
            .into_iter()
            .map(|a| Mailbox::parse(a.as_ref()))
            .collect::<mailpress_mime::Result<Vec<_>>>()
            .map_err(|source| Error::AddressParse { header, source })?;
        self.addr_headers.insert(header, mailboxes);
        Ok(())
    }

    /// Sets a generic header, replacing any previous value.
    pub fn set_gen_header(&mut self, header: Header, value: impl Into<String>) {
        self.gen_headers.insert(header, value.into());
    }

    /// Stamps the message with the current time.
    pub fn set_date(&mut self) {
        self.set_date_with_value(Utc::now().fixed_offset());
    }

    /// Sets the message date.
    pub fn set_date_with_value(&mut self, date: DateTime<FixedOffset>) {
        self.date = Some(date);
    }

    /// Sets the body charset.
    pub fn set_charset(&mut self, charset: impl Into<Charset>) {
        self.charset = Some(charset.into());
    }

    /// Sets the body transfer encoding.
    pub fn set_encoding(&mut self, encoding: TransferEncoding) {
        self.encoding = Some(encoding);
    }

    /// Sets the body, replacing any previous one.
    pub fn set_body_string(&mut self, content_type: ContentType, content: impl Into<String>) {
        self.body = Some(Body {
            content_type,
            content: content.into(),
        });
    }

    /// Returns the `From` mailbox.
    #[must_use]
    pub fn get_from(&self) -> Option<&Mailbox> {
        self.get_addr_header(AddrHeader::From).first()
    }

    /// Returns the `To` mailboxes.
    #[must_use]
    pub fn get_to(&self) -> &[Mailbox] {
        self.get_addr_header(AddrHeader::To)
    }

    /// Returns the `Cc` mailboxes.
    #[must_use]
    pub fn get_cc(&self) -> &[Mailbox] {
        self.get_addr_header(AddrHeader::Cc)
    }

    /// Returns the `Bcc` mailboxes.
    #[must_use]
    pub fn get_bcc(&self) -> &[Mailbox] {
        self.get_addr_header(AddrHeader::Bcc)
    }

    /// Returns the mailboxes of an address header; empty if unset.
    #[must_use]
    pub fn get_addr_header(&self, header: AddrHeader) -> &[Mailbox] {
        self.addr_headers
            .get(&header)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns a generic header value.
    #[must_use]
    pub fn get_gen_header(&self, header: Header) -> Option<&str> {
        self.gen_headers.get(&header).map(String::as_str)
    }

    /// Returns all generic headers.
    #[must_use]
    pub const fn gen_headers(&self) -> &HashMap<Header, String> {
        &self.gen_headers
    }

    /// Returns the message date.
    #[must_use]
    pub const fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.date
    }

    /// Returns the body charset.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_ref().map(Charset::as_str)
    }

    /// Returns the body transfer encoding.
    #[must_use]
    pub const fn encoding(&self) -> Option<TransferEncoding> {
        self.encoding
    }

    /// Returns the MIME version.
    #[must_use]
    pub fn mime_version(&self) -> &str {
        &self.mime_version
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
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

    #[test]
    fn test_msg_new() {
        let msg = Msg::new();
        assert!(msg.get_from().is_none());
        assert!(msg.get_to().is_empty());
        assert!(msg.gen_headers().is_empty());
        assert!(msg.date().is_none());
        assert!(msg.body().is_none());
        assert_eq!(msg.mime_version(), "1.0");
    }

    #[test]
    fn test_set_from() {
        let mut msg = Msg::new();
        msg.set_from("Alice <alice@example.com>").unwrap();
        let from = msg.get_from().unwrap();
        assert_eq!(from.name.as_deref(), Some("Alice"));
        assert_eq!(from.address.as_str(), "alice@example.com");
    }

    #[test]
    fn test_set_from_rejects_list() {
        let mut msg = Msg::new();
        let err = msg.set_from("a@example.com, b@example.com").unwrap_err();
        assert!(matches!(
            err,
            Error::AddressParse {
                header: AddrHeader::From,
                ..
            }
        ));
        assert!(msg.get_from().is_none());
    }

    #[test]
    fn test_set_recipients() {
        let mut msg = Msg::new();
        msg.set_to(["<b@example.com>", "c@example.com"]).unwrap();
        msg.set_cc(vec![String::from("d@example.com")]).unwrap();
        msg.set_bcc(Vec::<String>::new()).unwrap();

        let to: Vec<&str> = msg.get_to().iter().map(|m| m.address.as_str()).collect();
        assert_eq!(to, vec!["b@example.com", "c@example.com"]);
        assert_eq!(msg.get_cc().len(), 1);
        assert!(msg.get_bcc().is_empty());
    }

    #[test]
    fn test_invalid_recipient_keeps_previous() {
        let mut msg = Msg::new();
        msg.set_to(["b@example.com"]).unwrap();
        assert!(msg.set_to(["c@example.com", "broken"]).is_err());
        assert_eq!(msg.get_to()[0].address.as_str(), "b@example.com");
    }

    #[test]
    fn test_gen_headers() {
        let mut msg = Msg::new();
        msg.set_gen_header(Header::Subject, "first");
        msg.set_gen_header(Header::Subject, "second");
        assert_eq!(msg.get_gen_header(Header::Subject), Some("second"));
        assert_eq!(msg.get_gen_header(Header::XMailer), None);
        assert_eq!(Header::XMsMailPriority.to_string(), "X-MSMail-Priority");
    }

    #[test]
    fn test_set_date() {
        let mut msg = Msg::new();
        let before = Utc::now();
        msg.set_date();
        assert!(msg.date().unwrap() >= before.fixed_offset());

        let fixed = DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        msg.set_date_with_value(fixed);
        assert_eq!(msg.date(), Some(fixed));
    }

    #[test]
    fn test_body_and_tags() {
        let mut msg = Msg::new();
        msg.set_charset("utf-8");
        msg.set_encoding(TransferEncoding::Base64);
        msg.set_body_string(ContentType::text_plain(), "hi");

        assert_eq!(msg.charset(), Some("utf-8"));
        assert_eq!(msg.encoding(), Some(TransferEncoding::Base64));
        assert_eq!(msg.body().unwrap().content, "hi");
    }
}
