//! RFC 5322 mailbox and address-list parsing.
//!
//! Covers the forms found in real `From`/`To`/`Cc`/`Bcc` headers:
//! bare `addr-spec`, `Name <addr>`, `"Quoted, Name" <addr>`, `<addr>`,
//! parenthesized comments and groups (`undisclosed-recipients:;`).
//! RFC 2047 encoded words in display names are decoded.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Characters that force a display name to be quoted.
const NAME_SPECIALS: &str = "()<>[]:;@\\,.\"";

/// An `addr-spec` (`local@domain`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates an address (structural checks only, no DNS).
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(Error::InvalidAddress(format!("Address must contain @: {addr}")));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Local and domain parts cannot be empty: {addr}"
            )));
        }

        let quoted_local = local.len() >= 2 && local.starts_with('"') && local.ends_with('"');
        if !quoted_local
            && (local.starts_with('.')
                || local.ends_with('.')
                || local.contains("..")
                || !local.chars().all(is_atext_or_dot))
        {
            return Err(Error::InvalidAddress(format!("Invalid local part: {addr}")));
        }

        let literal = domain.starts_with('[') && domain.ends_with(']');
        if !literal
            && (domain.starts_with('.')
                || domain.ends_with('.')
                || domain.contains("..")
                || !domain
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '.'))
        {
            return Err(Error::InvalidAddress(format!("Invalid domain: {addr}")));
        }

        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(name.into()),
            address: Address::new(address)?,
        })
    }

    /// Parses exactly one mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or holds more than one
    /// address.
    pub fn parse(s: &str) -> Result<Self> {
        let mut list = parse_address_list(s)?;
        if list.len() != 1 {
            return Err(Error::InvalidAddress(format!(
                "expected single address, found {}: {s}",
                list.len()
            )));
        }
        Ok(list.remove(0))
    }

    fn parse_entry(entry: &str) -> Result<Self> {
        let cleaned = strip_comments(entry);
        let cleaned = cleaned.trim();

        let Some((name, rest)) = split_outside_quotes(cleaned, '<') else {
            return Self::new(cleaned);
        };
        let (addr, trailing) = rest
            .split_once('>')
            .ok_or_else(|| Error::InvalidAddress(format!("unclosed angle bracket: {entry}")))?;
        if !trailing.trim().is_empty() {
            return Err(Error::InvalidAddress(format!(
                "unexpected text after address: {entry}"
            )));
        }

        let name = decode_rfc2047(&unquote_name(name.trim()));
        let address = Address::new(addr.trim())?;
        Ok(Self {
            name: (!name.is_empty()).then_some(name),
            address,
        })
    }
}

/// Renders the canonical form: `"Name" <addr>`, `Name <addr>` or `<addr>`.
impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref() {
            Some(name) if name.contains(|c: char| NAME_SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "<{}>", self.address),
        }
    }
}

/// Parses a comma-separated address list.
///
/// Group syntax is flattened: members of `Team: a@x.org, b@x.org;` are
/// returned as ordinary mailboxes and an empty group contributes nothing.
/// Empty members left by stray commas are skipped.
///
/// # Errors
///
/// Returns an error if any entry is malformed, quotes or brackets are
/// unbalanced, or the list contains no address and no group.
pub fn parse_address_list(s: &str) -> Result<Vec<Mailbox>> {
    let (entries, had_group) = split_list(s)?;
    if entries.is_empty() && !had_group {
        return Err(Error::InvalidAddress("no address".to_string()));
    }
    entries.into_iter().map(Mailbox::parse_entry).collect()
}

/// Splits an address list into mailbox entries, tracking quoting state.
fn split_list(s: &str) -> Result<(Vec<&str>, bool)> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment = 0usize;
    let mut angle = false;
    let mut literal = false;
    let mut in_group = false;
    let mut after_group = false;
    let mut had_group = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes || comment > 0 => escaped = true,
            '"' if comment == 0 => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' => comment += 1,
            ')' if comment > 0 => comment -= 1,
            _ if comment > 0 => {}
            '<' => angle = true,
            '>' => angle = false,
            '[' => literal = true,
            ']' => literal = false,
            _ if angle || literal => {}
            ':' if !in_group && !after_group => {
                in_group = true;
                had_group = true;
                start = i + 1;
            }
            ';' if in_group => {
                push_entry(&mut entries, &s[start..i]);
                in_group = false;
                after_group = true;
                start = i + 1;
            }
            ',' => {
                if after_group {
                    ensure_blank(&s[start..i])?;
                    after_group = false;
                } else {
                    push_entry(&mut entries, &s[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes || comment > 0 || angle || literal || in_group {
        return Err(Error::InvalidAddress(format!("unterminated address list: {s}")));
    }

    let tail = &s[start..];
    if after_group {
        ensure_blank(tail)?;
    } else {
        push_entry(&mut entries, tail);
    }

    Ok((entries, had_group))
}

/// Empty members (`a@x,, b@x` or a trailing comma) are obsolete syntax and
/// are skipped.
fn push_entry<'a>(entries: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        entries.push(piece);
    }
}

fn ensure_blank(s: &str) -> Result<()> {
    if s.trim().is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidAddress(format!(
            "unexpected text after group: {s}"
        )))
    }
}

/// Removes parenthesized comments that are not inside a quoted string.
fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for c in s.chars() {
        if escaped {
            escaped = false;
            if depth == 0 {
                out.push(c);
            }
            continue;
        }
        match c {
            '\\' if in_quotes || depth > 0 => {
                escaped = true;
                if depth == 0 {
                    out.push(c);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

/// Finds the first `delim` outside a quoted string.
fn split_outside_quotes(s: &str, delim: char) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == delim && !in_quotes => return Some((&s[..i], &s[i + c.len_utf8()..])),
            _ => {}
        }
    }
    None
}

/// Turns a display-name phrase into plain text.
fn unquote_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_quotes = false;
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            }
            c => out.push(c),
        }
    }
    out.trim_end().to_string()
}

const fn is_atext_or_dot(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
                | '.'
        )
        || !c.is_ascii()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn addrs(list: &[Mailbox]) -> Vec<&str> {
        list.iter().map(|m| m.address.as_str()).collect()
    }

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_empty_local() {
        assert!(Address::new("@example.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty_domain() {
        assert!(Address::new("user@").is_err());
    }

    #[test]
    fn test_invalid_address_spaces() {
        assert!(Address::new("us er@example.com").is_err());
        assert!(Address::new("user@exa mple.com").is_err());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address.as_str(), "john@example.com");
    }

    #[test]
    fn test_mailbox_parse_forms() {
        let m = Mailbox::parse("a@example.com").unwrap();
        assert_eq!(m, Mailbox::new("a@example.com").unwrap());

        let m = Mailbox::parse("<a@example.com>").unwrap();
        assert!(m.name.is_none());

        let m = Mailbox::parse("Alice Example <alice@example.com>").unwrap();
        assert_eq!(m.name.as_deref(), Some("Alice Example"));

        let m = Mailbox::parse("\"Doe, Jane\" <jane@example.com>").unwrap();
        assert_eq!(m.name.as_deref(), Some("Doe, Jane"));

        let m = Mailbox::parse("bob@example.com (Bob at work)").unwrap();
        assert_eq!(m.address.as_str(), "bob@example.com");
        assert!(m.name.is_none());
    }

    #[test]
    fn test_mailbox_parse_rejects_lists() {
        assert!(Mailbox::parse("a@example.com, b@example.com").is_err());
        assert!(Mailbox::parse("").is_err());
        assert!(Mailbox::parse("not an address").is_err());
    }

    #[test]
    fn test_mailbox_display() {
        let m = Mailbox::new("a@example.com").unwrap();
        assert_eq!(m.to_string(), "<a@example.com>");

        let m = Mailbox::with_name("Alice", "alice@example.com").unwrap();
        assert_eq!(m.to_string(), "Alice <alice@example.com>");

        let m = Mailbox::with_name("Doe, Jane", "jane@example.com").unwrap();
        assert_eq!(m.to_string(), "\"Doe, Jane\" <jane@example.com>");
    }

    #[test]
    fn test_display_parse_is_stable() {
        for input in ["x@example.com", "\"Q. \\\"Quote\\\" R\" <q@example.com>", "Plain Name <p@example.org>"] {
            let m = Mailbox::parse(input).unwrap();
            assert_eq!(Mailbox::parse(&m.to_string()).unwrap(), m);
        }
    }

    #[test]
    fn test_address_list() {
        let list = parse_address_list("b@example.com, c@example.com").unwrap();
        assert_eq!(addrs(&list), vec!["b@example.com", "c@example.com"]);

        let list =
            parse_address_list("\"Smith, J\" <j@example.com>, K <k@example.com>,l@example.com")
                .unwrap();
        assert_eq!(
            addrs(&list),
            vec!["j@example.com", "k@example.com", "l@example.com"]
        );
        assert_eq!(list[0].name.as_deref(), Some("Smith, J"));
    }

    #[test]
    fn test_address_list_groups() {
        let list = parse_address_list("undisclosed-recipients:;").unwrap();
        assert!(list.is_empty());

        let list = parse_address_list("Team: a@x.org, b@x.org;, c@y.org").unwrap();
        assert_eq!(addrs(&list), vec!["a@x.org", "b@x.org", "c@y.org"]);
    }

    #[test]
    fn test_encoded_display_name() {
        let mailbox = Mailbox::parse("=?utf-8?Q?J=C3=B6rg_M?= <jorg@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Jörg M"));
        assert_eq!(mailbox.to_string(), "Jörg M <jorg@example.com>");

        let mailbox = Mailbox::parse("=?utf-8?B?RG9lLCBKw7xyZ2Vu?= <j@example.com>").unwrap();
        assert_eq!(mailbox.to_string(), "\"Doe, Jürgen\" <j@example.com>");
        assert_eq!(Mailbox::parse(&mailbox.to_string()).unwrap(), mailbox);
    }

    #[test]
    fn test_address_list_skips_empty_members() {
        let list = parse_address_list("a@example.com,,b@example.com").unwrap();
        assert_eq!(addrs(&list), vec!["a@example.com", "b@example.com"]);

        let list = parse_address_list("b@example.com, c@example.com,").unwrap();
        assert_eq!(addrs(&list), vec!["b@example.com", "c@example.com"]);

        let list = parse_address_list(", a@example.com, ").unwrap();
        assert_eq!(addrs(&list), vec!["a@example.com"]);
    }

    #[test]
    fn test_address_list_errors() {
        assert!(parse_address_list("").is_err());
        assert!(parse_address_list(" , ,").is_err());
        assert!(parse_address_list("\"unterminated <a@example.com>").is_err());
        assert!(parse_address_list("Name <a@example.com").is_err());
        assert!(parse_address_list("a@example.com, broken").is_err());
    }
}
