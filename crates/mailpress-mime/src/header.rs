//! RFC 5322 header block reading.

use crate::error::{Error, Result};

/// Header fields of a message, in the order they appeared.
///
/// Lookups are case-insensitive and return the first occurrence. Values keep
/// their original text with folded lines joined by a single space.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header block.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the value of the first field named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Headers::get`], but an empty value counts as absent.
    #[must_use]
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Number of fields, repeated names included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the block holds no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads a header block up to the first empty line.
    ///
    /// Lines starting with a space or tab continue the previous field. CRLF
    /// and bare LF line endings are both accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if a line has no colon, a field name is empty or
    /// contains whitespace, or the block starts with a continuation line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = headers.fields.last_mut() else {
                    return Err(Error::InvalidHeader(format!(
                        "continuation line without header: {line:?}"
                    )));
                };
                let folded = line.trim();
                if !value.is_empty() && !folded.is_empty() {
                    value.push(' ');
                }
                value.push_str(folded);
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::InvalidHeader(format!("missing colon: {line:?}")))?;
            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c.is_control()) {
                return Err(Error::InvalidHeader(format!("malformed name: {name:?}")));
            }
            headers.add(name, value.trim());
        }

        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive_first_wins() {
        let mut headers = Headers::new();
        assert!(headers.is_empty());

        headers.add("Received", "from a");
        headers.add("RECEIVED", "from b");
        assert_eq!(headers.get("received"), Some("from a"));
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Subject"), None);
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let headers = Headers::parse("Subject:\r\nCc:   \r\n").unwrap();
        assert_eq!(headers.get("Subject"), Some(""));
        assert_eq!(headers.get_non_empty("Subject"), None);
        assert_eq!(headers.get_non_empty("Cc"), None);
    }

    #[test]
    fn test_parse_stops_at_blank_line() {
        let text = concat!(
            "From: a@example.com\r\n",
            "Content-Type: text/plain;\r\n",
            "\tcharset=utf-8\r\n",
            "\r\n",
            "Looks-Like: a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(headers.get("Looks-Like"), None);
    }

    #[test]
    fn test_parse_folding_with_lf_endings() {
        let headers = Headers::parse("Subject: part one\n  part two\n\n").unwrap();
        assert_eq!(headers.get("subject"), Some("part one part two"));
    }

    #[test]
    fn test_value_may_contain_colons() {
        let headers = Headers::parse("Date: Tue, 1 Jul 2003 10:52:37 +0200\n").unwrap();
        assert_eq!(headers.get("Date"), Some("Tue, 1 Jul 2003 10:52:37 +0200"));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        for bad in [
            "no colon here\r\n",
            " leading continuation\r\n",
            "Bad Name: value\r\n",
            ": empty name\r\n",
        ] {
            assert!(
                matches!(Headers::parse(bad), Err(Error::InvalidHeader(_))),
                "{bad:?}"
            );
        }
    }
}
