//! RFC 5322 `Date` header parsing.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parses an RFC 5322 date-time, keeping the original UTC offset.
///
/// A trailing comment such as `(UTC)` or `(PST)` is ignored and runs of
/// folding whitespace are collapsed before parsing. A leading day name must
/// be a valid weekday abbreviation but is not checked against the date.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if the value is not a valid date-time.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let mut trimmed = value.trim();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            trimmed = trimmed[..open].trim_end();
        }
    }
    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    DateTime::parse_from_rfc2822(strip_weekday(&normalized)).map_err(|source| Error::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Drops a `Day,` prefix naming a known weekday; anything else is left for
/// the parser to reject.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest)) if WEEKDAYS.iter().any(|d| d.eq_ignore_ascii_case(day.trim())) => {
            rest.trim_start()
        }
        _ => value,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date.year(), 2003);
        assert_eq!(date.month(), 7);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_parse_date_without_weekday() {
        let date = parse_date("1 Jul 2003 10:52:37 +0000").unwrap();
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_parse_date_ignores_mismatched_weekday() {
        // 1 Jul 2003 was a Tuesday.
        let date = parse_date("Mon, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date, parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap());
        assert_eq!(date.day(), 1);
        assert_eq!(date.offset().local_minus_utc(), 2 * 3600);

        let date = parse_date("sun,  01 Jul 2003 10:52:37 +0000").unwrap();
        assert_eq!(date.month(), 7);
    }

    #[test]
    fn test_parse_date_rejects_unknown_day_name() {
        assert!(matches!(
            parse_date("Xyz, 1 Jul 2003 10:52:37 +0200"),
            Err(Error::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_date_with_comment() {
        let date = parse_date("Mon, 02 Jan 2006 15:04:05 -0700 (MST)").unwrap();
        assert_eq!(date.offset().local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn test_parse_date_folded() {
        let date = parse_date("Mon, 02 Jan 2006\r\n  15:04:05 +0000").unwrap();
        assert_eq!(date.minute(), 4);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(matches!(
            parse_date("not a date"),
            Err(Error::InvalidDate { .. })
        ));
        assert!(parse_date("").is_err());
    }
}
