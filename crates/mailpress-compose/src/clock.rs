//! Wall-clock abstraction for testability.
//!
//! The importer stamps messages without a `Date` header with the current
//! time. Going through [`Clock`] lets tests pin that time.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use mailpress_compose::clock::{Clock, FixedClock};
//!
//! let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//! assert_eq!(FixedClock::new(at).now(), at);
//! ```

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Creates a clock stopped at `at`.
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_clock_by_reference() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = FixedClock::new(at);
        let by_ref: &dyn Clock = &clock;
        assert_eq!(by_ref.now(), at);
    }
}
