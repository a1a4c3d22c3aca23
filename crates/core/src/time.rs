use chrono::{DateTime, Duration, Utc};

/// Where review timestamps come from.
///
/// Services and repositories hold a `Clock` instead of calling `Utc::now()`, so a
/// test can pin every rating and session boundary to one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// Always reports the same instant until advanced.
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match *self {
            Self::System => Utc::now(),
            Self::Fixed(at) => at,
        }
    }

    /// Step a fixed clock forward; the system clock ignores this.
    pub fn advance(&mut self, by: Duration) {
        if let Self::Fixed(at) = self {
            *at += by;
        }
    }
}

/// Seconds since the epoch behind `fixed_now` (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// A stable instant for tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(FIXED_TEST_TIMESTAMP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_now_matches_timestamp() {
        assert_eq!(fixed_now().timestamp(), FIXED_TEST_TIMESTAMP);
    }

    #[test]
    fn only_fixed_clock_moves_on_advance() {
        let mut pinned = Clock::fixed(fixed_now());
        pinned.advance(Duration::minutes(5));
        assert_eq!(pinned.now(), fixed_now() + Duration::minutes(5));

        let mut system = Clock::system();
        system.advance(Duration::days(1));
        assert_eq!(system, Clock::System);
    }
}
