// src/clock.rs
//! Wall-clock access in the device's local offset

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

/// Source of "now". Local dates are taken from the returned offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn local_date(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// `YYYY-MM-DD` for a local date.
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
pub(crate) use manual::ManualClock;


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_local_date_uses_offset() {
        // 2024-01-01 23:30 UTC is already Jan 2 at UTC+7
        let clock = ManualClock::at("2024-01-02T06:30:00+07:00").unwrap();
        assert_eq!(date_string(clock.local_date()), "2024-01-02");
        assert_eq!(clock.now_utc().format("%Y-%m-%d").to_string(), "2024-01-01");
    }

    #[test]
    fn test_advance() {
        let clock = ManualClock::at("2024-01-01T23:59:00+00:00").unwrap();
        clock.advance(Duration::minutes(2));
        assert_eq!(date_string(clock.local_date()), "2024-01-02");
    }
}
