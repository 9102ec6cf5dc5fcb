//! Time source used by the scheduler and the storage queries.
//!
//! Nothing in the crate reads the wall clock directly: every operation takes a
//! `&dyn Clock`, so tests can pin "now" and the desktop client can simulate
//! later days.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wall-clock time shifted forward by a whole number of days.
///
/// Used by the desktop client's "Next Day" button so a user can watch cards
/// come due without waiting.
#[derive(Debug, Default)]
pub struct OffsetClock {
    days: AtomicI64,
}

impl OffsetClock {
    pub fn new(days: i64) -> Self {
        Self {
            days: AtomicI64::new(days),
        }
    }

    pub fn days(&self) -> i64 {
        self.days.load(Ordering::Relaxed)
    }

    pub fn set_days(&self, days: i64) {
        self.days.store(days, Ordering::Relaxed);
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.days())
    }
}

/// Inclusive bounds of the calendar day containing an instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBounds {
    /// Calendar day of `now` as seen from `offset`. `end` is the last
    /// millisecond of that day.
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local_midnight = now
            .with_timezone(&offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let start = (local_midnight - Duration::seconds(offset.local_minus_utc() as i64)).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::days(3));
        assert_eq!(clock.now(), start + Duration::days(3));
    }

    #[test]
    fn test_day_bounds_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap();
        let bounds = DayBounds::containing(now, FixedOffset::east_opt(0).unwrap());

        assert_eq!(bounds.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(
            bounds.end,
            Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert!(bounds.contains(now));
        assert!(!bounds.contains(bounds.end + Duration::milliseconds(1)));
    }

    #[test]
    fn test_day_bounds_with_offset() {
        // 23:30 UTC is already the next day at UTC+2
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let bounds = DayBounds::containing(now, FixedOffset::east_opt(2 * 3600).unwrap());

        assert_eq!(bounds.start, Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap());
        assert!(bounds.contains(now));
    }

    #[test]
    fn test_offset_clock_shifts_days() {
        let clock = OffsetClock::new(0);
        clock.set_days(2);
        let shifted = clock.now();
        let diff = shifted - Utc::now();
        assert!(diff > Duration::days(2) - Duration::seconds(5));
        assert!(diff <= Duration::days(2));
    }
}
