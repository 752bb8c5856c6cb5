//! Wall-clock access for the goal engine.
//!
//! The only clock dependence in goal evaluation is "which calendar day is today"
//! and "when does a local calendar day begin". Both go through [`Clock`] so tests
//! and batch tools can pin them.

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone,
    Utc,
};

/// Source of "now" and of local day boundaries.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate;

    /// Instant at which the local calendar day `date` begins.
    fn day_start(&self, date: NaiveDate) -> DateTime<Utc>;
}

/// Clock backed by the system time and local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match Local.from_local_datetime(&midnight) {
            LocalResult::Single(t) => t.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Midnight skipped by a DST jump: the day starts at the first valid instant
            LocalResult::None => Local
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| midnight.and_utc()),
        }
    }
}

/// Clock pinned to one instant in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Pinned clock in UTC.
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.offset).date_naive()
    }

    fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        (midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today_respects_offset() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap();
        let utc = FixedClock::utc(now);
        assert_eq!(utc.today(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

        let plus_two = FixedClock::new(now, FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(plus_two.today(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
    }

    #[test]
    fn test_fixed_clock_day_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let clock = FixedClock::new(now, FixedOffset::east_opt(2 * 3600).unwrap());
        let start = clock.day_start(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 9, 22, 0, 0).unwrap());
    }
}
