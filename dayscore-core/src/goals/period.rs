//! Evaluation periods: the day, week or month a goal is measured over.

use crate::clock::Clock;
use crate::types::Frequency;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};

/// Inclusive range of calendar days a goal is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Where a period sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodPhase {
    /// Starts after today
    Upcoming,
    /// Contains today; values can still change
    Open,
    /// Ended before today; the outcome is final
    Closed,
}

/// Half-open instant range `[start, end)` covering a period in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// The period of the given frequency that contains `date`.
    ///
    /// Weeks run Monday through Sunday.
    pub fn containing(frequency: Frequency, date: NaiveDate) -> Self {
        match frequency {
            Frequency::Daily => Period {
                start: date,
                end: date,
            },
            Frequency::Weekly => {
                let monday =
                    date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                Period {
                    start: monday,
                    end: monday + Duration::days(6),
                }
            }
            Frequency::Monthly => {
                let first = date - Duration::days(i64::from(date.day0()));
                let next_first = if date.month() == 12 {
                    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
                };
                Period {
                    start: first,
                    end: next_first.and_then(|d| d.pred_opt()).unwrap_or(date),
                }
            }
        }
    }

    /// Day the period's progress is keyed by: its last day.
    pub fn key(&self) -> NaiveDate {
        self.end
    }

    /// The period immediately before this one.
    pub fn previous(&self, frequency: Frequency) -> Option<Period> {
        self.start
            .pred_opt()
            .map(|day| Period::containing(frequency, day))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn phase(&self, today: NaiveDate) -> PeriodPhase {
        if today < self.start {
            PeriodPhase::Upcoming
        } else if today > self.end {
            PeriodPhase::Closed
        } else {
            PeriodPhase::Open
        }
    }

    /// Local-time instant range of the whole period.
    pub fn window(&self, clock: &dyn Clock) -> TimeWindow {
        let after_end = self
            .end
            .succ_opt()
            .unwrap_or(self.end);
        TimeWindow {
            start: clock.day_start(self.start),
            end: clock.day_start(after_end),
        }
    }
}

/// Local-time instant range of one calendar day.
pub fn day_window(clock: &dyn Clock, date: NaiveDate) -> TimeWindow {
    Period::containing(Frequency::Daily, date).window(clock)
}

/// `date` moved back `days` calendar days, saturating at the earliest representable date.
pub fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_period_runs_monday_to_sunday() {
        // 2025-03-12 is a Wednesday
        let period = Period::containing(Frequency::Weekly, day(2025, 3, 12));
        assert_eq!(period.start, day(2025, 3, 10));
        assert_eq!(period.end, day(2025, 3, 16));
        assert_eq!(period.key(), day(2025, 3, 16));

        // Sunday belongs to the week that started the previous Monday
        let sunday = Period::containing(Frequency::Weekly, day(2025, 3, 16));
        assert_eq!(sunday, period);
    }

    #[test]
    fn test_monthly_period_handles_year_end_and_leap_years() {
        let december = Period::containing(Frequency::Monthly, day(2024, 12, 15));
        assert_eq!(december.start, day(2024, 12, 1));
        assert_eq!(december.end, day(2024, 12, 31));

        let february = Period::containing(Frequency::Monthly, day(2024, 2, 10));
        assert_eq!(february.end, day(2024, 2, 29));

        let previous = february.previous(Frequency::Monthly).unwrap();
        assert_eq!(previous.start, day(2024, 1, 1));
        assert_eq!(previous.end, day(2024, 1, 31));
    }

    #[test]
    fn test_phase() {
        let period = Period::containing(Frequency::Daily, day(2025, 3, 10));
        assert_eq!(period.phase(day(2025, 3, 9)), PeriodPhase::Upcoming);
        assert_eq!(period.phase(day(2025, 3, 10)), PeriodPhase::Open);
        assert_eq!(period.phase(day(2025, 3, 11)), PeriodPhase::Closed);
    }

    #[test]
    fn test_window_covers_whole_days() {
        let clock = FixedClock::utc(Utc.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap());
        let window = Period::containing(Frequency::Weekly, day(2025, 3, 12)).window(&clock);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap());

        let today = day_window(&clock, day(2025, 3, 12));
        assert_eq!(today.end - today.start, Duration::days(1));
    }

    #[test]
    fn test_days_before_saturates() {
        assert_eq!(days_before(day(2025, 3, 10), 9), day(2025, 3, 1));
        assert_eq!(days_before(day(2025, 3, 10), 0), day(2025, 3, 10));
        assert_eq!(days_before(day(2025, 3, 10), u32::MAX), NaiveDate::MIN);
    }
}
