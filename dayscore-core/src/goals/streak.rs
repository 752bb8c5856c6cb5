//! Streaks and success-rate history.

use super::period::{days_before, Period};
use crate::error::Result;
use crate::types::{ActiveDays, DaySuccess, Frequency, GoalProgress, GoalStatus, SummaryStats};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Count consecutive achieved periods ending at the period containing `end`.
///
/// Walks backward one period at a time. For daily goals, weekdays outside
/// `active_days` are skipped without breaking the streak. The walk stops at the
/// first period whose status is missing or not `achieved`. Only periods ending
/// within the `lookback_days` days up to and including `end` are counted.
///
/// `status_of` receives period keys (the last day of each period).
pub fn streak_ending_at<F>(
    end: NaiveDate,
    frequency: Frequency,
    active_days: Option<ActiveDays>,
    lookback_days: u32,
    mut status_of: F,
) -> Result<u32>
where
    F: FnMut(NaiveDate) -> Result<Option<GoalStatus>>,
{
    let limit = days_before(end, lookback_days);
    let mut period = Period::containing(frequency, end);
    let mut streak = 0u32;

    while period.end > limit {
        let key = period.key();
        let skipped = frequency == Frequency::Daily
            && active_days.is_some_and(|days| !days.contains(key.weekday()));

        if !skipped {
            match status_of(key)? {
                Some(GoalStatus::Achieved) => streak += 1,
                _ => break,
            }
        }

        match period.previous(frequency) {
            Some(previous) => period = previous,
            None => break,
        }
    }

    Ok(streak)
}

/// `round(achieved / total * 100)`, `None` when nothing was due.
pub fn success_rate(achieved: u32, total: u32) -> Option<u32> {
    if total == 0 {
        None
    } else {
        Some((f64::from(achieved) / f64::from(total) * 100.0).round() as u32)
    }
}

/// Heatmap bucket for a day: 0 without goals, 1-4 by quartile, 5 when every goal was met.
pub fn heatmap_level(success_rate: Option<u32>) -> u8 {
    match success_rate {
        None => 0,
        Some(rate) if rate >= 100 => 5,
        Some(rate) if rate >= 75 => 4,
        Some(rate) if rate >= 50 => 3,
        Some(rate) if rate >= 25 => 2,
        Some(_) => 1,
    }
}

/// Achieved/total tally for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTally {
    pub achieved: u32,
    pub total: u32,
}

impl DayTally {
    pub fn record(&mut self, status: GoalStatus) {
        self.total += 1;
        if status == GoalStatus::Achieved {
            self.achieved += 1;
        }
    }
}

/// One record per calendar day in `[from, to]`, empty days included.
pub fn success_series(
    tallies: &BTreeMap<NaiveDate, DayTally>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DaySuccess> {
    from.iter_days()
        .take_while(|date| *date <= to)
        .map(|date| {
            let tally = tallies.get(&date).copied().unwrap_or_default();
            let rate = success_rate(tally.achieved, tally.total);
            DaySuccess {
                date,
                achieved: tally.achieved,
                total: tally.total,
                success_rate: rate,
                level: heatmap_level(rate),
            }
        })
        .collect()
}

/// Summary statistics over the goals reported for a date.
///
/// `day_streak` is the longest streak among them.
pub fn summarize(goals: &[GoalProgress]) -> SummaryStats {
    let active_goals = goals.len() as u32;
    let achieved_today = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Achieved)
        .count() as u32;
    let day_streak = goals.iter().map(|g| g.streak_days).max().unwrap_or(0);

    SummaryStats {
        active_goals,
        achieved_today,
        day_streak,
        success_rate: success_rate(achieved_today, active_goals).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lookup(
        statuses: &HashMap<NaiveDate, GoalStatus>,
    ) -> impl FnMut(NaiveDate) -> Result<Option<GoalStatus>> + '_ {
        move |date| Ok(statuses.get(&date).copied())
    }

    #[test]
    fn test_streak_sequence() {
        // [T, T, F, T, T, T] from March 1st to March 6th
        let pattern = [true, true, false, true, true, true];
        let statuses: HashMap<_, _> = pattern
            .iter()
            .enumerate()
            .map(|(i, achieved)| {
                let status = if *achieved {
                    GoalStatus::Achieved
                } else {
                    GoalStatus::Failed
                };
                (day(2025, 3, 1 + i as u32), status)
            })
            .collect();

        let at = |d| streak_ending_at(d, Frequency::Daily, None, 365, lookup(&statuses)).unwrap();
        assert_eq!(at(day(2025, 3, 6)), 3);
        assert_eq!(at(day(2025, 3, 4)), 1);
        assert_eq!(at(day(2025, 3, 3)), 0);
        assert_eq!(at(day(2025, 3, 2)), 2);
    }

    #[test]
    fn test_weekday_streak_skips_weekend() {
        // Wed 2025-03-05 .. Tue 2025-03-11, weekend unrecorded
        let statuses: HashMap<_, _> = [5, 6, 7, 10, 11]
            .iter()
            .map(|d| (day(2025, 3, *d), GoalStatus::Achieved))
            .collect();

        let streak = streak_ending_at(
            day(2025, 3, 11),
            Frequency::Daily,
            Some(ActiveDays::WEEKDAYS),
            365,
            lookup(&statuses),
        )
        .unwrap();
        assert_eq!(streak, 5);

        // Without the weekday filter the missing Sunday breaks it
        let streak =
            streak_ending_at(day(2025, 3, 11), Frequency::Daily, None, 365, lookup(&statuses))
                .unwrap();
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_weekly_streak_walks_week_keys() {
        // Weeks ending Sundays 2025-03-02, 03-09, 03-16
        let statuses: HashMap<_, _> = [2, 9, 16]
            .iter()
            .map(|d| (day(2025, 3, *d), GoalStatus::Achieved))
            .collect();

        let streak = streak_ending_at(
            day(2025, 3, 12),
            Frequency::Weekly,
            None,
            365,
            lookup(&statuses),
        )
        .unwrap();
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_streak_bounded_by_lookback() {
        let statuses: HashMap<_, _> = (1..=30)
            .map(|d| (day(2025, 4, d), GoalStatus::Achieved))
            .collect();
        let streak =
            streak_ending_at(day(2025, 4, 30), Frequency::Daily, None, 9, lookup(&statuses))
                .unwrap();
        assert_eq!(streak, 9);

        let streak =
            streak_ending_at(day(2025, 4, 30), Frequency::Daily, None, 1, lookup(&statuses))
                .unwrap();
        assert_eq!(streak, 1);
    }

    #[test]
    fn test_huge_lookback_near_earliest_date() {
        let end = NaiveDate::MIN + chrono::Duration::days(2);
        let streak = streak_ending_at(end, Frequency::Daily, None, u32::MAX, |_| {
            Ok(Some(GoalStatus::Achieved))
        })
        .unwrap();
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_heatmap_levels() {
        assert_eq!(heatmap_level(None), 0);
        assert_eq!(heatmap_level(Some(0)), 1);
        assert_eq!(heatmap_level(Some(24)), 1);
        assert_eq!(heatmap_level(Some(25)), 2);
        assert_eq!(heatmap_level(Some(50)), 3);
        assert_eq!(heatmap_level(Some(99)), 4);
        assert_eq!(heatmap_level(Some(100)), 5);
    }

    #[test]
    fn test_success_series_includes_empty_days() {
        let mut tallies = BTreeMap::new();
        let mut tally = DayTally::default();
        tally.record(GoalStatus::Achieved);
        tally.record(GoalStatus::Failed);
        tally.record(GoalStatus::Achieved);
        tallies.insert(day(2025, 3, 2), tally);

        let series = success_series(&tallies, day(2025, 3, 1), day(2025, 3, 3));
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].success_rate, None);
        assert_eq!(series[0].level, 0);
        assert_eq!(series[1].achieved, 2);
        assert_eq!(series[1].total, 3);
        assert_eq!(series[1].success_rate, Some(67));
        assert_eq!(series[1].level, 3);
    }

    #[test]
    fn test_summarize_uses_longest_streak() {
        let make = |status, streak_days| GoalProgress {
            goal_id: "g".to_string(),
            goal_name: "Goal".to_string(),
            date: day(2025, 3, 10),
            period_start: day(2025, 3, 10),
            period_end: day(2025, 3, 10),
            current_value: 0.0,
            target_value: 1.0,
            target_unit: crate::types::TargetUnit::Sessions,
            target_type: crate::types::TargetType::Minimum,
            progress_percentage: 0,
            status,
            streak_days,
            source: crate::types::ProgressSource::Live,
            error: None,
        };
        let stats = summarize(&[
            make(GoalStatus::Achieved, 4),
            make(GoalStatus::Achieved, 9),
            make(GoalStatus::InProgress, 0),
        ]);
        assert_eq!(stats.active_goals, 3);
        assert_eq!(stats.achieved_today, 2);
        assert_eq!(stats.day_streak, 9);
        assert_eq!(stats.success_rate, 67);

        assert_eq!(summarize(&[]), SummaryStats::default());
    }
}
