//! Metric aggregation: reduces a period's sessions to a goal's current value.
//!
//! Every measurement works on session durations clipped to the evaluation
//! window, so a session that straddles midnight contributes to both days.

use super::period::TimeWindow;
use crate::types::{GoalKind, ProductivityLevel, TargetUnit, UsageSession};

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// A session paired with its resolved productivity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSession {
    pub session: UsageSession,
    pub level: ProductivityLevel,
}

/// Aggregation knobs that come from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationSettings {
    /// Weight of neutral time in the productivity score
    pub neutral_weight: f64,
    /// Session length counted by work-session goals without their own minimum
    pub default_min_session_minutes: u32,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            neutral_weight: 0.0,
            default_min_session_minutes: 25,
        }
    }
}

/// Current value of a goal over `window`, expressed in `unit`.
pub fn current_value(
    kind: &GoalKind,
    unit: TargetUnit,
    sessions: &[ClassifiedSession],
    window: &TimeWindow,
    settings: &AggregationSettings,
) -> f64 {
    let clipped = |s: &ClassifiedSession| s.session.overlap_ms(window.start, window.end);

    match kind {
        GoalKind::ProductivityScore => {
            productivity_score(sessions, window, settings.neutral_weight)
        }
        GoalKind::ProductivityTime { level } => {
            let ms: i64 = sessions
                .iter()
                .filter(|s| s.level == *level)
                .map(clipped)
                .sum();
            convert_duration(ms, unit)
        }
        GoalKind::WorkSessions {
            min_session_minutes,
        } => {
            let minimum_ms = i64::from(
                min_session_minutes.unwrap_or(settings.default_min_session_minutes),
            ) * 60_000;
            sessions
                .iter()
                .map(clipped)
                .filter(|ms| *ms >= minimum_ms)
                .count() as f64
        }
        GoalKind::App { app_id } => {
            let ms: i64 = sessions
                .iter()
                .filter(|s| s.session.app_id == *app_id)
                .map(clipped)
                .sum();
            convert_duration(ms, unit)
        }
        GoalKind::Category { category } => {
            let ms: i64 = sessions
                .iter()
                .filter(|s| s.session.category == *category)
                .map(clipped)
                .sum();
            convert_duration(ms, unit)
        }
    }
}

/// `round((productive + w * neutral) / total * 100)`, 0 for an empty window.
fn productivity_score(
    sessions: &[ClassifiedSession],
    window: &TimeWindow,
    neutral_weight: f64,
) -> f64 {
    let mut productive_ms = 0i64;
    let mut neutral_ms = 0i64;
    let mut total_ms = 0i64;

    for s in sessions {
        let ms = s.session.overlap_ms(window.start, window.end);
        total_ms += ms;
        match s.level {
            ProductivityLevel::Productive => productive_ms += ms,
            ProductivityLevel::Neutral => neutral_ms += ms,
            ProductivityLevel::Unproductive => {}
        }
    }

    if total_ms == 0 {
        return 0.0;
    }
    let weighted = productive_ms as f64 + neutral_weight * neutral_ms as f64;
    (weighted / total_ms as f64 * 100.0).round()
}

/// Convert milliseconds to a time unit: whole minutes, or hours to two decimals.
///
/// Non-time units fall back to whole minutes.
pub fn convert_duration(ms: i64, unit: TargetUnit) -> f64 {
    match unit {
        TargetUnit::Hours => (ms as f64 / MS_PER_HOUR * 100.0).round() / 100.0,
        _ => (ms as f64 / MS_PER_MINUTE).round(),
    }
}

/// Whether any session time falls inside the window.
pub fn has_activity(sessions: &[ClassifiedSession], window: &TimeWindow) -> bool {
    sessions
        .iter()
        .any(|s| s.session.overlap_ms(window.start, window.end) > 0)
}
