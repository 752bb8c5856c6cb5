//! Formatting helpers for goal progress output.

use crate::types::{GoalProgress, GoalStatus, TargetType, TargetUnit};

/// Format a value in a goal's unit (e.g., "1.5h", "45m", "3 sessions").
pub fn format_value(value: f64, unit: TargetUnit) -> String {
    match unit {
        TargetUnit::Score => format!("{}", value.round() as i64),
        TargetUnit::Minutes => format_minutes(value),
        TargetUnit::Hours => {
            if value.fract() == 0.0 {
                format!("{}h", value as i64)
            } else {
                let number = format!("{:.2}", value);
                format!("{}h", number.trim_end_matches('0').trim_end_matches('.'))
            }
        }
        TargetUnit::Sessions => {
            let count = value.round() as i64;
            if count == 1 {
                "1 session".to_string()
            } else {
                format!("{} sessions", count)
            }
        }
    }
}

/// Format minutes as "2h 05m" or "45m".
fn format_minutes(minutes: f64) -> String {
    let total = minutes.round() as i64;
    if total >= 60 {
        format!("{}h {:02}m", total / 60, total % 60)
    } else {
        format!("{}m", total)
    }
}

/// Short label for a status.
pub fn status_label(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Pending => "pending",
        GoalStatus::InProgress => "in progress",
        GoalStatus::Warning => "warning",
        GoalStatus::Achieved => "achieved",
        GoalStatus::Failed => "failed",
    }
}

/// Single-character marker for a status.
pub fn status_marker(status: GoalStatus) -> char {
    match status {
        GoalStatus::Pending => '·',
        GoalStatus::InProgress => '…',
        GoalStatus::Warning => '!',
        GoalStatus::Achieved => '✓',
        GoalStatus::Failed => '✗',
    }
}

/// One-line summary of a goal's progress: "1.5h / ≤ 2h (75%)".
pub fn format_progress(progress: &GoalProgress) -> String {
    let bound = match progress.target_type {
        TargetType::Minimum => "≥",
        TargetType::Maximum => "≤",
    };
    format!(
        "{} / {} {} ({}%)",
        format_value(progress.current_value, progress.target_unit),
        bound,
        format_value(progress.target_value, progress.target_unit),
        progress.progress_percentage
    )
}

/// Heatmap cell for a level 0-5.
pub fn heatmap_cell(level: u8) -> char {
    match level {
        0 => ' ',
        1 => '░',
        2 | 3 => '▒',
        4 => '▓',
        _ => '█',
    }
}
