//! Goal evaluation: compares a current value with a target.

use super::period::PeriodPhase;
use crate::config::GoalsConfig;
use crate::error::{Error, Result};
use crate::types::{GoalStatus, TargetType};

/// Ratios at which goals enter the warning band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum goals warn once `current / target` reaches this
    pub warning_ratio_minimum: f64,
    /// Open maximum goals fail outright above this
    pub warning_ratio_maximum: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_ratio_minimum: 0.8,
            warning_ratio_maximum: 1.2,
        }
    }
}

impl From<&GoalsConfig> for Thresholds {
    fn from(config: &GoalsConfig) -> Self {
        Self {
            warning_ratio_minimum: config.warning_ratio_minimum,
            warning_ratio_maximum: config.warning_ratio_maximum,
        }
    }
}

/// Outcome of evaluating one goal for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: GoalStatus,
    /// `round(current / target * 100)`, not clamped
    pub progress_percentage: i64,
}

/// Evaluate a goal.
///
/// `has_activity` tells whether any session was recorded in the period; an open
/// period without activity stays `pending`.
pub fn evaluate(
    goal_id: &str,
    current: f64,
    target: f64,
    target_type: TargetType,
    phase: PeriodPhase,
    has_activity: bool,
    thresholds: &Thresholds,
) -> Result<Evaluation> {
    if !target.is_finite() || target <= 0.0 {
        return Err(Error::definition(
            goal_id,
            format!("target value must be positive, got {}", target),
        ));
    }

    let ratio = current / target;
    let progress_percentage = (ratio * 100.0).round() as i64;

    let status = match phase {
        PeriodPhase::Upcoming => GoalStatus::Pending,
        PeriodPhase::Open if !has_activity => GoalStatus::Pending,
        _ => {
            let closed = phase == PeriodPhase::Closed;
            match target_type {
                TargetType::Minimum => {
                    if ratio >= 1.0 {
                        GoalStatus::Achieved
                    } else if closed {
                        GoalStatus::Failed
                    } else if ratio >= thresholds.warning_ratio_minimum {
                        GoalStatus::Warning
                    } else {
                        GoalStatus::InProgress
                    }
                }
                TargetType::Maximum => {
                    if closed {
                        if ratio <= 1.0 {
                            GoalStatus::Achieved
                        } else {
                            GoalStatus::Failed
                        }
                    } else if ratio <= 1.0 {
                        GoalStatus::InProgress
                    } else if ratio <= thresholds.warning_ratio_maximum {
                        GoalStatus::Warning
                    } else {
                        GoalStatus::Failed
                    }
                }
            }
        }
    };

    Ok(Evaluation {
        status,
        progress_percentage,
    })
}
