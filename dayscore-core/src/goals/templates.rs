//! Built-in goal templates.

use crate::error::{Error, Result};
use crate::types::{
    ActiveDays, Frequency, GoalKind, NewGoal, ProductivityLevel, TargetType, TargetUnit,
};
use std::collections::BTreeMap;
use ProductivityLevel::{Productive, Unproductive};
use TemplateMeasure::{ProductivityScore, ProductivityTime, WorkSessions};

/// What a template measures. Templates never reference a specific app or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMeasure {
    ProductivityScore,
    ProductivityTime(ProductivityLevel),
    /// Minimum qualifying session length in minutes
    WorkSessions(u32),
}

impl TemplateMeasure {
    fn kind(&self) -> GoalKind {
        match self {
            TemplateMeasure::ProductivityScore => GoalKind::ProductivityScore,
            TemplateMeasure::ProductivityTime(level) => {
                GoalKind::ProductivityTime { level: *level }
            }
            TemplateMeasure::WorkSessions(minutes) => GoalKind::WorkSessions {
                min_session_minutes: Some(*minutes),
            },
        }
    }
}

/// A ready-made goal.
#[derive(Debug, Clone)]
pub struct GoalTemplate {
    pub id: &'static str,
    /// Catalogue grouping, e.g. "Focus"
    pub group: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub measure: TemplateMeasure,
    pub target_value: f64,
    pub target_unit: TargetUnit,
    pub target_type: TargetType,
    pub frequency: Frequency,
}

/// Caller-supplied changes applied on top of a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub target_value: Option<f64>,
    /// Productivity level for time templates
    pub reference: Option<String>,
    pub min_session_minutes: Option<u32>,
    pub frequency: Option<Frequency>,
    pub active_days: Option<ActiveDays>,
}

const TEMPLATES: &[GoalTemplate] = &[
    GoalTemplate {
        id: "daily-productivity-70",
        group: "Productivity",
        name: "Daily Productivity Target",
        description: "Achieve a productivity score of 70 or higher each day",
        icon: "🎯",
        measure: ProductivityScore,
        target_value: 70.0,
        target_unit: TargetUnit::Score,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "weekly-productivity-75",
        group: "Productivity",
        name: "Weekly Productivity Goal",
        description: "Maintain a productivity score of 75 over the week",
        icon: "📊",
        measure: ProductivityScore,
        target_value: 75.0,
        target_unit: TargetUnit::Score,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "monthly-productivity-80",
        group: "Productivity",
        name: "Monthly Excellence",
        description: "Maintain a productivity score of 80 over the month",
        icon: "🏆",
        measure: ProductivityScore,
        target_value: 80.0,
        target_unit: TargetUnit::Score,
        target_type: TargetType::Minimum,
        frequency: Frequency::Monthly,
    },
    GoalTemplate {
        id: "daily-focus-4h",
        group: "Focus",
        name: "Daily Focus Time",
        description: "Spend at least 4 hours on productive tasks each day",
        icon: "⏱️",
        measure: ProductivityTime(Productive),
        target_value: 240.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-limit-distractions-2h",
        group: "Focus",
        name: "Limit Distractions",
        description: "Keep unproductive time under 2 hours per day",
        icon: "🚫",
        measure: ProductivityTime(Unproductive),
        target_value: 120.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Maximum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "weekly-focus-20h",
        group: "Focus",
        name: "Weekly Focus Target",
        description: "Accumulate at least 20 hours of focused work this week",
        icon: "🎯",
        measure: ProductivityTime(Productive),
        target_value: 1200.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "weekly-limit-distractions-10h",
        group: "Focus",
        name: "Weekly Distraction Limit",
        description: "Keep unproductive time under 10 hours for the week",
        icon: "⏱️",
        measure: ProductivityTime(Unproductive),
        target_value: 600.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Maximum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "monthly-focus-80h",
        group: "Focus",
        name: "Monthly Focus Marathon",
        description: "Achieve 80 hours of focused work this month",
        icon: "🎖️",
        measure: ProductivityTime(Productive),
        target_value: 4800.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Monthly,
    },
    GoalTemplate {
        id: "daily-deep-work-3",
        group: "Deep Work",
        name: "Daily Deep Work Sessions",
        description: "Complete 3 deep work sessions (25+ minutes) each day",
        icon: "🧠",
        measure: WorkSessions(25),
        target_value: 3.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-pomodoro-8",
        group: "Deep Work",
        name: "Pomodoro Sessions",
        description: "Complete 8 Pomodoro sessions (25 minutes each)",
        icon: "🍅",
        measure: WorkSessions(25),
        target_value: 8.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "weekly-deep-work-15",
        group: "Deep Work",
        name: "Weekly Deep Work Goal",
        description: "Complete 15 deep work sessions throughout the week",
        icon: "💪",
        measure: WorkSessions(25),
        target_value: 15.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "monthly-deep-work-60",
        group: "Deep Work",
        name: "Monthly Deep Work Challenge",
        description: "Complete 60 deep work sessions (25+ min) this month",
        icon: "🔥",
        measure: WorkSessions(25),
        target_value: 60.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Monthly,
    },
    GoalTemplate {
        id: "daily-consistency-2h",
        group: "Habits",
        name: "Consistency Streak",
        description: "Work at least 2 hours productively every day",
        icon: "📅",
        measure: ProductivityTime(Productive),
        target_value: 120.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-no-zero-days",
        group: "Habits",
        name: "No Zero Days",
        description: "Log at least 30 minutes of productive time every single day",
        icon: "✅",
        measure: ProductivityTime(Productive),
        target_value: 30.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-minimum-1h",
        group: "Habits",
        name: "Daily Minimum",
        description: "Ensure at least 1 hour of productive work every day",
        icon: "⏰",
        measure: ProductivityTime(Productive),
        target_value: 60.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-focus-8h",
        group: "Challenges",
        name: "Full Workday Focus",
        description: "Achieve a full 8 hours of productive work in one day",
        icon: "🎯",
        measure: ProductivityTime(Productive),
        target_value: 480.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-productivity-85",
        group: "Challenges",
        name: "High Performance Day",
        description: "Reach a productivity score of 85 or higher",
        icon: "⚡",
        measure: ProductivityScore,
        target_value: 85.0,
        target_unit: TargetUnit::Score,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-zero-distractions",
        group: "Challenges",
        name: "Zero Distraction Day",
        description: "Keep unproductive time under 30 minutes for the day",
        icon: "🛡️",
        measure: ProductivityTime(Unproductive),
        target_value: 30.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Maximum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "daily-deep-work-5",
        group: "Challenges",
        name: "Deep Work Marathon",
        description: "Complete 5 deep work sessions (25+ min) in one day",
        icon: "🚀",
        measure: WorkSessions(25),
        target_value: 5.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Daily,
    },
    GoalTemplate {
        id: "weekly-focus-30h",
        group: "Challenges",
        name: "Weekly Power Sprint",
        description: "Complete 30 hours of focused work in one week",
        icon: "💪",
        measure: ProductivityTime(Productive),
        target_value: 1800.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "weekly-deep-work-20",
        group: "Challenges",
        name: "Weekly Deep Work Push",
        description: "Complete 20 deep work sessions (25+ min) in one week",
        icon: "🔥",
        measure: WorkSessions(25),
        target_value: 20.0,
        target_unit: TargetUnit::Sessions,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "weekly-productivity-85",
        group: "Challenges",
        name: "Excellence Week",
        description: "Maintain a productivity score of 85 over the week",
        icon: "🏆",
        measure: ProductivityScore,
        target_value: 85.0,
        target_unit: TargetUnit::Score,
        target_type: TargetType::Minimum,
        frequency: Frequency::Weekly,
    },
    GoalTemplate {
        id: "monthly-focus-100h",
        group: "Challenges",
        name: "Monthly Century",
        description: "Reach 100 hours of productive work in one month",
        icon: "💯",
        measure: ProductivityTime(Productive),
        target_value: 6000.0,
        target_unit: TargetUnit::Minutes,
        target_type: TargetType::Minimum,
        frequency: Frequency::Monthly,
    },
];

/// All built-in templates.
pub fn goal_templates() -> &'static [GoalTemplate] {
    TEMPLATES
}

/// Look up a template by id.
pub fn find_template(id: &str) -> Option<&'static GoalTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Templates keyed by catalogue group, in catalogue order within each group.
pub fn templates_by_group() -> BTreeMap<&'static str, Vec<&'static GoalTemplate>> {
    let mut grouped: BTreeMap<&'static str, Vec<&'static GoalTemplate>> = BTreeMap::new();
    for template in TEMPLATES {
        grouped.entry(template.group).or_default().push(template);
    }
    grouped
}

/// Build the fields of a new goal from a template and overrides.
pub fn build_goal(template_id: &str, overrides: TemplateOverrides) -> Result<NewGoal> {
    let template = find_template(template_id)
        .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;

    let mut kind = template.measure.kind();
    match (&mut kind, overrides.reference) {
        (GoalKind::ProductivityTime { level }, Some(reference)) => {
            *level = reference.parse().map_err(|e: String| Error::definition(template_id, e))?;
        }
        (_, Some(reference)) => {
            return Err(Error::definition(
                template_id,
                format!("template does not take a reference (got {})", reference),
            ));
        }
        (_, None) => {}
    }
    if let Some(minutes) = overrides.min_session_minutes {
        match &mut kind {
            GoalKind::WorkSessions {
                min_session_minutes,
            } => *min_session_minutes = Some(minutes),
            _ => {
                return Err(Error::definition(
                    template_id,
                    "only work-session templates take a minimum session length",
                ))
            }
        }
    }

    Ok(NewGoal {
        name: overrides.name.unwrap_or_else(|| template.name.to_string()),
        description: Some(
            overrides
                .description
                .unwrap_or_else(|| template.description.to_string()),
        ),
        icon: Some(overrides.icon.unwrap_or_else(|| template.icon.to_string())),
        kind,
        target_value: overrides.target_value.unwrap_or(template.target_value),
        target_unit: template.target_unit,
        target_type: template.target_type,
        frequency: overrides.frequency.unwrap_or(template.frequency),
        active_days: overrides.active_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::validate_shape;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_is_valid() {
        let mut ids = HashSet::new();
        for template in goal_templates() {
            assert!(ids.insert(template.id), "duplicate template {}", template.id);
            validate_shape(
                template.id,
                &template.measure.kind(),
                template.target_value,
                template.target_unit,
                template.frequency,
                None,
            )
            .unwrap();
        }
        assert!(templates_by_group().contains_key("Deep Work"));
    }

    #[test]
    fn test_build_goal_with_overrides() {
        let goal = build_goal(
            "daily-focus-4h",
            TemplateOverrides {
                target_value: Some(180.0),
                reference: Some("neutral".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(goal.name, "Daily Focus Time");
        assert_eq!(goal.target_value, 180.0);
        assert_eq!(
            goal.kind,
            GoalKind::ProductivityTime {
                level: ProductivityLevel::Neutral
            }
        );
        assert_eq!(goal.frequency, Frequency::Daily);
    }

    #[test]
    fn test_build_goal_rejects_bad_input() {
        assert!(matches!(
            build_goal("nope", TemplateOverrides::default()),
            Err(Error::TemplateNotFound(_))
        ));
        assert!(build_goal(
            "daily-productivity-70",
            TemplateOverrides {
                reference: Some("slack".to_string()),
                ..Default::default()
            }
        )
        .is_err());
        assert!(build_goal(
            "daily-focus-4h",
            TemplateOverrides {
                reference: Some("sometimes".to_string()),
                ..Default::default()
            }
        )
        .is_err());
    }

    #[test]
    fn test_work_session_override() {
        let goal = build_goal(
            "daily-deep-work-3",
            TemplateOverrides {
                min_session_minutes: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            goal.kind,
            GoalKind::WorkSessions {
                min_session_minutes: Some(50)
            }
        );
    }
}
