//! Core domain types for dayscore
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | A closed interval of foreground use of one application |
//! | **Productivity level** | productive / neutral / unproductive, attached to apps or categories |
//! | **Goal** | A user-defined target over an aggregated usage metric |
//! | **Period** | The day, week or month a goal is evaluated over |
//! | **Snapshot** | Frozen progress of a goal for a period that has fully elapsed |
//! | **Streak** | Consecutive achieved periods ending at a reference date |

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Category assigned to apps that the user never categorised.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ============================================
// Usage sessions
// ============================================

/// A completed (or ongoing) interval of foreground use of one application.
///
/// Produced by the tracking pipeline; never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSession {
    /// Row identifier assigned by the session store
    pub id: i64,
    /// Opaque application identifier
    pub app_id: String,
    /// Category of the application at query time
    pub category: String,
    /// When the app gained focus
    pub start_time: DateTime<Utc>,
    /// When the app lost focus (None while still in the foreground)
    pub end_time: Option<DateTime<Utc>>,
}

impl UsageSession {
    /// Full duration in milliseconds; 0 for ongoing sessions.
    pub fn duration_ms(&self) -> i64 {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds().max(0))
            .unwrap_or(0)
    }

    /// Milliseconds of this session that fall inside `[start, end)`.
    pub fn overlap_ms(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        let Some(session_end) = self.end_time else {
            return 0;
        };
        let from = self.start_time.max(start);
        let to = session_end.min(end);
        if to > from {
            (to - from).num_milliseconds()
        } else {
            0
        }
    }
}

/// Three-way productivity classification of apps and categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityLevel {
    Productive,
    Neutral,
    Unproductive,
}

impl ProductivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductivityLevel::Productive => "productive",
            ProductivityLevel::Neutral => "neutral",
            ProductivityLevel::Unproductive => "unproductive",
        }
    }
}

impl std::str::FromStr for ProductivityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "productive" => Ok(ProductivityLevel::Productive),
            "neutral" => Ok(ProductivityLevel::Neutral),
            "unproductive" => Ok(ProductivityLevel::Unproductive),
            _ => Err(format!("unknown productivity level: {}", s)),
        }
    }
}

// ============================================
// Goal definitions
// ============================================

/// Goal type tag, as stored in the `goals.goal_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    ProductivityScore,
    ProductivityTime,
    WorkSessions,
    App,
    Category,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::ProductivityScore => "productivity_score",
            GoalType::ProductivityTime => "productivity_time",
            GoalType::WorkSessions => "work_sessions",
            GoalType::App => "app",
            GoalType::Category => "category",
        }
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "productivity_score" => Ok(GoalType::ProductivityScore),
            // Older templates called productivity time "focus time"
            "productivity_time" | "focus_time" => Ok(GoalType::ProductivityTime),
            "work_sessions" => Ok(GoalType::WorkSessions),
            "app" => Ok(GoalType::App),
            "category" => Ok(GoalType::Category),
            _ => Err(format!("unknown goal type: {}", s)),
        }
    }
}

/// What a goal measures, with the reference each measurement needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalKind {
    /// Weighted share of productive time in the period (0-100)
    ProductivityScore,
    /// Time spent on apps classified at `level`
    ProductivityTime { level: ProductivityLevel },
    /// Number of sessions at least `min_session_minutes` long (config default when unset)
    WorkSessions { min_session_minutes: Option<u32> },
    /// Time spent in one application
    App { app_id: String },
    /// Time spent in apps of one category
    Category { category: String },
}

impl GoalKind {
    pub fn goal_type(&self) -> GoalType {
        match self {
            GoalKind::ProductivityScore => GoalType::ProductivityScore,
            GoalKind::ProductivityTime { .. } => GoalType::ProductivityTime,
            GoalKind::WorkSessions { .. } => GoalType::WorkSessions,
            GoalKind::App { .. } => GoalType::App,
            GoalKind::Category { .. } => GoalType::Category,
        }
    }

    /// `(reference_type, reference_id)` columns for storage.
    pub fn reference(&self) -> (Option<&'static str>, Option<String>) {
        match self {
            GoalKind::ProductivityScore | GoalKind::WorkSessions { .. } => (None, None),
            GoalKind::ProductivityTime { level } => {
                (Some("productivity"), Some(level.as_str().to_string()))
            }
            GoalKind::App { app_id } => (Some("app"), Some(app_id.clone())),
            GoalKind::Category { category } => (Some("category"), Some(category.clone())),
        }
    }
}

/// Unit of a goal's target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUnit {
    Score,
    Minutes,
    Hours,
    Sessions,
}

impl TargetUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetUnit::Score => "score",
            TargetUnit::Minutes => "minutes",
            TargetUnit::Hours => "hours",
            TargetUnit::Sessions => "sessions",
        }
    }
}

impl std::str::FromStr for TargetUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "score" => Ok(TargetUnit::Score),
            "minutes" => Ok(TargetUnit::Minutes),
            "hours" => Ok(TargetUnit::Hours),
            "sessions" => Ok(TargetUnit::Sessions),
            _ => Err(format!("unknown target unit: {}", s)),
        }
    }
}

/// Whether the target is a floor or a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Satisfied when current >= target
    Minimum,
    /// Satisfied when current <= target
    Maximum,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Minimum => "minimum",
            TargetType::Maximum => "maximum",
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "minimum" => Ok(TargetType::Minimum),
            "maximum" => Ok(TargetType::Maximum),
            _ => Err(format!("unknown target type: {}", s)),
        }
    }
}

/// Period length a goal is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    /// Monday through Sunday
    Weekly,
    /// Calendar month
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("unknown frequency: {}", s)),
        }
    }
}

/// Weekdays on which a daily goal applies.
///
/// Stored as a comma-separated list of day numbers, 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u32>", try_from = "Vec<u32>")]
pub struct ActiveDays(u8);

impl ActiveDays {
    /// Monday through Friday.
    pub const WEEKDAYS: ActiveDays = ActiveDays(0b0011_1110);
    /// Saturday and Sunday.
    pub const WEEKEND: ActiveDays = ActiveDays(0b0100_0001);

    pub fn from_weekdays(days: &[Weekday]) -> Self {
        ActiveDays(
            days.iter()
                .fold(0u8, |mask, day| mask | (1 << day.num_days_from_sunday())),
        )
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 & 0b0111_1111 == 0
    }

    /// Day numbers (0 = Sunday) in ascending order.
    pub fn day_numbers(&self) -> Vec<u32> {
        (0..7).filter(|n| self.0 & (1 << n) != 0).collect()
    }

    pub fn to_storage(&self) -> String {
        self.day_numbers()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        let mut mask = 0u8;
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: u32 = part
                .parse()
                .map_err(|_| format!("invalid weekday number: {}", part))?;
            if day > 6 {
                return Err(format!("weekday number out of range: {}", day));
            }
            mask |= 1 << day;
        }
        Ok(ActiveDays(mask))
    }
}

impl From<ActiveDays> for Vec<u32> {
    fn from(days: ActiveDays) -> Self {
        days.day_numbers()
    }
}

impl TryFrom<Vec<u32>> for ActiveDays {
    type Error = String;

    fn try_from(days: Vec<u32>) -> std::result::Result<Self, Self::Error> {
        let mut mask = 0u8;
        for day in days {
            if day > 6 {
                return Err(format!("weekday number out of range: {}", day));
            }
            mask |= 1 << day;
        }
        Ok(ActiveDays(mask))
    }
}

/// A user-authored target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDefinition {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// What the goal measures
    pub kind: GoalKind,
    /// Threshold, must be > 0
    pub target_value: f64,
    pub target_unit: TargetUnit,
    pub target_type: TargetType,
    pub frequency: Frequency,
    /// None means every day
    pub active_days: Option<ActiveDays>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the goal was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl GoalDefinition {
    /// Whether the goal applies on the given calendar day.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.active_days
            .map_or(true, |days| days.contains(date.weekday()))
    }

    /// Whether the goal existed (created and not yet deleted) by the end of a day.
    pub fn existed_on(&self, day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> bool {
        self.created_at < day_end
            && self.deleted_at.map_or(true, |deleted| deleted >= day_end)
            && day_start < day_end
    }

    /// Check the invariants a definition must satisfy before it can be evaluated.
    pub fn validate(&self) -> Result<()> {
        validate_shape(
            &self.id,
            &self.kind,
            self.target_value,
            self.target_unit,
            self.frequency,
            self.active_days,
        )
    }
}

pub(crate) fn validate_shape(
    goal_id: &str,
    kind: &GoalKind,
    target_value: f64,
    target_unit: TargetUnit,
    frequency: Frequency,
    active_days: Option<ActiveDays>,
) -> Result<()> {
    if !target_value.is_finite() || target_value <= 0.0 {
        return Err(Error::definition(
            goal_id,
            format!("target value must be positive, got {}", target_value),
        ));
    }

    let unit_ok = match kind {
        GoalKind::ProductivityScore => target_unit == TargetUnit::Score,
        GoalKind::WorkSessions { .. } => target_unit == TargetUnit::Sessions,
        GoalKind::ProductivityTime { .. } | GoalKind::App { .. } | GoalKind::Category { .. } => {
            matches!(target_unit, TargetUnit::Minutes | TargetUnit::Hours)
        }
    };
    if !unit_ok {
        return Err(Error::definition(
            goal_id,
            format!(
                "unit {} does not fit a {} goal",
                target_unit.as_str(),
                kind.goal_type().as_str()
            ),
        ));
    }

    match kind {
        GoalKind::App { app_id } if app_id.trim().is_empty() => {
            return Err(Error::definition(goal_id, "app goal without an app id"));
        }
        GoalKind::Category { category } if category.trim().is_empty() => {
            return Err(Error::definition(goal_id, "category goal without a category"));
        }
        GoalKind::WorkSessions {
            min_session_minutes: Some(0),
        } => {
            return Err(Error::definition(
                goal_id,
                "minimum session duration must be at least one minute",
            ));
        }
        _ => {}
    }

    if let Some(days) = active_days {
        if frequency != Frequency::Daily {
            return Err(Error::definition(
                goal_id,
                "active days only apply to daily goals",
            ));
        }
        if days.is_empty() {
            return Err(Error::definition(goal_id, "active days list is empty"));
        }
    }

    Ok(())
}

/// Fields for creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub kind: GoalKind,
    pub target_value: f64,
    pub target_unit: TargetUnit,
    pub target_type: TargetType,
    pub frequency: Frequency,
    pub active_days: Option<ActiveDays>,
}

/// Partial update of a goal. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    /// Must keep the goal's type; only the reference may change
    pub kind: Option<GoalKind>,
    pub target_value: Option<f64>,
    pub target_unit: Option<TargetUnit>,
    pub target_type: Option<TargetType>,
    pub frequency: Option<Frequency>,
    pub active_days: Option<Option<ActiveDays>>,
}

// ============================================
// Goal progress
// ============================================

/// Evaluated status of a goal for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// No data yet, or the period has not started
    Pending,
    InProgress,
    /// Close to the target (minimum) or close to exceeding it (maximum)
    Warning,
    Achieved,
    Failed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Warning => "warning",
            GoalStatus::Achieved => "achieved",
            GoalStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GoalStatus::Pending),
            "in_progress" => Ok(GoalStatus::InProgress),
            "warning" => Ok(GoalStatus::Warning),
            "achieved" => Ok(GoalStatus::Achieved),
            "failed" => Ok(GoalStatus::Failed),
            _ => Err(format!("unknown goal status: {}", s)),
        }
    }
}

/// Where a progress row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    /// Computed for this request
    Live,
    /// Read back from a frozen snapshot
    Snapshot,
}

/// The evaluated state of one goal for the period containing a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: String,
    /// Goal name at the time of evaluation
    pub goal_name: String,
    /// Period key: the last day of the goal's period
    pub date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub current_value: f64,
    pub target_value: f64,
    pub target_unit: TargetUnit,
    pub target_type: TargetType,
    /// `round(current / target * 100)`, not clamped
    pub progress_percentage: i64,
    pub status: GoalStatus,
    pub streak_days: u32,
    pub source: ProgressSource,
    /// Definition error that forced a `failed` status
    pub error: Option<String>,
}

impl GoalProgress {
    /// Whether two rows describe the same frozen outcome (source is ignored).
    pub fn same_outcome(&self, other: &GoalProgress) -> bool {
        self.goal_id == other.goal_id
            && self.date == other.date
            && self.period_start == other.period_start
            && self.current_value.to_bits() == other.current_value.to_bits()
            && self.target_value.to_bits() == other.target_value.to_bits()
            && self.progress_percentage == other.progress_percentage
            && self.status == other.status
    }
}

/// Summary statistics for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Goals evaluated for the date
    pub active_goals: u32,
    /// Goals with status `achieved`
    pub achieved_today: u32,
    /// Longest `streak_days` among the evaluated goals
    pub day_streak: u32,
    /// `round(achieved / active * 100)`, 0 without goals
    pub success_rate: u32,
}

/// Response of [`GoalService::goals_for_date`](crate::goals::GoalService::goals_for_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsForDate {
    pub date: NaiveDate,
    pub is_today: bool,
    pub goals: Vec<GoalProgress>,
    pub stats: SummaryStats,
}

/// Goal success for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySuccess {
    pub date: NaiveDate,
    pub achieved: u32,
    pub total: u32,
    /// None when no goal was due that day
    pub success_rate: Option<u32>,
    /// Heatmap bucket 0-5
    pub level: u8,
}

/// Response of [`GoalService::goal_insights`](crate::goals::GoalService::goal_insights).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalInsights {
    pub daily_success_rate: Vec<DaySuccess>,
    pub calendar_heatmap: Vec<DaySuccess>,
}
