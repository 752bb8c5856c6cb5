//! Goal orchestration: the public entry points of the goal engine.

use super::aggregator::{current_value, has_activity, AggregationSettings, ClassifiedSession};
use super::cache::ProductivityCache;
use super::evaluator::{evaluate, Thresholds};
use super::period::{day_window, days_before, Period, PeriodPhase, TimeWindow};
use super::store::Stores;
use super::streak::{streak_ending_at, success_series, summarize, DayTally};
use super::templates::{build_goal, TemplateOverrides};
use crate::clock::{Clock, SystemClock};
use crate::config::{GoalsConfig, MAX_HISTORY_DAYS};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{
    validate_shape, Frequency, GoalDefinition, GoalInsights, GoalProgress, GoalStatus,
    GoalUpdate, GoalsForDate, NewGoal, ProductivityLevel, ProgressSource,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Sessions already loaded during one request, by window.
type SessionMemo = HashMap<TimeWindow, Vec<ClassifiedSession>>;

/// Result of [`GoalService::backfill_missing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Calendar days examined
    pub days_scanned: u32,
    /// Snapshots newly written
    pub snapshots_written: u32,
}

/// Computes goal progress, streaks and history, and manages goal definitions.
///
/// Every request reads the stores, computes, and freezes any fully elapsed
/// period it evaluated. The only state kept between requests is the
/// productivity cache.
pub struct GoalService {
    stores: Stores,
    cache: Arc<ProductivityCache>,
    config: GoalsConfig,
    thresholds: Thresholds,
    settings: AggregationSettings,
    clock: Arc<dyn Clock>,
}

impl GoalService {
    pub fn new(
        stores: Stores,
        cache: Arc<ProductivityCache>,
        config: GoalsConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let thresholds = Thresholds::from(&config);
        let settings = AggregationSettings {
            neutral_weight: config.neutral_weight,
            default_min_session_minutes: config.default_min_session_minutes,
        };
        Self {
            stores,
            cache,
            config,
            thresholds,
            settings,
            clock,
        }
    }

    /// Service over a single database using the system clock.
    pub fn from_database(db: Arc<Database>, config: GoalsConfig) -> Self {
        Self::new(
            Stores::from_database(db),
            Arc::new(ProductivityCache::new()),
            config,
            Arc::new(SystemClock),
        )
    }

    pub fn cache(&self) -> &ProductivityCache {
        &self.cache
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ============================================
    // Progress
    // ============================================

    /// Progress of every goal that applies on `date`, with summary statistics.
    pub fn goals_for_date(&self, date: NaiveDate) -> Result<GoalsForDate> {
        let today = self.clock.today();
        let window = day_window(self.clock.as_ref(), date);
        let mut memo = SessionMemo::new();

        let mut goals = Vec::new();
        for goal in self.goals_existing_on(window)? {
            if let Some(progress) = self.progress_for(&goal, date, today, &mut memo)? {
                goals.push(progress);
            }
        }

        let stats = summarize(&goals);
        tracing::debug!(
            date = %date,
            active_goals = stats.active_goals,
            achieved = stats.achieved_today,
            "Evaluated goals for date"
        );

        Ok(GoalsForDate {
            date,
            is_today: date == today,
            goals,
            stats,
        })
    }

    /// Daily success rate over the last `window_days` days and the calendar heatmap.
    ///
    /// The heatmap covers at least `heatmap_days` days. Daily goals count on each
    /// active day; weekly and monthly goals count on the last day of their period.
    /// Windows longer than [`MAX_HISTORY_DAYS`] are rejected.
    pub fn goal_insights(&self, window_days: u32) -> Result<GoalInsights> {
        if window_days > MAX_HISTORY_DAYS {
            return Err(Error::InvalidValue {
                field: "window_days",
                value: window_days.to_string(),
            });
        }
        let today = self.clock.today();
        let heatmap_days = window_days.max(self.config.heatmap_days).min(MAX_HISTORY_DAYS);
        let heatmap_from = days_before(today, heatmap_days.saturating_sub(1));
        let rate_from = days_before(today, window_days.saturating_sub(1));

        let range = TimeWindow {
            start: self.clock.day_start(heatmap_from),
            end: day_window(self.clock.as_ref(), today).end,
        };
        let goals = self
            .stores
            .goals
            .goals_existing_on(range.start, range.end)
            .map_err(|e| Error::unavailable("goal store", e))?;

        let mut memo = SessionMemo::new();
        let mut tallies: BTreeMap<NaiveDate, DayTally> = BTreeMap::new();
        for date in heatmap_from.iter_days().take_while(|d| *d <= today) {
            let window = day_window(self.clock.as_ref(), date);
            for goal in goals.iter().filter(|g| g.existed_on(window.start, window.end)) {
                if goal.frequency != Frequency::Daily
                    && Period::containing(goal.frequency, date).key() != date
                {
                    continue;
                }
                if let Some(progress) = self.progress_for(goal, date, today, &mut memo)? {
                    tallies.entry(date).or_default().record(progress.status);
                }
            }
        }

        let calendar_heatmap = success_series(&tallies, heatmap_from, today);
        let daily_success_rate = if window_days == 0 {
            Vec::new()
        } else {
            success_series(&tallies, rate_from, today)
        };

        Ok(GoalInsights {
            daily_success_rate,
            calendar_heatmap,
        })
    }

    /// Freeze every closed period up to `through` that has no snapshot yet.
    ///
    /// Scanning starts the day after the most recent snapshot (or at the oldest
    /// goal's creation day when nothing was frozen yet) and never covers more than
    /// `backfill_max_days` days. Days are processed oldest first so each snapshot's
    /// streak sees the ones before it.
    pub fn backfill_missing(&self, through: NaiveDate) -> Result<BackfillReport> {
        let today = self.clock.today();
        let through = through.min(days_before(today, 1));

        let last = self
            .stores
            .snapshots
            .last_snapshot_date()
            .map_err(|e| Error::unavailable("snapshot store", e))?;
        let start = match last {
            Some(date) => date.succ_opt().unwrap_or(date),
            None => {
                let goals = self
                    .stores
                    .goals
                    .list_active_goals()
                    .map_err(|e| Error::unavailable("goal store", e))?;
                match goals.iter().map(|g| g.created_at).min() {
                    Some(created) => self.local_date(created),
                    None => return Ok(BackfillReport::default()),
                }
            }
        };
        let limit = days_before(through, self.config.backfill_max_days.saturating_sub(1));
        let start = start.max(limit);

        let mut report = BackfillReport::default();
        let mut memo = SessionMemo::new();
        for date in start.iter_days().take_while(|d| *d <= through) {
            report.days_scanned += 1;
            let window = day_window(self.clock.as_ref(), date);
            for goal in self.goals_existing_on(window)? {
                let period = Period::containing(goal.frequency, date);
                if period.key() != date || period.phase(today) != PeriodPhase::Closed {
                    continue;
                }
                if self.snapshot(&goal.id, date)?.is_some() || !goal.applies_on(date) {
                    continue;
                }
                if let Some(progress) = self.progress_for(&goal, date, today, &mut memo)? {
                    if progress.source == ProgressSource::Snapshot {
                        report.snapshots_written += 1;
                    }
                }
            }
        }

        tracing::info!(
            from = %start,
            through = %through,
            days = report.days_scanned,
            snapshots = report.snapshots_written,
            "Backfilled goal progress"
        );
        Ok(report)
    }

    /// Progress of one goal for the period containing `date`, or `None` when the
    /// goal does not apply on that day.
    fn progress_for(
        &self,
        goal: &GoalDefinition,
        date: NaiveDate,
        today: NaiveDate,
        memo: &mut SessionMemo,
    ) -> Result<Option<GoalProgress>> {
        let period = Period::containing(goal.frequency, date);
        let phase = period.phase(today);

        if phase == PeriodPhase::Closed {
            if let Some(frozen) = self.snapshot(&goal.id, period.key())? {
                return Ok(Some(frozen));
            }
        }
        if !goal.applies_on(date) {
            return Ok(None);
        }

        let progress = match self.evaluate_live(goal, period, today, memo) {
            Ok(progress) => progress,
            Err(Error::Definition { goal_id, message }) => {
                tracing::warn!(goal_id = %goal_id, error = %message, "Invalid goal definition");
                return Ok(Some(failed_progress(goal, period, message)));
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            goal_id = %goal.id,
            date = %period.key(),
            status = progress.status.as_str(),
            "Evaluated goal"
        );

        if phase == PeriodPhase::Closed {
            return self.freeze(progress).map(Some);
        }
        Ok(Some(progress))
    }

    fn evaluate_live(
        &self,
        goal: &GoalDefinition,
        period: Period,
        today: NaiveDate,
        memo: &mut SessionMemo,
    ) -> Result<GoalProgress> {
        goal.validate()?;

        let phase = period.phase(today);
        let window = period.window(self.clock.as_ref());
        let sessions = self.sessions_for(window, memo)?;
        let current = current_value(
            &goal.kind,
            goal.target_unit,
            sessions,
            &window,
            &self.settings,
        );
        let evaluation = evaluate(
            &goal.id,
            current,
            goal.target_value,
            goal.target_type,
            phase,
            has_activity(sessions, &window),
            &self.thresholds,
        )?;

        let streak_days = if evaluation.status == GoalStatus::Achieved {
            self.streak_for(goal, period, today, memo)?
        } else {
            0
        };

        Ok(GoalProgress {
            goal_id: goal.id.clone(),
            goal_name: goal.name.clone(),
            date: period.key(),
            period_start: period.start,
            period_end: period.end,
            current_value: current,
            target_value: goal.target_value,
            target_unit: goal.target_unit,
            target_type: goal.target_type,
            progress_percentage: evaluation.progress_percentage,
            status: evaluation.status,
            streak_days,
            source: ProgressSource::Live,
            error: None,
        })
    }

    /// Streak for a goal achieved in `period`, walking earlier frozen periods.
    ///
    /// Earlier closed periods without a snapshot are evaluated and frozen first,
    /// oldest first, back to the last recorded miss, the goal's creation day or
    /// the lookback limit.
    fn streak_for(
        &self,
        goal: &GoalDefinition,
        period: Period,
        today: NaiveDate,
        memo: &mut SessionMemo,
    ) -> Result<u32> {
        let key = period.key();
        let lookback = self.config.streak_lookback_days;
        let from = days_before(key, lookback);
        let created = self.local_date(goal.created_at);

        let mut history: HashMap<NaiveDate, GoalStatus> = self
            .stores
            .snapshots
            .load_snapshots_between(&goal.id, from, key)
            .map_err(|e| Error::unavailable("snapshot store", e))?
            .into_iter()
            .map(|p| (p.date, p.status))
            .collect();

        let mut gaps = Vec::new();
        let mut cursor = period.previous(goal.frequency);
        while let Some(earlier) = cursor {
            if earlier.end <= from || earlier.end < created {
                break;
            }
            match history.get(&earlier.key()) {
                Some(GoalStatus::Achieved) => {}
                Some(_) => break,
                None if goal.applies_on(earlier.key()) => gaps.push(earlier),
                None => {}
            }
            cursor = earlier.previous(goal.frequency);
        }
        if !gaps.is_empty() {
            tracing::debug!(goal_id = %goal.id, periods = gaps.len(), "Freezing streak history");
        }
        for gap in gaps.into_iter().rev() {
            if let Some(progress) = self.progress_for(goal, gap.key(), today, memo)? {
                history.insert(progress.date, progress.status);
            }
        }

        streak_ending_at(key, goal.frequency, goal.active_days, lookback, |date| {
            if date == key {
                Ok(Some(GoalStatus::Achieved))
            } else {
                Ok(history.get(&date).copied())
            }
        })
    }

    /// Persist a closed period's progress; the first stored outcome wins.
    fn freeze(&self, progress: GoalProgress) -> Result<GoalProgress> {
        match self.stores.snapshots.save_snapshot(&progress) {
            Ok(stored) => Ok(stored),
            Err(Error::SnapshotConflict { goal_id, date }) => {
                tracing::error!(
                    goal_id = %goal_id,
                    date = %date,
                    "Conflicting snapshot write; serving stored progress"
                );
                self.snapshot(&goal_id, date)?.ok_or_else(|| Error::DataUnavailable {
                    store: "snapshot store",
                    message: format!("snapshot for {} on {} vanished", goal_id, date),
                })
            }
            Err(e) => Err(Error::unavailable("snapshot store", e)),
        }
    }

    fn snapshot(&self, goal_id: &str, date: NaiveDate) -> Result<Option<GoalProgress>> {
        self.stores
            .snapshots
            .load_snapshot(goal_id, date)
            .map_err(|e| Error::unavailable("snapshot store", e))
    }

    fn goals_existing_on(&self, window: TimeWindow) -> Result<Vec<GoalDefinition>> {
        let goals = self
            .stores
            .goals
            .goals_existing_on(window.start, window.end)
            .map_err(|e| Error::unavailable("goal store", e))?;
        Ok(goals
            .into_iter()
            .filter(|g| g.existed_on(window.start, window.end))
            .collect())
    }

    fn sessions_for<'m>(
        &self,
        window: TimeWindow,
        memo: &'m mut SessionMemo,
    ) -> Result<&'m [ClassifiedSession]> {
        if !memo.contains_key(&window) {
            let sessions = self
                .stores
                .sessions
                .sessions_between(window.start, window.end)
                .map_err(|e| Error::unavailable("session store", e))?;

            let productivity = self.stores.productivity.as_ref();
            let classified = sessions
                .into_iter()
                .map(|session| {
                    let level = self
                        .cache
                        .level_for(productivity, &session)
                        .map_err(|e| Error::unavailable("productivity store", e))?;
                    Ok(ClassifiedSession { session, level })
                })
                .collect::<Result<Vec<_>>>()?;
            memo.insert(window, classified);
        }
        Ok(memo.get(&window).map(Vec::as_slice).unwrap_or_default())
    }

    /// Local calendar day containing `instant`.
    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        let day = instant.date_naive();
        let mut date = day.succ_opt().unwrap_or(day);
        while self.clock.day_start(date) > instant {
            match date.pred_opt() {
                Some(previous) => date = previous,
                None => break,
            }
        }
        date
    }

    // ============================================
    // Goal definitions
    // ============================================

    /// Goals that have not been deleted.
    pub fn list_goals(&self) -> Result<Vec<GoalDefinition>> {
        self.stores.goals.list_active_goals()
    }

    pub fn get_goal(&self, id: &str) -> Result<GoalDefinition> {
        self.stores
            .goals
            .get_goal(id)?
            .filter(|g| g.deleted_at.is_none())
            .ok_or_else(|| Error::GoalNotFound(id.to_string()))
    }

    pub fn create_goal(&self, new: NewGoal) -> Result<GoalDefinition> {
        let id = uuid::Uuid::new_v4().to_string();
        validate_shape(
            &id,
            &new.kind,
            new.target_value,
            new.target_unit,
            new.frequency,
            new.active_days,
        )?;

        let now = self.clock.now();
        let goal = GoalDefinition {
            id,
            name: new.name,
            description: new.description,
            icon: new.icon,
            kind: new.kind,
            target_value: new.target_value,
            target_unit: new.target_unit,
            target_type: new.target_type,
            frequency: new.frequency,
            active_days: new.active_days,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.stores.goals.insert_goal(&goal)?;

        tracing::info!(
            goal_id = %goal.id,
            goal_type = goal.kind.goal_type().as_str(),
            "Created goal"
        );
        Ok(goal)
    }

    pub fn create_goal_from_template(
        &self,
        template_id: &str,
        overrides: TemplateOverrides,
    ) -> Result<GoalDefinition> {
        self.create_goal(build_goal(template_id, overrides)?)
    }

    /// Apply a partial update. The goal type cannot change.
    pub fn update_goal(&self, id: &str, update: GoalUpdate) -> Result<GoalDefinition> {
        let mut goal = self.get_goal(id)?;

        if let Some(kind) = update.kind {
            let (from, to) = (goal.kind.goal_type(), kind.goal_type());
            if from != to {
                return Err(Error::ImmutableGoalType {
                    goal_id: id.to_string(),
                    from: from.as_str(),
                    to: to.as_str(),
                });
            }
            goal.kind = kind;
        }
        if let Some(name) = update.name {
            goal.name = name;
        }
        if let Some(description) = update.description {
            goal.description = description;
        }
        if let Some(icon) = update.icon {
            goal.icon = icon;
        }
        if let Some(target_value) = update.target_value {
            goal.target_value = target_value;
        }
        if let Some(target_unit) = update.target_unit {
            goal.target_unit = target_unit;
        }
        if let Some(target_type) = update.target_type {
            goal.target_type = target_type;
        }
        if let Some(frequency) = update.frequency {
            goal.frequency = frequency;
        }
        if let Some(active_days) = update.active_days {
            goal.active_days = active_days;
        }

        goal.validate()?;
        goal.updated_at = self.clock.now();
        self.stores.goals.update_goal(&goal)?;

        tracing::info!(goal_id = %goal.id, "Updated goal");
        Ok(goal)
    }

    /// Soft-delete a goal. Frozen snapshots are kept.
    pub fn delete_goal(&self, id: &str) -> Result<()> {
        if !self.stores.goals.soft_delete_goal(id, self.clock.now())? {
            return Err(Error::GoalNotFound(id.to_string()));
        }
        tracing::info!(goal_id = %id, "Deleted goal");
        Ok(())
    }

    // ============================================
    // Productivity metadata
    // ============================================

    pub fn set_category_productivity(
        &self,
        category: &str,
        level: ProductivityLevel,
    ) -> Result<()> {
        self.stores
            .productivity
            .set_category_productivity(category, level)?;
        self.cache.invalidate_category(category);
        Ok(())
    }

    pub fn set_app_productivity_override(
        &self,
        app_id: &str,
        level: Option<ProductivityLevel>,
    ) -> Result<()> {
        self.stores
            .productivity
            .set_app_productivity_override(app_id, level)?;
        self.cache.invalidate_app(app_id);
        Ok(())
    }

    /// Forget cached productivity metadata after an out-of-band change.
    pub fn invalidate_metadata(&self) {
        self.cache.invalidate();
    }
}

/// Progress row for a goal whose definition cannot be evaluated.
fn failed_progress(goal: &GoalDefinition, period: Period, message: String) -> GoalProgress {
    GoalProgress {
        goal_id: goal.id.clone(),
        goal_name: goal.name.clone(),
        date: period.key(),
        period_start: period.start,
        period_end: period.end,
        current_value: 0.0,
        target_value: goal.target_value,
        target_unit: goal.target_unit,
        target_type: goal.target_type,
        progress_percentage: 0,
        status: GoalStatus::Failed,
        streak_days: 0,
        source: ProgressSource::Live,
        error: Some(message),
    }
}
