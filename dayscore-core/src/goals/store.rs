//! Storage seams used by the goal engine.
//!
//! The engine only talks to these traits. [`Database`] implements all of them;
//! tests substitute fakes to simulate outages.

use crate::db::Database;
use crate::error::Result;
use crate::types::{GoalDefinition, GoalProgress, ProductivityLevel, UsageSession};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Read access to recorded usage sessions.
pub trait SessionSource: Send + Sync {
    /// Closed sessions overlapping `[start, end)`, with their app's current category.
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageSession>>;
}

/// Goal definition CRUD.
pub trait GoalStore: Send + Sync {
    /// Definitions that existed at some point in `[start, end)`, deleted ones
    /// included, oldest first.
    fn goals_existing_on(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GoalDefinition>>;

    fn get_goal(&self, id: &str) -> Result<Option<GoalDefinition>>;

    fn insert_goal(&self, goal: &GoalDefinition) -> Result<()>;

    fn update_goal(&self, goal: &GoalDefinition) -> Result<()>;

    /// Mark a goal deleted. Returns false when no live goal has that id.
    fn soft_delete_goal(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Goals that are not deleted, oldest first.
    fn list_active_goals(&self) -> Result<Vec<GoalDefinition>>;
}

/// Productivity classification of apps and categories.
pub trait ProductivitySource: Send + Sync {
    /// Per-app level overriding the category. `None` when the app has none.
    fn app_productivity_override(&self, app_id: &str) -> Result<Option<ProductivityLevel>>;

    /// Level of a category. `None` for unknown categories.
    fn category_productivity(&self, category: &str) -> Result<Option<ProductivityLevel>>;

    fn set_category_productivity(&self, category: &str, level: ProductivityLevel) -> Result<()>;

    fn set_app_productivity_override(
        &self,
        app_id: &str,
        level: Option<ProductivityLevel>,
    ) -> Result<()>;
}

/// Frozen progress of elapsed periods.
pub trait SnapshotStore: Send + Sync {
    /// Insert a snapshot keyed by `(goal_id, date)` and return the stored row.
    ///
    /// The first write wins. Writing an identical outcome again is a no-op;
    /// writing a different one fails with [`Error::SnapshotConflict`](crate::Error::SnapshotConflict).
    fn save_snapshot(&self, progress: &GoalProgress) -> Result<GoalProgress>;

    fn load_snapshot(&self, goal_id: &str, date: NaiveDate) -> Result<Option<GoalProgress>>;

    /// Snapshots of one goal with keys in `[from, to]`, oldest first.
    fn load_snapshots_between(
        &self,
        goal_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GoalProgress>>;

    /// Key of the most recent snapshot of any goal.
    fn last_snapshot_date(&self) -> Result<Option<NaiveDate>>;
}

/// The set of stores a [`GoalService`](super::GoalService) reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionSource>,
    pub goals: Arc<dyn GoalStore>,
    pub productivity: Arc<dyn ProductivitySource>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl Stores {
    /// Back every store with the same database.
    pub fn from_database(db: Arc<Database>) -> Self {
        Self {
            sessions: db.clone(),
            goals: db.clone(),
            productivity: db.clone(),
            snapshots: db,
        }
    }
}
