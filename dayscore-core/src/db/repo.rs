//! Database repository layer
//!
//! Implements the goal engine's store traits on top of SQLite, plus the write
//! operations the tracking pipeline uses to record apps and sessions.

use crate::error::{Error, Result};
use crate::goals::store::{GoalStore, ProductivitySource, SessionSource, SnapshotStore};
use crate::types::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets the tracker keep writing while goals are evaluated
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;  -- 16MB cache
            ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        super::schema::run_migrations(&self.conn())
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // App and category operations
    // ============================================

    /// Insert or update an app. `None` keeps (or defaults) the category.
    pub fn upsert_app(&self, id: &str, name: &str, category: Option<&str>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO apps (id, name, category, created_at)
            VALUES (?1, ?2, COALESCE(?3, ?4), ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = COALESCE(?3, apps.category)
            "#,
            params![id, name, category, UNCATEGORIZED, format_ts(Utc::now())],
        )?;
        Ok(())
    }

    /// Insert or update a category.
    pub fn upsert_category(
        &self,
        name: &str,
        level: ProductivityLevel,
        color: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO categories (name, productivity_level, color, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET
                productivity_level = excluded.productivity_level,
                color = COALESCE(excluded.color, categories.color)
            "#,
            params![name, level.as_str(), color, format_ts(Utc::now())],
        )?;
        Ok(())
    }

    // ============================================
    // Session operations
    // ============================================

    /// Record a session. Returns its row id.
    pub fn insert_session(
        &self,
        app_id: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        if let Some(end) = end {
            if end < start {
                return Err(Error::InvalidValue {
                    field: "session end",
                    value: format_ts(end),
                });
            }
        }

        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (app_id, start_ms, end_ms) VALUES (?1, ?2, ?3)",
            params![
                app_id,
                start.timestamp_millis(),
                end.map(|e| e.timestamp_millis())
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Close an ongoing session.
    pub fn close_session(&self, id: i64, end: DateTime<Utc>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE sessions SET end_ms = ?1 WHERE id = ?2 AND end_ms IS NULL",
            params![end.timestamp_millis(), id],
        )?;
        Ok(())
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<UsageSession> {
        let start_ms: i64 = row.get("start_ms")?;
        let end_ms: Option<i64> = row.get("end_ms")?;

        Ok(UsageSession {
            id: row.get("id")?,
            app_id: row.get("app_id")?,
            category: row.get("category")?,
            start_time: DateTime::from_timestamp_millis(start_ms).unwrap_or_default(),
            end_time: end_ms.and_then(DateTime::from_timestamp_millis),
        })
    }

    // ============================================
    // Goal row mapping
    // ============================================

    fn row_to_goal_row(row: &Row) -> rusqlite::Result<GoalRow> {
        Ok(GoalRow {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            icon: row.get("icon")?,
            goal_type: row.get("goal_type")?,
            target_value: row.get("target_value")?,
            target_unit: row.get("target_unit")?,
            target_type: row.get("target_type")?,
            frequency: row.get("frequency")?,
            reference_type: row.get("reference_type")?,
            reference_id: row.get("reference_id")?,
            min_session_minutes: row.get("min_session_minutes")?,
            active_days: row.get("active_days")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    /// Run a goal query, skipping rows that cannot be decoded.
    fn query_goals(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<GoalDefinition>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::row_to_goal_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match row.into_definition() {
                    Ok(goal) => Some(goal),
                    Err(e) => {
                        tracing::warn!(goal_id = %id, error = %e, "Skipping undecodable goal row");
                        None
                    }
                }
            })
            .collect())
    }

    // ============================================
    // Snapshot row mapping
    // ============================================

    fn row_to_snapshot_row(row: &Row) -> rusqlite::Result<SnapshotRow> {
        Ok(SnapshotRow {
            goal_id: row.get("goal_id")?,
            goal_name: row.get("goal_name")?,
            date: row.get("date")?,
            period_start: row.get("period_start")?,
            period_end: row.get("period_end")?,
            current_value: row.get("current_value")?,
            target_value: row.get("target_value")?,
            target_unit: row.get("target_unit")?,
            target_type: row.get("target_type")?,
            progress_percentage: row.get("progress_percentage")?,
            status: row.get("status")?,
            streak_days: row.get("streak_days")?,
        })
    }

    fn query_snapshot(
        conn: &Connection,
        goal_id: &str,
        date: NaiveDate,
    ) -> Result<Option<GoalProgress>> {
        conn.query_row(
            "SELECT * FROM goal_progress WHERE goal_id = ?1 AND date = ?2",
            params![goal_id, date.to_string()],
            Self::row_to_snapshot_row,
        )
        .optional()?
        .map(SnapshotRow::into_progress)
        .transpose()
    }
}

// ============================================
// Store trait implementations
// ============================================

impl SessionSource for Database {
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageSession>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT s.id, s.app_id, COALESCE(a.category, ?3) AS category, s.start_ms, s.end_ms
            FROM sessions s
            LEFT JOIN apps a ON a.id = s.app_id
            WHERE s.end_ms IS NOT NULL
              AND s.start_ms < ?2
              AND s.end_ms > ?1
            ORDER BY s.start_ms, s.id
            "#,
        )?;
        let sessions = stmt
            .query_map(
                params![start.timestamp_millis(), end.timestamp_millis(), UNCATEGORIZED],
                Self::row_to_session,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }
}

impl GoalStore for Database {
    fn goals_existing_on(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GoalDefinition>> {
        let conn = self.conn();
        Self::query_goals(
            &conn,
            r#"
            SELECT * FROM goals
            WHERE created_at < ?2
              AND (deleted_at IS NULL OR deleted_at > ?1)
            ORDER BY created_at, id
            "#,
            &[&format_ts(start), &format_ts(end)],
        )
    }

    fn get_goal(&self, id: &str) -> Result<Option<GoalDefinition>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM goals WHERE id = ?1",
            [id],
            Self::row_to_goal_row,
        )
        .optional()?
        .map(GoalRow::into_definition)
        .transpose()
    }

    fn insert_goal(&self, goal: &GoalDefinition) -> Result<()> {
        let (reference_type, reference_id) = goal.kind.reference();
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO goals (
                id, name, description, icon, goal_type, target_value, target_unit,
                target_type, frequency, reference_type, reference_id, min_session_minutes,
                active_days, created_at, updated_at, deleted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                goal.id,
                goal.name,
                goal.description,
                goal.icon,
                goal.kind.goal_type().as_str(),
                goal.target_value,
                goal.target_unit.as_str(),
                goal.target_type.as_str(),
                goal.frequency.as_str(),
                reference_type,
                reference_id,
                min_session_minutes(&goal.kind),
                goal.active_days.map(|d| d.to_storage()),
                format_ts(goal.created_at),
                format_ts(goal.updated_at),
                goal.deleted_at.map(format_ts),
            ],
        )?;
        Ok(())
    }

    fn update_goal(&self, goal: &GoalDefinition) -> Result<()> {
        let (reference_type, reference_id) = goal.kind.reference();
        let conn = self.conn();
        let changed = conn.execute(
            r#"
            UPDATE goals SET
                name = ?2,
                description = ?3,
                icon = ?4,
                target_value = ?5,
                target_unit = ?6,
                target_type = ?7,
                frequency = ?8,
                reference_type = ?9,
                reference_id = ?10,
                min_session_minutes = ?11,
                active_days = ?12,
                updated_at = ?13
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
            params![
                goal.id,
                goal.name,
                goal.description,
                goal.icon,
                goal.target_value,
                goal.target_unit.as_str(),
                goal.target_type.as_str(),
                goal.frequency.as_str(),
                reference_type,
                reference_id,
                min_session_minutes(&goal.kind),
                goal.active_days.map(|d| d.to_storage()),
                format_ts(goal.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(Error::GoalNotFound(goal.id.clone()));
        }
        Ok(())
    }

    fn soft_delete_goal(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE goals SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, format_ts(at)],
        )?;
        Ok(changed > 0)
    }

    fn list_active_goals(&self) -> Result<Vec<GoalDefinition>> {
        let conn = self.conn();
        Self::query_goals(
            &conn,
            "SELECT * FROM goals WHERE deleted_at IS NULL ORDER BY created_at, id",
            &[],
        )
    }
}

impl ProductivitySource for Database {
    fn app_productivity_override(&self, app_id: &str) -> Result<Option<ProductivityLevel>> {
        let conn = self.conn();
        let stored: Option<Option<String>> = conn
            .query_row(
                "SELECT productivity_override FROM apps WHERE id = ?1",
                [app_id],
                |r| r.get(0),
            )
            .optional()?;
        stored
            .flatten()
            .map(|s| parse_enum("productivity_override", &s))
            .transpose()
    }

    fn category_productivity(&self, category: &str) -> Result<Option<ProductivityLevel>> {
        let conn = self.conn();
        let stored: Option<String> = conn
            .query_row(
                "SELECT productivity_level FROM categories WHERE name = ?1",
                [category],
                |r| r.get(0),
            )
            .optional()?;
        stored
            .map(|s| parse_enum("productivity_level", &s))
            .transpose()
    }

    fn set_category_productivity(&self, category: &str, level: ProductivityLevel) -> Result<()> {
        self.upsert_category(category, level, None)
    }

    fn set_app_productivity_override(
        &self,
        app_id: &str,
        level: Option<ProductivityLevel>,
    ) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE apps SET productivity_override = ?2 WHERE id = ?1",
            params![app_id, level.map(|l| l.as_str())],
        )?;
        if changed == 0 {
            return Err(Error::AppNotFound(app_id.to_string()));
        }
        Ok(())
    }
}

impl SnapshotStore for Database {
    fn save_snapshot(&self, progress: &GoalProgress) -> Result<GoalProgress> {
        let conn = self.conn();
        let inserted = conn.execute(
            r#"
            INSERT INTO goal_progress (
                goal_id, date, period_start, period_end, goal_name, current_value,
                target_value, target_unit, target_type, progress_percentage, status,
                streak_days, computed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(goal_id, date) DO NOTHING
            "#,
            params![
                progress.goal_id,
                progress.date.to_string(),
                progress.period_start.to_string(),
                progress.period_end.to_string(),
                progress.goal_name,
                progress.current_value,
                progress.target_value,
                progress.target_unit.as_str(),
                progress.target_type.as_str(),
                progress.progress_percentage,
                progress.status.as_str(),
                progress.streak_days,
                format_ts(Utc::now()),
            ],
        )?;

        let stored = Self::query_snapshot(&conn, &progress.goal_id, progress.date)?.ok_or_else(
            || Error::DataUnavailable {
                store: "snapshot store",
                message: format!(
                    "snapshot for {} on {} missing after insert",
                    progress.goal_id, progress.date
                ),
            },
        )?;

        if inserted == 0 && !stored.same_outcome(progress) {
            return Err(Error::SnapshotConflict {
                goal_id: progress.goal_id.clone(),
                date: progress.date,
            });
        }
        Ok(stored)
    }

    fn load_snapshot(&self, goal_id: &str, date: NaiveDate) -> Result<Option<GoalProgress>> {
        let conn = self.conn();
        Self::query_snapshot(&conn, goal_id, date)
    }

    fn load_snapshots_between(
        &self,
        goal_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GoalProgress>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM goal_progress
            WHERE goal_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![goal_id, from.to_string(), to.to_string()],
                Self::row_to_snapshot_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(SnapshotRow::into_progress).collect()
    }

    fn last_snapshot_date(&self) -> Result<Option<NaiveDate>> {
        let conn = self.conn();
        let last: Option<String> =
            conn.query_row("SELECT MAX(date) FROM goal_progress", [], |r| r.get(0))?;
        last.map(|s| parse_date("date", &s)).transpose()
    }
}

// ============================================
// Raw rows and conversions
// ============================================

/// A `goals` row before enum and reference decoding.
struct GoalRow {
    id: String,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    goal_type: String,
    target_value: f64,
    target_unit: String,
    target_type: String,
    frequency: String,
    reference_type: Option<String>,
    reference_id: Option<String>,
    min_session_minutes: Option<u32>,
    active_days: Option<String>,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}

impl GoalRow {
    fn into_definition(self) -> Result<GoalDefinition> {
        let goal_type: GoalType = parse_enum("goal_type", &self.goal_type)?;
        let reference = self.reference_id.unwrap_or_default();

        let kind = match goal_type {
            GoalType::ProductivityScore => GoalKind::ProductivityScore,
            GoalType::ProductivityTime => {
                // Older rows kept the level in reference_type
                let level = if reference.is_empty() {
                    self.reference_type.unwrap_or_default()
                } else {
                    reference
                };
                GoalKind::ProductivityTime {
                    level: parse_enum("productivity level", &level)?,
                }
            }
            GoalType::WorkSessions => GoalKind::WorkSessions {
                min_session_minutes: self.min_session_minutes,
            },
            GoalType::App => GoalKind::App { app_id: reference },
            GoalType::Category => GoalKind::Category {
                category: reference,
            },
        };

        let active_days = match self.active_days.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(ActiveDays::parse(value).map_err(|_| Error::InvalidValue {
                field: "active_days",
                value: value.to_string(),
            })?),
        };

        Ok(GoalDefinition {
            id: self.id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            kind,
            target_value: self.target_value,
            target_unit: parse_enum("target_unit", &self.target_unit)?,
            target_type: parse_enum("target_type", &self.target_type)?,
            frequency: parse_enum("frequency", &self.frequency)?,
            active_days,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
            deleted_at: self
                .deleted_at
                .map(|s| parse_ts("deleted_at", &s))
                .transpose()?,
        })
    }
}

/// A `goal_progress` row before decoding.
struct SnapshotRow {
    goal_id: String,
    goal_name: String,
    date: String,
    period_start: String,
    period_end: String,
    current_value: f64,
    target_value: f64,
    target_unit: String,
    target_type: String,
    progress_percentage: i64,
    status: String,
    streak_days: u32,
}

impl SnapshotRow {
    fn into_progress(self) -> Result<GoalProgress> {
        Ok(GoalProgress {
            goal_id: self.goal_id,
            goal_name: self.goal_name,
            date: parse_date("date", &self.date)?,
            period_start: parse_date("period_start", &self.period_start)?,
            period_end: parse_date("period_end", &self.period_end)?,
            current_value: self.current_value,
            target_value: self.target_value,
            target_unit: parse_enum("target_unit", &self.target_unit)?,
            target_type: parse_enum("target_type", &self.target_type)?,
            progress_percentage: self.progress_percentage,
            status: parse_enum("status", &self.status)?,
            streak_days: self.streak_days,
            source: ProgressSource::Snapshot,
            error: None,
        })
    }
}

fn min_session_minutes(kind: &GoalKind) -> Option<u32> {
    match kind {
        GoalKind::WorkSessions {
            min_session_minutes,
        } => *min_session_minutes,
        _ => None,
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidValue {
            field,
            value: value.to_string(),
        })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    value.parse().map_err(|_| Error::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn parse_enum<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn create_test_goal(id: &str, kind: GoalKind, unit: TargetUnit) -> GoalDefinition {
        GoalDefinition {
            id: id.to_string(),
            name: format!("Goal {}", id),
            description: None,
            icon: Some("🎯".to_string()),
            kind,
            target_value: 2.0,
            target_unit: unit,
            target_type: TargetType::Minimum,
            frequency: Frequency::Daily,
            active_days: Some(ActiveDays::WEEKDAYS),
            created_at: ts(1, 8),
            updated_at: ts(1, 8),
            deleted_at: None,
        }
    }

    fn create_test_progress(goal_id: &str, date: NaiveDate, status: GoalStatus) -> GoalProgress {
        GoalProgress {
            goal_id: goal_id.to_string(),
            goal_name: "Goal".to_string(),
            date,
            period_start: date,
            period_end: date,
            current_value: 1.5,
            target_value: 2.0,
            target_unit: TargetUnit::Hours,
            target_type: TargetType::Maximum,
            progress_percentage: 75,
            status,
            streak_days: 1,
            source: ProgressSource::Live,
            error: None,
        }
    }

    #[test]
    fn test_sessions_between_overlap_and_category() {
        let db = test_db();
        db.upsert_app("code", "VS Code", Some("Development")).unwrap();
        db.upsert_app("misc", "Misc", None).unwrap();

        db.insert_session("code", ts(10, 9), Some(ts(10, 11))).unwrap();
        // Straddles midnight into the 10th
        db.insert_session("misc", ts(9, 23), Some(ts(10, 1))).unwrap();
        // Ongoing sessions are never returned
        db.insert_session("code", ts(10, 12), None).unwrap();
        // Entirely on the next day
        db.insert_session("code", ts(11, 9), Some(ts(11, 10))).unwrap();

        let sessions = db.sessions_between(ts(10, 0), ts(11, 0)).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].app_id, "misc");
        assert_eq!(sessions[0].category, UNCATEGORIZED);
        assert_eq!(sessions[1].category, "Development");
        assert_eq!(sessions[1].duration_ms(), 2 * 3_600_000);
    }

    #[test]
    fn test_insert_session_rejects_negative_duration() {
        let db = test_db();
        db.upsert_app("code", "VS Code", None).unwrap();
        assert!(db.insert_session("code", ts(10, 9), Some(ts(10, 8))).is_err());
    }

    #[test]
    fn test_goal_round_trip_and_existence_window() {
        let db = test_db();
        let goal = create_test_goal(
            "g1",
            GoalKind::App {
                app_id: "slack".to_string(),
            },
            TargetUnit::Hours,
        );
        db.insert_goal(&goal).unwrap();

        let loaded = db.get_goal("g1").unwrap().unwrap();
        assert_eq!(loaded, goal);

        // Created on the 1st: not visible for the last day of February
        let before = db.goals_existing_on(ts(1, 0) - chrono::Duration::days(1), ts(1, 0));
        assert!(before.unwrap().is_empty());
        assert_eq!(db.goals_existing_on(ts(1, 0), ts(2, 0)).unwrap().len(), 1);

        assert!(db.soft_delete_goal("g1", ts(5, 12)).unwrap());
        assert!(!db.soft_delete_goal("g1", ts(6, 12)).unwrap());
        assert!(db.list_active_goals().unwrap().is_empty());
        assert_eq!(db.goals_existing_on(ts(5, 0), ts(6, 0)).unwrap().len(), 1);
        assert!(db.goals_existing_on(ts(6, 0), ts(7, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_productivity_time_rows() {
        let db = test_db();
        db.connection()
            .execute(
                r#"
                INSERT INTO goals (id, name, goal_type, target_value, target_unit, target_type,
                                   frequency, reference_type, created_at, updated_at)
                VALUES ('legacy', 'Focus', 'focus_time', 240, 'minutes', 'minimum',
                        'daily', 'productive', '2025-03-01T08:00:00.000Z', '2025-03-01T08:00:00.000Z')
                "#,
                [],
            )
            .unwrap();

        let goal = db.get_goal("legacy").unwrap().unwrap();
        assert_eq!(
            goal.kind,
            GoalKind::ProductivityTime {
                level: ProductivityLevel::Productive
            }
        );
    }

    #[test]
    fn test_undecodable_rows_are_skipped_in_lists() {
        let db = test_db();
        db.insert_goal(&create_test_goal(
            "good",
            GoalKind::ProductivityScore,
            TargetUnit::Score,
        ))
        .unwrap();
        db.connection()
            .execute(
                r#"
                INSERT INTO goals (id, name, goal_type, target_value, target_unit, target_type,
                                   frequency, created_at, updated_at)
                VALUES ('bad', 'Bad', 'mystery', 1, 'score', 'minimum', 'daily',
                        '2025-03-01T08:00:00.000Z', '2025-03-01T08:00:00.000Z')
                "#,
                [],
            )
            .unwrap();

        let goals = db.list_active_goals().unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].id, "good");
        assert!(matches!(
            db.get_goal("bad"),
            Err(Error::InvalidValue {
                field: "goal_type",
                ..
            })
        ));
    }

    #[test]
    fn test_productivity_metadata() {
        let db = test_db();
        db.upsert_category("Development", ProductivityLevel::Productive, Some("#00ff00"))
            .unwrap();
        db.upsert_app("youtube", "YouTube", Some("Development")).unwrap();

        assert_eq!(
            db.category_productivity("Development").unwrap(),
            Some(ProductivityLevel::Productive)
        );
        assert_eq!(db.category_productivity("Unknown").unwrap(), None);
        assert_eq!(db.app_productivity_override("youtube").unwrap(), None);

        db.set_app_productivity_override("youtube", Some(ProductivityLevel::Unproductive))
            .unwrap();
        assert_eq!(
            db.app_productivity_override("youtube").unwrap(),
            Some(ProductivityLevel::Unproductive)
        );

        assert!(matches!(
            db.set_app_productivity_override("ghost", None),
            Err(Error::AppNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_first_write_wins() {
        let db = test_db();
        let first = create_test_progress("g1", day(10), GoalStatus::Achieved);

        let stored = db.save_snapshot(&first).unwrap();
        assert_eq!(stored.source, ProgressSource::Snapshot);
        assert!(stored.same_outcome(&first));

        // Identical rewrite is a no-op
        assert!(db.save_snapshot(&first).is_ok());

        let mut different = first.clone();
        different.current_value = 2.5;
        different.status = GoalStatus::Failed;
        assert!(matches!(
            db.save_snapshot(&different),
            Err(Error::SnapshotConflict { .. })
        ));

        let kept = db.load_snapshot("g1", day(10)).unwrap().unwrap();
        assert_eq!(kept.status, GoalStatus::Achieved);
        assert_eq!(kept.current_value, 1.5);
    }

    #[test]
    fn test_snapshot_range_and_last_date() {
        let db = test_db();
        assert_eq!(db.last_snapshot_date().unwrap(), None);

        for d in [3, 4, 7] {
            db.save_snapshot(&create_test_progress("g1", day(d), GoalStatus::Achieved))
                .unwrap();
        }
        db.save_snapshot(&create_test_progress("g2", day(8), GoalStatus::Failed))
            .unwrap();

        let range = db.load_snapshots_between("g1", day(4), day(8)).unwrap();
        let dates: Vec<_> = range.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(4), day(7)]);
        assert_eq!(db.last_snapshot_date().unwrap(), Some(day(8)));
    }
}
