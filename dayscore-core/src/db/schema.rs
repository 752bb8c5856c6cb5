//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: usage tracking, goals and frozen goal progress
    r#"
    -- ============================================
    -- Usage metadata and sessions
    -- ============================================

    CREATE TABLE IF NOT EXISTS categories (
        name                  TEXT PRIMARY KEY,
        productivity_level    TEXT NOT NULL DEFAULT 'neutral',
        color                 TEXT,
        created_at            DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS apps (
        id                    TEXT PRIMARY KEY,
        name                  TEXT NOT NULL,
        category              TEXT NOT NULL DEFAULT 'Uncategorized',
        -- Overrides the category's level when set
        productivity_override TEXT,
        created_at            DATETIME NOT NULL
    );

    -- Times are epoch milliseconds; end_ms is NULL while the app has focus
    CREATE TABLE IF NOT EXISTS sessions (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        app_id                TEXT NOT NULL REFERENCES apps(id),
        start_ms              INTEGER NOT NULL,
        end_ms                INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_ms);
    CREATE INDEX IF NOT EXISTS idx_sessions_end ON sessions(end_ms);
    CREATE INDEX IF NOT EXISTS idx_apps_category ON apps(category);

    -- ============================================
    -- Goals
    -- ============================================

    CREATE TABLE IF NOT EXISTS goals (
        id                    TEXT PRIMARY KEY,
        name                  TEXT NOT NULL,
        description           TEXT,
        icon                  TEXT,
        goal_type             TEXT NOT NULL,
        target_value          REAL NOT NULL,
        target_unit           TEXT NOT NULL,
        target_type           TEXT NOT NULL,
        frequency             TEXT NOT NULL DEFAULT 'daily',
        reference_type        TEXT,
        reference_id          TEXT,
        min_session_minutes   INTEGER,
        -- Comma-separated weekday numbers, 0 = Sunday; NULL = every day
        active_days           TEXT,
        created_at            DATETIME NOT NULL,
        updated_at            DATETIME NOT NULL,
        deleted_at            DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_goals_created ON goals(created_at);

    -- Frozen progress of elapsed periods, keyed by the period's last day.
    -- No foreign key: snapshots outlive their goal.
    CREATE TABLE IF NOT EXISTS goal_progress (
        goal_id               TEXT NOT NULL,
        date                  TEXT NOT NULL,
        period_start          TEXT NOT NULL,
        period_end            TEXT NOT NULL,
        goal_name             TEXT NOT NULL,
        current_value         REAL NOT NULL,
        target_value          REAL NOT NULL,
        target_unit           TEXT NOT NULL,
        target_type           TEXT NOT NULL,
        progress_percentage   INTEGER NOT NULL,
        status                TEXT NOT NULL,
        streak_days           INTEGER NOT NULL DEFAULT 0,
        computed_at           DATETIME NOT NULL,
        PRIMARY KEY (goal_id, date)
    );

    CREATE INDEX IF NOT EXISTS idx_goal_progress_date ON goal_progress(date);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = ["categories", "apps", "sessions", "goals", "goal_progress"];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_goal_progress_has_no_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let fk_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_foreign_key_list('goal_progress')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(fk_count, 0);
    }
}
