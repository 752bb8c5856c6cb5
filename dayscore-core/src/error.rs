//! Error types for dayscore-core

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the dayscore-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed goal definition (bad target, missing reference, unit mismatch)
    #[error("invalid goal definition {goal_id}: {message}")]
    Definition { goal_id: String, message: String },

    /// A backing store could not be read
    #[error("{store} unavailable: {message}")]
    DataUnavailable { store: &'static str, message: String },

    /// Two writers tried to freeze different progress for the same goal and date
    #[error("conflicting snapshot for goal {goal_id} on {date}")]
    SnapshotConflict { goal_id: String, date: NaiveDate },

    /// Goal not found
    #[error("goal not found: {0}")]
    GoalNotFound(String),

    /// Attempt to change the type of an existing goal
    #[error("goal {goal_id} is a {from} goal and cannot become {to}")]
    ImmutableGoalType {
        goal_id: String,
        from: &'static str,
        to: &'static str,
    },

    /// App not known to the metadata store
    #[error("app not found: {0}")]
    AppNotFound(String),

    /// Goal template not found
    #[error("goal template not found: {0}")]
    TemplateNotFound(String),

    /// Value outside its accepted domain
    #[error("invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Error {
    /// Build a definition error for a goal.
    pub fn definition(goal_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Definition {
            goal_id: goal_id.into(),
            message: message.into(),
        }
    }

    /// Wrap a store failure so the whole request fails without partial results.
    pub fn unavailable(store: &'static str, err: Error) -> Self {
        match err {
            Error::DataUnavailable { .. } => err,
            other => Error::DataUnavailable {
                store,
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for dayscore-core
pub type Result<T> = std::result::Result<T, Error>;
