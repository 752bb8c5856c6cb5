//! # dayscore-core
//!
//! Core library for dayscore - goal tracking over desktop usage sessions.
//!
//! This library provides:
//! - Domain types for usage sessions, goals and goal progress
//! - The goal engine: aggregation, evaluation, streaks and history
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Progress lifecycle
//!
//! - **Open period:** progress is recomputed from sessions on every request
//! - **Closed period:** progress is computed once and frozen as a snapshot;
//!   later edits to the goal never change it
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dayscore_core::{Config, Database, GoalService};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! // Evaluate today's goals
//! let service = GoalService::from_database(Arc::new(db), config.goals);
//! let today = service.goals_for_date(service.today()).expect("failed to evaluate goals");
//! println!("{} of {} goals achieved", today.stats.achieved_today, today.stats.active_goals);
//! ```

// Re-export commonly used items at the crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use goals::{GoalService, ProductivityCache, Stores, TemplateOverrides};
pub use types::*;

// Public modules
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod goals;
pub mod logging;
pub mod types;
