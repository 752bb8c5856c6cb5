//! Database layer for dayscore
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Implementations of the goal engine's store traits
//! - Write helpers for recording apps, categories and sessions

pub mod repo;
pub mod schema;

pub use repo::Database;
