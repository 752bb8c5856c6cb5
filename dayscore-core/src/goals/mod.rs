//! Goal engine
//!
//! Turns usage sessions and goal definitions into per-period progress:
//!
//! - [`aggregator`]: per-type current value from sessions
//! - [`evaluator`]: status and percentage from a current value
//! - [`streak`]: streaks, success rates, heatmap buckets
//! - [`service`]: [`GoalService`], the entry points callers use
//!
//! Storage is reached only through the traits in [`store`].

pub mod aggregator;
pub mod cache;
pub mod evaluator;
pub mod period;
pub mod service;
pub mod store;
pub mod streak;
pub mod templates;

pub use cache::ProductivityCache;
pub use evaluator::Thresholds;
pub use period::{Period, PeriodPhase, TimeWindow};
pub use service::{BackfillReport, GoalService};
pub use store::{GoalStore, ProductivitySource, SessionSource, SnapshotStore, Stores};
pub use templates::{goal_templates, GoalTemplate, TemplateMeasure, TemplateOverrides};
