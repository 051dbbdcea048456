//! Database entity models.

pub mod task;

pub use task::ComparisonTask;
