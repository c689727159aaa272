//! Background Tasks Module
//!
//! Contains background tasks that run periodically during proxy operation.
//!
//! # Tasks
//! - Stats reporting: logs a cache statistics snapshot at configured intervals

mod stats_report;

pub use stats_report::spawn_stats_task;
