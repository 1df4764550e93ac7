//! Output module for run reports
//!
//! This module handles:
//! - Writing a markdown report of a sync run
//! - Printing event and run statistics to the console

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_report, print_statistics, EventStatistics};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Seconds between two RFC 3339 timestamps, if both parse
pub(crate) fn duration_seconds(started_at: &str, finished_at: Option<&str>) -> Option<i64> {
    let started = started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = finished_at?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}
