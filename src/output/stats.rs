//! Console statistics
//!
//! Event counts and the latest run, read from the SQLite store, plus a
//! console rendering of a single sync report.

use crate::output::duration_seconds;
use crate::storage::{RunRecord, SqliteStorage, StorageResult};
use crate::sync::SyncReport;

/// Snapshot of the event store
#[derive(Debug, Clone)]
pub struct EventStatistics {
    /// Events currently listed
    pub active_events: u64,

    /// Events flagged archived
    pub archived_events: u64,

    /// Most recent run, if any has been recorded
    pub latest_run: Option<RunRecord>,
}

impl EventStatistics {
    pub fn total_events(&self) -> u64 {
        self.active_events + self.archived_events
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<EventStatistics> {
    Ok(EventStatistics {
        active_events: storage.count_events(false)?,
        archived_events: storage.count_events(true)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &EventStatistics) {
    println!("=== Event Statistics ===\n");

    println!("Events:");
    println!("  Active:   {}", stats.active_events);
    println!("  Archived: {}", stats.archived_events);
    println!("  Total:    {}", stats.total_events());
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status:  {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = duration_seconds(&run.started_at, run.finished_at.as_deref()) {
                println!("  Duration: {}s", seconds);
            }
            println!(
                "  Created {} / Updated {} / Archived {} / Errors {}",
                run.totals.created, run.totals.updated, run.totals.archived, run.totals.errors
            );
        }
        None => println!("No sync runs recorded yet."),
    }
}

/// Prints a sync report to stdout
pub fn print_report(report: &SyncReport) {
    println!("=== Sync Report ===\n");
    println!("  Created:  {}", report.created);
    println!("  Updated:  {}", report.updated);
    println!("  Archived: {}", report.archived);
    println!("  Items:    {}", report.items.len());
    println!();

    for item in &report.items {
        println!("  - {} ({} departures)", item.name, item.schedule_count);
    }

    if !report.errors.is_empty() {
        println!("\nErrors ({}):", report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
}
