//! Storage module for persisted catalog events
//!
//! The synchronizer only ever talks to storage through the [`EventStore`]
//! trait. This module provides:
//! - `SqliteStorage`: the SQLite-backed store used by the CLI, which also
//!   keeps the sync run history and the run-in-progress lease
//! - `MemoryStore`: a plain in-memory store for dry runs and tests

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStorage;
pub use traits::{EventStore, StorageError, StorageResult};

use crate::extract::TourCategory;
use chrono::NaiveDate;
use std::path::Path;

/// Opens (or creates) the SQLite event database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Values written for one event
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    /// Reconciliation key; `None` for events not created by synchronization
    pub external_id: Option<String>,
    pub name: String,
    pub source_url: Option<String>,
    pub price: i64,
    pub currency: String,
    pub category: TourCategory,
    pub duration_days: u32,
    pub locations: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
}

/// An event as held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Store-assigned identity
    pub id: i64,
    /// Archived events are kept, never deleted
    pub archived: bool,
    pub fields: EventFields,
}

impl StoredEvent {
    /// The reconciliation key, if the event has one
    pub fn external_id(&self) -> Option<&str> {
        self.fields.external_id.as_deref()
    }
}

/// Represents one synchronization run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub totals: RunTotals,
}

/// Counters recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub created: u64,
    pub updated: u64,
    pub archived: u64,
    pub errors: u64,
}

/// Status of a synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
