//! Storage traits and error types
//!
//! This module defines the interface the synchronizer needs from an event
//! store, and the errors a store may report.

use crate::storage::{EventFields, StoredEvent};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Event not found: {0}")]
    EventNotFound(i64),

    #[error("Another sync run ({run_id}) has been running since {started_at}")]
    RunInProgress { run_id: i64, started_at: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted event store
///
/// Every call is treated as atomic, and calls made in sequence are applied in
/// that order: a later update for an event wins over an earlier one.
pub trait EventStore {
    /// Returns every event, archived ones included
    fn get_all_events(&self) -> StorageResult<Vec<StoredEvent>>;

    /// Creates an event and returns it with its assigned identity
    fn create_event(&mut self, fields: &EventFields) -> StorageResult<StoredEvent>;

    /// Overwrites an event's fields in place and clears its archived flag
    fn update_event(&mut self, id: i64, fields: &EventFields) -> StorageResult<()>;

    /// Flags an event as archived
    fn archive_event(&mut self, id: i64) -> StorageResult<()>;
}
