//! In-memory event store
//!
//! Used for dry runs (seeded from a snapshot of the real database) and by
//! tests. Enforces the same external-id uniqueness as the SQLite schema.

use crate::storage::traits::{EventStore, StorageError, StorageResult};
use crate::storage::{EventFields, StoredEvent};

/// Event store backed by a plain vector
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Vec<StoredEvent>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing events, keeping their ids
    pub fn from_events(events: Vec<StoredEvent>) -> Self {
        let next_id = events.iter().map(|e| e.id).max().unwrap_or(0);
        Self { events, next_id }
    }

    /// Current contents, in creation order
    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }

    fn find_mut(&mut self, id: i64) -> StorageResult<&mut StoredEvent> {
        self.events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StorageError::EventNotFound(id))
    }

    fn check_unique(&self, fields: &EventFields, except: Option<i64>) -> StorageResult<()> {
        let Some(key) = fields.external_id.as_deref() else {
            return Ok(());
        };

        let taken = self
            .events
            .iter()
            .any(|e| Some(e.id) != except && e.external_id() == Some(key));
        if taken {
            return Err(StorageError::ConstraintViolation(format!(
                "duplicate external id {}",
                key
            )));
        }
        Ok(())
    }
}

impl EventStore for MemoryStore {
    fn get_all_events(&self) -> StorageResult<Vec<StoredEvent>> {
        Ok(self.events.clone())
    }

    fn create_event(&mut self, fields: &EventFields) -> StorageResult<StoredEvent> {
        self.check_unique(fields, None)?;

        self.next_id += 1;
        let event = StoredEvent {
            id: self.next_id,
            archived: false,
            fields: fields.clone(),
        };
        self.events.push(event.clone());
        Ok(event)
    }

    fn update_event(&mut self, id: i64, fields: &EventFields) -> StorageResult<()> {
        self.check_unique(fields, Some(id))?;

        let event = self.find_mut(id)?;
        event.fields = fields.clone();
        event.archived = false;
        Ok(())
    }

    fn archive_event(&mut self, id: i64) -> StorageResult<()> {
        self.find_mut(id)?.archived = true;
        Ok(())
    }
}
