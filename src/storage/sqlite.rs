//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the EventStore
//! trait, plus the sync run history kept alongside the events.

use crate::extract::TourCategory;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{EventStore, StorageError, StorageResult};
use crate::storage::{EventFields, RunRecord, RunStatus, RunTotals, StoredEvent};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const EVENT_COLUMNS: &str = "id, external_id, name, source_url, price, currency, category, \
     duration_days, start_date, end_date, description, archived";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing database without writing to it
    ///
    /// No pragmas are set and the schema is not touched. Every write through
    /// this handle fails.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Starts a run, taking the run-in-progress lease
    ///
    /// Fails with `RunInProgress` while another run is marked running and
    /// younger than `lease`. An older running run is considered abandoned and
    /// marked interrupted.
    pub fn begin_run(&mut self, config_hash: &str, lease: Duration) -> StorageResult<i64> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;

        let running: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, started_at FROM sync_runs WHERE status = ?1 ORDER BY id DESC LIMIT 1",
                params![RunStatus::Running.to_db_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((run_id, started_at)) = running {
            let within_lease = DateTime::parse_from_rfc3339(&started_at)
                .map(|started| now - started.with_timezone(&Utc) < lease)
                .unwrap_or(false);

            if within_lease {
                return Err(StorageError::RunInProgress { run_id, started_at });
            }

            tracing::warn!(
                "Run {} (started {}) outlived its lease; marking it interrupted",
                run_id,
                started_at
            );
            tx.execute(
                "UPDATE sync_runs SET status = ?1 WHERE status = ?2",
                params![
                    RunStatus::Interrupted.to_db_string(),
                    RunStatus::Running.to_db_string()
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO sync_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                now.to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(run_id)
    }

    /// Closes a run, releasing the lease and recording its totals
    pub fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE sync_runs
             SET status = ?1, finished_at = ?2, created = ?3, updated = ?4, archived = ?5, error_count = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                Utc::now().to_rfc3339(),
                totals.created as i64,
                totals.updated as i64,
                totals.archived as i64,
                totals.errors as i64,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::Database(format!("Run not found: {}", run_id)));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, created, updated, archived, error_count
                 FROM sync_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Failed),
                        totals: RunTotals {
                            created: row.get::<_, i64>(5)? as u64,
                            updated: row.get::<_, i64>(6)? as u64,
                            archived: row.get::<_, i64>(7)? as u64,
                            errors: row.get::<_, i64>(8)? as u64,
                        },
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    // ===== Statistics =====

    /// Counts events by archived flag
    pub fn count_events(&self, archived: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE archived = ?1",
            params![archived],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl EventStore for SqliteStorage {
    fn get_all_events(&self) -> StorageResult<Vec<StoredEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM events ORDER BY id", EVENT_COLUMNS))?;
        let mut events = stmt
            .query_map([], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT event_id, name FROM event_locations ORDER BY event_id, position")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut locations: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            let (event_id, name) = row?;
            locations.entry(event_id).or_default().push(name);
        }

        for event in &mut events {
            event.fields.locations = locations.remove(&event.id).unwrap_or_default();
        }

        Ok(events)
    }

    fn create_event(&mut self, fields: &EventFields) -> StorageResult<StoredEvent> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO events (external_id, name, source_url, price, currency, category,
                 duration_days, start_date, end_date, description, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?11)",
            params![
                fields.external_id,
                fields.name,
                fields.source_url,
                fields.price,
                fields.currency,
                fields.category.to_db_string(),
                fields.duration_days,
                fields.start_date.format(DATE_FORMAT).to_string(),
                fields.end_date.format(DATE_FORMAT).to_string(),
                fields.description,
                now
            ],
        )
        .map_err(write_error)?;

        let id = tx.last_insert_rowid();
        insert_locations(&tx, id, &fields.locations)?;
        tx.commit()?;

        Ok(StoredEvent {
            id,
            archived: false,
            fields: fields.clone(),
        })
    }

    fn update_event(&mut self, id: i64, fields: &EventFields) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let changed = tx
            .execute(
                "UPDATE events
                 SET external_id = ?1, name = ?2, source_url = ?3, price = ?4, currency = ?5,
                     category = ?6, duration_days = ?7, start_date = ?8, end_date = ?9,
                     description = ?10, archived = 0, updated_at = ?11
                 WHERE id = ?12",
                params![
                    fields.external_id,
                    fields.name,
                    fields.source_url,
                    fields.price,
                    fields.currency,
                    fields.category.to_db_string(),
                    fields.duration_days,
                    fields.start_date.format(DATE_FORMAT).to_string(),
                    fields.end_date.format(DATE_FORMAT).to_string(),
                    fields.description,
                    Utc::now().to_rfc3339(),
                    id
                ],
            )
            .map_err(write_error)?;

        if changed == 0 {
            return Err(StorageError::EventNotFound(id));
        }

        tx.execute(
            "DELETE FROM event_locations WHERE event_id = ?1",
            params![id],
        )?;
        insert_locations(&tx, id, &fields.locations)?;
        tx.commit()?;

        Ok(())
    }

    fn archive_event(&mut self, id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE events SET archived = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;

        if changed == 0 {
            return Err(StorageError::EventNotFound(id));
        }
        Ok(())
    }
}

fn insert_locations(conn: &Connection, event_id: i64, locations: &[String]) -> StorageResult<()> {
    let mut stmt = conn
        .prepare("INSERT INTO event_locations (event_id, position, name) VALUES (?1, ?2, ?3)")?;
    for (position, name) in locations.iter().enumerate() {
        stmt.execute(params![event_id, position as i64, name])?;
    }
    Ok(())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    let category: String = row.get(6)?;
    let start_date: String = row.get(8)?;
    let end_date: String = row.get(9)?;

    Ok(StoredEvent {
        id: row.get(0)?,
        archived: row.get(11)?,
        fields: EventFields {
            external_id: row.get(1)?,
            name: row.get(2)?,
            source_url: row.get(3)?,
            price: row.get(4)?,
            currency: row.get(5)?,
            category: TourCategory::from_db_string(&category).unwrap_or_default(),
            duration_days: row.get(7)?,
            locations: Vec::new(),
            start_date: parse_date(8, &start_date)?,
            end_date: parse_date(9, &end_date)?,
            description: row.get(10)?,
        },
    })
}

fn parse_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Surfaces constraint failures (duplicate external id) as their own variant
fn write_error(error: rusqlite::Error) -> StorageError {
    match error {
        rusqlite::Error::SqliteFailure(err, message)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(message.unwrap_or_else(|| err.to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}
