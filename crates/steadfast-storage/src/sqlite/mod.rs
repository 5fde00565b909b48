//! SQLite-backed revision store.

pub mod migrations;
pub mod writer;

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use steadfast_core::errors::StoreError;
use steadfast_core::models::ResourceRevision;
use steadfast_core::traits::{CasOutcome, RevisionStore};

use crate::to_store_err;

/// `RevisionStore` persisted in a single SQLite table.
///
/// One connection behind a mutex; every CAS runs in a `BEGIN IMMEDIATE`
/// transaction so the revision check and the write are atomic.
pub struct SqliteRevisionStore {
    conn: Mutex<Connection>,
}

impl SqliteRevisionStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| to_store_err(e.to_string()))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )
        .map_err(|e| to_store_err(e.to_string()))?;
        Self::initialize(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| to_store_err(e.to_string()))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// Number of stored resources.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| to_store_err(e.to_string()))
        })
    }
}

impl RevisionStore for SqliteRevisionStore {
    fn read(&self, resource_id: &str) -> Result<Option<ResourceRevision>, StoreError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT revision, payload FROM resources WHERE resource_id = ?1",
                params![resource_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| to_store_err(e.to_string()))
        })?;

        row.map(|(revision, payload)| {
            let payload: Value =
                serde_json::from_str(&payload).map_err(|e| StoreError::CorruptPayload {
                    resource_id: resource_id.to_string(),
                    message: e.to_string(),
                })?;
            Ok(ResourceRevision {
                resource_id: resource_id.to_string(),
                revision_number: revision as u64,
                payload,
            })
        })
        .transpose()
    }

    fn compare_and_set(
        &self,
        resource_id: &str,
        expected_revision: u64,
        new_payload: &Value,
    ) -> Result<CasOutcome, StoreError> {
        let payload = serde_json::to_string(new_payload).map_err(|e| to_store_err(e.to_string()))?;
        self.with_conn(|conn| {
            writer::with_immediate_transaction(conn, |tx| {
                let current: Option<i64> = tx
                    .query_row(
                        "SELECT revision FROM resources WHERE resource_id = ?1",
                        params![resource_id],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| to_store_err(e.to_string()))?;

                match current {
                    None if expected_revision == 0 => {
                        tx.execute(
                            "INSERT INTO resources (resource_id, revision, payload, updated_at)
                             VALUES (?1, 1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                            params![resource_id, payload],
                        )
                        .map_err(|e| to_store_err(e.to_string()))?;
                        Ok(CasOutcome::Committed { revision: 1 })
                    }
                    None => Ok(CasOutcome::StaleRevision { current: 0 }),
                    Some(current) if current as u64 == expected_revision => {
                        let next = current + 1;
                        tx.execute(
                            "UPDATE resources
                             SET revision = ?2, payload = ?3,
                                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                             WHERE resource_id = ?1",
                            params![resource_id, next, payload],
                        )
                        .map_err(|e| to_store_err(e.to_string()))?;
                        Ok(CasOutcome::Committed {
                            revision: next as u64,
                        })
                    }
                    Some(current) => Ok(CasOutcome::StaleRevision {
                        current: current as u64,
                    }),
                }
            })
        })
    }
}
