//! Schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::Connection;

use steadfast_core::errors::StoreError;

use crate::to_store_err;

/// v001: resources table.
pub const V001_RESOURCES: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    resource_id TEXT PRIMARY KEY,
    revision INTEGER NOT NULL CHECK (revision > 0),
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
) STRICT;
"#;

const MIGRATIONS: &[(u32, &str)] = &[(1, V001_RESOURCES)];

/// Apply every migration newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_store_err(e.to_string()))?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        conn.execute_batch(sql)
            .map_err(|e| to_store_err(format!("migration v{version:03} failed: {e}")))?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| to_store_err(e.to_string()))?;
        tracing::debug!(version, "applied migration");
    }
    Ok(())
}
