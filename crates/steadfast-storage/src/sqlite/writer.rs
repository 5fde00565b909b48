//! Write helpers: BEGIN IMMEDIATE transactions.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use steadfast_core::errors::StoreError;

use crate::to_store_err;

/// Execute a write operation inside a BEGIN IMMEDIATE transaction.
/// The write lock is taken up front so the read-check-write sequence cannot
/// be interleaved by another connection. Dropping `tx` without commit rolls back.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| to_store_err(format!("failed to begin immediate transaction: {e}")))?;

    let result = f(&tx)?;

    tx.commit()
        .map_err(|e| to_store_err(format!("failed to commit: {e}")))?;

    Ok(result)
}
