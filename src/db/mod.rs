pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::{ffi, Connection, ErrorCode, Transaction, TransactionBehavior};

use crate::errors::AppError;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
///
/// The immediate transaction takes SQLite's database-wide write lock before
/// `f` reads anything, so a read-check-write sequence inside `f` is
/// serialized against every other writer on the same file, whichever
/// connection or process it comes from. Each attempt waits for the lock in
/// SQLite's busy handler, bounded by the connection's busy timeout, and
/// lock contention (`SQLITE_BUSY`, `SQLITE_LOCKED`) is then retried up to
/// `retries` times with no extra sleep; any other error,
/// including business-rule rejections returned by `f`, rolls back and is
/// returned immediately.
pub fn write_tx<T, F>(conn: &mut Connection, retries: u32, mut f: F) -> Result<T, AppError>
where
    F: FnMut(&Transaction<'_>) -> Result<T, AppError>,
{
    let mut attempt = 0;
    loop {
        match run_once(conn, &mut f) {
            Err(AppError::Database(e)) if is_busy(&e) => {
                if attempt >= retries {
                    tracing::error!(attempts = attempt + 1, "write lock still busy, giving up");
                    return Err(AppError::Busy);
                }
                attempt += 1;
                tracing::warn!(attempt, "write lock busy, retrying transaction");
            }
            other => return other,
        }
    }
}

fn run_once<T, F>(conn: &mut Connection, f: &mut F) -> Result<T, AppError>
where
    F: FnMut(&Transaction<'_>) -> Result<T, AppError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

pub fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Column named by a UNIQUE or PRIMARY KEY violation, e.g. `users.email`.
/// Other constraint failures (foreign key, CHECK, NOT NULL) yield `None`.
pub fn unique_violation_column(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Some(
                msg.as_deref()
                    .and_then(|m| m.rsplit_once(": "))
                    .map_or("", |(_, column)| column),
            )
        }
        _ => None,
    }
}

pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    unique_violation_column(e).is_some()
}
