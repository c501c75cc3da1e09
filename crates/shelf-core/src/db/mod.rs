//! Connection setup for the SQLite catalog store.
//!
//! File databases run in WAL mode with `synchronous = NORMAL` and a 5s busy
//! timeout. Every connection, file or in-memory, has `foreign_keys = ON`.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a connection waits on another writer before `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open or create the catalog database at `path` and migrate it.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or opening,
/// configuring or migrating the database fails.
pub fn open_catalog_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create catalog db directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("open catalog database {}", path.display()))?;
    prepare(conn, true)
}

/// Private in-memory catalog with the same schema.
///
/// # Errors
///
/// Returns an error if configuring or migrating the database fails.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory catalog database")?;
    prepare(conn, false)
}

fn prepare(mut conn: Connection, on_disk: bool) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    if on_disk {
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("set synchronous mode")?;
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .context("enable WAL journal")?;
        tracing::trace!(journal_mode = %mode, "catalog database opened");
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .context("set busy timeout")?;
    }
    migrations::migrate(&mut conn).context("apply catalog migrations")?;
    Ok(conn)
}
