//! Ordered schema upgrades for the SQLite catalog.
//!
//! The applied version lives in both `PRAGMA user_version` and
//! `catalog_meta.schema_version`; the pragma is authoritative.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "catalog tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "product lookup indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version recorded in `PRAGMA user_version`.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

/// Bring the catalog schema up to [`LATEST_SCHEMA_VERSION`].
///
/// Every step runs in its own transaction together with its version bump.
/// Steps at or below the recorded version are skipped, so calling this on
/// an up-to-date database does nothing.
///
/// # Errors
///
/// Returns an error if any step fails; earlier steps stay applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut applied = start;

    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        let version = i64::from(step.version);
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.execute("UPDATE catalog_meta SET schema_version = ?1 WHERE id = 1", [version])?;
        tx.commit()?;

        tracing::debug!(version = step.version, name = step.name, "catalog schema upgraded");
        applied = step.version;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, MIGRATIONS, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn has_object(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
            params![kind, name],
            |row| row.get(0),
        )
    }

    fn meta_version(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT schema_version FROM catalog_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )
    }

    #[test]
    fn steps_are_strictly_ascending_and_end_at_latest() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(
            MIGRATIONS.last().map(|m| m.version),
            Some(LATEST_SCHEMA_VERSION)
        );
    }

    #[test]
    fn fresh_database_gets_every_table_and_index() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in ["categories", "products", "catalog_meta"] {
            assert!(has_object(&conn, "table", table)?, "missing table {table}");
        }
        for index in schema::REQUIRED_INDEXES {
            assert!(has_object(&conn, "index", index)?, "missing index {index}");
        }
        Ok(())
    }

    #[test]
    fn second_run_changes_nothing() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM catalog_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);
        assert_eq!(meta_version(&conn)?, i64::from(LATEST_SCHEMA_VERSION));
        Ok(())
    }

    #[test]
    fn v1_catalog_keeps_its_categories_after_upgrade() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "INSERT INTO categories (id, name, description, created_at_us, updated_at_us)
             VALUES ('c1', 'Drinks', NULL, 1, 1)",
            [],
        )?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let names: String =
            conn.query_row("SELECT group_concat(name) FROM categories", [], |row| row.get(0))?;
        assert_eq!(names, "Drinks");
        assert!(has_object(&conn, "index", "idx_products_category_id")?);
        assert_eq!(meta_version(&conn)?, 2);
        Ok(())
    }
}
