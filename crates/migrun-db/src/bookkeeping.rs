use migrun_common::{Error, Result};
use tracing::debug;

use crate::migrations::MAX_IDENTIFIER_LEN;
use crate::schema::{Column, Schema};

pub const IDENTIFIER_COLUMN: &str = "identifier";
pub const APPLIED_AT_COLUMN: &str = "applied_at";

fn columns() -> [Column; 2] {
    [
        Column::string(IDENTIFIER_COLUMN, MAX_IDENTIFIER_LEN as u32).primary_key(),
        Column::date_time(APPLIED_AT_COLUMN).default_current(),
    ]
}

/// Create the bookkeeping table if missing, then check that whatever table
/// now carries that name has the identifier key and timestamp columns.
/// Existing rows are never touched.
pub fn ensure_table(schema: &Schema<'_>, table: &str) -> Result<()> {
    schema.create_table_if_not_exists(table, &columns())?;

    let existing = schema.columns(table)?;
    let identifier = existing.iter().find(|c| c.name == IDENTIFIER_COLUMN);
    let applied_at = existing.iter().find(|c| c.name == APPLIED_AT_COLUMN);
    let (Some(identifier), Some(applied_at)) = (identifier, applied_at) else {
        return Err(Error::Database(format!(
            "bookkeeping table {table} exists without {IDENTIFIER_COLUMN} and {APPLIED_AT_COLUMN} columns"
        )));
    };

    // A composite key would let the same identifier be recorded twice.
    let key_columns = existing.iter().filter(|c| c.is_primary_key()).count();
    if !identifier.is_primary_key() || key_columns != 1 {
        return Err(Error::Database(format!(
            "bookkeeping table {table} exists but {IDENTIFIER_COLUMN} is not its sole primary key"
        )));
    }

    // Rows are inserted with the identifier only.
    let has_default = applied_at
        .default_value
        .as_deref()
        .is_some_and(|d| !d.eq_ignore_ascii_case("null"));
    if !applied_at.not_null || !has_default {
        return Err(Error::Database(format!(
            "bookkeeping table {table} exists but {APPLIED_AT_COLUMN} is not NOT NULL with a default"
        )));
    }

    debug!("bookkeeping table {table} is ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn creates_table_once_and_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(&conn);

        ensure_table(&schema, "migrations").unwrap();
        conn.execute(
            "INSERT INTO migrations (identifier) VALUES ('000_init')",
            [],
        )
        .unwrap();
        ensure_table(&schema, "migrations").unwrap();

        let ids: Vec<String> = conn
            .prepare("SELECT identifier FROM migrations")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec!["000_init".to_string()]);
    }

    #[test]
    fn accepts_compatible_table_created_elsewhere() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE migrations (
                identifier TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .unwrap();

        assert!(ensure_table(&Schema::new(&conn), "migrations").is_ok());
    }

    #[test]
    fn rejects_incompatible_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE migrations (version INTEGER PRIMARY KEY);")
            .unwrap();

        let err = ensure_table(&Schema::new(&conn), "migrations").unwrap_err();
        assert!(err.to_string().contains("without identifier and applied_at"));
    }

    #[test]
    fn rejects_table_without_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE migrations (identifier TEXT, applied_at TEXT);")
            .unwrap();

        let err = ensure_table(&Schema::new(&conn), "migrations").unwrap_err();
        assert!(err.to_string().contains("not its sole primary key"));
    }

    #[test]
    fn rejects_composite_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE migrations (
                identifier TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (identifier, applied_at)
            );",
        )
        .unwrap();

        let err = ensure_table(&Schema::new(&conn), "migrations").unwrap_err();
        assert!(err.to_string().contains("not its sole primary key"));
    }

    #[test]
    fn rejects_applied_at_without_default() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(&conn);
        for ddl in [
            "CREATE TABLE migrations (identifier TEXT PRIMARY KEY, applied_at TEXT);",
            "CREATE TABLE migrations (identifier TEXT PRIMARY KEY, applied_at TEXT NOT NULL);",
            "CREATE TABLE migrations (identifier TEXT PRIMARY KEY, applied_at TEXT DEFAULT CURRENT_TIMESTAMP);",
            "CREATE TABLE migrations (identifier TEXT PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT NULL);",
        ] {
            conn.execute_batch(ddl).unwrap();
            let err = ensure_table(&schema, "migrations").unwrap_err();
            assert!(
                err.to_string().contains("applied_at is not NOT NULL with a default"),
                "{ddl}"
            );
            conn.execute_batch("DROP TABLE migrations;").unwrap();
        }
    }

    #[test]
    fn accepts_integer_timestamp_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE migrations (
                identifier TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            );",
        )
        .unwrap();

        assert!(ensure_table(&Schema::new(&conn), "migrations").is_ok());
    }
}
