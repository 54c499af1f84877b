use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use migrun_common::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::bookkeeping::{self, APPLIED_AT_COLUMN, IDENTIFIER_COLUMN};
use crate::migrations::MigrationId;
use crate::schema::{Schema, validate_name};

/// One row of the bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub identifier: String,
    pub applied_at: DateTime<Utc>,
}

/// Read/write access to the bookkeeping table of one migration track.
pub struct AppliedStore<'a> {
    conn: &'a Connection,
    table: &'a str,
}

impl<'a> AppliedStore<'a> {
    pub fn new(conn: &'a Connection, table: &'a str) -> Result<Self> {
        validate_name(table)?;
        Ok(Self { conn, table })
    }

    pub fn table(&self) -> &str {
        self.table
    }

    /// Must run before any read or write.
    pub fn ensure_table(&self, schema: &Schema<'_>) -> Result<()> {
        bookkeeping::ensure_table(schema, self.table)
    }

    /// All records, oldest first.
    pub fn records(&self) -> Result<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT {IDENTIFIER_COLUMN}, {APPLIED_AT_COLUMN} FROM \"{}\" ORDER BY {APPLIED_AT_COLUMN}, rowid",
            self.table
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?))
            })
            .map_err(|e| Error::Database(format!("failed to query {}: {e}", self.table)))?;

        let mut records = Vec::new();
        for row in rows {
            let (identifier, applied_at) = row.map_err(|e| {
                Error::Database(format!("failed to read {} row: {e}", self.table))
            })?;
            let applied_at = timestamp_from_value(&applied_at).ok_or_else(|| {
                Error::Database(format!(
                    "unreadable {APPLIED_AT_COLUMN} {applied_at:?} for {identifier}"
                ))
            })?;
            records.push(AppliedMigration {
                identifier,
                applied_at,
            });
        }
        Ok(records)
    }

    /// Identifiers only; timestamps are not decoded.
    pub fn applied_set(&self) -> Result<HashSet<String>> {
        let sql = format!("SELECT {IDENTIFIER_COLUMN} FROM \"{}\"", self.table);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(format!("failed to query {}: {e}", self.table)))?;

        let mut applied = HashSet::new();
        for row in rows {
            applied.insert(row.map_err(|e| {
                Error::Database(format!("failed to read {} row: {e}", self.table))
            })?);
        }
        Ok(applied)
    }

    /// Insert one record; the store assigns the timestamp. Fails on a
    /// duplicate identifier.
    pub fn record_applied(&self, id: &MigrationId) -> Result<()> {
        let sql = format!(
            "INSERT INTO \"{}\" ({IDENTIFIER_COLUMN}) VALUES (?1)",
            self.table
        );
        self.conn
            .execute(&sql, params![id.as_str()])
            .map_err(|e| Error::Database(format!("failed to record {id}: {e}")))?;
        Ok(())
    }
}

/// Text timestamps as SQLite or RFC 3339 write them, integers as Unix seconds.
fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Text(s) => parse_datetime(s),
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite strftime/datetime produce "YYYY-MM-DD HH:MM:SS[.SSS]"
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
