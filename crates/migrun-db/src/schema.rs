//! Minimal schema-definition helper over a SQLite connection.

use migrun_common::{Error, Result};
use rusqlite::{Connection, params};
use tracing::debug;

pub use migrun_common::validation::validate_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Bounded string. SQLite does not enforce the bound; callers do.
    String(u32),
    DateTime,
    Integer,
    Text,
}

/// Column specification for [`Schema::create_table_if_not_exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    primary_key: bool,
    not_null: bool,
    default_current: bool,
}

impl Column {
    fn with_type(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            not_null: false,
            default_current: false,
        }
    }

    pub fn string(name: impl Into<String>, max_len: u32) -> Self {
        Self::with_type(name, ColumnType::String(max_len))
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::with_type(name, ColumnType::DateTime)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_type(name, ColumnType::Integer)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::with_type(name, ColumnType::Text)
    }

    /// Primary key columns are also `NOT NULL`; SQLite would otherwise allow
    /// NULL keys on non-integer columns.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Default to the insertion time, UTC with millisecond precision.
    pub fn default_current(mut self) -> Self {
        self.default_current = true;
        self.not_null = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    fn definition(&self) -> Result<String> {
        validate_name(&self.name)?;
        let ty = match self.ty {
            ColumnType::String(len) => format!("VARCHAR({len})"),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Text => "TEXT".to_string(),
        };

        let mut def = format!("\"{}\" {ty}", self.name);
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.default_current {
            match self.ty {
                ColumnType::DateTime | ColumnType::Text => {
                    def.push_str(" DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))");
                }
                _ => {
                    return Err(Error::Database(format!(
                        "column '{}' cannot default to the current time",
                        self.name
                    )));
                }
            }
        }
        Ok(def)
    }
}

/// A column as reported by SQLite for an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    /// Default expression as written in the table definition.
    pub default_value: Option<String>,
    /// 1-based position within the primary key, 0 if not part of it.
    pub primary_key_position: u32,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_position > 0
    }
}

/// Schema helper bound to one connection.
#[derive(Clone, Copy)]
pub struct Schema<'a> {
    conn: &'a Connection,
}

impl<'a> Schema<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    pub fn create_table_if_not_exists(&self, table: &str, columns: &[Column]) -> Result<()> {
        validate_name(table)?;
        if columns.is_empty() {
            return Err(Error::Database(format!(
                "table '{table}' needs at least one column"
            )));
        }

        let defs = columns
            .iter()
            .map(Column::definition)
            .collect::<Result<Vec<_>>>()?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (\n    {}\n)",
            defs.join(",\n    ")
        );

        debug!("ensuring table {table}");
        self.conn
            .execute_batch(&sql)
            .map_err(|e| Error::Database(format!("failed to create table {table}: {e}")))?;
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT count(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to look up table {table}: {e}")))
    }

    /// Columns of `table` in declaration order. Empty if the table does not exist.
    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value, pk
                 FROM pragma_table_info(?1) ORDER BY cid",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    not_null: row.get::<_, i64>(2)? != 0,
                    default_value: row.get(3)?,
                    primary_key_position: row.get(4)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to inspect table {table}: {e}")))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(
                row.map_err(|e| Error::Database(format!("failed to read column info: {e}")))?,
            );
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_column_definitions() {
        let col = Column::string("identifier", 191).primary_key();
        assert_eq!(
            col.definition().unwrap(),
            "\"identifier\" VARCHAR(191) PRIMARY KEY NOT NULL"
        );

        let col = Column::date_time("applied_at").default_current();
        assert_eq!(
            col.definition().unwrap(),
            "\"applied_at\" DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))"
        );

        assert_eq!(Column::integer("n").definition().unwrap(), "\"n\" INTEGER");
        assert!(Column::integer("n").default_current().definition().is_err());
    }

    #[test]
    fn create_table_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(&conn);
        let columns = [
            Column::integer("id").primary_key(),
            Column::text("body").not_null(),
        ];

        assert!(!schema.table_exists("notes").unwrap());
        schema.create_table_if_not_exists("notes", &columns).unwrap();
        conn.execute("INSERT INTO notes (id, body) VALUES (1, 'hi')", [])
            .unwrap();
        schema.create_table_if_not_exists("notes", &columns).unwrap();

        assert!(schema.table_exists("notes").unwrap());
        let count: i64 = conn
            .query_row("SELECT count(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn reports_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(&conn);
        schema
            .create_table_if_not_exists(
                "history",
                &[
                    Column::string("identifier", 191).primary_key(),
                    Column::date_time("applied_at").default_current(),
                ],
            )
            .unwrap();

        let columns = schema.columns("history").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "identifier");
        assert_eq!(columns[0].declared_type, "VARCHAR(191)");
        assert!(columns[0].is_primary_key());
        assert!(columns[0].not_null);
        assert_eq!(columns[1].name, "applied_at");
        assert!(!columns[1].is_primary_key());
        assert!(columns[1].not_null);
        assert!(
            columns[1]
                .default_value
                .as_deref()
                .is_some_and(|d| d.contains("strftime"))
        );

        assert!(schema.columns("missing").unwrap().is_empty());
    }

    #[test]
    fn rejects_unsafe_table_names_and_empty_column_lists() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = Schema::new(&conn);
        assert!(
            schema
                .create_table_if_not_exists("x\"; DROP", &[Column::integer("id")])
                .is_err()
        );
        assert!(schema.create_table_if_not_exists("empty", &[]).is_err());
    }
}
