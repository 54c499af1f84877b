//! Migration descriptors and the identifiers derived from them.
//!
//! A migration is identified by its position in the caller's list plus its
//! name, e.g. `007_add_users_table`. Lists must therefore only ever be
//! appended to: inserting or reordering entries shifts identifiers and causes
//! earlier migrations to be applied again.

use std::fmt;

use migrun_common::validation::validate_identifier_width;
use migrun_common::{Error, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::schema::Schema;

/// Longest identifier the bookkeeping table accepts.
pub const MAX_IDENTIFIER_LEN: usize = 191;

type Operation = Box<dyn Fn(&Connection, &Schema<'_>) -> Result<()> + Send + Sync>;

/// A named unit of schema or data change, applied at most once.
pub struct Migration {
    name: String,
    operation: Operation,
}

impl Migration {
    pub fn new<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&Connection, &Schema<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(operation),
        }
    }

    /// A migration that executes a fixed batch of SQL statements.
    pub fn sql(name: impl Into<String>, sql: &'static str) -> Self {
        let name = name.into();
        let label = name.clone();
        Self::new(name, move |conn, _| {
            conn.execute_batch(sql)
                .map_err(|e| Error::Database(format!("{label}: {e}")))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn apply(&self, conn: &Connection, schema: &Schema<'_>) -> Result<()> {
        (self.operation)(conn, schema)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Persisted identifier of a migration: zero-padded position, `_`, name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    /// Identifier for the migration at zero-based `index`.
    ///
    /// Fails when `index` does not fit in `width` digits, since a wider
    /// prefix would break lexical ordering against existing records.
    pub fn new(index: usize, name: &str, width: usize) -> Result<Self> {
        validate_identifier_width(width)?;
        if name.is_empty() {
            return Err(Error::InvalidIdentifier(format!(
                "migration at index {index} has an empty name"
            )));
        }
        if index >= 10usize.pow(width as u32) {
            return Err(Error::InvalidIdentifier(format!(
                "migration index {index} does not fit in {width} digits"
            )));
        }

        let id = format!("{index:0width$}_{name}");
        if id.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(Error::InvalidIdentifier(format!(
                "identifier '{id}' is longer than {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifiers for a whole list, in list order.
pub fn identifiers(migrations: &[Migration], width: usize) -> Result<Vec<MigrationId>> {
    migrations
        .iter()
        .enumerate()
        .map(|(index, m)| MigrationId::new(index, m.name(), width))
        .collect()
}
