use std::collections::HashSet;
use std::sync::Arc;

use migrun_common::{Error, ErrorKind, MigrationError};
use migrun_config::MigrationConfig;
use migrun_config::model::{DEFAULT_IDENTIFIER_WIDTH, DEFAULT_TABLE};
use rusqlite::Connection;
use serde::Serialize;

use crate::migrations::{self, Migration, MigrationId};
use crate::observer::{RunObserver, TracingObserver};
use crate::schema::Schema;
use crate::store::{AppliedMigration, AppliedStore};

pub type RunResult<T> = std::result::Result<T, MigrationError>;

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Identifiers applied during this run, in the order they were applied.
    pub applied: Vec<MigrationId>,
    /// Migrations that were already recorded and left alone.
    pub skipped: usize,
}

/// Applies an ordered list of migrations exactly once each.
///
/// A run is synchronous and stops at the first failure. Concurrent runs
/// against the same bookkeeping table are not coordinated; the losing insert
/// fails on the primary key and surfaces as [`ErrorKind::StoreWrite`].
pub struct Runner {
    table: String,
    identifier_width: usize,
    observer: Arc<dyn RunObserver>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            identifier_width: DEFAULT_IDENTIFIER_WIDTH,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new()
            .with_table(config.table.clone())
            .with_identifier_width(config.identifier_width)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_identifier_width(mut self, width: usize) -> Self {
        self.identifier_width = width;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identifier_width(&self) -> usize {
        self.identifier_width
    }

    /// Apply every pending migration, using a schema helper bound to `conn`.
    pub fn run(&self, conn: &Connection, migrations: &[Migration]) -> RunResult<RunReport> {
        self.run_with_schema(conn, &Schema::new(conn), migrations)
    }

    /// Apply every pending migration in list order.
    ///
    /// On failure nothing after the failing migration is attempted. A
    /// [`ErrorKind::StoreWrite`] failure means the migration's change is in
    /// place but unrecorded; it must be inspected before re-running.
    pub fn run_with_schema(
        &self,
        conn: &Connection,
        schema: &Schema<'_>,
        migrations: &[Migration],
    ) -> RunResult<RunReport> {
        self.observer.run_started(migrations.len());

        let result = self.apply_pending(conn, schema, migrations);
        match &result {
            Ok(report) => self.observer.run_finished(report),
            Err(e) => self.observer.migration_failed(e),
        }
        result
    }

    /// Identifiers that a run would apply, without applying them. Creates the
    /// bookkeeping table if needed.
    pub fn pending(
        &self,
        conn: &Connection,
        migrations: &[Migration],
    ) -> RunResult<Vec<MigrationId>> {
        let ids = self.identifiers(migrations)?;
        let store = self.open_store(conn, &Schema::new(conn))?;
        let applied = load_applied(&store)?;
        Ok(ids
            .into_iter()
            .filter(|id| !applied.contains(id.as_str()))
            .collect())
    }

    /// Bookkeeping records, oldest first. Creates the table if needed.
    pub fn applied(&self, conn: &Connection) -> RunResult<Vec<AppliedMigration>> {
        let store = self.open_store(conn, &Schema::new(conn))?;
        store
            .records()
            .map_err(|e| MigrationError::new(ErrorKind::StoreRead, e))
    }

    fn apply_pending(
        &self,
        conn: &Connection,
        schema: &Schema<'_>,
        migrations: &[Migration],
    ) -> RunResult<RunReport> {
        let ids = self.identifiers(migrations)?;
        let store = self.open_store(conn, schema)?;
        let applied = load_applied(&store)?;

        let mut report = RunReport::default();
        for (migration, id) in migrations.iter().zip(ids) {
            if applied.contains(id.as_str()) {
                self.observer.migration_skipped(&id);
                report.skipped += 1;
                continue;
            }

            self.observer.migration_applying(&id);
            migration.apply(conn, schema).map_err(|e| {
                MigrationError::new(ErrorKind::Apply, e).with_identifier(id.as_str())
            })?;
            store.record_applied(&id).map_err(|e| {
                MigrationError::new(ErrorKind::StoreWrite, e).with_identifier(id.as_str())
            })?;
            self.observer.migration_applied(&id);
            report.applied.push(id);
        }
        Ok(report)
    }

    fn identifiers(&self, migrations: &[Migration]) -> RunResult<Vec<MigrationId>> {
        migrations::identifiers(migrations, self.identifier_width)
            .map_err(|e| MigrationError::new(ErrorKind::InvalidList, e))
    }

    fn open_store<'a>(
        &'a self,
        conn: &'a Connection,
        schema: &Schema<'_>,
    ) -> RunResult<AppliedStore<'a>> {
        let bookkeeping = |e: Error| MigrationError::new(ErrorKind::Bookkeeping, e);
        let store = AppliedStore::new(conn, &self.table).map_err(bookkeeping)?;
        store.ensure_table(schema).map_err(bookkeeping)?;
        self.observer.bookkeeping_checked(&self.table);
        Ok(store)
    }
}

fn load_applied(store: &AppliedStore<'_>) -> RunResult<HashSet<String>> {
    store
        .applied_set()
        .map_err(|e| MigrationError::new(ErrorKind::StoreRead, e))
}
