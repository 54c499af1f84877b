use migrun_common::MigrationError;
use tracing::{error, info, trace};

use crate::migrations::MigrationId;
use crate::runner::RunReport;

/// Receives progress notices from a [`Runner`](crate::Runner).
///
/// Purely advisory: nothing in a run depends on what an observer does.
/// Every method defaults to a no-op.
pub trait RunObserver: Send + Sync {
    fn run_started(&self, _total: usize) {}

    fn bookkeeping_checked(&self, _table: &str) {}

    fn migration_skipped(&self, _id: &MigrationId) {}

    fn migration_applying(&self, _id: &MigrationId) {}

    fn migration_applied(&self, _id: &MigrationId) {}

    fn migration_failed(&self, _error: &MigrationError) {}

    fn run_finished(&self, _report: &RunReport) {}
}

/// Emits `tracing` events. The default observer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn run_started(&self, total: usize) {
        info!(number = total, "run migrations");
    }

    fn bookkeeping_checked(&self, table: &str) {
        info!(table, "bookkeeping table checked");
    }

    fn migration_skipped(&self, id: &MigrationId) {
        trace!(name = %id, "migration already applied");
    }

    fn migration_applying(&self, id: &MigrationId) {
        info!(name = %id, "apply migration");
    }

    fn migration_applied(&self, id: &MigrationId) {
        info!(name = %id, "migration recorded");
    }

    fn migration_failed(&self, error: &MigrationError) {
        error!(
            name = error.identifier().unwrap_or("-"),
            kind = %error.kind(),
            "migration run failed: {}",
            error.cause()
        );
    }

    fn run_finished(&self, report: &RunReport) {
        info!(
            applied = report.applied.len(),
            skipped = report.skipped,
            "migrations applied successfully"
        );
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
