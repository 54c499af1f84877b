pub mod bookkeeping;
pub mod migrations;
pub mod observer;
pub mod runner;
pub mod schema;
pub mod store;

pub use migrations::{Migration, MigrationId};
pub use observer::{NoopObserver, RunObserver, TracingObserver};
pub use runner::{RunReport, RunResult, Runner};
pub use schema::{Column, ColumnInfo, Schema};
pub use store::{AppliedMigration, AppliedStore};
