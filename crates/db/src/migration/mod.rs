//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration. The SQL is kept to the
//! subset shared by `PostgreSQL` and `SQLite` so tests can run in memory.

pub use sea_orm_migration::prelude::*;

mod m20261014_000001_cash_ledger;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261014_000001_cash_ledger::Migration)]
    }
}
