//! `SeaORM` entity definitions.

pub mod cash_sessions;
pub mod ledger_entries;
