//! Repository abstractions for data access.
//!
//! Repositories implement the engine's store traits, hiding the `SeaORM`
//! implementation details from the rest of the application.

pub mod ledger;
mod mapping;

pub use ledger::LedgerRepository;
