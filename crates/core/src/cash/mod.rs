//! Cash-register sessions and their append-only ledger.
//!
//! This module implements the "caixa" engine:
//! - Session and entry domain types
//! - Per-category entry validation
//! - Closing reconciliation (totals and balance)
//! - Store traits plus an in-memory store
//! - The session manager enforcing the open/closed lifecycle
//! - The `LedgerService` facade used by callers

pub mod error;
pub mod locks;
pub mod lookup;
pub mod manager;
pub mod memory;
pub mod reconciliation;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod ordering_props;
#[cfg(test)]
mod reconciliation_props;
#[cfg(test)]
mod validation_props;

pub use error::{CashError, EntryViolation, StoreError};
pub use lookup::{DescribedEntry, LookupError, NoReferenceLookup, ReferenceLookup};
pub use manager::SessionManager;
pub use memory::MemoryLedgerStore;
pub use reconciliation::ReconciliationCalculator;
pub use service::{EntryRequest, LedgerService};
pub use store::{EntryStore, LedgerStore, SessionClosing, SessionStore, StoreResult};
pub use types::{
    CashSession, ClosingReport, EntryCategory, EntryFilter, LedgerEntry, MethodTotals, NewEntry,
    PaymentMethod, SessionStatus, SessionTotals,
};
pub use validation::{LedgerPolicy, MIN_OUTFLOW_DESCRIPTION_CHARS, validate_entry};
