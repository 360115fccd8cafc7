//! Core business logic for Caixa.
//!
//! This crate contains the cash-register engine with ZERO web or database
//! dependencies. Persistence is reached only through the store traits in
//! [`cash::store`].
//!
//! # Modules
//!
//! - `cash` - Cash sessions, the append-only ledger, and closing reconciliation

pub mod cash;
