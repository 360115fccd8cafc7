//! Storage seams for sessions and entries.
//!
//! Implementations must make every mutating call a single atomic unit and
//! enforce the lifecycle invariants themselves, so that several engine
//! processes sharing one database stay correct:
//!
//! - `insert_open` fails with [`StoreError::OpenSessionExists`] when the
//!   operator already has an OPEN session.
//! - `append_entry` succeeds only while the session is OPEN and its
//!   `entry_count` equals `entry.sequence - 1`; it then bumps the count.
//! - `close_session` succeeds only while the session is OPEN and its `entry_count`
//!   equals `expected_entry_count`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use caixa_shared::types::{CashSessionId, OperatorId};

use super::error::StoreError;
use super::types::{CashSession, EntryFilter, LedgerEntry, SessionTotals};

/// Result type alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Terminal transition written by `SessionStore::close_session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClosing {
    /// Session being closed.
    pub session_id: CashSessionId,
    /// Entry count the totals were computed from.
    pub expected_entry_count: u64,
    /// Closing timestamp.
    pub closed_at: DateTime<Utc>,
    /// Optional closing note.
    pub closing_note: Option<String>,
    /// Frozen totals.
    pub totals: SessionTotals,
}

/// Persistent session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new OPEN session, atomically refusing a second open one
    /// for the same operator.
    async fn insert_open(&self, session: &CashSession) -> StoreResult<()>;

    /// Looks a session up by id.
    async fn find_session(&self, id: CashSessionId) -> StoreResult<Option<CashSession>>;

    /// Returns the operator's OPEN session, if any.
    async fn find_open_session(&self, operator_id: OperatorId)
    -> StoreResult<Option<CashSession>>;

    /// All sessions of an operator, newest first.
    async fn list_sessions(&self, operator_id: OperatorId) -> StoreResult<Vec<CashSession>>;

    /// Conditionally closes a session and returns it in CLOSED state.
    async fn close_session(&self, closing: &SessionClosing) -> StoreResult<CashSession>;
}

/// Append-only ledger records.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Appends an entry to an OPEN session at `entry.sequence`.
    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()>;

    /// Entries of a session in sequence order, narrowed by `filter`.
    async fn list_entries(
        &self,
        session_id: CashSessionId,
        filter: &EntryFilter,
    ) -> StoreResult<Vec<LedgerEntry>>;
}

/// A store serving both sessions and entries from one backend.
pub trait LedgerStore: SessionStore + EntryStore {}

impl<T: SessionStore + EntryStore> LedgerStore for T {}
