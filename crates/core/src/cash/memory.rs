//! In-memory ledger store.
//!
//! Serves as the reference implementation of the store contract and backs
//! the engine tests. All state sits behind one async mutex, so every call
//! is atomic with respect to every other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use caixa_shared::types::{CashSessionId, OperatorId};

use super::error::StoreError;
use super::store::{EntryStore, SessionClosing, SessionStore, StoreResult};
use super::types::{CashSession, EntryFilter, LedgerEntry, SessionStatus};

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<CashSessionId, CashSession>,
    entries: HashMap<CashSessionId, Vec<LedgerEntry>>,
}

/// Ledger store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent call before it touches any state.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Total number of entries across all sessions.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.values().map(Vec::len).sum()
    }

    async fn guard(&self) -> StoreResult<tokio::sync::MutexGuard<'_, MemoryState>> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(self.state.lock().await)
    }
}

#[async_trait]
impl SessionStore for MemoryLedgerStore {
    async fn insert_open(&self, session: &CashSession) -> StoreResult<()> {
        let mut state = self.guard().await?;
        let already_open = state
            .sessions
            .values()
            .any(|s| s.operator_id == session.operator_id && s.is_open());
        if already_open {
            return Err(StoreError::OpenSessionExists(session.operator_id));
        }
        state.sessions.insert(session.id, session.clone());
        state.entries.insert(session.id, Vec::new());
        Ok(())
    }

    async fn find_session(&self, id: CashSessionId) -> StoreResult<Option<CashSession>> {
        let state = self.guard().await?;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn find_open_session(
        &self,
        operator_id: OperatorId,
    ) -> StoreResult<Option<CashSession>> {
        let state = self.guard().await?;
        Ok(state
            .sessions
            .values()
            .find(|s| s.operator_id == operator_id && s.is_open())
            .cloned())
    }

    async fn list_sessions(&self, operator_id: OperatorId) -> StoreResult<Vec<CashSession>> {
        let state = self.guard().await?;
        let mut sessions: Vec<CashSession> = state
            .sessions
            .values()
            .filter(|s| s.operator_id == operator_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.opened_at.cmp(&a.opened_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn close_session(&self, closing: &SessionClosing) -> StoreResult<CashSession> {
        let mut state = self.guard().await?;
        let session = state
            .sessions
            .get_mut(&closing.session_id)
            .ok_or(StoreError::SessionNotFound(closing.session_id))?;
        if !session.is_open() {
            return Err(StoreError::SessionNotOpen(session.id));
        }
        if session.entry_count != closing.expected_entry_count {
            return Err(StoreError::VersionMismatch {
                session_id: session.id,
                expected: closing.expected_entry_count,
                actual: session.entry_count,
            });
        }
        session.status = SessionStatus::Closed;
        session.closed_at = Some(closing.closed_at);
        session.closing_note.clone_from(&closing.closing_note);
        session.totals = Some(closing.totals.clone());
        Ok(session.clone())
    }
}

#[async_trait]
impl EntryStore for MemoryLedgerStore {
    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()> {
        let mut state = self.guard().await?;
        let session = state
            .sessions
            .get_mut(&entry.session_id)
            .ok_or(StoreError::SessionNotFound(entry.session_id))?;
        if !session.is_open() {
            return Err(StoreError::SessionNotOpen(session.id));
        }
        let expected = entry.sequence.saturating_sub(1);
        if session.entry_count != expected {
            return Err(StoreError::VersionMismatch {
                session_id: session.id,
                expected,
                actual: session.entry_count,
            });
        }
        session.entry_count += 1;
        state
            .entries
            .entry(entry.session_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_entries(
        &self,
        session_id: CashSessionId,
        filter: &EntryFilter,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.guard().await?;
        Ok(state
            .entries
            .get(&session_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.matches(e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash::reconciliation::ReconciliationCalculator;
    use crate::cash::types::{NewEntry, PaymentMethod};
    use caixa_shared::types::{Money, ProductId};
    use chrono::Utc;

    fn open_session(operator_id: OperatorId) -> CashSession {
        CashSession::open(operator_id, Money::from_minor(1_000), None, Utc::now())
    }

    fn sale(session_id: CashSessionId, sequence: u64) -> LedgerEntry {
        LedgerEntry::record(
            session_id,
            sequence,
            NewEntry::sale(Money::from_minor(500), PaymentMethod::Cash, ProductId::new()),
            Utc::now(),
        )
    }

    fn closing(session_id: CashSessionId, expected_entry_count: u64) -> SessionClosing {
        SessionClosing {
            session_id,
            expected_entry_count,
            closed_at: Utc::now(),
            closing_note: None,
            totals: ReconciliationCalculator::reconcile(Money::ZERO, &[]).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_open_rejects_second_open_session() {
        let store = MemoryLedgerStore::new();
        let operator = OperatorId::new();
        store.insert_open(&open_session(operator)).await.unwrap();
        assert!(matches!(
            store.insert_open(&open_session(operator)).await,
            Err(StoreError::OpenSessionExists(op)) if op == operator
        ));
        store.insert_open(&open_session(OperatorId::new())).await.unwrap();
    }

    #[tokio::test]
    async fn test_append_enforces_sequence() {
        let store = MemoryLedgerStore::new();
        let session = open_session(OperatorId::new());
        store.insert_open(&session).await.unwrap();

        store.append_entry(&sale(session.id, 1)).await.unwrap();
        assert!(matches!(
            store.append_entry(&sale(session.id, 1)).await,
            Err(StoreError::VersionMismatch { expected: 0, actual: 1, .. })
        ));
        store.append_entry(&sale(session.id, 2)).await.unwrap();

        let stored = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.entry_count, 2);
    }

    #[tokio::test]
    async fn test_close_is_conditional() {
        let store = MemoryLedgerStore::new();
        let session = open_session(OperatorId::new());
        store.insert_open(&session).await.unwrap();
        store.append_entry(&sale(session.id, 1)).await.unwrap();

        assert!(matches!(
            store.close_session(&closing(session.id, 0)).await,
            Err(StoreError::VersionMismatch { expected: 0, actual: 1, .. })
        ));
        let closed = store.close_session(&closing(session.id, 1)).await.unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert!(matches!(
            store.close_session(&closing(session.id, 1)).await,
            Err(StoreError::SessionNotOpen(_))
        ));
        assert!(matches!(
            store.append_entry(&sale(session.id, 2)).await,
            Err(StoreError::SessionNotOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_without_mutation() {
        let store = MemoryLedgerStore::new();
        store.set_unavailable(true);
        let session = open_session(OperatorId::new());
        assert!(matches!(
            store.insert_open(&session).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.find_session(session.id).await.unwrap().is_none());
    }
}
