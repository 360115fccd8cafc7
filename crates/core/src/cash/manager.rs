//! Cash session lifecycle.
//!
//! The manager owns the OPEN → CLOSED state machine. Mutations run under a
//! keyed async lock (per operator for opening, per session for recording
//! and closing) held across the whole check-then-write sequence, and every
//! write is additionally conditional at the store, so the invariants hold
//! even when several processes share one database.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use caixa_shared::LedgerSettings;
use caixa_shared::types::{CashSessionId, Money, OperatorId};

use super::error::CashError;
use super::locks::KeyedLocks;
use super::reconciliation::ReconciliationCalculator;
use super::store::{LedgerStore, SessionClosing, StoreResult};
use super::types::{
    CashSession, ClosingReport, EntryFilter, LedgerEntry, NewEntry, SessionTotals, normalize_text,
    timestamp_now,
};
use super::validation::{LedgerPolicy, validate_entry};

/// Orchestrates opening, recording into, and closing cash sessions.
#[derive(Debug)]
pub struct SessionManager<S> {
    store: Arc<S>,
    policy: LedgerPolicy,
    store_timeout: Duration,
    retry_limit: u32,
    operator_locks: KeyedLocks<OperatorId>,
    session_locks: KeyedLocks<CashSessionId>,
}

impl<S: LedgerStore> SessionManager<S> {
    /// Creates a manager with default settings.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_settings(store, &LedgerSettings::default())
    }

    /// Creates a manager from configuration.
    #[must_use]
    pub fn with_settings(store: Arc<S>, settings: &LedgerSettings) -> Self {
        Self {
            store,
            policy: LedgerPolicy::from(settings),
            store_timeout: settings.store_timeout(),
            retry_limit: settings.close_retry_limit,
            operator_locks: KeyedLocks::new(),
            session_locks: KeyedLocks::new(),
        }
    }

    /// The validation policy in force.
    #[must_use]
    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Opens a new session for `operator_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidOpeningFloat` if the float is negative
    /// - `SessionAlreadyOpen` if the operator has an OPEN session
    /// - `StoreUnavailable` on store failure or timeout
    pub async fn open_session(
        &self,
        operator_id: OperatorId,
        opening_float: Money,
        opening_note: Option<String>,
    ) -> Result<CashSession, CashError> {
        if opening_float.is_negative() {
            return Err(CashError::InvalidOpeningFloat(opening_float));
        }

        let _guard = self.operator_locks.lock(&operator_id).await;

        if let Some(existing) = self.bounded(self.store.find_open_session(operator_id)).await? {
            warn!(%operator_id, session_id = %existing.id, "open rejected: session already open");
            return Err(CashError::SessionAlreadyOpen {
                operator_id,
                session_id: Some(existing.id),
            });
        }

        let session =
            CashSession::open(operator_id, opening_float, opening_note, timestamp_now());
        match self.bounded(self.store.insert_open(&session)).await {
            Ok(()) => {
                info!(
                    %operator_id,
                    session_id = %session.id,
                    opening_float = session.opening_float.minor(),
                    "cash session opened"
                );
                Ok(session)
            }
            Err(CashError::SessionAlreadyOpen { .. }) => {
                // Another process won the unique index.
                let existing = match self.bounded(self.store.find_open_session(operator_id)).await {
                    Ok(found) => found.map(|s| s.id),
                    Err(err) => {
                        warn!(%operator_id, error = %err, "could not look up the competing open session");
                        None
                    }
                };
                warn!(%operator_id, "open rejected by store: session already open");
                Err(CashError::SessionAlreadyOpen {
                    operator_id,
                    session_id: existing,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// The operator's OPEN session, if any.
    pub async fn active_session(
        &self,
        operator_id: OperatorId,
    ) -> Result<Option<CashSession>, CashError> {
        debug!(%operator_id, "looking up active cash session");
        self.bounded(self.store.find_open_session(operator_id)).await
    }

    /// A session by id, in any state.
    pub async fn session(&self, session_id: CashSessionId) -> Result<CashSession, CashError> {
        self.bounded(self.store.find_session(session_id))
            .await?
            .ok_or(CashError::SessionNotFound(session_id))
    }

    /// All sessions of an operator, newest first.
    pub async fn sessions(&self, operator_id: OperatorId) -> Result<Vec<CashSession>, CashError> {
        self.bounded(self.store.list_sessions(operator_id)).await
    }

    /// Validates and appends an entry to an OPEN session.
    ///
    /// Validation runs before any store access. The session status is
    /// re-read under the session lock right before the append, and the
    /// append itself is conditional on the session still being OPEN.
    ///
    /// # Errors
    ///
    /// - `InvalidEntry` if validation fails
    /// - `SessionNotFound` / `SessionNotOpen` for a missing or closed session
    /// - `AmountOverflow` if the session totals would leave the `i64` range
    /// - `ConcurrentModification` if other writers kept winning the race
    /// - `AppendOutcomeUnknown` if the append timed out; do not retry blindly
    /// - `StoreUnavailable` on store failure
    pub async fn record_entry(
        &self,
        session_id: CashSessionId,
        entry: NewEntry,
    ) -> Result<LedgerEntry, CashError> {
        if let Err(violation) = validate_entry(&entry, &self.policy) {
            warn!(%session_id, category = %entry.category, %violation, "entry rejected");
            return Err(violation.into());
        }
        if entry.missing_link() {
            warn!(%session_id, category = %entry.category, "entry recorded without its customer/product reference");
        }

        let _guard = self.session_locks.lock(&session_id).await;

        let mut attempt = 0;
        loop {
            let session = self.session(session_id).await?;
            if let Err(err) = session.ensure_open() {
                warn!(%session_id, "entry rejected: session not open");
                return Err(err);
            }

            let recorded = LedgerEntry::record(
                session_id,
                session.entry_count + 1,
                entry.clone(),
                timestamp_now(),
            );

            // The session must stay closable: refuse an entry whose totals
            // no longer fit once it is added.
            let mut entries = self
                .bounded(self.store.list_entries(session_id, &EntryFilter::all()))
                .await?;
            entries.push(recorded.clone());
            if let Err(err) = ReconciliationCalculator::reconcile(session.opening_float, &entries) {
                warn!(
                    %session_id,
                    amount = recorded.amount.minor(),
                    "entry rejected: session totals would overflow"
                );
                return Err(err);
            }

            match self.append_once(&recorded).await {
                Ok(()) => {
                    info!(
                        %session_id,
                        entry_id = %recorded.id,
                        sequence = recorded.sequence,
                        category = %recorded.category,
                        amount = recorded.amount.minor(),
                        "ledger entry recorded"
                    );
                    return Ok(recorded);
                }
                Err(CashError::ConcurrentModification(_)) if attempt < self.retry_limit => {
                    attempt += 1;
                    debug!(%session_id, attempt, "append lost a race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Entries of a session in recording order.
    pub async fn entries(
        &self,
        session_id: CashSessionId,
        filter: &EntryFilter,
    ) -> Result<Vec<LedgerEntry>, CashError> {
        self.session(session_id).await?;
        self.bounded(self.store.list_entries(session_id, filter)).await
    }

    /// Reconciles and closes an OPEN session.
    ///
    /// Totals are computed from the complete entry set and written together
    /// with `status = CLOSED` in one conditional store call. If another
    /// process appended in between, the entries are re-read and the totals
    /// recomputed, up to the configured retry limit.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    /// - `SessionNotOpen` if it is already closed
    /// - `ConcurrentModification` if appends kept racing the close
    /// - `AmountOverflow` if the totals leave the `i64` range
    /// - `StoreUnavailable` on store failure or timeout
    pub async fn close_session(
        &self,
        session_id: CashSessionId,
        closing_note: Option<String>,
    ) -> Result<ClosingReport, CashError> {
        let guard = self.session_locks.lock(&session_id).await;
        let closing_note = normalize_text(closing_note);

        let mut attempt = 0;
        let report = loop {
            let session = self.session(session_id).await?;
            if let Err(err) = session.ensure_open() {
                warn!(%session_id, "close rejected: session not open");
                return Err(err);
            }

            let entries = self
                .bounded(self.store.list_entries(session_id, &EntryFilter::all()))
                .await?;
            let totals = ReconciliationCalculator::reconcile(session.opening_float, &entries)?;
            let closing = SessionClosing {
                session_id,
                expected_entry_count: totals.entry_count,
                closed_at: timestamp_now(),
                closing_note: closing_note.clone(),
                totals,
            };

            match self.bounded(self.store.close_session(&closing)).await {
                Ok(closed) => break ClosingReport::try_new(closed, entries)?,
                Err(CashError::ConcurrentModification(_)) if attempt < self.retry_limit => {
                    attempt += 1;
                    debug!(%session_id, attempt, "close lost a race to an append, recomputing");
                }
                Err(err) => return Err(err),
            }
        };

        drop(guard);

        info!(
            %session_id,
            operator_id = %report.session.operator_id,
            entries = report.totals.entry_count,
            total_inflow = report.totals.total_inflow.minor(),
            total_outflow = report.totals.total_outflow.minor(),
            closing_balance = report.totals.closing_balance.minor(),
            "cash session closed"
        );
        Ok(report)
    }

    /// The frozen report of a CLOSED session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStillOpen` while the session is OPEN.
    pub async fn closing_report(
        &self,
        session_id: CashSessionId,
    ) -> Result<ClosingReport, CashError> {
        let session = self.session(session_id).await?;
        if session.is_open() {
            return Err(CashError::SessionStillOpen(session_id));
        }
        let entries = self
            .bounded(self.store.list_entries(session_id, &EntryFilter::all()))
            .await?;
        ClosingReport::try_new(session, entries)
    }

    /// Provisional totals of an OPEN session, or the frozen ones once closed.
    pub async fn preview_totals(
        &self,
        session_id: CashSessionId,
    ) -> Result<SessionTotals, CashError> {
        let session = self.session(session_id).await?;
        if let Some(totals) = session.totals {
            return Ok(totals);
        }
        let entries = self
            .bounded(self.store.list_entries(session_id, &EntryFilter::all()))
            .await?;
        ReconciliationCalculator::reconcile(session.opening_float, &entries)
    }

    /// Appends one entry under the configured timeout.
    ///
    /// A timed-out append may still have committed, so it is reported as
    /// `AppendOutcomeUnknown` rather than a retryable outage.
    async fn append_once(&self, entry: &LedgerEntry) -> Result<(), CashError> {
        match tokio::time::timeout(self.store_timeout, self.store.append_entry(entry)).await {
            Ok(result) => result.map_err(CashError::from),
            Err(_) => {
                warn!(
                    session_id = %entry.session_id,
                    entry_id = %entry.id,
                    timeout_ms = self.store_timeout.as_millis(),
                    "append timed out, outcome unknown"
                );
                Err(CashError::AppendOutcomeUnknown {
                    session_id: entry.session_id,
                    entry_id: entry.id,
                })
            }
        }
    }

    /// Keys currently tracked by the operator and session lock tables.
    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.operator_locks.len() + self.session_locks.len()
    }

    /// Runs one store call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = StoreResult<T>>,
    ) -> Result<T, CashError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(CashError::from),
            Err(_) => {
                warn!(timeout_ms = self.store_timeout.as_millis(), "store call timed out");
                Err(CashError::StoreUnavailable(format!(
                    "store call exceeded {}ms",
                    self.store_timeout.as_millis()
                )))
            }
        }
    }
}
