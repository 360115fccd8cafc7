//! Caller-facing facade over the session manager.
//!
//! Accepts loosely typed requests (category and method as strings, amounts
//! as raw minor units, references as bare UUIDs) and hands back domain
//! types or a [`CashError`].

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use caixa_shared::LedgerSettings;
use caixa_shared::types::{CashSessionId, CustomerId, Money, OperatorId, ProductId};

use super::error::{CashError, EntryViolation};
use super::lookup::{DescribedEntry, NoReferenceLookup, ReferenceLookup, describe_entries};
use super::manager::SessionManager;
use super::store::LedgerStore;
use super::types::{
    CashSession, ClosingReport, EntryFilter, LedgerEntry, NewEntry, SessionTotals,
};

/// An entry as submitted by a form or API payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntryRequest {
    /// `inflow_payment`, `inflow_sale` or `outflow`.
    pub category: String,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// `cash`, `pix`, `debit` or `credit`.
    pub payment_method: String,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Paying customer.
    #[serde(default)]
    pub linked_customer_id: Option<Uuid>,
    /// Product sold.
    #[serde(default)]
    pub linked_product_id: Option<Uuid>,
}

impl TryFrom<EntryRequest> for NewEntry {
    type Error = EntryViolation;

    fn try_from(request: EntryRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            category: request.category.parse()?,
            amount: Money::from_minor(request.amount_minor),
            payment_method: request.payment_method.parse()?,
            description: request.description,
            linked_customer_id: request.linked_customer_id.map(CustomerId::from_uuid),
            linked_product_id: request.linked_product_id.map(ProductId::from_uuid),
        })
    }
}

/// The ledger engine as seen by UI and API layers.
pub struct LedgerService<S> {
    manager: SessionManager<S>,
    lookup: Arc<dyn ReferenceLookup>,
    lookup_timeout: Duration,
}

impl<S> std::fmt::Debug for LedgerService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService").finish_non_exhaustive()
    }
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates a service with default settings and no name lookup.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_settings(store, &LedgerSettings::default())
    }

    /// Creates a service from configuration.
    #[must_use]
    pub fn with_settings(store: Arc<S>, settings: &LedgerSettings) -> Self {
        Self {
            manager: SessionManager::with_settings(store, settings),
            lookup: Arc::new(NoReferenceLookup),
            lookup_timeout: settings.store_timeout(),
        }
    }

    /// Replaces the customer/product name lookup.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn ReferenceLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// The wrapped manager.
    #[must_use]
    pub fn manager(&self) -> &SessionManager<S> {
        &self.manager
    }

    /// Opens a session with a float given in minor units.
    pub async fn open_session(
        &self,
        operator_id: OperatorId,
        opening_float_minor: i64,
        opening_note: Option<String>,
    ) -> Result<CashSession, CashError> {
        self.manager
            .open_session(operator_id, Money::from_minor(opening_float_minor), opening_note)
            .await
    }

    /// The operator's OPEN session, if any.
    pub async fn get_active_session(
        &self,
        operator_id: OperatorId,
    ) -> Result<Option<CashSession>, CashError> {
        self.manager.active_session(operator_id).await
    }

    /// A session by id.
    pub async fn get_session(&self, session_id: CashSessionId) -> Result<CashSession, CashError> {
        self.manager.session(session_id).await
    }

    /// All sessions of an operator, newest first.
    pub async fn list_sessions(
        &self,
        operator_id: OperatorId,
    ) -> Result<Vec<CashSession>, CashError> {
        self.manager.sessions(operator_id).await
    }

    /// Records a typed entry.
    pub async fn record_entry(
        &self,
        session_id: CashSessionId,
        entry: NewEntry,
    ) -> Result<LedgerEntry, CashError> {
        self.manager.record_entry(session_id, entry).await
    }

    /// Parses and records a raw entry request.
    ///
    /// # Errors
    ///
    /// Unknown category or payment method strings surface as
    /// `InvalidEntry` before the session is looked up.
    pub async fn submit_entry(
        &self,
        session_id: CashSessionId,
        request: EntryRequest,
    ) -> Result<LedgerEntry, CashError> {
        let entry = NewEntry::try_from(request)?;
        self.manager.record_entry(session_id, entry).await
    }

    /// Entries of a session in recording order, optionally narrowed.
    pub async fn list_entries(
        &self,
        session_id: CashSessionId,
        filter: Option<EntryFilter>,
    ) -> Result<Vec<LedgerEntry>, CashError> {
        self.manager
            .entries(session_id, &filter.unwrap_or_default())
            .await
    }

    /// Reconciles and closes a session.
    pub async fn close_session(
        &self,
        session_id: CashSessionId,
        closing_note: Option<String>,
    ) -> Result<ClosingReport, CashError> {
        self.manager.close_session(session_id, closing_note).await
    }

    /// The frozen report of a closed session.
    pub async fn get_closing_report(
        &self,
        session_id: CashSessionId,
    ) -> Result<ClosingReport, CashError> {
        self.manager.closing_report(session_id).await
    }

    /// Running totals of a session.
    pub async fn preview_totals(
        &self,
        session_id: CashSessionId,
    ) -> Result<SessionTotals, CashError> {
        self.manager.preview_totals(session_id).await
    }

    /// Pairs entries with customer and product names. Each lookup gets the
    /// store timeout.
    pub async fn describe_entries(&self, entries: &[LedgerEntry]) -> Vec<DescribedEntry> {
        describe_entries(self.lookup.as_ref(), entries, self.lookup_timeout).await
    }
}
