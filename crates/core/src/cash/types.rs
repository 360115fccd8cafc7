//! Cash session domain types.
//!
//! A [`CashSession`] is one operator's bounded operating period. Every
//! financial movement recorded during it is a [`LedgerEntry`]; once the
//! session closes, its entries and [`SessionTotals`] are frozen.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use caixa_shared::types::{
    CashSessionId, CustomerId, LedgerEntryId, Money, OperatorId, ProductId,
};

use super::error::{CashError, EntryViolation};

/// Lifecycle state of a cash session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Register is operating; entries may be recorded.
    Open,
    /// Register has been reconciled (terminal).
    Closed,
}

impl SessionStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown session status: {s}")),
        }
    }
}

/// Kind of financial movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// Payment received from a customer (enrollment fee, monthly plan).
    InflowPayment,
    /// Product sold over the counter.
    InflowSale,
    /// Cash taken out of the register.
    Outflow,
}

impl EntryCategory {
    /// All categories, in display order.
    pub const ALL: [Self; 3] = [Self::InflowPayment, Self::InflowSale, Self::Outflow];

    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InflowPayment => "inflow_payment",
            Self::InflowSale => "inflow_sale",
            Self::Outflow => "outflow",
        }
    }

    /// Returns true for categories that add money to the register.
    #[must_use]
    pub const fn is_inflow(self) -> bool {
        matches!(self, Self::InflowPayment | Self::InflowSale)
    }
}

impl std::fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryCategory {
    type Err = EntryViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inflow_payment" => Ok(Self::InflowPayment),
            "inflow_sale" => Ok(Self::InflowSale),
            "outflow" => Ok(Self::Outflow),
            _ => Err(EntryViolation::UnknownCategory(s.to_string())),
        }
    }
}

/// How the money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Notes and coins.
    Cash,
    /// Brazilian instant payment.
    Pix,
    /// Debit card.
    Debit,
    /// Credit card.
    Credit,
}

impl PaymentMethod {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Pix => "pix",
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = EntryViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "dinheiro" => Ok(Self::Cash),
            "pix" => Ok(Self::Pix),
            "debit" | "debito" => Ok(Self::Debit),
            "credit" | "credito" => Ok(Self::Credit),
            _ => Err(EntryViolation::UnknownPaymentMethod(s.to_string())),
        }
    }
}

/// Inflow and outflow sums for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotals {
    /// The payment method.
    pub method: PaymentMethod,
    /// Sum of inflow amounts paid this way.
    pub inflow: Money,
    /// Sum of outflow amounts paid this way.
    pub outflow: Money,
}

/// Totals computed once, at closing, from the frozen entry set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    /// Sum of payment and sale amounts.
    pub total_inflow: Money,
    /// Sum of outflow amounts.
    pub total_outflow: Money,
    /// `opening_float + total_inflow - total_outflow`.
    pub closing_balance: Money,
    /// Number of entries the totals were computed from.
    pub entry_count: u64,
    /// Per payment method breakdown, ordered by method.
    pub by_method: Vec<MethodTotals>,
}

/// A cash-register session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSession {
    /// Unique identifier.
    pub id: CashSessionId,
    /// Operator who opened the register.
    pub operator_id: OperatorId,
    /// Starting cash declared at opening.
    pub opening_float: Money,
    /// Optional note written at opening.
    pub opening_note: Option<String>,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
    /// Current status.
    pub status: SessionStatus,
    /// Entries appended so far; also the optimistic-concurrency version.
    pub entry_count: u64,
    /// When the session was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Optional note written at closing.
    pub closing_note: Option<String>,
    /// Frozen totals, present only once closed.
    pub totals: Option<SessionTotals>,
}

impl CashSession {
    /// Builds a fresh OPEN session.
    #[must_use]
    pub fn open(
        operator_id: OperatorId,
        opening_float: Money,
        opening_note: Option<String>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CashSessionId::new(),
            operator_id,
            opening_float,
            opening_note: normalize_text(opening_note),
            opened_at,
            status: SessionStatus::Open,
            entry_count: 0,
            closed_at: None,
            closing_note: None,
            totals: None,
        }
    }

    /// Returns true if entries may still be recorded.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Fails with `SessionNotOpen` unless the session is OPEN.
    pub fn ensure_open(&self) -> Result<(), CashError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CashError::SessionNotOpen(self.id))
        }
    }
}

/// Entry data proposed by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Kind of movement.
    pub category: EntryCategory,
    /// Amount in minor units.
    pub amount: Money,
    /// How the money moved.
    pub payment_method: PaymentMethod,
    /// Free text; required for outflows.
    pub description: Option<String>,
    /// Paying customer, expected for payments.
    pub linked_customer_id: Option<CustomerId>,
    /// Product sold, expected for sales.
    pub linked_product_id: Option<ProductId>,
}

impl NewEntry {
    /// A customer payment.
    #[must_use]
    pub fn payment(amount: Money, payment_method: PaymentMethod, customer: CustomerId) -> Self {
        Self {
            category: EntryCategory::InflowPayment,
            amount,
            payment_method,
            description: None,
            linked_customer_id: Some(customer),
            linked_product_id: None,
        }
    }

    /// A product sale.
    #[must_use]
    pub fn sale(amount: Money, payment_method: PaymentMethod, product: ProductId) -> Self {
        Self {
            category: EntryCategory::InflowSale,
            amount,
            payment_method,
            description: None,
            linked_customer_id: None,
            linked_product_id: Some(product),
        }
    }

    /// A withdrawal from the register.
    #[must_use]
    pub fn outflow(
        amount: Money,
        payment_method: PaymentMethod,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: EntryCategory::Outflow,
            amount,
            payment_method,
            description: Some(description.into()),
            linked_customer_id: None,
            linked_product_id: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True when an inflow lacks the reference its category expects.
    #[must_use]
    pub fn missing_link(&self) -> bool {
        match self.category {
            EntryCategory::InflowPayment => self.linked_customer_id.is_none(),
            EntryCategory::InflowSale => self.linked_product_id.is_none(),
            EntryCategory::Outflow => false,
        }
    }
}

/// A recorded, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Owning session.
    pub session_id: CashSessionId,
    /// 1-based position in the session's recording order.
    pub sequence: u64,
    /// Kind of movement.
    pub category: EntryCategory,
    /// Amount in minor units, always positive.
    pub amount: Money,
    /// How the money moved.
    pub payment_method: PaymentMethod,
    /// Trimmed description.
    pub description: Option<String>,
    /// Paying customer.
    pub linked_customer_id: Option<CustomerId>,
    /// Product sold.
    pub linked_product_id: Option<ProductId>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Materializes a validated [`NewEntry`] at the given position.
    #[must_use]
    pub fn record(
        session_id: CashSessionId,
        sequence: u64,
        entry: NewEntry,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            session_id,
            sequence,
            category: entry.category,
            amount: entry.amount,
            payment_method: entry.payment_method,
            description: normalize_text(entry.description),
            linked_customer_id: entry.linked_customer_id,
            linked_product_id: entry.linked_product_id,
            created_at,
        }
    }
}

/// Optional narrowing for `ListEntries`.
///
/// `created_from` is inclusive, `created_to` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Only entries of this category.
    pub category: Option<EntryCategory>,
    /// Only entries paid this way.
    pub payment_method: Option<PaymentMethod>,
    /// Only entries recorded at or after this instant.
    pub created_from: Option<DateTime<Utc>>,
    /// Only entries recorded before this instant.
    pub created_to: Option<DateTime<Utc>>,
}

impl EntryFilter {
    /// Filter matching every entry.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a single category.
    #[must_use]
    pub fn category(category: EntryCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Returns true if the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.category.is_none_or(|c| c == entry.category)
            && self.payment_method.is_none_or(|m| m == entry.payment_method)
            && self.created_from.is_none_or(|from| entry.created_at >= from)
            && self.created_to.is_none_or(|to| entry.created_at < to)
    }
}

/// Closed session plus its ordered entries, handed to the report renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingReport {
    /// The session, in CLOSED state.
    pub session: CashSession,
    /// The frozen totals.
    pub totals: SessionTotals,
    /// Entries in recording order.
    pub entries: Vec<LedgerEntry>,
}

impl ClosingReport {
    /// Assembles a report; the session must be closed.
    pub fn try_new(session: CashSession, mut entries: Vec<LedgerEntry>) -> Result<Self, CashError> {
        let Some(totals) = session.totals.clone() else {
            return Err(CashError::SessionStillOpen(session.id));
        };
        if session.is_open() {
            return Err(CashError::SessionStillOpen(session.id));
        }
        entries.sort_by_key(|e| e.sequence);
        Ok(Self {
            session,
            totals,
            entries,
        })
    }
}

/// Current time at microsecond precision, the finest every store keeps.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Trims free text and drops it when blank.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
