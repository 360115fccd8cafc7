//! Cash ledger error types.
//!
//! This module defines all errors that can occur during cash session
//! operations: entry validation failures, session state errors, and
//! store failures.

use thiserror::Error;

use caixa_shared::AppError;
use caixa_shared::types::{CashSessionId, LedgerEntryId, Money, OperatorId};

/// Why a proposed entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryViolation {
    /// Amount is zero or negative.
    #[error("Entry amount must be greater than zero, got {0}")]
    NonPositiveAmount(Money),

    /// Category is not one of the defined values.
    #[error("Unknown entry category: {0}")]
    UnknownCategory(String),

    /// Payment method is not one of the defined values.
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    /// Outflow without a description.
    #[error("Outflow entries require a description")]
    MissingDescription,

    /// Outflow description too short after trimming.
    #[error("Outflow description must have at least {min} characters, got {len}")]
    DescriptionTooShort {
        /// Trimmed length in characters.
        len: usize,
        /// Required minimum.
        min: usize,
    },

    /// Outflow carries a customer or product reference.
    #[error("Outflow entries cannot reference a customer or product")]
    UnexpectedLink,

    /// Payment without a customer.
    #[error("Payment entries must reference a customer")]
    MissingCustomer,

    /// Sale without a product.
    #[error("Sale entries must reference a product")]
    MissingProduct,
}

/// Errors that can occur during cash session operations.
#[derive(Debug, Error)]
pub enum CashError {
    // ========== Session State Errors ==========
    /// The operator already has an OPEN session.
    #[error("Operator {operator_id} already has an open cash session")]
    SessionAlreadyOpen {
        /// The operator.
        operator_id: OperatorId,
        /// The session currently open, when known.
        session_id: Option<CashSessionId>,
    },

    /// The session is not OPEN.
    #[error("Cash session {0} is not open")]
    SessionNotOpen(CashSessionId),

    /// The session does not exist.
    #[error("Cash session not found: {0}")]
    SessionNotFound(CashSessionId),

    /// A closing report was requested for a session still OPEN.
    #[error("Cash session {0} is still open")]
    SessionStillOpen(CashSessionId),

    // ========== Validation Errors ==========
    /// The proposed entry broke a validation rule.
    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] EntryViolation),

    /// Opening float is negative.
    #[error("Opening float cannot be negative, got {0}")]
    InvalidOpeningFloat(Money),

    /// A sum left the representable range.
    #[error("Amount overflow while totaling cash session")]
    AmountOverflow,

    // ========== Concurrency Errors ==========
    /// Another writer changed the session between read and write.
    #[error("Concurrent modification of cash session {0}, please retry")]
    ConcurrentModification(CashSessionId),

    // ========== Store Errors ==========
    /// The backing store failed or timed out.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// An append timed out and may or may not have committed.
    #[error("Append of entry {entry_id} to cash session {session_id} timed out, outcome unknown")]
    AppendOutcomeUnknown {
        /// The session appended to.
        session_id: CashSessionId,
        /// Id of the entry that may have been stored.
        entry_id: LedgerEntryId,
    },
}

impl CashError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SessionAlreadyOpen { .. } => "SESSION_ALREADY_OPEN",
            Self::SessionNotOpen(_) => "SESSION_NOT_OPEN",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionStillOpen(_) => "SESSION_STILL_OPEN",
            Self::InvalidEntry(_) => "INVALID_ENTRY",
            Self::InvalidOpeningFloat(_) => "INVALID_OPENING_FLOAT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::AppendOutcomeUnknown { .. } => "APPEND_OUTCOME_UNKNOWN",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller-fixable input
            Self::InvalidEntry(_) | Self::InvalidOpeningFloat(_) => 400,

            // 404 Not Found
            Self::SessionNotFound(_) => 404,

            // 409 Conflict - lifecycle and concurrency errors
            Self::SessionAlreadyOpen { .. }
            | Self::SessionNotOpen(_)
            | Self::SessionStillOpen(_)
            | Self::ConcurrentModification(_) => 409,

            // 422 Unprocessable - totals out of range
            Self::AmountOverflow => 422,

            // 503 Service Unavailable - transient store failure
            Self::StoreUnavailable(_) => 503,

            // 500 - the write may have landed, a blind retry could duplicate it
            Self::AppendOutcomeUnknown { .. } => 500,
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification(_) | Self::StoreUnavailable(_)
        )
    }

    /// The session the error refers to, for structured reporting.
    #[must_use]
    pub fn session_id(&self) -> Option<CashSessionId> {
        match self {
            Self::SessionAlreadyOpen { session_id, .. } => *session_id,
            Self::SessionNotOpen(id)
            | Self::SessionNotFound(id)
            | Self::SessionStillOpen(id)
            | Self::ConcurrentModification(id) => Some(*id),
            Self::AppendOutcomeUnknown { session_id, .. } => Some(*session_id),
            Self::InvalidEntry(_)
            | Self::InvalidOpeningFloat(_)
            | Self::AmountOverflow
            | Self::StoreUnavailable(_) => None,
        }
    }
}

impl From<CashError> for AppError {
    fn from(err: CashError) -> Self {
        let message = err.to_string();
        match err {
            CashError::SessionNotFound(_) => Self::NotFound(message),
            CashError::InvalidEntry(_) | CashError::InvalidOpeningFloat(_) => {
                Self::Validation(message)
            }
            CashError::SessionAlreadyOpen { .. } | CashError::ConcurrentModification(_) => {
                Self::Conflict(message)
            }
            CashError::SessionNotOpen(_)
            | CashError::SessionStillOpen(_)
            | CashError::AmountOverflow => Self::BusinessRule(message),
            CashError::StoreUnavailable(_) => Self::Unavailable(message),
            CashError::AppendOutcomeUnknown { .. } => Self::Internal(message),
        }
    }
}

/// Failures reported by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-open-session constraint rejected the insert.
    #[error("Operator {0} already has an open cash session")]
    OpenSessionExists(OperatorId),

    /// Referenced session does not exist.
    #[error("Cash session not found: {0}")]
    SessionNotFound(CashSessionId),

    /// Conditional write found the session CLOSED.
    #[error("Cash session {0} is not open")]
    SessionNotOpen(CashSessionId),

    /// Conditional write found a different entry count than expected.
    #[error("Cash session {session_id} version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The session.
        session_id: CashSessionId,
        /// Entry count the writer read.
        expected: u64,
        /// Entry count found at write time.
        actual: u64,
    },

    /// Stored data could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The store could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CashError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OpenSessionExists(operator_id) => Self::SessionAlreadyOpen {
                operator_id,
                session_id: None,
            },
            StoreError::SessionNotFound(id) => Self::SessionNotFound(id),
            StoreError::SessionNotOpen(id) => Self::SessionNotOpen(id),
            StoreError::VersionMismatch { session_id, .. } => {
                Self::ConcurrentModification(session_id)
            }
            StoreError::Corrupt(reason) | StoreError::Unavailable(reason) => {
                Self::StoreUnavailable(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let id = CashSessionId::new();
        assert_eq!(CashError::SessionNotOpen(id).error_code(), "SESSION_NOT_OPEN");
        assert_eq!(CashError::SessionNotFound(id).error_code(), "SESSION_NOT_FOUND");
        assert_eq!(
            CashError::InvalidEntry(EntryViolation::MissingDescription).error_code(),
            "INVALID_ENTRY"
        );
        assert_eq!(
            CashError::SessionAlreadyOpen {
                operator_id: OperatorId::new(),
                session_id: None,
            }
            .error_code(),
            "SESSION_ALREADY_OPEN"
        );
    }

    #[test]
    fn test_http_status_codes() {
        let id = CashSessionId::new();
        assert_eq!(
            CashError::InvalidEntry(EntryViolation::MissingProduct).http_status_code(),
            400
        );
        assert_eq!(CashError::SessionNotFound(id).http_status_code(), 404);
        assert_eq!(CashError::SessionNotOpen(id).http_status_code(), 409);
        assert_eq!(
            CashError::StoreUnavailable("down".into()).http_status_code(),
            503
        );
    }

    #[test]
    fn test_retryable_errors() {
        let id = CashSessionId::new();
        assert!(CashError::StoreUnavailable("timeout".into()).is_retryable());
        assert!(CashError::ConcurrentModification(id).is_retryable());
        assert!(!CashError::SessionNotOpen(id).is_retryable());
        assert!(!CashError::InvalidEntry(EntryViolation::UnexpectedLink).is_retryable());
        assert!(
            !CashError::AppendOutcomeUnknown {
                session_id: id,
                entry_id: LedgerEntryId::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_session_id_context() {
        let id = CashSessionId::new();
        assert_eq!(CashError::SessionNotOpen(id).session_id(), Some(id));
        assert_eq!(CashError::AmountOverflow.session_id(), None);
    }

    #[test]
    fn test_error_display() {
        let err = CashError::InvalidEntry(EntryViolation::DescriptionTooShort { len: 2, min: 5 });
        assert_eq!(
            err.to_string(),
            "Invalid entry: Outflow description must have at least 5 characters, got 2"
        );
        let err = CashError::InvalidEntry(EntryViolation::NonPositiveAmount(Money::from_minor(-150)));
        assert_eq!(
            err.to_string(),
            "Invalid entry: Entry amount must be greater than zero, got -1.50"
        );
    }

    #[test]
    fn test_store_error_mapping() {
        let id = CashSessionId::new();
        let mapped: CashError = StoreError::VersionMismatch {
            session_id: id,
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(mapped, CashError::ConcurrentModification(s) if s == id));

        let mapped: CashError = StoreError::Unavailable("pool timed out".into()).into();
        assert!(mapped.is_retryable());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = CashError::SessionNotFound(CashSessionId::new()).into();
        assert_eq!(app.status_code(), 404);
        let app: AppError = CashError::InvalidEntry(EntryViolation::MissingCustomer).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
        let app: AppError = CashError::StoreUnavailable("down".into()).into();
        assert!(app.is_retryable());
        let app: AppError = CashError::AppendOutcomeUnknown {
            session_id: CashSessionId::new(),
            entry_id: LedgerEntryId::new(),
        }
        .into();
        assert_eq!(app.status_code(), 500);
        assert!(!app.is_retryable());
    }
}
