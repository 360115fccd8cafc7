//! Conversions between cash ledger domain types and database rows.

use chrono::Utc;
use sea_orm::Set;

use caixa_core::cash::{
    CashSession, LedgerEntry, MethodTotals, SessionStatus, SessionTotals, StoreError,
};
use caixa_shared::types::{
    CashSessionId, CustomerId, LedgerEntryId, Money, OperatorId, ProductId,
};

use crate::entities::{cash_sessions, ledger_entries};

fn corrupt(what: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(what.to_string())
}

pub(crate) fn to_db_count(count: u64) -> Result<i64, StoreError> {
    i64::try_from(count).map_err(|_| corrupt(format!("count {count} exceeds BIGINT")))
}

fn from_db_count(count: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(count).map_err(|_| corrupt(format!("negative {column}: {count}")))
}

/// Builds the insert model for a freshly opened session.
pub(crate) fn new_session_model(session: &CashSession) -> Result<cash_sessions::ActiveModel, StoreError> {
    Ok(cash_sessions::ActiveModel {
        id: Set(session.id.into_inner()),
        operator_id: Set(session.operator_id.into_inner()),
        status: Set(session.status.as_str().to_string()),
        opening_float: Set(session.opening_float.minor()),
        opening_note: Set(session.opening_note.clone()),
        opened_at: Set(session.opened_at.into()),
        entry_count: Set(to_db_count(session.entry_count)?),
        closed_at: Set(None),
        closing_note: Set(None),
        total_inflow: Set(None),
        total_outflow: Set(None),
        closing_balance: Set(None),
        totals_by_method: Set(None),
    })
}

/// Encodes the per-method breakdown for the `totals_by_method` column.
pub(crate) fn encode_by_method(by_method: &[MethodTotals]) -> Result<String, StoreError> {
    serde_json::to_string(by_method).map_err(corrupt)
}

/// Decodes a session row.
pub(crate) fn session_from_model(model: cash_sessions::Model) -> Result<CashSession, StoreError> {
    let status: SessionStatus = model.status.parse().map_err(corrupt)?;
    let entry_count = from_db_count(model.entry_count, "entry_count")?;

    let totals = match (model.total_inflow, model.total_outflow, model.closing_balance) {
        (Some(inflow), Some(outflow), Some(balance)) => {
            let by_method: Vec<MethodTotals> = match model.totals_by_method.as_deref() {
                Some(raw) => serde_json::from_str(raw).map_err(corrupt)?,
                None => Vec::new(),
            };
            Some(SessionTotals {
                total_inflow: Money::from_minor(inflow),
                total_outflow: Money::from_minor(outflow),
                closing_balance: Money::from_minor(balance),
                entry_count,
                by_method,
            })
        }
        _ => None,
    };

    Ok(CashSession {
        id: CashSessionId::from_uuid(model.id),
        operator_id: OperatorId::from_uuid(model.operator_id),
        opening_float: Money::from_minor(model.opening_float),
        opening_note: model.opening_note,
        opened_at: model.opened_at.with_timezone(&Utc),
        status,
        entry_count,
        closed_at: model.closed_at.map(|at| at.with_timezone(&Utc)),
        closing_note: model.closing_note,
        totals,
    })
}

/// Builds the insert model for an entry.
pub(crate) fn new_entry_model(entry: &LedgerEntry) -> Result<ledger_entries::ActiveModel, StoreError> {
    Ok(ledger_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        session_id: Set(entry.session_id.into_inner()),
        sequence: Set(to_db_count(entry.sequence)?),
        category: Set(entry.category.as_str().to_string()),
        amount: Set(entry.amount.minor()),
        payment_method: Set(entry.payment_method.as_str().to_string()),
        description: Set(entry.description.clone()),
        linked_customer_id: Set(entry.linked_customer_id.map(CustomerId::into_inner)),
        linked_product_id: Set(entry.linked_product_id.map(ProductId::into_inner)),
        created_at: Set(entry.created_at.into()),
    })
}

/// Decodes an entry row.
pub(crate) fn entry_from_model(model: ledger_entries::Model) -> Result<LedgerEntry, StoreError> {
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        session_id: CashSessionId::from_uuid(model.session_id),
        sequence: from_db_count(model.sequence, "sequence")?,
        category: model.category.parse().map_err(corrupt)?,
        amount: Money::from_minor(model.amount),
        payment_method: model.payment_method.parse().map_err(corrupt)?,
        description: model.description,
        linked_customer_id: model.linked_customer_id.map(CustomerId::from_uuid),
        linked_product_id: model.linked_product_id.map(ProductId::from_uuid),
        created_at: model.created_at.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caixa_core::cash::{NewEntry, PaymentMethod};

    #[test]
    fn test_open_session_row_round_trips() {
        let session = CashSession::open(
            OperatorId::new(),
            Money::from_minor(10_000),
            Some("float from safe".into()),
            Utc::now(),
        );
        let active = new_session_model(&session).unwrap();
        let model = cash_sessions::Model {
            id: active.id.unwrap(),
            operator_id: active.operator_id.unwrap(),
            status: active.status.unwrap(),
            opening_float: active.opening_float.unwrap(),
            opening_note: active.opening_note.unwrap(),
            opened_at: active.opened_at.unwrap(),
            entry_count: active.entry_count.unwrap(),
            closed_at: None,
            closing_note: None,
            total_inflow: None,
            total_outflow: None,
            closing_balance: None,
            totals_by_method: None,
        };

        assert_eq!(session_from_model(model).unwrap(), session);
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let session = CashSession::open(OperatorId::new(), Money::ZERO, None, Utc::now());
        let active = new_session_model(&session).unwrap();
        let model = cash_sessions::Model {
            id: active.id.unwrap(),
            operator_id: active.operator_id.unwrap(),
            status: "suspended".into(),
            opening_float: 0,
            opening_note: None,
            opened_at: active.opened_at.unwrap(),
            entry_count: 0,
            closed_at: None,
            closing_note: None,
            total_inflow: None,
            total_outflow: None,
            closing_balance: None,
            totals_by_method: None,
        };

        assert!(matches!(
            session_from_model(model),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_entry_with_bad_method_is_corrupt() {
        let entry = LedgerEntry::record(
            CashSessionId::new(),
            1,
            NewEntry::payment(Money::from_minor(100), PaymentMethod::Pix, CustomerId::new()),
            Utc::now(),
        );
        let active = new_entry_model(&entry).unwrap();
        let model = ledger_entries::Model {
            id: active.id.unwrap(),
            session_id: active.session_id.unwrap(),
            sequence: 1,
            category: active.category.unwrap(),
            amount: 100,
            payment_method: "cheque".into(),
            description: None,
            linked_customer_id: active.linked_customer_id.unwrap(),
            linked_product_id: None,
            created_at: active.created_at.unwrap(),
        };

        assert!(matches!(entry_from_model(model), Err(StoreError::Corrupt(_))));
    }
}
