//! Closing reconciliation.
//!
//! Totals are computed from a complete, frozen entry set in integer minor
//! units. Conversion to decimal currency happens only at the rendering edge.

use std::collections::BTreeMap;

use caixa_shared::types::Money;

use super::error::CashError;
use super::types::{LedgerEntry, MethodTotals, PaymentMethod, SessionTotals};

/// Stateless aggregation over a session's entries.
pub struct ReconciliationCalculator;

impl ReconciliationCalculator {
    /// Aggregates `entries` into session totals.
    ///
    /// - `total_inflow`: sum of payments and sales
    /// - `total_outflow`: sum of outflows
    /// - `closing_balance = opening_float + total_inflow - total_outflow`
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if any sum leaves the `i64` range.
    pub fn reconcile(
        opening_float: Money,
        entries: &[LedgerEntry],
    ) -> Result<SessionTotals, CashError> {
        let mut total_inflow = Money::ZERO;
        let mut total_outflow = Money::ZERO;
        let mut by_method: BTreeMap<PaymentMethod, (Money, Money)> = BTreeMap::new();

        for entry in entries {
            let slot = by_method
                .entry(entry.payment_method)
                .or_insert((Money::ZERO, Money::ZERO));
            if entry.category.is_inflow() {
                total_inflow = checked_add(total_inflow, entry.amount)?;
                slot.0 = checked_add(slot.0, entry.amount)?;
            } else {
                total_outflow = checked_add(total_outflow, entry.amount)?;
                slot.1 = checked_add(slot.1, entry.amount)?;
            }
        }

        let closing_balance = opening_float
            .checked_add(total_inflow)
            .and_then(|m| m.checked_sub(total_outflow))
            .ok_or(CashError::AmountOverflow)?;

        Ok(SessionTotals {
            total_inflow,
            total_outflow,
            closing_balance,
            entry_count: entries.len() as u64,
            by_method: by_method
                .into_iter()
                .map(|(method, (inflow, outflow))| MethodTotals {
                    method,
                    inflow,
                    outflow,
                })
                .collect(),
        })
    }
}

fn checked_add(a: Money, b: Money) -> Result<Money, CashError> {
    a.checked_add(b).ok_or(CashError::AmountOverflow)
}
