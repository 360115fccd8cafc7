//! Property tests for closing reconciliation.

use chrono::Utc;
use proptest::prelude::*;

use caixa_shared::types::{CashSessionId, CustomerId, Money, ProductId};

use super::reconciliation::ReconciliationCalculator;
use super::types::{EntryCategory, LedgerEntry, NewEntry, PaymentMethod};

// ============================================================================
// Strategies
// ============================================================================

fn amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..10_000_000i64).prop_map(Money::from_minor)
}

fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Pix),
        Just(PaymentMethod::Debit),
        Just(PaymentMethod::Credit),
    ]
}

fn new_entry_strategy() -> impl Strategy<Value = NewEntry> {
    (0u8..3, amount_strategy(), method_strategy()).prop_map(|(kind, amount, method)| match kind {
        0 => NewEntry::payment(amount, method, CustomerId::new()),
        1 => NewEntry::sale(amount, method, ProductId::new()),
        _ => NewEntry::outflow(amount, method, "till withdrawal"),
    })
}

fn ledger_strategy() -> impl Strategy<Value = Vec<LedgerEntry>> {
    prop::collection::vec(new_entry_strategy(), 0..40).prop_map(|specs| {
        let session_id = CashSessionId::new();
        specs
            .into_iter()
            .zip(1u64..)
            .map(|(entry, sequence)| LedgerEntry::record(session_id, sequence, entry, Utc::now()))
            .collect()
    })
}

fn sum_where(entries: &[LedgerEntry], pred: impl Fn(&LedgerEntry) -> bool) -> i64 {
    entries
        .iter()
        .filter(|e| pred(e))
        .map(|e| e.amount.minor())
        .sum()
}

// ============================================================================
// Balance law
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// closing = opening + inflow - outflow, with each total summing its
    /// categories exactly.
    #[test]
    fn prop_balance_law(
        opening in 0i64..1_000_000_000i64,
        entries in ledger_strategy(),
    ) {
        let totals = ReconciliationCalculator::reconcile(Money::from_minor(opening), &entries)
            .unwrap();

        let inflow = sum_where(&entries, |e| e.category.is_inflow());
        let outflow = sum_where(&entries, |e| e.category == EntryCategory::Outflow);

        prop_assert_eq!(totals.total_inflow.minor(), inflow);
        prop_assert_eq!(totals.total_outflow.minor(), outflow);
        prop_assert_eq!(totals.closing_balance.minor(), opening + inflow - outflow);
        prop_assert_eq!(totals.entry_count, entries.len() as u64);
    }

    /// The per-method breakdown partitions the totals.
    #[test]
    fn prop_method_breakdown_sums_to_totals(entries in ledger_strategy()) {
        let totals = ReconciliationCalculator::reconcile(Money::ZERO, &entries).unwrap();

        let inflow: i64 = totals.by_method.iter().map(|m| m.inflow.minor()).sum();
        let outflow: i64 = totals.by_method.iter().map(|m| m.outflow.minor()).sum();

        prop_assert_eq!(inflow, totals.total_inflow.minor());
        prop_assert_eq!(outflow, totals.total_outflow.minor());
        prop_assert!(totals.by_method.windows(2).all(|w| w[0].method < w[1].method));
    }

    /// Recording order does not change the totals.
    #[test]
    fn prop_totals_ignore_order(entries in ledger_strategy()) {
        let forward = ReconciliationCalculator::reconcile(Money::ZERO, &entries).unwrap();
        let mut reversed = entries.clone();
        reversed.reverse();
        let backward = ReconciliationCalculator::reconcile(Money::ZERO, &reversed).unwrap();

        prop_assert_eq!(forward, backward);
    }
}
