//! Property tests for entry validation.

use proptest::prelude::*;

use caixa_shared::types::{CustomerId, Money, ProductId};

use super::error::EntryViolation;
use super::types::{EntryCategory, NewEntry, PaymentMethod};
use super::validation::{LedgerPolicy, MIN_OUTFLOW_DESCRIPTION_CHARS, validate_entry};

fn category_strategy() -> impl Strategy<Value = EntryCategory> {
    prop_oneof![
        Just(EntryCategory::InflowPayment),
        Just(EntryCategory::InflowSale),
        Just(EntryCategory::Outflow),
    ]
}

fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Pix),
        Just(PaymentMethod::Debit),
        Just(PaymentMethod::Credit),
    ]
}

/// Arbitrary entries, valid or not.
fn any_entry_strategy() -> impl Strategy<Value = NewEntry> {
    (
        category_strategy(),
        -1_000i64..1_000i64,
        method_strategy(),
        prop::option::of("[ a-z]{0,12}"),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(category, amount, payment_method, description, customer, product)| NewEntry {
                category,
                amount: Money::from_minor(amount),
                payment_method,
                description,
                linked_customer_id: customer.then(CustomerId::new),
                linked_product_id: product.then(ProductId::new),
            },
        )
}

/// Reference predicate written independently of `validate_entry`.
fn is_acceptable(entry: &NewEntry, policy: &LedgerPolicy) -> bool {
    let positive = entry.amount.minor() > 0;
    let rules = match entry.category {
        EntryCategory::Outflow => {
            let chars = entry
                .description
                .as_deref()
                .map_or(0, |d| d.trim().chars().count());
            chars >= MIN_OUTFLOW_DESCRIPTION_CHARS
                && entry.linked_customer_id.is_none()
                && entry.linked_product_id.is_none()
        }
        EntryCategory::InflowPayment => {
            !policy.require_entry_links || entry.linked_customer_id.is_some()
        }
        EntryCategory::InflowSale => {
            !policy.require_entry_links || entry.linked_product_id.is_some()
        }
    };
    positive && rules
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Validation accepts exactly the entries the rules allow.
    #[test]
    fn prop_validation_matches_rules(
        entry in any_entry_strategy(),
        require_entry_links in any::<bool>(),
    ) {
        let policy = LedgerPolicy { require_entry_links };
        prop_assert_eq!(
            validate_entry(&entry, &policy).is_ok(),
            is_acceptable(&entry, &policy)
        );
    }

    /// Non-positive amounts are reported before anything else.
    #[test]
    fn prop_non_positive_amount_wins(
        mut entry in any_entry_strategy(),
        amount in -1_000i64..=0,
    ) {
        entry.amount = Money::from_minor(amount);
        prop_assert_eq!(
            validate_entry(&entry, &LedgerPolicy::default()),
            Err(EntryViolation::NonPositiveAmount(Money::from_minor(amount)))
        );
    }

    /// Surrounding whitespace never counts toward an outflow description.
    #[test]
    fn prop_outflow_description_is_trimmed(
        core in "[a-z]{1,4}",
        pad in " {0,8}",
        amount in 1i64..1_000,
    ) {
        let entry = NewEntry::outflow(
            Money::from_minor(amount),
            PaymentMethod::Cash,
            format!("{pad}{core}{pad}"),
        );
        let rejected = matches!(
            validate_entry(&entry, &LedgerPolicy::default()),
            Err(EntryViolation::DescriptionTooShort { .. })
        );
        prop_assert!(rejected);
    }
}
