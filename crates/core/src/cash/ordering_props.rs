//! Property tests for recording order and post-close immutability.

use std::sync::Arc;

use proptest::prelude::*;

use caixa_shared::types::{CustomerId, Money, OperatorId, ProductId};

use super::error::CashError;
use super::memory::MemoryLedgerStore;
use super::service::LedgerService;
use super::types::{EntryFilter, NewEntry, PaymentMethod};

fn new_entry_strategy() -> impl Strategy<Value = NewEntry> {
    (0u8..3, 1i64..100_000).prop_map(|(kind, minor)| {
        let amount = Money::from_minor(minor);
        match kind {
            0 => NewEntry::payment(amount, PaymentMethod::Pix, CustomerId::new()),
            1 => NewEntry::sale(amount, PaymentMethod::Cash, ProductId::new()),
            _ => NewEntry::outflow(amount, PaymentMethod::Cash, "withdrawal"),
        }
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Entries are listed, and reported at close, in recording order.
    #[test]
    fn prop_list_entries_preserves_recording_order(
        entries in prop::collection::vec(new_entry_strategy(), 1..30),
    ) {
        let (listed, recorded, reported) = runtime().block_on(async {
            let service = LedgerService::new(Arc::new(MemoryLedgerStore::new()));
            let session = service.open_session(OperatorId::new(), 0, None).await.unwrap();
            let mut recorded = Vec::new();
            for entry in entries {
                recorded.push(service.record_entry(session.id, entry).await.unwrap());
            }
            let listed = service
                .list_entries(session.id, Some(EntryFilter::all()))
                .await
                .unwrap();
            let report = service.close_session(session.id, None).await.unwrap();
            (listed, recorded, report.entries)
        });

        prop_assert_eq!(&listed, &recorded);
        prop_assert_eq!(&reported, &recorded);
    }

    /// After a close, every entry payload is refused with `SessionNotOpen`.
    #[test]
    fn prop_closed_session_refuses_any_entry(entry in new_entry_strategy()) {
        let outcome = runtime().block_on(async {
            let service = LedgerService::new(Arc::new(MemoryLedgerStore::new()));
            let session = service.open_session(OperatorId::new(), 0, None).await.unwrap();
            service.close_session(session.id, None).await.unwrap();
            service.record_entry(session.id, entry).await
        });

        prop_assert!(matches!(outcome, Err(CashError::SessionNotOpen(_))));
    }
}
