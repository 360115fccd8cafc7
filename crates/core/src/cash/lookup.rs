//! Display-name resolution for linked customers and products.
//!
//! Names are a display-only denormalization: a failing lookup is logged
//! and leaves the name empty, it never fails a ledger operation.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use caixa_shared::types::{CustomerId, ProductId};

use super::types::LedgerEntry;

/// Lookup failure reported by a reference provider.
#[derive(Debug, Error)]
#[error("Reference lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read-only access to customer and product names.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Display name of a customer.
    async fn customer_name(&self, id: CustomerId) -> Result<Option<String>, LookupError>;

    /// Display name of a product.
    async fn product_name(&self, id: ProductId) -> Result<Option<String>, LookupError>;
}

/// Lookup that knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferenceLookup;

#[async_trait]
impl ReferenceLookup for NoReferenceLookup {
    async fn customer_name(&self, _id: CustomerId) -> Result<Option<String>, LookupError> {
        Ok(None)
    }

    async fn product_name(&self, _id: ProductId) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

/// An entry paired with the names of what it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescribedEntry {
    /// The entry.
    pub entry: LedgerEntry,
    /// Customer display name.
    pub customer_name: Option<String>,
    /// Product display name.
    pub product_name: Option<String>,
}

/// Awaits one name lookup under `timeout`; failures and timeouts yield no name.
async fn resolve_name(
    lookup: impl Future<Output = Result<Option<String>, LookupError>>,
    timeout: Duration,
    entry: &LedgerEntry,
    kind: &'static str,
) -> Option<String> {
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(name)) => name,
        Ok(Err(err)) => {
            warn!(entry_id = %entry.id, kind, error = %err, "reference lookup failed");
            None
        }
        Err(_) => {
            warn!(
                entry_id = %entry.id,
                kind,
                timeout_ms = timeout.as_millis(),
                "reference lookup timed out"
            );
            None
        }
    }
}

/// Resolves names for each entry, in order. Each lookup is bounded by
/// `timeout`.
pub async fn describe_entries(
    lookup: &dyn ReferenceLookup,
    entries: &[LedgerEntry],
    timeout: Duration,
) -> Vec<DescribedEntry> {
    let mut described = Vec::with_capacity(entries.len());
    for entry in entries {
        let customer_name = match entry.linked_customer_id {
            Some(id) => resolve_name(lookup.customer_name(id), timeout, entry, "customer").await,
            None => None,
        };
        let product_name = match entry.linked_product_id {
            Some(id) => resolve_name(lookup.product_name(id), timeout, entry, "product").await,
            None => None,
        };
        described.push(DescribedEntry {
            entry: entry.clone(),
            customer_name,
            product_name,
        });
    }
    described
}
