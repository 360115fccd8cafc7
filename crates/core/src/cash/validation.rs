//! Business rule validation for proposed ledger entries.

use caixa_shared::LedgerSettings;

use super::error::EntryViolation;
use super::types::{EntryCategory, NewEntry};

/// Minimum trimmed length of an outflow description, in characters.
pub const MIN_OUTFLOW_DESCRIPTION_CHARS: usize = 5;

/// Tunable rules applied by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Payments must name a customer and sales a product.
    pub require_entry_links: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            require_entry_links: true,
        }
    }
}

impl From<&LedgerSettings> for LedgerPolicy {
    fn from(settings: &LedgerSettings) -> Self {
        Self {
            require_entry_links: settings.require_entry_links,
        }
    }
}

/// Validates a single proposed entry.
///
/// Rules, checked in order:
/// 1. amount is strictly positive
/// 2. outflows carry a description of at least
///    [`MIN_OUTFLOW_DESCRIPTION_CHARS`] characters after trimming, and no
///    customer or product reference
/// 3. payments reference a customer, sales a product (only when
///    `policy.require_entry_links`)
///
/// Category membership is enforced by the [`EntryCategory`] type itself;
/// raw strings are rejected earlier by its `FromStr`.
///
/// # Errors
///
/// Returns the first rule the entry breaks.
pub fn validate_entry(entry: &NewEntry, policy: &LedgerPolicy) -> Result<(), EntryViolation> {
    if !entry.amount.is_positive() {
        return Err(EntryViolation::NonPositiveAmount(entry.amount));
    }

    match entry.category {
        EntryCategory::Outflow => {
            let description = entry
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .ok_or(EntryViolation::MissingDescription)?;
            let len = description.chars().count();
            if len < MIN_OUTFLOW_DESCRIPTION_CHARS {
                return Err(EntryViolation::DescriptionTooShort {
                    len,
                    min: MIN_OUTFLOW_DESCRIPTION_CHARS,
                });
            }
            if entry.linked_customer_id.is_some() || entry.linked_product_id.is_some() {
                return Err(EntryViolation::UnexpectedLink);
            }
        }
        EntryCategory::InflowPayment => {
            if policy.require_entry_links && entry.linked_customer_id.is_none() {
                return Err(EntryViolation::MissingCustomer);
            }
        }
        EntryCategory::InflowSale => {
            if policy.require_entry_links && entry.linked_product_id.is_none() {
                return Err(EntryViolation::MissingProduct);
            }
        }
    }

    Ok(())
}
