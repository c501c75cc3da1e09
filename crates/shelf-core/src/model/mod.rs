//! Catalog entities and the payloads callers hand to the store.
//!
//! Stored records ([`Product`], [`Category`]) serialize in camelCase so a
//! snapshot file reads the same regardless of which backend produced it.

pub mod category;
pub mod product;

pub use category::{Category, CategoryPatch, NewCategory};
pub use product::{NewProduct, Product, ProductPatch};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision every backend can store (microseconds).
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fresh opaque identifier for a new record.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Empty or whitespace-only optional text is stored as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
