//! Starter categories for an empty catalog.

use crate::error::Result;
use crate::model::{Category, NewCategory};
use crate::store::CatalogStore;
use tracing::info;

/// Name and description of each starter category, in creation order.
pub const DEFAULT_CATEGORIES: [(&str, &str); 5] = [
    ("Food & Beverages", "Packaged food and drinks"),
    ("Household", "Everyday household supplies"),
    ("Personal Care", "Toiletries and personal care products"),
    ("Home & Living", "Home goods and decoration"),
    ("Other", "Everything else"),
];

/// Create the starter categories if the catalog has none.
///
/// Returns the categories created, which is empty when any category already
/// existed.
///
/// # Errors
///
/// Propagates any store error from listing or creating categories.
pub fn seed_default_categories<S: CatalogStore + ?Sized>(store: &mut S) -> Result<Vec<Category>> {
    if !store.list_categories()?.is_empty() {
        return Ok(Vec::new());
    }

    let mut created = Vec::with_capacity(DEFAULT_CATEGORIES.len());
    for (name, description) in DEFAULT_CATEGORIES {
        created.push(store.create_category(NewCategory::named(name).with_description(description))?);
    }
    info!(count = created.len(), "seeded default categories");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn seeds_only_an_empty_catalog() {
        let mut store = SqliteStore::in_memory().unwrap();
        let created = seed_default_categories(&mut store).unwrap();
        assert_eq!(created.len(), DEFAULT_CATEGORIES.len());

        let again = seed_default_categories(&mut store).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.list_categories().unwrap().len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn existing_category_suppresses_seeding() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.create_category(NewCategory::named("Mine")).unwrap();

        assert!(seed_default_categories(&mut store).unwrap().is_empty());
        assert_eq!(store.list_categories().unwrap().len(), 1);
    }
}
