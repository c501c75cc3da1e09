//! Catalog invariants, checked by every adapter write path.
//!
//! - Product GTINs are valid and unique (the updated product excluded).
//! - Every product references an existing category.
//! - `Product::category` equals the referenced category's name.
//! - Category names are unique by exact match (the updated one excluded).
//! - `price >= 0` and `stock >= 0`.
//!
//! Input checks run first and touch no stored state. Conflict and reference
//! checks come after, in the order the error contract promises:
//! duplicate GTIN, then missing category.

use crate::error::{CatalogError, InputError, Result};
use crate::gtin::{self, Gtin};
use crate::model::{Category, NewCategory, NewProduct, Product, non_blank};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Product fields that passed the input checks, normalized for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub name: String,
    pub description: String,
    pub gtin: Gtin,
    pub category_id: String,
    pub price: Decimal,
    pub stock: i64,
    pub image_url: Option<String>,
}

impl ValidProduct {
    /// Build the stored record, stamping in the resolved category name.
    #[must_use]
    pub fn into_product(
        self,
        id: String,
        category_name: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            gtin: self.gtin.into_string(),
            category_id: self.category_id,
            category: category_name,
            price: self.price,
            stock: self.stock,
            image_url: self.image_url,
            created_at,
            updated_at,
        }
    }
}

/// Category fields that passed the input checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCategory {
    pub name: String,
    pub description: Option<String>,
}

fn required(field: &'static str, value: &str) -> Result<String, InputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

/// Input checks for a product candidate: required fields, GTIN syntax, and
/// non-negative price and stock.
///
/// # Errors
///
/// Returns the first [`InputError`] found, in field order: name, GTIN,
/// category id, price, stock.
pub fn check_product_fields(candidate: &NewProduct) -> Result<ValidProduct, InputError> {
    let name = required("name", &candidate.name)?;
    let gtin = gtin::validate(&candidate.gtin)?;
    let category_id = required("categoryId", &candidate.category_id)?;

    if candidate.price < Decimal::ZERO {
        return Err(InputError::NegativePrice(candidate.price));
    }
    if candidate.stock < 0 {
        return Err(InputError::NegativeStock(candidate.stock));
    }

    Ok(ValidProduct {
        name,
        description: candidate.description.clone(),
        gtin,
        category_id,
        price: candidate.price,
        stock: candidate.stock,
        image_url: non_blank(candidate.image_url.clone()),
    })
}

/// Input checks for a category candidate.
///
/// # Errors
///
/// Returns [`InputError::EmptyField`] when the name is blank.
pub fn check_category_fields(candidate: &NewCategory) -> Result<ValidCategory, InputError> {
    Ok(ValidCategory {
        name: required("name", &candidate.name)?,
        description: non_blank(candidate.description.clone()),
    })
}

/// Name of the category `category_id` refers to, for the denormalized
/// `Product::category`.
///
/// # Errors
///
/// Returns [`CatalogError::CategoryNotFound`] if no category has that id.
pub fn resolve_category_name(category_id: &str, categories: &[Category]) -> Result<String> {
    categories
        .iter()
        .find(|c| c.id == category_id)
        .map(|c| c.name.clone())
        .ok_or_else(|| CatalogError::CategoryNotFound {
            id: category_id.to_string(),
        })
}

/// Full product write check against in-memory collections.
///
/// Returns the normalized fields and the category name to denormalize.
///
/// # Errors
///
/// `InvalidInput`, then `DuplicateGtin`, then `CategoryNotFound`.
pub fn validate_product_write(
    candidate: &NewProduct,
    products: &[Product],
    categories: &[Category],
    excluding_id: Option<&str>,
) -> Result<(ValidProduct, String)> {
    let valid = check_product_fields(candidate)?;

    if let Some(existing) = products
        .iter()
        .filter(|p| Some(p.id.as_str()) != excluding_id)
        .find(|p| p.gtin == valid.gtin.as_str())
    {
        return Err(CatalogError::DuplicateGtin {
            gtin: existing.gtin.clone(),
            existing_id: existing.id.clone(),
        });
    }

    let category_name = resolve_category_name(&valid.category_id, categories)?;
    Ok((valid, category_name))
}

/// Full category write check against the in-memory collection.
///
/// # Errors
///
/// `InvalidInput`, then `DuplicateCategoryName`.
pub fn validate_category_write(
    candidate: &NewCategory,
    categories: &[Category],
    excluding_id: Option<&str>,
) -> Result<ValidCategory> {
    let valid = check_category_fields(candidate)?;

    if categories
        .iter()
        .filter(|c| Some(c.id.as_str()) != excluding_id)
        .any(|c| c.name == valid.name)
    {
        return Err(CatalogError::DuplicateCategoryName { name: valid.name });
    }

    Ok(valid)
}

/// One broken invariant found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    InvalidGtin { product_id: String },
    DuplicateGtin { gtin: String },
    DanglingCategory { product_id: String },
    StaleCategoryName { product_id: String },
    DuplicateCategoryName { name: String },
    NegativeQuantity { product_id: String },
}

/// Check every invariant over whole collections, e.g. after an import or in tests.
#[must_use]
pub fn audit(products: &[Product], categories: &[Category]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen_gtins = std::collections::HashSet::new();
    let mut seen_names = std::collections::HashSet::new();

    for category in categories {
        if !seen_names.insert(category.name.as_str()) {
            violations.push(Violation::DuplicateCategoryName {
                name: category.name.clone(),
            });
        }
    }

    for product in products {
        if !matches!(gtin::validate(&product.gtin), Ok(valid) if valid.as_str() == product.gtin) {
            violations.push(Violation::InvalidGtin {
                product_id: product.id.clone(),
            });
        }
        if !seen_gtins.insert(product.gtin.as_str()) {
            violations.push(Violation::DuplicateGtin {
                gtin: product.gtin.clone(),
            });
        }
        match categories.iter().find(|c| c.id == product.category_id) {
            None => violations.push(Violation::DanglingCategory {
                product_id: product.id.clone(),
            }),
            Some(category) if category.name != product.category => {
                violations.push(Violation::StaleCategoryName {
                    product_id: product.id.clone(),
                });
            }
            Some(_) => {}
        }
        if product.stock < 0 || product.price < Decimal::ZERO {
            violations.push(Violation::NegativeQuantity {
                product_id: product.id.clone(),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtin::GtinError;
    use crate::model::now_utc;

    fn category(id: &str, name: &str) -> Category {
        let now = now_utc();
        Category {
            id: id.into(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn candidate(gtin: &str, category_id: &str) -> NewProduct {
        NewProduct {
            name: "Oat milk".into(),
            description: String::new(),
            gtin: gtin.into(),
            category_id: category_id.into(),
            price: Decimal::new(249, 2),
            stock: 5,
            image_url: None,
        }
    }

    fn stored(id: &str, gtin: &str, category: &Category) -> Product {
        let (valid, name) =
            validate_product_write(&candidate(gtin, &category.id), &[], &[category.clone()], None)
                .unwrap();
        let now = now_utc();
        valid.into_product(id.into(), name, now, now)
    }

    #[test]
    fn accepts_valid_candidate_and_resolves_category_name() {
        let drinks = category("c1", "Drinks");
        let (valid, name) =
            validate_product_write(&candidate("400-6381333931", "c1"), &[], &[drinks], None)
                .unwrap();
        assert_eq!(valid.gtin.as_str(), "4006381333931");
        assert_eq!(name, "Drinks");
    }

    #[test]
    fn input_errors_come_before_conflicts() {
        let drinks = category("c1", "Drinks");
        let existing = stored("p1", "4006381333931", &drinks);

        let mut bad = candidate("4006381333931", "missing");
        bad.stock = -1;
        let err = validate_product_write(&bad, &[existing], &[drinks], None).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidInput(InputError::NegativeStock(-1))
        ));
    }

    #[test]
    fn duplicate_gtin_reported_before_missing_category() {
        let drinks = category("c1", "Drinks");
        let existing = stored("p1", "4006381333931", &drinks);

        let err = validate_product_write(
            &candidate("4006381333931", "missing"),
            &[existing],
            &[drinks],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateGtin { existing_id, .. } if existing_id == "p1"));
    }

    #[test]
    fn own_gtin_is_excluded_on_update() {
        let drinks = category("c1", "Drinks");
        let existing = stored("p1", "4006381333931", &drinks);

        let result = validate_product_write(
            &candidate("4006381333931", "c1"),
            &[existing],
            &[drinks],
            Some("p1"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn missing_category_is_reported() {
        let err = validate_product_write(&candidate("96385074", "nope"), &[], &[], None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::CategoryNotFound { id } if id == "nope"));
    }

    #[test]
    fn gtin_failures_are_wrapped_as_input_errors() {
        let err = check_product_fields(&candidate("4006381333930", "c1")).unwrap_err();
        assert_eq!(
            err,
            InputError::Gtin(GtinError::CheckDigitMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn negative_price_is_rejected_but_zero_is_fine() {
        let mut free = candidate("96385074", "c1");
        free.price = Decimal::ZERO;
        assert!(check_product_fields(&free).is_ok());

        free.price = Decimal::new(-1, 2);
        assert!(matches!(
            check_product_fields(&free),
            Err(InputError::NegativePrice(_))
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut blank = candidate("96385074", "c1");
        blank.name = "   ".into();
        assert_eq!(
            check_product_fields(&blank).unwrap_err(),
            InputError::EmptyField { field: "name" }
        );
    }

    #[test]
    fn category_names_are_unique_by_exact_match() {
        let drinks = category("c1", "Drinks");
        let cats = [drinks];

        let err = validate_category_write(&NewCategory::named("Drinks"), &cats, None).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCategoryName { .. }));

        assert!(validate_category_write(&NewCategory::named("drinks"), &cats, None).is_ok());
        assert!(validate_category_write(&NewCategory::named("Drinks"), &cats, Some("c1")).is_ok());
    }

    #[test]
    fn category_description_blank_becomes_none() {
        let valid = check_category_fields(&NewCategory::named(" Snacks ").with_description(""))
            .unwrap();
        assert_eq!(valid.name, "Snacks");
        assert_eq!(valid.description, None);
    }

    #[test]
    fn audit_flags_stale_names_and_dangling_references() {
        let drinks = category("c1", "Drinks");
        let mut stale = stored("p1", "4006381333931", &drinks);
        stale.category = "Old name".into();
        let mut dangling = stored("p2", "96385074", &drinks);
        dangling.category_id = "gone".into();

        let violations = audit(&[stale, dangling], &[drinks]);
        assert_eq!(
            violations,
            vec![
                Violation::StaleCategoryName {
                    product_id: "p1".into()
                },
                Violation::DanglingCategory {
                    product_id: "p2".into()
                },
            ]
        );
    }

    #[test]
    fn audit_of_consistent_catalog_is_empty() {
        let drinks = category("c1", "Drinks");
        let product = stored("p1", "4006381333931", &drinks);
        assert!(audit(&[product], &[drinks]).is_empty());
    }
}
