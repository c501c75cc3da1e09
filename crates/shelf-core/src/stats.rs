//! Catalog statistics computed from the port's list operations.

use crate::error::Result;
use crate::model::{Category, Product};
use crate::store::CatalogStore;
use rust_decimal::Decimal;
use serde::Serialize;

/// Inventory summary over all products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: usize,
    /// Sum of `price × stock`, saturating at `Decimal::MAX`.
    pub total_value: Decimal,
    /// Products with `stock` below the configured threshold (includes out of stock).
    pub low_stock: usize,
    pub out_of_stock: usize,
}

/// A category with the number of products referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUsage {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub total: usize,
    pub with_products: usize,
    pub empty: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub categories: Vec<CategoryUsage>,
    pub totals: CategoryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub products: ProductStats,
    pub categories: CategoryStats,
}

#[must_use]
pub fn product_stats(products: &[Product], low_stock_threshold: i64) -> ProductStats {
    ProductStats {
        total: products.len(),
        total_value: products
            .iter()
            .map(Product::stock_value)
            .fold(Decimal::ZERO, Decimal::saturating_add),
        low_stock: products
            .iter()
            .filter(|p| p.stock < low_stock_threshold)
            .count(),
        out_of_stock: products.iter().filter(|p| p.stock == 0).count(),
    }
}

#[must_use]
pub fn category_stats(categories: &[Category], products: &[Product]) -> CategoryStats {
    let usage: Vec<CategoryUsage> = categories
        .iter()
        .map(|category| CategoryUsage {
            category: category.clone(),
            product_count: products
                .iter()
                .filter(|p| p.category_id == category.id)
                .count(),
        })
        .collect();

    let with_products = usage.iter().filter(|u| u.product_count > 0).count();
    CategoryStats {
        totals: CategoryTotals {
            total: usage.len(),
            with_products,
            empty: usage.len() - with_products,
        },
        categories: usage,
    }
}

/// Both summaries from one consistent pair of list calls.
///
/// # Errors
///
/// Propagates any store read error.
pub fn catalog_stats<S: CatalogStore + ?Sized>(
    store: &S,
    low_stock_threshold: i64,
) -> Result<CatalogStats> {
    let categories = store.list_categories()?;
    let products = store.list_products()?;
    Ok(CatalogStats {
        products: product_stats(&products, low_stock_threshold),
        categories: category_stats(&categories, &products),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::now_utc;

    fn category(id: &str) -> Category {
        let now = now_utc();
        Category {
            id: id.into(),
            name: format!("Category {id}"),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: &str, category_id: &str, price: Decimal, stock: i64) -> Product {
        let now = now_utc();
        Product {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            gtin: "96385074".into(),
            category_id: category_id.into(),
            category: format!("Category {category_id}"),
            price,
            stock,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn product_stats_sum_value_and_count_stock_levels() {
        let products = [
            product("a", "c1", Decimal::new(250, 2), 4),
            product("b", "c1", Decimal::new(1000, 2), 0),
            product("c", "c2", Decimal::new(1, 0), 25),
        ];

        let stats = product_stats(&products, 10);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_value, Decimal::new(35, 0));
        assert_eq!(stats.low_stock, 2);
        assert_eq!(stats.out_of_stock, 1);
    }

    #[test]
    fn huge_prices_saturate_total_value() {
        let products = [
            product("a", "c1", Decimal::MAX, 2),
            product("b", "c1", Decimal::MAX, 1),
            product("c", "c1", Decimal::ONE, 3),
        ];

        let stats = product_stats(&products, 10);
        assert_eq!(stats.total_value, Decimal::MAX);
        assert_eq!(stats.low_stock, 3);
    }

    #[test]
    fn empty_catalog_has_zero_value() {
        let stats = product_stats(&[], 10);
        assert_eq!(stats.total_value, Decimal::ZERO);
        assert_eq!(stats.low_stock, 0);
    }

    #[test]
    fn category_stats_count_references_per_category() {
        let categories = [category("c1"), category("c2"), category("c3")];
        let products = [
            product("a", "c1", Decimal::ONE, 1),
            product("b", "c1", Decimal::ONE, 1),
            product("c", "c3", Decimal::ONE, 1),
        ];

        let stats = category_stats(&categories, &products);
        let counts: Vec<usize> = stats.categories.iter().map(|u| u.product_count).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert_eq!(
            stats.totals,
            CategoryTotals {
                total: 3,
                with_products: 2,
                empty: 1
            }
        );
    }

    #[test]
    fn usage_serializes_flat_with_product_count() {
        let stats = category_stats(&[category("c1")], &[]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["categories"][0]["id"], "c1");
        assert_eq!(json["categories"][0]["productCount"], 0);
        assert_eq!(json["totals"]["withProducts"], 0);
    }
}
