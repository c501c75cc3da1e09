//! Relational store on SQLite.
//!
//! Each write runs in one `IMMEDIATE` transaction: the write lock is taken up
//! front, then the same checks the local store runs are issued as explicit
//! queries (GTIN owner, category existence, name uniqueness, reference
//! count) before any row changes. Schema constraints stay in place as a
//! backstop and are mapped onto the same typed errors if they ever fire.
//!
//! Listing follows `rowid`, i.e. insertion order.

use super::{Backend, CatalogStore};
use crate::db;
use crate::error::{CatalogError, Result};
use crate::gtin;
use crate::model::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch, new_id, now_utc,
};
use crate::validate::{ValidProduct, check_category_fields, check_product_fields};
use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, types::Type,
};
use rust_decimal::Decimal;
use std::{path::Path, str::FromStr};
use tracing::{debug, warn};

const PRODUCT_COLUMNS: &str = "id, name, description, gtin, category_id, category, price, stock, \
                               image_url, created_at_us, updated_at_us";
const CATEGORY_COLUMNS: &str = "id, name, description, created_at_us, updated_at_us";

/// SQLite-backed catalog store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create and migrate) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_catalog_db(path)?,
        })
    }

    /// A private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    /// Underlying connection, for diagnostics.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros))
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    let price: String = row.get(6)?;
    let price = Decimal::from_str(&price)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(err)))?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        gtin: row.get(3)?,
        category_id: row.get(4)?,
        category: row.get(5)?,
        price,
        stock: row.get(7)?,
        image_url: row.get(8)?,
        created_at: timestamp(row, 9)?,
        updated_at: timestamp(row, 10)?,
    })
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: timestamp(row, 3)?,
        updated_at: timestamp(row, 4)?,
    })
}

fn insert_product(conn: &Connection, product: &Product) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            product.id,
            product.name,
            product.description,
            product.gtin,
            product.category_id,
            product.category,
            product.price.to_string(),
            product.stock,
            product.image_url,
            product.created_at.timestamp_micros(),
            product.updated_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

fn insert_category(conn: &Connection, category: &Category) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![
            category.id,
            category.name,
            category.description,
            category.created_at.timestamp_micros(),
            category.updated_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Pre-check queries
// ---------------------------------------------------------------------------

fn fetch_product(conn: &Connection, id: &str) -> rusqlite::Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        row_to_product,
    )
    .optional()
}

fn fetch_category(conn: &Connection, id: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        params![id],
        row_to_category,
    )
    .optional()
}

fn gtin_owner(
    conn: &Connection,
    gtin: &str,
    excluding_id: Option<&str>,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM products WHERE gtin = ?1 AND (?2 IS NULL OR id <> ?2) LIMIT 1",
        params![gtin, excluding_id],
        |row| row.get(0),
    )
    .optional()
}

fn category_name(conn: &Connection, id: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT name FROM categories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

fn name_taken(conn: &Connection, name: &str, excluding_id: Option<&str>) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1 AND (?2 IS NULL OR id <> ?2))",
        params![name, excluding_id],
        |row| row.get(0),
    )
}

fn products_in_category(conn: &Connection, category_id: &str) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE category_id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Input checks, then GTIN uniqueness, then category existence.
fn check_product_write(
    conn: &Connection,
    candidate: &NewProduct,
    excluding_id: Option<&str>,
) -> Result<(ValidProduct, String)> {
    let valid = check_product_fields(candidate)?;

    if let Some(existing_id) = gtin_owner(conn, valid.gtin.as_str(), excluding_id)? {
        return Err(CatalogError::DuplicateGtin {
            gtin: valid.gtin.to_string(),
            existing_id,
        });
    }

    let name = category_name(conn, &valid.category_id)?.ok_or_else(|| {
        CatalogError::CategoryNotFound {
            id: valid.category_id.clone(),
        }
    })?;
    Ok((valid, name))
}

// ---------------------------------------------------------------------------
// Constraint backstop
// ---------------------------------------------------------------------------

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn product_constraint(conn: &Connection, err: rusqlite::Error, product: &Product) -> CatalogError {
    if !is_constraint_violation(&err) {
        return err.into();
    }
    let message = err.to_string();
    warn!(id = %product.id, %message, "product write hit a schema constraint");

    if message.contains("products.gtin") {
        let existing_id = gtin_owner(conn, &product.gtin, Some(&product.id))
            .ok()
            .flatten()
            .unwrap_or_default();
        return CatalogError::DuplicateGtin {
            gtin: product.gtin.clone(),
            existing_id,
        };
    }
    if message.contains("FOREIGN KEY") {
        return CatalogError::CategoryNotFound {
            id: product.category_id.clone(),
        };
    }
    err.into()
}

fn category_constraint(err: rusqlite::Error, category: &Category) -> CatalogError {
    if is_constraint_violation(&err) && err.to_string().contains("categories.name") {
        return CatalogError::DuplicateCategoryName {
            name: category.name.clone(),
        };
    }
    err.into()
}

impl CatalogStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY rowid"))?;
        let rows = stmt.query_map([], row_to_product)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY rowid"))?;
        let rows = stmt.query_map([], row_to_category)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    fn get_product(&self, id: &str) -> Result<Product> {
        fetch_product(&self.conn, id)?.ok_or_else(|| CatalogError::product_not_found(id))
    }

    fn get_category(&self, id: &str) -> Result<Category> {
        fetch_category(&self.conn, id)?.ok_or_else(|| CatalogError::category_not_found(id))
    }

    fn find_product_by_gtin(&self, raw: &str) -> Result<Option<Product>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE gtin = ?1"),
                params![gtin::normalize(raw)],
                row_to_product,
            )
            .optional()?)
    }

    fn create_product(&mut self, data: NewProduct) -> Result<Product> {
        let tx = self.begin()?;
        let (valid, category_name) = check_product_write(&tx, &data, None)?;

        let now = now_utc();
        let product = valid.into_product(new_id(), category_name, now, now);
        insert_product(&tx, &product).map_err(|err| product_constraint(&tx, err, &product))?;
        tx.commit()?;

        debug!(id = %product.id, gtin = %product.gtin, "created product");
        Ok(product)
    }

    fn update_product(&mut self, id: &str, patch: ProductPatch) -> Result<Product> {
        let tx = self.begin()?;
        let current = fetch_product(&tx, id)?.ok_or_else(|| CatalogError::product_not_found(id))?;
        let candidate = patch.merge_onto(&current);
        let (valid, category_name) = check_product_write(&tx, &candidate, Some(id))?;

        let updated = valid.into_product(
            current.id,
            category_name,
            current.created_at,
            now_utc(),
        );
        tx.execute(
            "UPDATE products SET name = ?2, description = ?3, gtin = ?4, category_id = ?5, \
             category = ?6, price = ?7, stock = ?8, image_url = ?9, updated_at_us = ?10 \
             WHERE id = ?1",
            params![
                updated.id,
                updated.name,
                updated.description,
                updated.gtin,
                updated.category_id,
                updated.category,
                updated.price.to_string(),
                updated.stock,
                updated.image_url,
                updated.updated_at.timestamp_micros(),
            ],
        )
        .map_err(|err| product_constraint(&tx, err, &updated))?;
        tx.commit()?;

        debug!(id, "updated product");
        Ok(updated)
    }

    fn delete_product(&mut self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(CatalogError::product_not_found(id));
        }
        debug!(id, "deleted product");
        Ok(())
    }

    fn create_category(&mut self, data: NewCategory) -> Result<Category> {
        let valid = check_category_fields(&data)?;
        let tx = self.begin()?;
        if name_taken(&tx, &valid.name, None)? {
            return Err(CatalogError::DuplicateCategoryName { name: valid.name });
        }

        let now = now_utc();
        let category = Category {
            id: new_id(),
            name: valid.name,
            description: valid.description,
            created_at: now,
            updated_at: now,
        };
        insert_category(&tx, &category).map_err(|err| category_constraint(err, &category))?;
        tx.commit()?;

        debug!(id = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<Category> {
        let tx = self.begin()?;
        let current =
            fetch_category(&tx, id)?.ok_or_else(|| CatalogError::category_not_found(id))?;
        let valid = check_category_fields(&patch.merge_onto(&current))?;
        if name_taken(&tx, &valid.name, Some(id))? {
            return Err(CatalogError::DuplicateCategoryName { name: valid.name });
        }

        let renamed = current.name != valid.name;
        let updated = Category {
            name: valid.name,
            description: valid.description,
            updated_at: now_utc(),
            ..current
        };
        tx.execute(
            "UPDATE categories SET name = ?2, description = ?3, updated_at_us = ?4 WHERE id = ?1",
            params![
                updated.id,
                updated.name,
                updated.description,
                updated.updated_at.timestamp_micros(),
            ],
        )
        .map_err(|err| category_constraint(err, &updated))?;

        if renamed {
            let touched = tx.execute(
                "UPDATE products SET category = ?1 WHERE category_id = ?2",
                params![updated.name, id],
            )?;
            debug!(id, products = touched, "propagated category rename");
        }
        tx.commit()?;

        debug!(id, "updated category");
        Ok(updated)
    }

    fn delete_category(&mut self, id: &str) -> Result<()> {
        let tx = self.begin()?;
        if fetch_category(&tx, id)?.is_none() {
            return Err(CatalogError::category_not_found(id));
        }

        let count = products_in_category(&tx, id)?;
        if count > 0 {
            warn!(id, count, "refusing to delete category that is still referenced");
            return Err(CatalogError::CategoryInUse {
                id: id.to_string(),
                count,
            });
        }

        tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        tx.commit()?;
        debug!(id, "deleted category");
        Ok(())
    }

    fn clear_products(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM products", [])?;
        Ok(())
    }

    fn clear_categories(&mut self) -> Result<()> {
        let tx = self.begin()?;
        let blocking: Option<(String, i64)> = tx
            .query_row(
                "SELECT category_id, COUNT(*) FROM products \
                 GROUP BY category_id ORDER BY MIN(rowid) LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((id, count)) = blocking {
            return Err(CatalogError::CategoryInUse {
                id,
                count: usize::try_from(count).unwrap_or_default(),
            });
        }

        tx.execute("DELETE FROM categories", [])?;
        tx.commit()?;
        Ok(())
    }

    fn restore_categories(&mut self, categories: &[Category]) -> Result<()> {
        let tx = self.begin()?;
        for category in categories {
            insert_category(&tx, category)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn restore_products(&mut self, products: &[Product]) -> Result<()> {
        let tx = self.begin()?;
        for product in products {
            insert_product(&tx, product)?;
        }
        tx.commit()?;
        Ok(())
    }
}
