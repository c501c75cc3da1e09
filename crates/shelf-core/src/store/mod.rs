//! Persistence port: the catalog operations every storage backend provides.
//!
//! Two adapters implement [`CatalogStore`]:
//!
//! - [`LocalStore`] keeps each collection as one JSON document on disk and
//!   does a locked read-modify-write of the whole collection per operation.
//! - [`SqliteStore`] keeps rows in SQLite and runs explicit existence and
//!   uniqueness queries inside one transaction per write.
//!
//! Both give the same outcome for the same sequence of calls. Shared rules:
//!
//! - Reads never mutate state. Listing order is insertion order.
//! - Writes validate first (see [`crate::validate`]) and either apply fully
//!   or not at all.
//! - Deleting a category that products still reference is blocked with
//!   [`CatalogError::CategoryInUse`] carrying the number of such products.
//! - Renaming a category rewrites the denormalized `category` name on every
//!   product that references it.
//!
//! The backend is chosen once per process via [`open_store`].

pub mod local;
pub mod sqlite;

pub use local::LocalStore;
pub use sqlite::SqliteStore;

use crate::config::StorageConfig;
use crate::error::{CatalogError, Result};
use crate::gtin;
use crate::model::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which adapter backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON collections on the local filesystem.
    #[default]
    Local,
    /// Relational store in a SQLite database file.
    Sqlite,
}

impl Backend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "json" | "file" => Ok(Self::Local),
            "sqlite" | "sql" | "relational" => Ok(Self::Sqlite),
            other => anyhow::bail!("unknown backend '{other}': expected one of local, sqlite"),
        }
    }
}

/// The catalog persistence contract.
pub trait CatalogStore {
    /// Which adapter this is.
    fn backend(&self) -> Backend;

    /// All products, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// All categories, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    fn list_categories(&self) -> Result<Vec<Category>>;

    /// One product by id.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] if absent.
    fn get_product(&self, id: &str) -> Result<Product> {
        self.list_products()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CatalogError::product_not_found(id))
    }

    /// One category by id.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] if absent.
    fn get_category(&self, id: &str) -> Result<Category> {
        self.list_categories()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CatalogError::category_not_found(id))
    }

    /// Look a product up by GTIN. Separators in `raw` are ignored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    fn find_product_by_gtin(&self, raw: &str) -> Result<Option<Product>> {
        let digits = gtin::normalize(raw);
        Ok(self.list_products()?.into_iter().find(|p| p.gtin == digits))
    }

    /// Validate, assign id and timestamps, persist, and return the stored product.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `DuplicateGtin`, `CategoryNotFound`, or a storage error.
    fn create_product(&mut self, data: NewProduct) -> Result<Product>;

    /// Merge `patch` onto the stored product, revalidate the merged record
    /// (its own GTIN excluded from the uniqueness check), refresh
    /// `updated_at`, and persist.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidInput`, `DuplicateGtin`, `CategoryNotFound`, or a
    /// storage error.
    fn update_product(&mut self, id: &str, patch: ProductPatch) -> Result<Product>;

    /// Remove a product unconditionally.
    ///
    /// # Errors
    ///
    /// `NotFound`, or a storage error.
    fn delete_product(&mut self, id: &str) -> Result<()>;

    /// Validate, assign id and timestamps, persist, and return the stored category.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `DuplicateCategoryName`, or a storage error.
    fn create_category(&mut self, data: NewCategory) -> Result<Category>;

    /// Merge `patch` onto the stored category, revalidate, refresh
    /// `updated_at`, persist, and propagate a rename to referencing products.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidInput`, `DuplicateCategoryName`, or a storage error.
    fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<Category>;

    /// Remove a category nothing references.
    ///
    /// # Errors
    ///
    /// `NotFound`, `CategoryInUse { count }`, or a storage error.
    fn delete_category(&mut self, id: &str) -> Result<()>;

    /// Remove every product.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be written.
    fn clear_products(&mut self) -> Result<()>;

    /// Remove every category. Products must be cleared first.
    ///
    /// # Errors
    ///
    /// `CategoryInUse` if any product remains, or a storage error.
    fn clear_categories(&mut self) -> Result<()>;

    /// Append categories verbatim (ids and timestamps kept, no validation).
    ///
    /// # Errors
    ///
    /// Returns a storage error; the relational store also rejects rows that
    /// break its own key constraints.
    fn restore_categories(&mut self, categories: &[Category]) -> Result<()>;

    /// Append products verbatim (ids and timestamps kept, no validation).
    ///
    /// # Errors
    ///
    /// Same as [`restore_categories`](Self::restore_categories).
    fn restore_products(&mut self, products: &[Product]) -> Result<()>;
}

/// Open the configured backend under `project_root`.
///
/// # Errors
///
/// Returns an error if the store directory or database cannot be opened.
pub fn open_store(config: &StorageConfig, project_root: &Path) -> anyhow::Result<Box<dyn CatalogStore>> {
    let store: Box<dyn CatalogStore> = match config.backend {
        Backend::Local => Box::new(LocalStore::open(
            project_root.join(&config.local_dir),
            config.lock_timeout(),
        )?),
        Backend::Sqlite => Box::new(SqliteStore::open(&project_root.join(&config.sqlite_path))?),
    };
    tracing::debug!(backend = %store.backend(), "opened catalog store");
    Ok(store)
}

/// First category (in product order) that still has products, with its count.
pub(crate) fn first_blocking_category(products: &[Product]) -> Option<(String, usize)> {
    let first = products.first()?;
    let count = products
        .iter()
        .filter(|p| p.category_id == first.category_id)
        .count();
    Some((first.category_id.clone(), count))
}

#[cfg(test)]
mod tests {
    use super::Backend;

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("local".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!(" SQLite ".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("relational".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert!("postgres".parse::<Backend>().is_err());
    }

    #[test]
    fn backend_round_trips_through_display() {
        for backend in [Backend::Local, Backend::Sqlite] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }
}
