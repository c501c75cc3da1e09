//! Local document store: one JSON array per collection.
//!
//! Layout under the store directory:
//!
//! ```text
//! products.json     # [Product, ...] in insertion order
//! categories.json   # [Category, ...] in insertion order
//! version           # storage format stamp, see STORAGE_VERSION
//! catalog.lock      # advisory lock file
//! ```
//!
//! Every write is a read-modify-write of the whole collection under an
//! exclusive lock. Reads take a shared lock. Collections are written to a
//! sibling temp file and renamed into place so a crash never leaves a
//! half-written document behind. A missing collection file reads as empty.

use super::{Backend, CatalogStore, first_blocking_category};
use crate::error::{CatalogError, Result};
use crate::lock::{CatalogReadLock, CatalogWriteLock};
use crate::model::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch, new_id, now_utc,
};
use crate::validate::{validate_category_write, validate_product_write};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Storage format stamp written to the `version` file.
pub const STORAGE_VERSION: &str = "1.0.0";

const PRODUCTS_FILE: &str = "products.json";
const CATEGORIES_FILE: &str = "categories.json";
const VERSION_FILE: &str = "version";
const LOCK_FILE: &str = "catalog.lock";

/// JSON-file backed catalog store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl LocalStore {
    /// Open (or create) a store rooted at `dir` and stamp its format version.
    ///
    /// A store written by an older format version is re-stamped; the record
    /// layout has not changed across versions so no data is rewritten.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory or version file cannot be
    /// created, or the lock cannot be taken within `lock_timeout`.
    pub fn open(dir: impl Into<PathBuf>, lock_timeout: Duration) -> Result<Self> {
        let store = Self {
            dir: dir.into(),
            lock_timeout,
        };
        fs::create_dir_all(&store.dir)?;

        let _lock = store.write_lock()?;
        match store.stored_version()? {
            None => {
                debug!(dir = %store.dir.display(), "initializing local catalog store");
                store.write_version()?;
            }
            Some(version) if version == STORAGE_VERSION => {}
            Some(previous) => {
                info!(
                    from = %previous,
                    to = STORAGE_VERSION,
                    "upgrading local catalog storage format"
                );
                store.write_version()?;
            }
        }

        Ok(store)
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The format stamp on disk, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the version file exists but cannot be read.
    pub fn stored_version(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.dir.join(VERSION_FILE)) {
            Ok(raw) => Ok(Some(raw.trim().to_string()).filter(|v| !v.is_empty())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_version(&self) -> Result<()> {
        fs::write(self.dir.join(VERSION_FILE), format!("{STORAGE_VERSION}\n"))?;
        Ok(())
    }

    fn write_lock(&self) -> Result<CatalogWriteLock> {
        Ok(CatalogWriteLock::acquire(
            &self.dir.join(LOCK_FILE),
            self.lock_timeout,
        )?)
    }

    fn read_lock(&self) -> Result<CatalogReadLock> {
        Ok(CatalogReadLock::acquire(
            &self.dir.join(LOCK_FILE),
            self.lock_timeout,
        )?)
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let bytes = match fs::read(self.dir.join(file)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        let path = self.dir.join(file);
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(items)?;
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, file: &str) -> Result<()> {
        match fs::remove_file(self.dir.join(file)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CatalogStore for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let _lock = self.read_lock()?;
        self.load(PRODUCTS_FILE)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let _lock = self.read_lock()?;
        self.load(CATEGORIES_FILE)
    }

    fn create_product(&mut self, data: NewProduct) -> Result<Product> {
        let _lock = self.write_lock()?;
        let mut products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        let categories: Vec<Category> = self.load(CATEGORIES_FILE)?;

        let (valid, category_name) = validate_product_write(&data, &products, &categories, None)?;
        let now = now_utc();
        let product = valid.into_product(new_id(), category_name, now, now);

        products.push(product.clone());
        self.save(PRODUCTS_FILE, &products)?;
        debug!(id = %product.id, gtin = %product.gtin, "created product");
        Ok(product)
    }

    fn update_product(&mut self, id: &str, patch: ProductPatch) -> Result<Product> {
        let _lock = self.write_lock()?;
        let mut products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        let categories: Vec<Category> = self.load(CATEGORIES_FILE)?;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::product_not_found(id))?;
        let candidate = patch.merge_onto(&products[index]);
        let (valid, category_name) =
            validate_product_write(&candidate, &products, &categories, Some(id))?;

        let created_at = products[index].created_at;
        let updated = valid.into_product(id.to_string(), category_name, created_at, now_utc());
        products[index] = updated.clone();

        self.save(PRODUCTS_FILE, &products)?;
        debug!(id, "updated product");
        Ok(updated)
    }

    fn delete_product(&mut self, id: &str) -> Result<()> {
        let _lock = self.write_lock()?;
        let mut products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(CatalogError::product_not_found(id));
        }

        self.save(PRODUCTS_FILE, &products)?;
        debug!(id, "deleted product");
        Ok(())
    }

    fn create_category(&mut self, data: NewCategory) -> Result<Category> {
        let _lock = self.write_lock()?;
        let mut categories: Vec<Category> = self.load(CATEGORIES_FILE)?;

        let valid = validate_category_write(&data, &categories, None)?;
        let now = now_utc();
        let category = Category {
            id: new_id(),
            name: valid.name,
            description: valid.description,
            created_at: now,
            updated_at: now,
        };

        categories.push(category.clone());
        self.save(CATEGORIES_FILE, &categories)?;
        debug!(id = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<Category> {
        let _lock = self.write_lock()?;
        let mut categories: Vec<Category> = self.load(CATEGORIES_FILE)?;

        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CatalogError::category_not_found(id))?;
        let candidate = patch.merge_onto(&categories[index]);
        let valid = validate_category_write(&candidate, &categories, Some(id))?;

        let renamed = categories[index].name != valid.name;
        let category = &mut categories[index];
        category.name = valid.name;
        category.description = valid.description;
        category.updated_at = now_utc();
        let updated = category.clone();

        // Both collections are prepared before either file is written.
        let mut relabelled = None;
        if renamed {
            let mut products: Vec<Product> = self.load(PRODUCTS_FILE)?;
            let mut touched = 0_usize;
            for product in products.iter_mut().filter(|p| p.category_id == id) {
                product.category.clone_from(&updated.name);
                touched += 1;
            }
            if touched > 0 {
                relabelled = Some((products, touched));
            }
        }

        if let Some((products, touched)) = relabelled {
            self.save(PRODUCTS_FILE, &products)?;
            debug!(id, products = touched, "propagated category rename");
        }
        self.save(CATEGORIES_FILE, &categories)?;

        debug!(id, "updated category");
        Ok(updated)
    }

    fn delete_category(&mut self, id: &str) -> Result<()> {
        let _lock = self.write_lock()?;
        let mut categories: Vec<Category> = self.load(CATEGORIES_FILE)?;

        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CatalogError::category_not_found(id))?;

        let products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        let count = products.iter().filter(|p| p.category_id == id).count();
        if count > 0 {
            warn!(id, count, "refusing to delete category that is still referenced");
            return Err(CatalogError::CategoryInUse {
                id: id.to_string(),
                count,
            });
        }

        categories.remove(index);
        self.save(CATEGORIES_FILE, &categories)?;
        debug!(id, "deleted category");
        Ok(())
    }

    fn clear_products(&mut self) -> Result<()> {
        let _lock = self.write_lock()?;
        self.remove(PRODUCTS_FILE)
    }

    fn clear_categories(&mut self) -> Result<()> {
        let _lock = self.write_lock()?;
        let products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        if let Some((id, count)) = first_blocking_category(&products) {
            return Err(CatalogError::CategoryInUse { id, count });
        }
        self.remove(CATEGORIES_FILE)
    }

    fn restore_categories(&mut self, restored: &[Category]) -> Result<()> {
        let _lock = self.write_lock()?;
        let mut categories: Vec<Category> = self.load(CATEGORIES_FILE)?;
        categories.extend_from_slice(restored);
        self.save(CATEGORIES_FILE, &categories)
    }

    fn restore_products(&mut self, restored: &[Product]) -> Result<()> {
        let _lock = self.write_lock()?;
        let mut products: Vec<Product> = self.load(PRODUCTS_FILE)?;
        products.extend_from_slice(restored);
        self.save(PRODUCTS_FILE, &products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = LocalStore::open(dir.path().join("data"), Duration::from_millis(200))
            .expect("open local store");
        (dir, store)
    }

    #[test]
    fn open_stamps_current_version() {
        let (_dir, store) = open_temp();
        assert_eq!(
            store.stored_version().unwrap().as_deref(),
            Some(STORAGE_VERSION)
        );
    }

    #[test]
    fn reopen_restamps_older_version() {
        let (_dir, store) = open_temp();
        fs::write(store.dir().join(VERSION_FILE), "0.9.0").unwrap();

        let reopened = LocalStore::open(store.dir(), Duration::from_millis(200)).unwrap();
        assert_eq!(
            reopened.stored_version().unwrap().as_deref(),
            Some(STORAGE_VERSION)
        );
    }

    #[test]
    fn missing_and_blank_collections_read_as_empty() {
        let (_dir, store) = open_temp();
        assert!(store.list_products().unwrap().is_empty());

        fs::write(store.dir().join(CATEGORIES_FILE), "  \n").unwrap();
        assert!(store.list_categories().unwrap().is_empty());
    }

    #[test]
    fn garbage_collection_file_is_reported_as_corrupt() {
        let (_dir, store) = open_temp();
        fs::write(store.dir().join(PRODUCTS_FILE), "{not json").unwrap();

        let err = store.list_products().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptStore);
    }

    #[test]
    fn writes_leave_no_temp_files_behind() {
        let (_dir, mut store) = open_temp();
        store.create_category(NewCategory::named("Drinks")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(store.dir().join(CATEGORIES_FILE).exists());
    }

    #[test]
    fn collections_are_camel_case_json_arrays() {
        let (_dir, mut store) = open_temp();
        let drinks = store.create_category(NewCategory::named("Drinks")).unwrap();
        store
            .create_product(NewProduct {
                name: "Cola".into(),
                gtin: "96385074".into(),
                category_id: drinks.id,
                price: rust_decimal::Decimal::new(150, 2),
                stock: 3,
                ..NewProduct::default()
            })
            .unwrap();

        let raw = fs::read_to_string(store.dir().join(PRODUCTS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["category"], "Drinks");
        assert_eq!(json[0]["price"], "1.50");
    }

    #[test]
    fn held_write_lock_surfaces_as_contention() {
        let (_dir, store) = open_temp();
        let _held = CatalogWriteLock::acquire(&store.dir().join(LOCK_FILE), Duration::from_secs(1))
            .unwrap();

        let err = store.list_categories().unwrap_err();
        assert_eq!(err.code(), ErrorCode::LockContention);
    }

    #[test]
    fn failed_rename_leaves_category_file_untouched() {
        let (_dir, mut store) = open_temp();
        let drinks = store.create_category(NewCategory::named("Drinks")).unwrap();
        fs::write(store.dir().join(PRODUCTS_FILE), "{broken").unwrap();

        let patch = CategoryPatch {
            name: Some("Beverages".into()),
            ..CategoryPatch::default()
        };
        let err = store.update_category(&drinks.id, patch).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptStore);

        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Drinks"]);
    }
}
