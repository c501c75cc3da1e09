//! Whole-catalog export, import, and clear.
//!
//! Import is a destructive two-phase replace: the snapshot's shape is checked
//! first (nothing is touched if it is malformed), then the catalog is cleared,
//! then every category and product is restored verbatim with its original id
//! and timestamps. Records are not revalidated; a snapshot exported from a
//! healthy catalog already satisfies the invariants. Timestamps finer than a
//! microsecond are truncated on restore, the precision every backend keeps.
//!
//! The two phases are separate store calls. If restore fails after the
//! clear, the error surfaces and the catalog stays partially restored.

use crate::error::{CatalogError, Result};
use crate::model::{Category, Product, now_utc};
use chrono::SubsecRound;
use crate::store::CatalogStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};
use tracing::{info, warn};

/// Version stamped into exported snapshots. Advisory only on import.
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Serializable capture of the full catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    #[serde(default = "now_utc")]
    pub timestamp: DateTime<Utc>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// Record counts for one import or clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub products: usize,
    pub categories: usize,
}

/// Capture the current catalog.
///
/// # Errors
///
/// Propagates any store read error.
pub fn export<S: CatalogStore + ?Sized>(store: &S) -> Result<Snapshot> {
    let categories = store.list_categories()?;
    let products = store.list_products()?;
    Ok(Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        timestamp: now_utc(),
        products,
        categories,
    })
}

/// Check the outer shape of a decoded JSON document and build a [`Snapshot`].
///
/// # Errors
///
/// [`CatalogError::MalformedSnapshot`] when the document is not an object,
/// `version` is missing or blank, `products` or `categories` is missing or not
/// an array, or any record fails to decode.
pub fn parse_snapshot(value: Value) -> Result<Snapshot> {
    let Some(object) = value.as_object() else {
        return Err(malformed("snapshot must be a JSON object"));
    };

    match object.get("version").and_then(Value::as_str) {
        Some(version) if !version.trim().is_empty() => {}
        _ => return Err(malformed("missing or empty `version`")),
    }
    for key in ["products", "categories"] {
        if !object.get(key).is_some_and(Value::is_array) {
            return Err(malformed(&format!("missing `{key}` array")));
        }
    }

    serde_json::from_value(value).map_err(|err| malformed(&format!("bad record: {err}")))
}

/// Replace the whole catalog with `snapshot`.
///
/// # Errors
///
/// [`CatalogError::MalformedSnapshot`] for a blank version (nothing is
/// changed), otherwise any store error from the clear or restore phases.
///
/// Record timestamps are truncated to microseconds, so both backends hold
/// the same values after importing the same snapshot.
pub fn import<S: CatalogStore + ?Sized>(store: &mut S, snapshot: &Snapshot) -> Result<RestoreSummary> {
    if snapshot.version.trim().is_empty() {
        return Err(malformed("missing or empty `version`"));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        info!(version = %snapshot.version, "importing snapshot from another format version");
    }

    let categories: Vec<Category> = snapshot
        .categories
        .iter()
        .map(|c| Category {
            created_at: c.created_at.trunc_subsecs(6),
            updated_at: c.updated_at.trunc_subsecs(6),
            ..c.clone()
        })
        .collect();
    let products: Vec<Product> = snapshot
        .products
        .iter()
        .map(|p| Product {
            created_at: p.created_at.trunc_subsecs(6),
            updated_at: p.updated_at.trunc_subsecs(6),
            ..p.clone()
        })
        .collect();

    let cleared = clear_all(store)?;
    let restored = store
        .restore_categories(&categories)
        .and_then(|()| store.restore_products(&products));
    if let Err(err) = restored {
        warn!(error = %err, "snapshot restore failed after clearing the catalog");
        return Err(err);
    }

    info!(
        replaced_products = cleared.products,
        replaced_categories = cleared.categories,
        products = snapshot.products.len(),
        categories = snapshot.categories.len(),
        "imported snapshot"
    );
    Ok(RestoreSummary {
        products: snapshot.products.len(),
        categories: snapshot.categories.len(),
    })
}

/// Parse then import a decoded JSON document.
///
/// # Errors
///
/// See [`parse_snapshot`] and [`import`].
pub fn import_value<S: CatalogStore + ?Sized>(store: &mut S, value: Value) -> Result<RestoreSummary> {
    let snapshot = parse_snapshot(value)?;
    import(store, &snapshot)
}

/// Delete every product, then every category.
///
/// # Errors
///
/// Propagates any store error.
pub fn clear_all<S: CatalogStore + ?Sized>(store: &mut S) -> Result<RestoreSummary> {
    let summary = RestoreSummary {
        products: store.list_products()?.len(),
        categories: store.list_categories()?.len(),
    };
    store.clear_products()?;
    store.clear_categories()?;
    info!(
        products = summary.products,
        categories = summary.categories,
        "cleared catalog"
    );
    Ok(summary)
}

/// Export to a pretty-printed JSON file at `path`.
///
/// # Errors
///
/// Propagates store read errors and file write errors.
pub fn write_snapshot<S: CatalogStore + ?Sized>(store: &S, path: &Path) -> Result<Snapshot> {
    let snapshot = export(store)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_vec_pretty(&snapshot)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(snapshot)
}

/// Read and shape-check a snapshot file.
///
/// # Errors
///
/// A storage error if the file cannot be read, or
/// [`CatalogError::MalformedSnapshot`] if it is not a valid snapshot.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path)?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|err| malformed(&format!("not valid JSON: {err}")))?;
    parse_snapshot(value)
}

fn malformed(reason: &str) -> CatalogError {
    CatalogError::MalformedSnapshot(reason.to_string())
}
