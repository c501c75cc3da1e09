pub mod category;
pub mod completions;
pub mod gtin;
pub mod init;
pub mod product;
pub mod snapshot;
pub mod stats;

use crate::output::CliError;
use shelf_core::config::{self, ProjectConfig, SHELF_DIR};
use shelf_core::error::ErrorCode;
use shelf_core::{Backend, CatalogStore, open_store};
use std::path::Path;
use tracing::debug;

/// An opened catalog: resolved config and the chosen store.
pub struct Catalog {
    pub config: ProjectConfig,
    pub store: Box<dyn CatalogStore>,
}

/// Find the enclosing project and open its store.
///
/// # Errors
///
/// A coded [`CliError`] when no `.shelf/` directory exists above `start` or
/// the project config cannot be read, otherwise any store open error.
pub fn open_catalog(start: &Path, backend: Option<Backend>) -> anyhow::Result<Catalog> {
    let root = config::find_project_root(start).ok_or_else(|| {
        coded(
            format!("no {SHELF_DIR}/ directory in {} or any parent", start.display()),
            ErrorCode::NotInitialized,
        )
    })?;

    let config = config::resolve_project_config(&root, backend)
        .map_err(|err| coded(format!("{err:#}"), ErrorCode::ConfigParseError))?;
    let store = open_store(&config.storage, &root)?;
    debug!(root = %root.display(), backend = %store.backend(), "opened catalog");

    Ok(Catalog { config, store })
}

/// A [`CliError`] carrying `code` and its standard hint.
pub fn coded(message: impl Into<String>, code: ErrorCode) -> CliError {
    CliError {
        message: message.into(),
        suggestion: code.hint().map(str::to_string),
        error_code: Some(code.code().to_string()),
    }
}

/// Rejection for an `update` given no field flags.
pub fn nothing_to_update(kind: &str) -> CliError {
    coded(
        format!("no fields given to update on the {kind}"),
        ErrorCode::InvalidInput,
    )
    .with_suggestion(format!("Pass at least one field flag, see `shelf {kind} update --help`."))
}

/// Outcome of a delete, shared by products and categories.
#[derive(Debug, serde::Serialize)]
pub struct Deleted<'a> {
    pub kind: &'static str,
    pub id: &'a str,
    pub deleted: bool,
}

impl<'a> Deleted<'a> {
    pub const fn new(kind: &'static str, id: &'a str) -> Self {
        Self {
            kind,
            id,
            deleted: true,
        }
    }
}
