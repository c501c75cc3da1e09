//! `shelf export`, `shelf import` and `shelf clear`.
//!
//! Import and clear are destructive. Import replaces the whole catalog;
//! clear only runs with `--force`.

use crate::cmd::{coded, open_catalog};
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::Context as _;
use clap::Args;
use serde::Serialize;
use shelf_core::Backend;
use shelf_core::error::ErrorCode;
use shelf_core::snapshot::{self, RestoreSummary};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Snapshot file to write; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Snapshot file to restore from.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm deleting every product and category.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    path: String,
    version: String,
    products: usize,
    categories: usize,
}

#[derive(Debug, Serialize)]
struct RestoreOutput<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(flatten)]
    summary: &'a RestoreSummary,
}

/// Execute `shelf export`.
///
/// Without `--output` the snapshot JSON itself goes to stdout in every
/// output mode, so it can be redirected into a file.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or the file cannot be written.
pub fn run_export(
    args: &ExportArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let catalog = open_catalog(project_root, backend)?;

    let Some(path) = &args.output else {
        let snapshot = snapshot::export(catalog.store.as_ref())?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &snapshot)?;
        writeln!(out)?;
        return Ok(());
    };

    let written = snapshot::write_snapshot(catalog.store.as_ref(), path)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    let payload = ExportOutput {
        path: path.display().to_string(),
        version: written.version,
        products: written.products.len(),
        categories: written.categories.len(),
    };
    render(output, &payload, |value, w| {
        writeln!(w, "✓ exported snapshot to {}", value.path)?;
        pretty_kv(w, "Version", &value.version)?;
        pretty_kv(w, "Products", value.products.to_string())?;
        pretty_kv(w, "Categories", value.categories.to_string())
    })
}

/// Execute `shelf import`.
///
/// The file is read and shape-checked before anything in the catalog is
/// touched.
///
/// # Errors
///
/// Returns `MalformedSnapshot` for an unreadable or malformed file, or any
/// store error from the clear and restore phases.
pub fn run_import(
    args: &ImportArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut catalog = open_catalog(project_root, backend)?;
    let parsed = snapshot::read_snapshot(&args.file)?;
    let summary = snapshot::import(catalog.store.as_mut(), &parsed)?;

    let payload = RestoreOutput {
        action: "import",
        source: Some(args.file.display().to_string()),
        summary: &summary,
    };
    render(output, &payload, |value, w| {
        writeln!(
            w,
            "✓ imported {} product(s) and {} categor{} from {}",
            value.summary.products,
            value.summary.categories,
            if value.summary.categories == 1 { "y" } else { "ies" },
            value.source.as_deref().unwrap_or_default()
        )
    })
}

/// Execute `shelf clear`.
///
/// # Errors
///
/// Refuses without `--force`; otherwise propagates store errors.
pub fn run_clear(
    args: &ClearArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    if !args.force {
        let err = coded(
            "refusing to clear the catalog without --force",
            ErrorCode::InvalidInput,
        )
        .with_suggestion("Re-run as `shelf clear --force`.");
        return Err(err.into());
    }

    let mut catalog = open_catalog(project_root, backend)?;
    let summary = snapshot::clear_all(catalog.store.as_mut())?;

    let payload = RestoreOutput {
        action: "clear",
        source: None,
        summary: &summary,
    };
    render(output, &payload, |value, w| {
        writeln!(
            w,
            "✓ cleared {} product(s) and {} categor{}",
            value.summary.products,
            value.summary.categories,
            if value.summary.categories == 1 { "y" } else { "ies" }
        )
    })
}
