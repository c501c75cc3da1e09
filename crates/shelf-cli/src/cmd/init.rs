//! `shelf init` — create `.shelf/`, the default config, and an empty store.

use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use shelf_core::config::{self, SHELF_DIR};
use shelf_core::seed::seed_default_categories;
use shelf_core::{Backend, open_store};
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Create the starter categories when the catalog has none.
    #[arg(long)]
    pub seed: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    root: String,
    backend: Backend,
    created: bool,
    config_written: bool,
    seeded: Vec<String>,
}

/// Execute `shelf init` in `project_root`.
///
/// Re-running on an existing project is harmless: the config is left alone
/// and seeding only touches an empty catalog.
///
/// # Errors
///
/// Returns an error if the directory or config cannot be written, the
/// existing config is malformed, or the store cannot be opened.
pub fn run_init(
    args: &InitArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let shelf_dir = project_root.join(SHELF_DIR);
    let created = !shelf_dir.is_dir();
    std::fs::create_dir_all(&shelf_dir)
        .with_context(|| format!("Failed to create {}", shelf_dir.display()))?;

    let resolved = config::resolve_project_config(project_root, backend)?;
    let config_written =
        config::write_default_project_config(project_root, resolved.storage.backend)?;

    let mut store = open_store(&resolved.storage, project_root)?;
    let seeded = if args.seed {
        seed_default_categories(store.as_mut())?
            .into_iter()
            .map(|c| c.name)
            .collect()
    } else {
        Vec::new()
    };

    let payload = InitOutput {
        root: project_root.display().to_string(),
        backend: resolved.storage.backend,
        created,
        config_written,
        seeded,
    };

    render(output, &payload, |value, w| {
        if value.created {
            writeln!(w, "✓ Initialized {SHELF_DIR}/ in {}", value.root)?;
        } else {
            writeln!(w, "✓ {SHELF_DIR}/ already exists in {}", value.root)?;
        }
        pretty_kv(w, "Backend", value.backend.as_str())?;
        if value.config_written {
            pretty_kv(w, "Config", format!("{SHELF_DIR}/config.toml"))?;
        }
        if !value.seeded.is_empty() {
            pretty_kv(w, "Seeded", value.seeded.join(", "))?;
        }
        if value.created {
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  shelf category add \"Drinks\"")?;
            writeln!(w, "  shelf product add --name Water --gtin 4006381333931 --category Drinks --price 0.99 --stock 40")?;
        }
        Ok(())
    })
}
