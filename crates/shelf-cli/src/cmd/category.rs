//! `shelf category` — add, update, delete, list and show categories.

use crate::cmd::{Deleted, nothing_to_update, open_catalog};
use crate::output::{
    OutputMode, Renderable, pretty_kv, pretty_section, render, render_item, render_list,
};
use clap::{Args, Subcommand};
use shelf_core::model::{Category, CategoryPatch, NewCategory};
use shelf_core::stats::{CategoryUsage, category_stats};
use shelf_core::{Backend, CatalogStore};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(about = "Create a category")]
    Add(CategoryAddArgs),

    #[command(about = "Rename a category or change its description")]
    Update(CategoryUpdateArgs),

    #[command(about = "Delete a category that no product references")]
    Delete(CategoryIdArgs),

    #[command(about = "List categories with product counts")]
    List,

    #[command(about = "Show one category")]
    Show(CategoryIdArgs),
}

#[derive(Args, Debug)]
pub struct CategoryAddArgs {
    /// Category name; must be unique.
    pub name: String,

    /// Optional description.
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct CategoryUpdateArgs {
    /// Category ID.
    pub id: String,

    /// New name; products pick it up immediately.
    #[arg(long)]
    pub name: Option<String>,

    /// New description (empty clears it).
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct CategoryIdArgs {
    /// Category ID.
    pub id: String,
}

impl Renderable for CategoryUsage {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let category = &self.category;
        pretty_section(w, &category.name)?;
        pretty_kv(w, "ID", &category.id)?;
        if let Some(description) = &category.description {
            pretty_kv(w, "Description", description)?;
        }
        pretty_kv(w, "Products", self.product_count.to_string())?;
        pretty_kv(w, "Updated", category.updated_at.to_rfc3339())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}",
            self.category.id, self.category.name, self.product_count
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "NAME", "PRODUCTS"]
    }
}

fn with_usage(store: &dyn CatalogStore, category: Category) -> anyhow::Result<CategoryUsage> {
    let product_count = store
        .list_products()?
        .iter()
        .filter(|p| p.category_id == category.id)
        .count();
    Ok(CategoryUsage {
        category,
        product_count,
    })
}

/// Dispatch a `shelf category` subcommand.
///
/// # Errors
///
/// Returns the catalog error from the store (duplicate name, not found,
/// category in use, ...) or a project lookup error.
pub fn run_category(
    args: &CategoryArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut catalog = open_catalog(project_root, backend)?;
    let store = catalog.store.as_mut();

    match &args.command {
        CategoryCommand::Add(add) => {
            let mut input = NewCategory::named(add.name.clone());
            input.description.clone_from(&add.description);
            let category = store.create_category(input)?;
            render_item(
                &CategoryUsage {
                    category,
                    product_count: 0,
                },
                output,
            )
        }
        CategoryCommand::Update(update) => {
            let patch = CategoryPatch {
                name: update.name.clone(),
                description: update.description.clone(),
            };
            if patch.is_empty() {
                return Err(nothing_to_update("category").into());
            }
            let category = store.update_category(&update.id, patch)?;
            render_item(&with_usage(store, category)?, output)
        }
        CategoryCommand::Delete(target) => {
            store.delete_category(&target.id)?;
            render(output, &Deleted::new("category", &target.id), |value, w| {
                writeln!(w, "✓ deleted category {}", value.id)
            })
        }
        CategoryCommand::List => {
            let categories = store.list_categories()?;
            let products = store.list_products()?;
            let usage = category_stats(&categories, &products).categories;
            render_list(&usage, output, "(no categories)")
        }
        CategoryCommand::Show(target) => {
            let category = store.get_category(&target.id)?;
            render_item(&with_usage(store, category)?, output)
        }
    }
}
