//! `shelf product` — add, update, delete, list, show and find products.
//!
//! `--category` accepts a category id or an exact category name. Anything
//! that matches neither is passed through unchanged so the store reports
//! `CategoryNotFound`.

use crate::cmd::{Deleted, coded, nothing_to_update, open_catalog};
use crate::output::{
    OutputMode, Renderable, pretty_kv, pretty_section, render, render_item, render_list,
};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use shelf_core::error::ErrorCode;
use shelf_core::gtin;
use shelf_core::model::{NewProduct, Product, ProductPatch};
use shelf_core::{Backend, CatalogStore};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ProductArgs {
    #[command(subcommand)]
    pub command: ProductCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    #[command(about = "Create a product")]
    Add(ProductAddArgs),

    #[command(about = "Change fields of a product")]
    Update(ProductUpdateArgs),

    #[command(about = "Delete a product")]
    Delete(ProductIdArgs),

    #[command(about = "List products")]
    List(ProductListArgs),

    #[command(about = "Show one product")]
    Show(ProductIdArgs),

    #[command(about = "Look a product up by GTIN")]
    Find(ProductFindArgs),
}

#[derive(Args, Debug)]
pub struct ProductAddArgs {
    #[arg(long)]
    pub name: String,

    /// GTIN-8/12/13/14; spaces and dashes are ignored.
    #[arg(long)]
    pub gtin: String,

    /// Category id or exact name.
    #[arg(long)]
    pub category: String,

    /// Unit price, e.g. 2.49.
    #[arg(long, allow_negative_numbers = true)]
    pub price: Decimal,

    /// Units on hand.
    #[arg(long, allow_negative_numbers = true)]
    pub stock: i64,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub image_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProductUpdateArgs {
    /// Product ID.
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub gtin: Option<String>,

    /// Category id or exact name.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub price: Option<Decimal>,

    #[arg(long, allow_negative_numbers = true)]
    pub stock: Option<i64>,

    #[arg(long)]
    pub description: Option<String>,

    /// New image URL (empty clears it).
    #[arg(long)]
    pub image_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProductIdArgs {
    /// Product ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ProductListArgs {
    /// Only products in this category (id or exact name).
    #[arg(long)]
    pub category: Option<String>,

    /// Only products with stock below the configured low-stock threshold.
    #[arg(long)]
    pub low_stock: bool,
}

#[derive(Args, Debug)]
pub struct ProductFindArgs {
    /// GTIN to look up; spaces and dashes are ignored.
    pub gtin: String,
}

impl Renderable for Product {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &self.name)?;
        pretty_kv(w, "ID", &self.id)?;
        pretty_kv(w, "GTIN", gtin::format(&self.gtin))?;
        pretty_kv(w, "Category", format!("{} ({})", self.category, self.category_id))?;
        pretty_kv(w, "Price", self.price.to_string())?;
        pretty_kv(w, "Stock", self.stock.to_string())?;
        pretty_kv(w, "Stock value", self.stock_value().to_string())?;
        if !self.description.is_empty() {
            pretty_kv(w, "Description", &self.description)?;
        }
        if let Some(url) = &self.image_url {
            pretty_kv(w, "Image", url)?;
        }
        pretty_kv(w, "Updated", self.updated_at.to_rfc3339())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.id, self.gtin, self.name, self.category, self.price, self.stock
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "GTIN", "NAME", "CATEGORY", "PRICE", "STOCK"]
    }
}

/// Map a category id or exact name to an id.
fn resolve_category_ref(store: &dyn CatalogStore, raw: &str) -> anyhow::Result<String> {
    let categories = store.list_categories()?;
    if categories.iter().any(|c| c.id == raw) {
        return Ok(raw.to_string());
    }
    Ok(categories
        .into_iter()
        .find(|c| c.name == raw)
        .map_or_else(|| raw.to_string(), |c| c.id))
}

/// Dispatch a `shelf product` subcommand.
///
/// # Errors
///
/// Returns the catalog error from the store (invalid input, duplicate GTIN,
/// missing category, not found, ...) or a project lookup error.
pub fn run_product(
    args: &ProductArgs,
    backend: Option<Backend>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut catalog = open_catalog(project_root, backend)?;
    let threshold = catalog.config.stats.low_stock_threshold;
    let store = catalog.store.as_mut();

    match &args.command {
        ProductCommand::Add(add) => {
            let input = NewProduct {
                name: add.name.clone(),
                description: add.description.clone(),
                gtin: add.gtin.clone(),
                category_id: resolve_category_ref(store, &add.category)?,
                price: add.price,
                stock: add.stock,
                image_url: add.image_url.clone(),
            };
            let product = store.create_product(input)?;
            render_item(&product, output)
        }
        ProductCommand::Update(update) => {
            let category_id = match &update.category {
                Some(raw) => Some(resolve_category_ref(store, raw)?),
                None => None,
            };
            let patch = ProductPatch {
                name: update.name.clone(),
                description: update.description.clone(),
                gtin: update.gtin.clone(),
                category_id,
                price: update.price,
                stock: update.stock,
                image_url: update.image_url.clone(),
            };
            if patch.is_empty() {
                return Err(nothing_to_update("product").into());
            }
            let product = store.update_product(&update.id, patch)?;
            render_item(&product, output)
        }
        ProductCommand::Delete(target) => {
            store.delete_product(&target.id)?;
            render(output, &Deleted::new("product", &target.id), |value, w| {
                writeln!(w, "✓ deleted product {}", value.id)
            })
        }
        ProductCommand::List(list) => {
            let category_id = match &list.category {
                Some(raw) => Some(resolve_category_ref(store, raw)?),
                None => None,
            };
            let products: Vec<Product> = store
                .list_products()?
                .into_iter()
                .filter(|p| category_id.as_ref().is_none_or(|id| &p.category_id == id))
                .filter(|p| !list.low_stock || p.stock < threshold)
                .collect();
            render_list(&products, output, "(no products)")
        }
        ProductCommand::Show(target) => render_item(&store.get_product(&target.id)?, output),
        ProductCommand::Find(find) => match store.find_product_by_gtin(&find.gtin)? {
            Some(product) => render_item(&product, output),
            None => Err(coded(
                format!("no product with GTIN {}", gtin::normalize(&find.gtin)),
                ErrorCode::NotFound,
            )
            .into()),
        },
    }
}
