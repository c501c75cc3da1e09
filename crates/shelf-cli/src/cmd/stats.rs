use crate::cmd::open_catalog;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use shelf_core::Backend;
use shelf_core::stats::{CatalogStats, catalog_stats};
use std::io::{self, Write};
use std::path::Path;

/// Execute `shelf stats`.
///
/// # Errors
///
/// Returns an error if the project cannot be found or the store cannot be read.
pub fn run_stats(backend: Option<Backend>, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let catalog = open_catalog(project_root, backend)?;
    let threshold = catalog.config.stats.low_stock_threshold;
    let stats = catalog_stats(catalog.store.as_ref(), threshold)?;

    render_mode(output, &stats, render_text, |value, w| {
        render_pretty(value, threshold, w)
    })
}

fn render_pretty(stats: &CatalogStats, threshold: i64, w: &mut dyn Write) -> io::Result<()> {
    let products = &stats.products;
    pretty_section(w, "Products")?;
    pretty_kv(w, "Total", products.total.to_string())?;
    pretty_kv(w, "Stock value", products.total_value.to_string())?;
    pretty_kv(w, "Low stock", format!("{} (below {threshold})", products.low_stock))?;
    pretty_kv(w, "Out of stock", products.out_of_stock.to_string())?;
    writeln!(w)?;

    let totals = &stats.categories.totals;
    pretty_section(w, "Categories")?;
    pretty_kv(w, "Total", totals.total.to_string())?;
    pretty_kv(w, "In use", totals.with_products.to_string())?;
    pretty_kv(w, "Empty", totals.empty.to_string())?;
    if !stats.categories.categories.is_empty() {
        writeln!(w)?;
        for usage in &stats.categories.categories {
            writeln!(w, "  {:<32} {:>6}", usage.category.name, usage.product_count)?;
        }
    }
    Ok(())
}

fn render_text(stats: &CatalogStats, w: &mut dyn Write) -> io::Result<()> {
    let products = &stats.products;
    let totals = &stats.categories.totals;
    writeln!(w, "products\t{}", products.total)?;
    writeln!(w, "total_value\t{}", products.total_value)?;
    writeln!(w, "low_stock\t{}", products.low_stock)?;
    writeln!(w, "out_of_stock\t{}", products.out_of_stock)?;
    writeln!(w, "categories\t{}", totals.total)?;
    writeln!(w, "categories_in_use\t{}", totals.with_products)?;
    writeln!(w, "categories_empty\t{}", totals.empty)
}
