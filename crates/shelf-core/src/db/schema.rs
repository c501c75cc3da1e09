//! Canonical SQLite schema for the relational catalog store.
//!
//! - `categories` holds unique category names
//! - `products` references `categories` and carries the denormalized
//!   category name; GTINs are unique
//! - `catalog_meta` tracks the applied schema version
//!
//! Timestamps are stored as microseconds since the Unix epoch. Prices are
//! stored as decimal text so no precision is lost to floating point.

/// Migration v1: catalog tables plus metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    description TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description TEXT NOT NULL DEFAULT '',
    gtin TEXT NOT NULL UNIQUE,
    category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
    category TEXT NOT NULL,
    price TEXT NOT NULL,
    stock INTEGER NOT NULL CHECK (stock >= 0),
    image_url TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS catalog_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO catalog_meta (id, schema_version) VALUES (1, 0);
";

/// Migration v2: lookup indexes for reference counting and GTIN search.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_products_category_id ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at_us);
";

/// Indexes the latest schema must have.
pub const REQUIRED_INDEXES: &[&str] = &["idx_products_category_id", "idx_products_created_at"];
