//! shelf-core: the catalog integrity engine behind `shelf`.
//!
//! Products are grouped into categories and stored through one of two
//! interchangeable backends. Whatever the backend, every successful write
//! leaves the catalog consistent: GTINs are valid and unique, products point
//! at existing categories and carry their current names, category names are
//! unique, and prices and stock are never negative.
//!
//! # Conventions
//!
//! - **Errors**: catalog operations return [`error::CatalogError`]; setup
//!   code (config, opening stores) uses `anyhow::Result`.
//! - **Logging**: `tracing` macros only; the binary installs the subscriber.

pub mod config;
pub mod db;
pub mod error;
pub mod gtin;
pub mod lock;
pub mod model;
pub mod seed;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod validate;

pub use error::{CatalogError, ErrorCode, Result};
pub use store::{Backend, CatalogStore, open_store};
