use crate::gtin::GtinError;
use crate::lock::LockError;
use rust_decimal::Decimal;
use std::{fmt, io};

/// Machine-readable error codes for callers that render or branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidInput,
    InvalidGtin,
    DuplicateGtin,
    DuplicateCategoryName,
    CategoryNotFound,
    NotFound,
    CategoryInUse,
    MalformedSnapshot,
    StorageWriteFailed,
    LockContention,
    CorruptStore,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidInput => "E2001",
            Self::InvalidGtin => "E2002",
            Self::DuplicateGtin => "E2003",
            Self::DuplicateCategoryName => "E2004",
            Self::CategoryNotFound => "E2005",
            Self::NotFound => "E2006",
            Self::CategoryInUse => "E2007",
            Self::MalformedSnapshot => "E3001",
            Self::StorageWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::CorruptStore => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Catalog not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidInput => "Invalid input",
            Self::InvalidGtin => "Invalid GTIN",
            Self::DuplicateGtin => "Duplicate GTIN",
            Self::DuplicateCategoryName => "Duplicate category name",
            Self::CategoryNotFound => "Category not found",
            Self::NotFound => "Record not found",
            Self::CategoryInUse => "Category in use",
            Self::MalformedSnapshot => "Malformed snapshot",
            Self::StorageWriteFailed => "Storage write failed",
            Self::LockContention => "Lock contention",
            Self::CorruptStore => "Corrupt catalog store",
        }
    }

    /// Optional remediation hint that can be surfaced to end users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `shelf init` to create a catalog in this directory."),
            Self::ConfigParseError => Some("Fix syntax in .shelf/config.toml and retry."),
            Self::InvalidInput => None,
            Self::InvalidGtin => {
                Some("Use an 8, 12, 13 or 14 digit GTIN with a valid GS1 check digit.")
            }
            Self::DuplicateGtin => Some("Each product needs its own GTIN; edit the existing product instead."),
            Self::DuplicateCategoryName => Some("Pick a category name that is not already taken."),
            Self::CategoryNotFound => Some("List categories and reference an existing id."),
            Self::NotFound => None,
            Self::CategoryInUse => {
                Some("Move or delete the products in this category before deleting it.")
            }
            Self::MalformedSnapshot => {
                Some("Snapshots need a non-empty version plus products and categories arrays.")
            }
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other shelf process releases its lock."),
            Self::CorruptStore => Some("Restore the catalog from a snapshot with `shelf import`."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Entity kind named by [`CatalogError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Category,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => f.write_str("product"),
            Self::Category => f.write_str("category"),
        }
    }
}

/// Input errors, detected before any persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Gtin(#[from] GtinError),

    /// A required text field is empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("price must not be negative, got {0}")]
    NegativePrice(Decimal),

    #[error("stock must not be negative, got {0}")]
    NegativeStock(i64),
}

/// Failures of the underlying store, surfaced but never retried.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("collection encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Stored data that decodes but cannot be a valid record.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// The discriminated outcome of every catalog operation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("GTIN {gtin} is already used by product {existing_id}")]
    DuplicateGtin { gtin: String, existing_id: String },

    #[error("category name '{name}' already exists")]
    DuplicateCategoryName { name: String },

    #[error("category '{id}' does not exist")]
    CategoryNotFound { id: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("category '{id}' is still used by {count} product(s)")]
    CategoryInUse { id: String, count: usize },

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(InputError::Gtin(_)) => ErrorCode::InvalidGtin,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::DuplicateGtin { .. } => ErrorCode::DuplicateGtin,
            Self::DuplicateCategoryName { .. } => ErrorCode::DuplicateCategoryName,
            Self::CategoryNotFound { .. } => ErrorCode::CategoryNotFound,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::CategoryInUse { .. } => ErrorCode::CategoryInUse,
            Self::MalformedSnapshot(_) => ErrorCode::MalformedSnapshot,
            Self::Storage(StorageError::Lock(LockError::Timeout { .. })) => {
                ErrorCode::LockContention
            }
            Self::Storage(StorageError::Json(_) | StorageError::Corrupt(_)) => {
                ErrorCode::CorruptStore
            }
            Self::Storage(_) => ErrorCode::StorageWriteFailed,
        }
    }

    /// Optional remediation hint for end users.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn product_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: EntityKind::Product,
            id: id.to_string(),
        }
    }

    pub(crate) fn category_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: EntityKind::Category,
            id: id.to_string(),
        }
    }
}

impl From<io::Error> for CatalogError {
    fn from(err: io::Error) -> Self {
        Self::Storage(StorageError::Io(err))
    }
}

impl From<rusqlite::Error> for CatalogError {
    /// A row that cannot be decoded is corruption, not a failed write.
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => {
                Self::Storage(StorageError::Corrupt(err.to_string()))
            }
            other => Self::Storage(StorageError::Sqlite(other)),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(StorageError::Json(err))
    }
}

impl From<LockError> for CatalogError {
    fn from(err: LockError) -> Self {
        Self::Storage(StorageError::Lock(err))
    }
}

impl From<GtinError> for CatalogError {
    fn from(err: GtinError) -> Self {
        Self::InvalidInput(InputError::Gtin(err))
    }
}

/// Result alias used across the engine.
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{CatalogError, ErrorCode, InputError};
    use crate::gtin::GtinError;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidInput,
            ErrorCode::InvalidGtin,
            ErrorCode::DuplicateGtin,
            ErrorCode::DuplicateCategoryName,
            ErrorCode::CategoryNotFound,
            ErrorCode::NotFound,
            ErrorCode::CategoryInUse,
            ErrorCode::MalformedSnapshot,
            ErrorCode::StorageWriteFailed,
            ErrorCode::LockContention,
            ErrorCode::CorruptStore,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::CategoryInUse.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn gtin_failures_get_their_own_code() {
        let err = CatalogError::from(GtinError::EmptyInput);
        assert_eq!(err.code(), ErrorCode::InvalidGtin);

        let err = CatalogError::from(InputError::NegativeStock(-1));
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn category_in_use_message_names_the_count() {
        let err = CatalogError::CategoryInUse {
            id: "c1".into(),
            count: 3,
        };
        assert_eq!(err.to_string(), "category 'c1' is still used by 3 product(s)");
        assert!(err.hint().is_some());
    }
}
