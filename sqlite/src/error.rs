//! Error types for store access.
//!
//! Extraction, metadata fetching and fixture writing each get their own error
//! type so callers can tell which step of which operation failed. SQLite
//! failures keep the numeric result code reported by the library.

use store_model_core::{ArchiveError, ValidationError};
use thiserror::Error;

/// Errors that can occur while extracting the cached model from a store.
///
/// Every variant is terminal: the extractor never retries.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file cannot be opened as a SQLite database.
    #[error("failed to open store (sqlite code {code})")]
    OpenFailed { code: i32 },

    /// The model cache query could not be compiled against this database.
    #[error("failed to prepare model cache query (sqlite code {code})")]
    QueryPrepareFailed { code: i32 },

    /// The model cache query could not be stepped to a row.
    #[error("model cache query failed (sqlite code {code})")]
    QueryExecutionFailed { code: i32 },

    /// The model cache table holds more than one row.
    #[error("model cache holds more than one row")]
    AmbiguousCacheRows,

    /// The model cache row has no blob.
    #[error("model cache blob is missing")]
    BlobMissing,

    /// The blob is not a valid compressed stream.
    #[error("failed to decompress model cache: {0}")]
    DecompressionFailed(#[source] std::io::Error),

    /// The inflated bytes are not a model archive.
    #[error("failed to decode model cache: {0}")]
    DecodeFailed(#[source] ArchiveError),

    /// The archive decoded to no value.
    #[error("model cache decoded to an empty value")]
    DecodedEmpty,
}

/// Errors that can occur while reading a store's metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The file cannot be opened as a SQLite database.
    #[error("failed to open store (sqlite code {code})")]
    OpenFailed { code: i32 },

    /// Querying the metadata table failed.
    #[error("failed to read store metadata: {0}")]
    Query(#[from] rusqlite::Error),

    /// The metadata table is empty or its plist column is null.
    #[error("store has no metadata")]
    Missing,

    /// The metadata plist is not valid JSON metadata.
    #[error("malformed store metadata: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The store was written by a different store type.
    #[error("store type is {found}, expected {expected}")]
    StoreTypeMismatch { expected: String, found: String },

    /// A pragma name in the store options contains invalid characters.
    #[error("invalid pragma '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPragma(String),
}

/// Errors that can occur while writing a fixture store.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The model failed validation.
    #[error("invalid model: {} validation error(s)", .0.len())]
    InvalidModel(Vec<ValidationError>),

    /// An entity or property name cannot be used as a SQL identifier.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// The model could not be archived.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// The archive could not be compressed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// The metadata could not be serialized.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Convenience alias for results with [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Numeric SQLite result code carried by `err`.
///
/// Errors raised by rusqlite itself rather than by SQLite map to
/// `SQLITE_ERROR`.
pub(crate) fn sqlite_code(err: &rusqlite::Error) -> i32 {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => failure.extended_code,
        _ => rusqlite::ffi::SQLITE_ERROR,
    }
}
