//! Error types for classification and its configuration.

use store_model_sqlite::ExtractError;
use thiserror::Error;

/// Errors that can occur while classifying a store.
///
/// An incompatible store is not an error; see
/// [`CompatibilityVerdict::Incompatible`](crate::CompatibilityVerdict::Incompatible).
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The store metadata could not be fetched.
    #[error("failed to fetch store metadata: {0}")]
    MetadataFetchFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The cached model could not be extracted from the store.
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// The worker pool for batch classification could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors that can occur while loading or saving a [`ClassifierConfig`](crate::ClassifierConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`ClassifyError`].
pub type Result<T> = std::result::Result<T, ClassifyError>;
