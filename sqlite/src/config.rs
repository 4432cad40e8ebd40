//! Extractor configuration.
//!
//! Serializable settings that control how the model cache is read and
//! inflated. The cache layout itself is fixed; only the policy around it is
//! configurable.
//!
//! # Example YAML
//!
//! ```yaml
//! row_policy: strict
//! max_inflated_bytes: 67108864
//! ```

use serde::{Deserialize, Serialize};

/// Upper bound on the size of an inflated model archive (64 MiB).
pub const DEFAULT_MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

/// What to do when the model cache table holds more than one row.
///
/// # Examples
///
/// ```
/// use store_model_sqlite::CacheRowPolicy;
///
/// assert_eq!(CacheRowPolicy::default(), CacheRowPolicy::Strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheRowPolicy {
    /// Fail with [`AmbiguousCacheRows`](crate::ExtractError::AmbiguousCacheRows).
    #[default]
    Strict,
    /// Use the first row in table order and ignore the rest.
    FirstRow,
}

/// Settings for [`StoreModelExtractor`](crate::StoreModelExtractor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Handling of a cache table with several rows.
    #[serde(default)]
    pub row_policy: CacheRowPolicy,
    /// Inflation stops with an error past this many bytes.
    #[serde(default = "default_max_inflated_bytes")]
    pub max_inflated_bytes: u64,
}

fn default_max_inflated_bytes() -> u64 {
    DEFAULT_MAX_INFLATED_BYTES
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            row_policy: CacheRowPolicy::default(),
            max_inflated_bytes: DEFAULT_MAX_INFLATED_BYTES,
        }
    }
}
