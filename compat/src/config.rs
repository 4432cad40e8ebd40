//! Classifier configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! store_type: SQLite
//! extractor:
//!   row_policy: strict
//!   max_inflated_bytes: 67108864
//! jobs: 4
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use store_model_core::SQLITE_STORE_TYPE;
use store_model_sqlite::ExtractorConfig;

use crate::error::ConfigError;

/// Settings for [`CompatibilityClassifier`](crate::CompatibilityClassifier).
///
/// Every field is optional in YAML; missing fields take the engine defaults.
///
/// # Examples
///
/// ```
/// use store_model_compat::ClassifierConfig;
///
/// let config: ClassifierConfig = serde_yaml::from_str("jobs: 2").unwrap();
/// assert_eq!(config.store_type, "SQLite");
/// assert_eq!(config.jobs, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Store type the metadata must record.
    #[serde(default = "default_store_type")]
    pub store_type: String,
    /// Extraction settings used on the slow path.
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Worker threads for batch classification (`None` = rayon's default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

fn default_store_type() -> String {
    SQLITE_STORE_TYPE.to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
            extractor: ExtractorConfig::default(),
            jobs: None,
        }
    }
}

impl ClassifierConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read, or
    /// [`ConfigError::YamlError`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be written, or
    /// [`ConfigError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_model_sqlite::{CacheRowPolicy, DEFAULT_MAX_INFLATED_BYTES};

    fn sample_yaml() -> &'static str {
        r#"
store_type: SQLite
extractor:
  row_policy: first_row
  max_inflated_bytes: 1048576
jobs: 8
"#
    }

    #[test]
    fn test_parse_config() {
        let config: ClassifierConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.store_type, "SQLite");
        assert_eq!(config.extractor.row_policy, CacheRowPolicy::FirstRow);
        assert_eq!(config.extractor.max_inflated_bytes, 1_048_576);
        assert_eq!(config.jobs, Some(8));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ClassifierConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ClassifierConfig::default());
        assert_eq!(config.extractor.row_policy, CacheRowPolicy::Strict);
        assert_eq!(config.extractor.max_inflated_bytes, DEFAULT_MAX_INFLATED_BYTES);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("classifier.yml");

        let config = ClassifierConfig {
            jobs: Some(3),
            ..ClassifierConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = ClassifierConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = ClassifierConfig::load(dir.path().join("absent.yml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
