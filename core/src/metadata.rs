//! Persisted store metadata.
//!
//! Every store carries a small metadata record identifying the model it was
//! written with: one version hash per entity plus the model's version
//! identifiers. Comparing that record against a candidate model is the cheap
//! compatibility check that avoids decoding the cached model.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ObjectModel;

/// Store type recorded by SQLite-backed stores.
pub const SQLITE_STORE_TYPE: &str = "SQLite";

/// Key-value metadata describing a store's persisted model identity.
///
/// Known keys are typed fields; anything else the engine records is kept in
/// [`extra`](StoreMetadata::extra).
///
/// # Examples
///
/// ```
/// use store_model_core::*;
///
/// let model = ObjectModel::new().with_entity(EntityDescription::new("Note"));
/// let metadata = StoreMetadata::for_model(&model, SQLITE_STORE_TYPE, "B2A3C4D5");
///
/// assert_eq!(metadata.store_type, "SQLite");
/// assert!(metadata.entity_version_hashes.contains_key("Note"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub store_type: String,
    pub store_uuid: String,
    /// Entity name to hex version hash.
    pub entity_version_hashes: BTreeMap<String, String>,
    #[serde(default)]
    pub version_identifiers: BTreeSet<String>,
    /// Configuration the store was opened with, if any.
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StoreMetadata {
    /// Builds the metadata a store written with `model` would carry.
    pub fn for_model(model: &ObjectModel, store_type: &str, store_uuid: &str) -> Self {
        Self {
            store_type: store_type.to_string(),
            store_uuid: store_uuid.to_string(),
            entity_version_hashes: model.entity_version_hashes(),
            version_identifiers: model.version_identifiers.clone(),
            configuration: None,
            extra: BTreeMap::new(),
        }
    }

    /// Looks up an engine-specific key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}
