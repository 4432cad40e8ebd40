//! The seams the classifier is built from.
//!
//! Each step of classification goes through a trait so the fast path, the
//! extraction and the mapping inference can be swapped independently. The
//! default implementations wire in the SQLite store reader and the
//! lightweight inference from `store-model-core`.

use std::path::Path;

use store_model_core::{MappingError, MappingModel, ObjectModel, StoreMetadata, infer_mapping};
use store_model_sqlite::{
    CacheBlobReader, ExtractError, MetadataError, SqliteMetadataSource, StoreModelExtractor,
    StoreOptions,
};

/// Fetches the metadata a store was written with.
pub trait MetadataSource {
    /// Error reported when the metadata cannot be read.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the metadata of the store at `path`.
    fn fetch_metadata(
        &self,
        path: &Path,
        store_type: &str,
        options: &StoreOptions,
    ) -> Result<StoreMetadata, Self::Error>;
}

impl MetadataSource for SqliteMetadataSource {
    type Error = MetadataError;

    fn fetch_metadata(
        &self,
        path: &Path,
        store_type: &str,
        options: &StoreOptions,
    ) -> Result<StoreMetadata, MetadataError> {
        self.fetch(path, store_type, options)
    }
}

/// Decides from metadata alone whether a model can open a store as is.
pub trait MetadataComparator {
    /// Returns `true` if `model`, restricted to `configuration`, matches
    /// the model recorded in `metadata`.
    fn is_compatible(
        &self,
        model: &ObjectModel,
        configuration: Option<&str>,
        metadata: &StoreMetadata,
    ) -> bool;
}

/// Compares per-entity version hashes.
///
/// The configuration's entities must hash exactly to the store's recorded
/// entities: no entity missing, extra or changed. An unknown configuration is
/// never compatible.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionHashComparator;

impl MetadataComparator for VersionHashComparator {
    fn is_compatible(
        &self,
        model: &ObjectModel,
        configuration: Option<&str>,
        metadata: &StoreMetadata,
    ) -> bool {
        if !model.has_configuration(configuration) {
            return false;
        }
        model.configuration_version_hashes(configuration) == metadata.entity_version_hashes
    }
}

/// Produces the data mapping from an old model to a new one.
pub trait MappingInference {
    /// Infers a mapping from `source` to `destination`.
    fn infer(
        &self,
        source: &ObjectModel,
        destination: &ObjectModel,
    ) -> Result<MappingModel, MappingError>;
}

/// [`MappingInference`] backed by [`infer_mapping`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LightweightInference;

impl MappingInference for LightweightInference {
    fn infer(
        &self,
        source: &ObjectModel,
        destination: &ObjectModel,
    ) -> Result<MappingModel, MappingError> {
        infer_mapping(source, destination)
    }
}

/// Recovers the model a store was last written with.
pub trait ModelSource {
    /// Loads the store's model.
    fn load_model(&self, path: &Path) -> Result<ObjectModel, ExtractError>;
}

impl<R: CacheBlobReader> ModelSource for StoreModelExtractor<R> {
    fn load_model(&self, path: &Path) -> Result<ObjectModel, ExtractError> {
        self.extract(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_model_core::{
        AttributeDescription, AttributeType, EntityDescription, SQLITE_STORE_TYPE,
    };

    fn model() -> ObjectModel {
        ObjectModel::new()
            .with_entity(
                EntityDescription::new("Note")
                    .with_attribute(AttributeDescription::required("body", AttributeType::String)),
            )
            .with_entity(EntityDescription::new("Tag"))
            .with_configuration("Notes", &["Note"])
    }

    #[test]
    fn test_same_model_is_compatible() {
        let metadata = StoreMetadata::for_model(&model(), SQLITE_STORE_TYPE, "1");
        assert!(VersionHashComparator.is_compatible(&model(), None, &metadata));
        assert!(VersionHashComparator.is_compatible(&model(), Some("Default"), &metadata));
    }

    #[test]
    fn test_configuration_subset_must_match_store() {
        let full = StoreMetadata::for_model(&model(), SQLITE_STORE_TYPE, "1");
        assert!(!VersionHashComparator.is_compatible(&model(), Some("Notes"), &full));

        let notes_only = ObjectModel::new().with_entity(model().entity("Note").unwrap().clone());
        let metadata = StoreMetadata::for_model(&notes_only, SQLITE_STORE_TYPE, "1");
        assert!(VersionHashComparator.is_compatible(&model(), Some("Notes"), &metadata));
    }

    #[test]
    fn test_unknown_configuration_is_incompatible() {
        let empty = ObjectModel::new();
        let metadata = StoreMetadata::for_model(&empty, SQLITE_STORE_TYPE, "1");
        assert!(!VersionHashComparator.is_compatible(&empty, Some("Missing"), &metadata));
    }

    #[test]
    fn test_changed_entity_is_incompatible() {
        let metadata = StoreMetadata::for_model(&model(), SQLITE_STORE_TYPE, "1");
        let changed = ObjectModel::new()
            .with_entity(
                EntityDescription::new("Note")
                    .with_attribute(AttributeDescription::optional("body", AttributeType::String)),
            )
            .with_entity(EntityDescription::new("Tag"));
        assert!(!VersionHashComparator.is_compatible(&changed, None, &metadata));
    }

    #[test]
    fn test_lightweight_inference_delegates() {
        assert!(LightweightInference.infer(&model(), &model()).unwrap().is_identity());
    }
}
