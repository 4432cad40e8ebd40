//! Core object-model types shared by the store-model crates.
//!
//! This crate defines the model a persistence engine caches inside its
//! stores, plus the pure operations performed on it:
//!
//! - [`ObjectModel`] — entities, configurations and version identifiers.
//! - [`EntityDescription`], [`AttributeDescription`],
//!   [`RelationshipDescription`] — the building blocks of a model.
//! - [`entity_version_hash`] — the per-entity SHA-256 hash recorded in store
//!   metadata.
//! - [`StoreMetadata`] — the persisted identity of a store's model.
//! - [`encode_archive`] / [`decode_archive`] — the keyed archive format of the
//!   model cache.
//! - [`infer_mapping`] — lightweight mapping inference between two models.
//!
//! Validation ([`validate_model`]) catches structural errors such as
//! duplicate properties, dangling relationships and inheritance cycles.
//!
//! # Example
//!
//! ```
//! use store_model_core::*;
//!
//! let v1 = ObjectModel::new().with_entity(
//!     EntityDescription::new("MockEntity")
//!         .with_attribute(AttributeDescription::required("value", AttributeType::Integer64)),
//! );
//! let v2 = ObjectModel::new().with_entity(
//!     EntityDescription::new("MockEntity")
//!         .with_attribute(AttributeDescription::required("value", AttributeType::Integer64))
//!         .with_attribute(AttributeDescription::optional("value2", AttributeType::Integer64)),
//! );
//!
//! assert!(validate_model(&v2).is_empty());
//! assert_ne!(v1.entity_version_hashes(), v2.entity_version_hashes());
//! assert!(infer_mapping(&v1, &v2).is_ok());
//! ```

mod archive;
mod hash;
mod mapping;
mod metadata;
mod types;
mod validate;

pub use archive::{
    ARCHIVE_VERSION, ARCHIVER_NAME, Archivable, ArchiveError, decode_archive, encode_archive,
};
pub use hash::entity_version_hash;
pub use mapping::{
    EntityMapping, MappingError, MappingKind, MappingModel, MigrationIssue, PropertyMapping,
    infer_mapping,
};
pub use metadata::{SQLITE_STORE_TYPE, StoreMetadata};
pub use types::*;
pub use validate::{ValidationError, validate_model};
