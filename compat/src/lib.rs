//! Store compatibility classification.
//!
//! Given a candidate [`ObjectModel`](store_model_core::ObjectModel) and an
//! existing store, [`CompatibilityClassifier`] answers one of:
//!
//! - [`CompatibilityVerdict::Compatible`] — the store's metadata matches the
//!   model, it opens as is.
//! - [`CompatibilityVerdict::MigratableWithGeneratedMapping`] — the store's
//!   cached model differs, but a mapping can be inferred.
//! - [`CompatibilityVerdict::Incompatible`] — no mapping can be inferred; the
//!   verdict carries every blocking change.
//!
//! Each step goes through a trait ([`MetadataSource`], [`MetadataComparator`],
//! [`ModelSource`] and [`MappingInference`]) and can be replaced.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use store_model_compat::{ClassifierConfig, CompatibilityClassifier};
//! use store_model_core::ObjectModel;
//!
//! let config = ClassifierConfig::load("classifier.yml").unwrap();
//! let classifier = CompatibilityClassifier::from_config(&config);
//! let verdict = classifier
//!     .classify(&ObjectModel::new(), None, Path::new("Model.sqlite"), None)
//!     .unwrap();
//! println!("{verdict:?}");
//! ```

mod classifier;
mod collaborators;
mod config;
mod error;

pub use classifier::{CompatibilityClassifier, CompatibilityVerdict};
pub use collaborators::{
    LightweightInference, MappingInference, MetadataComparator, MetadataSource, ModelSource,
    VersionHashComparator,
};
pub use config::ClassifierConfig;
pub use error::{ClassifyError, ConfigError, Result};
