//! Store compatibility classification.
//!
//! Answers whether a candidate model can open an existing store unchanged,
//! can open it after an automatically inferred migration, or cannot open it
//! at all. The cheap metadata comparison always runs first; the store's model
//! is only extracted when that comparison fails.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use store_model_core::{DEFAULT_CONFIGURATION, MappingError, ObjectModel};
use store_model_sqlite::{SqliteMetadataSource, StoreModelExtractor, StoreOptions};
use tracing::{debug, info};

use crate::collaborators::{
    LightweightInference, MappingInference, MetadataComparator, MetadataSource, ModelSource,
    VersionHashComparator,
};
use crate::config::ClassifierConfig;
use crate::error::{ClassifyError, Result};

/// Outcome of a classification.
///
/// `Incompatible` is a successful answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityVerdict {
    /// The model matches the store's metadata and opens it as is.
    Compatible,
    /// The store needs migrating, and a mapping can be inferred.
    MigratableWithGeneratedMapping,
    /// No mapping can be inferred; carries every blocking change.
    Incompatible(MappingError),
}

impl CompatibilityVerdict {
    /// Returns `true` unless the verdict is [`Incompatible`](Self::Incompatible).
    pub fn can_open(&self) -> bool {
        !matches!(self, Self::Incompatible(_))
    }
}

/// Classifies stores against a candidate model.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use store_model_compat::{CompatibilityClassifier, CompatibilityVerdict};
/// use store_model_core::ObjectModel;
///
/// let classifier = CompatibilityClassifier::new();
/// let model = ObjectModel::new();
/// match classifier.classify(&model, None, Path::new("Model.sqlite"), None).unwrap() {
///     CompatibilityVerdict::Compatible => println!("open as is"),
///     CompatibilityVerdict::MigratableWithGeneratedMapping => println!("migrate"),
///     CompatibilityVerdict::Incompatible(detail) => println!("incompatible: {detail}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CompatibilityClassifier<
    M = SqliteMetadataSource,
    S = StoreModelExtractor,
    C = VersionHashComparator,
    I = LightweightInference,
> {
    metadata: M,
    models: S,
    comparator: C,
    inference: I,
    store_type: String,
    jobs: Option<usize>,
}

impl CompatibilityClassifier {
    /// Creates a classifier for SQLite stores with the default configuration.
    pub fn new() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }

    /// Creates a classifier for SQLite stores from `config`.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            metadata: SqliteMetadataSource,
            models: StoreModelExtractor::with_config(config.extractor.clone()),
            comparator: VersionHashComparator,
            inference: LightweightInference,
            store_type: config.store_type.clone(),
            jobs: config.jobs,
        }
    }
}

impl Default for CompatibilityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, S, C, I> CompatibilityClassifier<M, S, C, I>
where
    M: MetadataSource,
    S: ModelSource,
    C: MetadataComparator,
    I: MappingInference,
{
    /// Creates a classifier from custom collaborators.
    pub fn with_collaborators(
        metadata: M,
        models: S,
        comparator: C,
        inference: I,
        store_type: impl Into<String>,
    ) -> Self {
        Self {
            metadata,
            models,
            comparator,
            inference,
            store_type: store_type.into(),
            jobs: None,
        }
    }

    /// Sets the worker count used by [`classify_all`](Self::classify_all).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs).filter(|jobs| *jobs > 0);
        self
    }

    /// Classifies the store at `path` against `model`.
    ///
    /// `configuration` selects the entities compared; `None` means the
    /// default configuration. `options` are applied when reading metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::MetadataFetchFailed`] if the metadata cannot
    /// be read, or [`ClassifyError::Extraction`] if the store's model is
    /// needed and cannot be extracted.
    pub fn classify(
        &self,
        model: &ObjectModel,
        configuration: Option<&str>,
        path: &Path,
        options: Option<&StoreOptions>,
    ) -> Result<CompatibilityVerdict> {
        let default_options = StoreOptions::default();
        let options = options.unwrap_or(&default_options);

        let metadata = self
            .metadata
            .fetch_metadata(path, &self.store_type, options)
            .map_err(|e| ClassifyError::MetadataFetchFailed(Box::new(e)))?;

        if self.comparator.is_compatible(model, configuration, &metadata) {
            info!(path = %path.display(), "store is compatible");
            return Ok(CompatibilityVerdict::Compatible);
        }

        debug!(
            path = %path.display(),
            configuration = configuration.unwrap_or(DEFAULT_CONFIGURATION),
            "metadata mismatch, extracting store model"
        );
        let stored = self.models.load_model(path)?;

        let verdict = match self.inference.infer(&stored, model) {
            Ok(_) => CompatibilityVerdict::MigratableWithGeneratedMapping,
            Err(detail) => CompatibilityVerdict::Incompatible(detail),
        };
        info!(path = %path.display(), ?verdict, "classified store");
        Ok(verdict)
    }

    /// Classifies several independent stores in parallel.
    ///
    /// Results are returned in the order of `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::ThreadPool`] if the worker pool cannot be
    /// built. Per-store failures are reported in the returned vector.
    pub fn classify_all(
        &self,
        model: &ObjectModel,
        configuration: Option<&str>,
        paths: &[PathBuf],
        options: Option<&StoreOptions>,
    ) -> Result<Vec<(PathBuf, Result<CompatibilityVerdict>)>>
    where
        Self: Sync,
    {
        let run = || -> Vec<(PathBuf, Result<CompatibilityVerdict>)> {
            paths
                .par_iter()
                .map(|path| {
                    let verdict = self.classify(model, configuration, path, options);
                    (path.clone(), verdict)
                })
                .collect()
        };

        match self.jobs {
            Some(jobs) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    }
}
