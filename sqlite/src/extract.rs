//! Extracting the cached object model from a store.

use std::path::Path;

use store_model_core::{ObjectModel, decode_archive, validate_model};
use tracing::{debug, warn};

use crate::codec::inflate;
use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::reader::{CacheBlobReader, SqliteCacheReader};

/// Reads the object model a store was last written with.
///
/// Extraction is a straight pipeline: read the cache blob, inflate it, decode
/// the keyed archive. The first failing step ends the operation; nothing is
/// retried and nothing is cached between calls, so an extractor can be shared
/// freely across threads when its reader can.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use store_model_sqlite::StoreModelExtractor;
///
/// let extractor = StoreModelExtractor::new();
/// let model = extractor.extract(Path::new("Model.sqlite")).unwrap();
/// for name in model.entity_names() {
///     println!("{name}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreModelExtractor<R = SqliteCacheReader> {
    reader: R,
    config: ExtractorConfig,
}

impl StoreModelExtractor {
    /// Creates an extractor with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor reading through SQLite with `config`.
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            reader: SqliteCacheReader::new(config.row_policy),
            config,
        }
    }
}

impl<R: CacheBlobReader> StoreModelExtractor<R> {
    /// Creates an extractor over a custom blob reader.
    pub fn with_reader(reader: R, config: ExtractorConfig) -> Self {
        Self { reader, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts the cached model of the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns the [`ExtractError`] of the first step that failed.
    pub fn extract(&self, path: &Path) -> Result<ObjectModel> {
        let blob = self.reader.read_cache_blob(path)?;
        let model = self.decode_blob(&blob)?;
        debug!(
            path = %path.display(),
            entities = model.entities.len(),
            "extracted store model"
        );
        Ok(model)
    }

    /// Inflates and decodes a raw cache blob.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::DecompressionFailed`],
    /// [`ExtractError::DecodeFailed`] or [`ExtractError::DecodedEmpty`].
    pub fn decode_blob(&self, blob: &[u8]) -> Result<ObjectModel> {
        let archive =
            inflate(blob, self.config.max_inflated_bytes).map_err(ExtractError::DecompressionFailed)?;
        let model = decode_archive::<ObjectModel>(&archive)
            .map_err(ExtractError::DecodeFailed)?
            .ok_or(ExtractError::DecodedEmpty)?;

        // The engine wrote this model, so structural problems are reported
        // but do not fail extraction.
        for issue in validate_model(&model) {
            warn!(%issue, "cached model failed validation");
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BlobFormat, deflate};
    use std::cell::Cell;
    use store_model_core::{
        AttributeDescription, AttributeType, EntityDescription, encode_archive,
    };

    struct FixedReader {
        result: fn() -> Result<Vec<u8>>,
        calls: Cell<usize>,
    }

    impl FixedReader {
        fn new(result: fn() -> Result<Vec<u8>>) -> Self {
            Self {
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl CacheBlobReader for FixedReader {
        fn read_cache_blob(&self, _path: &Path) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            (self.result)()
        }
    }

    fn model() -> ObjectModel {
        ObjectModel::new().with_entity(
            EntityDescription::new("MockEntity")
                .with_attribute(AttributeDescription::required("value", AttributeType::Integer64)),
        )
    }

    fn good_blob() -> Result<Vec<u8>> {
        let archive = encode_archive(&model()).unwrap();
        Ok(deflate(&archive, BlobFormat::Zlib).unwrap())
    }

    #[test]
    fn test_extract_through_reader() {
        let extractor = StoreModelExtractor::with_reader(
            FixedReader::new(good_blob),
            ExtractorConfig::default(),
        );
        let extracted = extractor.extract(Path::new("unused.sqlite")).unwrap();
        assert_eq!(extracted, model());
        assert_eq!(extractor.reader.calls.get(), 1);
    }

    #[test]
    fn test_reader_error_is_passed_through() {
        let extractor = StoreModelExtractor::with_reader(
            FixedReader::new(|| Err(ExtractError::BlobMissing)),
            ExtractorConfig::default(),
        );
        assert!(matches!(
            extractor.extract(Path::new("unused.sqlite")),
            Err(ExtractError::BlobMissing)
        ));
    }

    #[test]
    fn test_decode_blob_rejects_garbage() {
        let extractor = StoreModelExtractor::new();
        let err = extractor.decode_blob(&[0x78, 0x9c, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ExtractError::DecompressionFailed(_)));
    }

    #[test]
    fn test_decode_blob_rejects_non_archive() {
        let extractor = StoreModelExtractor::new();
        let blob = deflate(b"not an archive", BlobFormat::Zlib).unwrap();
        assert!(matches!(
            extractor.decode_blob(&blob),
            Err(ExtractError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_decode_blob_null_root_is_empty() {
        let extractor = StoreModelExtractor::new();
        let archive = br#"{"archiver":"StoreModelArchiver","version":1,"class":"ObjectModel","root":null}"#;
        let blob = deflate(archive, BlobFormat::RawDeflate).unwrap();
        assert!(matches!(
            extractor.decode_blob(&blob),
            Err(ExtractError::DecodedEmpty)
        ));
    }

    #[test]
    fn test_inflate_limit_from_config() {
        let config = ExtractorConfig {
            max_inflated_bytes: 8,
            ..ExtractorConfig::default()
        };
        let extractor = StoreModelExtractor::with_reader(FixedReader::new(good_blob), config);
        assert!(matches!(
            extractor.extract(Path::new("unused.sqlite")),
            Err(ExtractError::DecompressionFailed(_))
        ));
    }
}
