//! Keyed object-graph archive.
//!
//! Stores cache their model as a keyed archive: a JSON envelope naming the
//! archiver, its format version and the class of the root object, followed by
//! the root object itself.
//!
//! ```json
//! { "archiver": "StoreModelArchiver", "version": 1, "class": "ObjectModel", "root": { ... } }
//! ```
//!
//! Decoding is parameterized by the expected root type through the
//! [`Archivable`] trait, so a blob holding some other class is rejected
//! rather than half-decoded. A `null` root decodes to `None`.
//!
//! # Example
//!
//! ```
//! use store_model_core::*;
//!
//! let model = ObjectModel::new().with_entity(EntityDescription::new("Note"));
//! let bytes = encode_archive(&model).unwrap();
//!
//! let decoded: Option<ObjectModel> = decode_archive(&bytes).unwrap();
//! assert_eq!(decoded, Some(model));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ObjectModel;

/// Archiver name written into every envelope.
pub const ARCHIVER_NAME: &str = "StoreModelArchiver";

/// Highest envelope format version this crate understands.
pub const ARCHIVE_VERSION: u32 = 1;

/// A type that can be the root object of a keyed archive.
pub trait Archivable: Serialize + DeserializeOwned {
    /// Class name recorded in, and expected from, the envelope.
    const CLASS_NAME: &'static str;
}

impl Archivable for ObjectModel {
    const CLASS_NAME: &'static str = "ObjectModel";
}

/// Errors raised while decoding an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Bytes are not a well-formed envelope.
    #[error("malformed archive: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope was written by a different archiver.
    #[error("unknown archiver: {0}")]
    UnknownArchiver(String),

    /// Envelope version is newer than this crate supports.
    #[error("unsupported archive version {found}")]
    UnsupportedVersion { found: u32 },

    /// Root object is of a different class than requested.
    #[error("archive root is {found}, expected {expected}")]
    ClassMismatch {
        expected: &'static str,
        found: String,
    },
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    archiver: &'static str,
    version: u32,
    class: &'static str,
    root: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    archiver: String,
    version: u32,
    class: String,
    #[serde(default)]
    root: Option<serde_json::Value>,
}

/// Encodes `value` as the root of a keyed archive.
///
/// # Errors
///
/// Returns [`ArchiveError::Malformed`] if serialization fails.
pub fn encode_archive<T: Archivable>(value: &T) -> Result<Vec<u8>, ArchiveError> {
    let envelope = EnvelopeOut {
        archiver: ARCHIVER_NAME,
        version: ARCHIVE_VERSION,
        class: T::CLASS_NAME,
        root: value,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decodes a keyed archive whose root is expected to be a `T`.
///
/// Returns `Ok(None)` when the envelope is valid but its root is absent or
/// `null`.
///
/// # Errors
///
/// Returns [`ArchiveError`] for malformed bytes, a foreign archiver, a newer
/// format version, or a root of the wrong class.
pub fn decode_archive<T: Archivable>(bytes: &[u8]) -> Result<Option<T>, ArchiveError> {
    let envelope: EnvelopeIn = serde_json::from_slice(bytes)?;

    if envelope.archiver != ARCHIVER_NAME {
        return Err(ArchiveError::UnknownArchiver(envelope.archiver));
    }
    if envelope.version > ARCHIVE_VERSION {
        return Err(ArchiveError::UnsupportedVersion {
            found: envelope.version,
        });
    }
    if envelope.class != T::CLASS_NAME {
        return Err(ArchiveError::ClassMismatch {
            expected: T::CLASS_NAME,
            found: envelope.class,
        });
    }

    match envelope.root {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(root) => Ok(Some(serde_json::from_value(root)?)),
    }
}
