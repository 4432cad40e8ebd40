//! Reading store metadata.
//!
//! The metadata row is what the cheap compatibility check compares against:
//! it records the version hash of every entity the store was written with.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use store_model_core::StoreMetadata;
use tracing::debug;

use crate::error::{MetadataError, sqlite_code};
use crate::reader::{close_quietly, open_read_only};
use crate::schema::metadata_query;

/// Connection options applied before the metadata is read.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use store_model_sqlite::StoreOptions;
///
/// let options = StoreOptions::default()
///     .with_busy_timeout(Duration::from_millis(250))
///     .with_pragma("cache_size", "-2000");
/// assert_eq!(options.pragmas.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long to wait on a locked store before failing.
    ///
    /// `None` fails at once with `SQLITE_BUSY`.
    pub busy_timeout: Option<Duration>,
    /// Pragmas set on the connection, by name.
    pub pragmas: BTreeMap<String, String>,
}

impl StoreOptions {
    /// Sets the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Adds a pragma.
    pub fn with_pragma(mut self, name: &str, value: &str) -> Self {
        self.pragmas.insert(name.to_string(), value.to_string());
        self
    }

    fn apply_pragmas(&self, conn: &Connection) -> Result<(), MetadataError> {
        for (name, value) in &self.pragmas {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(MetadataError::InvalidPragma(name.clone()));
            }
            conn.pragma_update(None, name, value)?;
        }
        Ok(())
    }
}

/// Reads [`StoreMetadata`] from SQLite stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMetadataSource;

impl SqliteMetadataSource {
    /// Reads the metadata of the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::OpenFailed`] if the file is not a database,
    /// [`MetadataError::Missing`] if it has no metadata row,
    /// [`MetadataError::StoreTypeMismatch`] if the recorded store type is not
    /// `store_type`, and the underlying error for anything else.
    pub fn fetch(
        &self,
        path: &Path,
        store_type: &str,
        options: &StoreOptions,
    ) -> Result<StoreMetadata, MetadataError> {
        let busy_timeout = options.busy_timeout.unwrap_or(Duration::ZERO);
        let conn = open_read_only(path, busy_timeout).map_err(|e| MetadataError::OpenFailed {
            code: sqlite_code(&e),
        })?;

        let plist = read_plist(&conn, options);
        close_quietly(conn, path);

        let metadata: StoreMetadata = serde_json::from_slice(&plist?)?;
        if metadata.store_type != store_type {
            return Err(MetadataError::StoreTypeMismatch {
                expected: store_type.to_string(),
                found: metadata.store_type,
            });
        }

        debug!(
            path = %path.display(),
            entities = metadata.entity_version_hashes.len(),
            "read store metadata"
        );
        Ok(metadata)
    }
}

fn read_plist(conn: &Connection, options: &StoreOptions) -> Result<Vec<u8>, MetadataError> {
    options.apply_pragmas(conn)?;
    conn.query_row(&metadata_query(), [], |row| row.get::<_, Option<Vec<u8>>>(0))
        .optional()?
        .flatten()
        .ok_or(MetadataError::Missing)
}
