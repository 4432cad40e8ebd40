//! Reading the raw model cache blob.
//!
//! [`CacheBlobReader`] is the narrow seam between the extractor and the
//! database: it turns a store path into the compressed cache bytes and
//! nothing more. [`SqliteCacheReader`] is the real implementation; tests can
//! substitute synthetic byte streams.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::config::CacheRowPolicy;
use crate::error::{ExtractError, Result, sqlite_code};
use crate::schema::model_cache_query;

/// Source of the compressed model cache blob for a store.
pub trait CacheBlobReader {
    /// Reads the raw cache blob of the store at `path`.
    ///
    /// Implementations must release every resource they acquire before
    /// returning, on success and on failure alike.
    fn read_cache_blob(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Opens `path` read-only and forces SQLite to read the file header.
///
/// SQLite opens lazily, so a file that exists but is not a database would
/// otherwise only fail at the first query. `busy_timeout` replaces rusqlite's
/// default busy handler before that first read; `Duration::ZERO` makes a
/// locked store fail with `SQLITE_BUSY` at once.
pub(crate) fn open_read_only(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(busy_timeout)?;
    conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}

/// Closes `conn`, logging rather than failing if SQLite refuses.
pub(crate) fn close_quietly(conn: Connection, path: &Path) {
    if let Err((_, err)) = conn.close() {
        warn!(path = %path.display(), error = %err, "failed to close store cleanly");
    }
}

/// [`CacheBlobReader`] backed by a read-only rusqlite connection.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use store_model_sqlite::{CacheBlobReader, CacheRowPolicy, SqliteCacheReader};
///
/// let reader = SqliteCacheReader::new(CacheRowPolicy::Strict);
/// let blob = reader.read_cache_blob(Path::new("Model.sqlite")).unwrap();
/// println!("{} compressed bytes", blob.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCacheReader {
    row_policy: CacheRowPolicy,
}

impl SqliteCacheReader {
    /// Creates a reader with the given multi-row policy.
    pub fn new(row_policy: CacheRowPolicy) -> Self {
        Self { row_policy }
    }
}

impl CacheBlobReader for SqliteCacheReader {
    fn read_cache_blob(&self, path: &Path) -> Result<Vec<u8>> {
        let conn = open_read_only(path, Duration::ZERO).map_err(|e| {
            debug!(path = %path.display(), error = %e, "store open failed");
            ExtractError::OpenFailed {
                code: sqlite_code(&e),
            }
        })?;

        let blob = query_blob(&conn, self.row_policy);
        close_quietly(conn, path);

        if let Ok(bytes) = &blob {
            debug!(path = %path.display(), bytes = bytes.len(), "read model cache blob");
        }
        blob
    }
}

/// Runs the cache query; the prepared statement is finalized on return.
fn query_blob(conn: &Connection, row_policy: CacheRowPolicy) -> Result<Vec<u8>> {
    let execution_failed = |e: rusqlite::Error| ExtractError::QueryExecutionFailed {
        code: sqlite_code(&e),
    };

    let query = model_cache_query();
    let mut stmt = conn
        .prepare(&query)
        .map_err(|e| ExtractError::QueryPrepareFailed {
            code: sqlite_code(&e),
        })?;
    let mut rows = stmt.query([]).map_err(execution_failed)?;

    let row = rows
        .next()
        .map_err(execution_failed)?
        .ok_or(ExtractError::QueryExecutionFailed {
            code: rusqlite::ffi::SQLITE_DONE,
        })?;

    // A zero-length blob reads back as no blob at all.
    let blob = match row.get_ref(0).map_err(execution_failed)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
        _ => None,
    };

    // Row count is checked before the content of the first row.
    if row_policy == CacheRowPolicy::Strict && rows.next().map_err(execution_failed)?.is_some() {
        return Err(ExtractError::AmbiguousCacheRows);
    }

    blob.ok_or(ExtractError::BlobMissing)
}
