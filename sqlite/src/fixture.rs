//! Writing stores the way the persistence engine lays them out.
//!
//! Used to produce stores for tests and tooling: the bookkeeping tables, one
//! table per root entity, the metadata row and the compressed model cache.
//! Entity rows themselves are never written.

use std::path::Path;

use rusqlite::{Connection, params};
use store_model_core::{
    ObjectModel, SQLITE_STORE_TYPE, StoreMetadata, encode_archive, validate_model,
};
use tracing::debug;

use crate::codec::{BlobFormat, deflate};
use crate::error::FixtureError;
use crate::schema::generate_store_sql;

/// Store identifier used when none is given.
pub const DEFAULT_STORE_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Options for [`StoreWriter::write_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureOptions {
    /// Framing of the compressed cache blob.
    pub blob_format: BlobFormat,
    /// Identifier recorded in the metadata row.
    pub store_uuid: String,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            blob_format: BlobFormat::default(),
            store_uuid: DEFAULT_STORE_UUID.to_string(),
        }
    }
}

/// Writes engine-layout stores over an open connection.
///
/// # Examples
///
/// ```no_run
/// use store_model_core::{EntityDescription, ObjectModel};
/// use store_model_sqlite::{FixtureOptions, StoreWriter};
///
/// let model = ObjectModel::new().with_entity(EntityDescription::new("Note"));
/// let mut writer = StoreWriter::create("Model.sqlite").unwrap();
/// let metadata = writer.write_model(&model, &FixtureOptions::default()).unwrap();
/// assert_eq!(metadata.entity_version_hashes.len(), 1);
/// ```
pub struct StoreWriter {
    conn: Connection,
}

impl StoreWriter {
    /// Wraps an existing connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens or creates the database file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Creates the store tables for `model` and writes its metadata and
    /// model cache, replacing any previous ones.
    ///
    /// Executes within a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidModel`] if the model fails validation,
    /// [`FixtureError::InvalidIdentifier`] for names unusable in SQL, and the
    /// underlying error if archiving, compression or the database fails.
    pub fn write_model(
        &mut self,
        model: &ObjectModel,
        options: &FixtureOptions,
    ) -> Result<StoreMetadata, FixtureError> {
        let errors = validate_model(model);
        if !errors.is_empty() {
            return Err(FixtureError::InvalidModel(errors));
        }

        let sql = generate_store_sql(model)?;
        let blob = deflate(&encode_archive(model)?, options.blob_format)?;
        let metadata = StoreMetadata::for_model(model, SQLITE_STORE_TYPE, &options.store_uuid);
        let plist = serde_json::to_vec(&metadata)?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)?;

        tx.execute("DELETE FROM Z_PRIMARYKEY", [])?;
        for (index, entity) in model.entities.iter().enumerate() {
            let parent = entity
                .parent
                .as_deref()
                .and_then(|p| model.entities.iter().position(|e| e.name == p))
                .map_or(0, |i| i as i64 + 1);
            tx.execute(
                "INSERT INTO Z_PRIMARYKEY (Z_ENT, Z_NAME, Z_SUPER, Z_MAX) VALUES (?1, ?2, ?3, 0)",
                params![index as i64 + 1, entity.name, parent],
            )?;
        }

        tx.execute("DELETE FROM Z_METADATA", [])?;
        tx.execute(
            "INSERT INTO Z_METADATA (Z_VERSION, Z_UUID, Z_PLIST) VALUES (1, ?1, ?2)",
            params![options.store_uuid, plist],
        )?;

        tx.execute("DELETE FROM Z_MODELCACHE", [])?;
        tx.execute("INSERT INTO Z_MODELCACHE (Z_CONTENT) VALUES (?1)", [&blob])?;
        tx.commit()?;

        debug!(
            entities = model.entities.len(),
            blob_bytes = blob.len(),
            "wrote store model"
        );
        Ok(metadata)
    }

    /// Replaces the metadata row.
    pub fn write_metadata(&self, metadata: &StoreMetadata) -> Result<(), FixtureError> {
        let plist = serde_json::to_vec(metadata)?;
        self.conn.execute("DELETE FROM Z_METADATA", [])?;
        self.conn.execute(
            "INSERT INTO Z_METADATA (Z_VERSION, Z_UUID, Z_PLIST) VALUES (1, ?1, ?2)",
            params![metadata.store_uuid, plist],
        )?;
        Ok(())
    }

    /// Replaces the model cache with a single row holding `blob` verbatim.
    ///
    /// `None` writes a NULL content column.
    pub fn write_cache_blob(&self, blob: Option<&[u8]>) -> Result<(), FixtureError> {
        self.conn.execute("DELETE FROM Z_MODELCACHE", [])?;
        self.append_cache_blob(blob)
    }

    /// Adds another model cache row holding `blob` verbatim.
    pub fn append_cache_blob(&self, blob: Option<&[u8]>) -> Result<(), FixtureError> {
        self.conn
            .execute("INSERT INTO Z_MODELCACHE (Z_CONTENT) VALUES (?1)", [blob])?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the writer and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

/// Creates a store at `path` holding `model` with default options.
///
/// The connection is closed before returning.
pub fn create_store(
    path: impl AsRef<Path>,
    model: &ObjectModel,
) -> Result<StoreMetadata, FixtureError> {
    let mut writer = StoreWriter::create(path)?;
    writer.write_model(model, &FixtureOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_model_core::{AttributeDescription, AttributeType, EntityDescription};

    fn model() -> ObjectModel {
        ObjectModel::new()
            .with_entity(
                EntityDescription::new("Document")
                    .with_attribute(AttributeDescription::required("title", AttributeType::String)),
            )
            .with_entity(EntityDescription::new("Invoice").with_parent("Document"))
    }

    #[test]
    fn test_write_model_fills_primary_keys() {
        let mut writer = StoreWriter::new(Connection::open_in_memory().unwrap());
        writer.write_model(&model(), &FixtureOptions::default()).unwrap();

        let rows: Vec<(i64, String, i64)> = writer
            .connection()
            .prepare("SELECT Z_ENT, Z_NAME, Z_SUPER FROM Z_PRIMARYKEY ORDER BY Z_ENT")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![(1, "Document".to_string(), 0), (2, "Invoice".to_string(), 1)]
        );
    }

    #[test]
    fn test_write_model_twice_keeps_single_rows() {
        let mut writer = StoreWriter::new(Connection::open_in_memory().unwrap());
        writer.write_model(&model(), &FixtureOptions::default()).unwrap();
        writer.write_model(&model(), &FixtureOptions::default()).unwrap();

        let conn = writer.into_connection();
        for table in ["Z_MODELCACHE", "Z_METADATA"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 1, "{table}");
        }
    }

    #[test]
    fn test_write_model_rejects_invalid_model() {
        let broken = ObjectModel::new()
            .with_entity(EntityDescription::new("Invoice").with_parent("Missing"));
        let mut writer = StoreWriter::new(Connection::open_in_memory().unwrap());
        assert!(matches!(
            writer.write_model(&broken, &FixtureOptions::default()),
            Err(FixtureError::InvalidModel(errors)) if !errors.is_empty()
        ));
    }

    #[test]
    fn test_metadata_records_uuid() {
        let mut writer = StoreWriter::new(Connection::open_in_memory().unwrap());
        let options = FixtureOptions {
            store_uuid: "B1A2C3".to_string(),
            ..FixtureOptions::default()
        };
        let metadata = writer.write_model(&model(), &options).unwrap();
        assert_eq!(metadata.store_uuid, "B1A2C3");
        assert_eq!(metadata.store_type, SQLITE_STORE_TYPE);

        let uuid: String = writer
            .connection()
            .query_row("SELECT Z_UUID FROM Z_METADATA", [], |row| row.get(0))
            .unwrap();
        assert_eq!(uuid, "B1A2C3");
    }
}
