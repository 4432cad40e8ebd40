//! On-disk table layout of engine-written stores.
//!
//! A store produced by the persistence engine contains three bookkeeping
//! tables next to one table per root entity:
//!
//! - `Z_PRIMARYKEY` — one row per entity with its numeric id and super-entity
//! - `Z_METADATA` — a single row whose `Z_PLIST` column holds the metadata
//! - `Z_MODELCACHE` — a single row whose `Z_CONTENT` column holds the
//!   compressed model archive
//! - `Z<ENTITY>` — entity rows; subentities share their root's table
//!
//! Entity and property names are interpolated into SQL, so they must contain
//! only alphanumeric characters and underscores.

use std::collections::BTreeSet;

use store_model_core::{AttributeType, EntityDescription, ObjectModel};

use crate::error::FixtureError;

/// Table holding the cached model archive.
pub const MODEL_CACHE_TABLE: &str = "Z_MODELCACHE";

/// Column of [`MODEL_CACHE_TABLE`] holding the compressed archive.
pub const MODEL_CACHE_CONTENT_COLUMN: &str = "Z_CONTENT";

/// Table holding the store metadata.
pub const METADATA_TABLE: &str = "Z_METADATA";

/// Column of [`METADATA_TABLE`] holding the serialized metadata.
pub const METADATA_PLIST_COLUMN: &str = "Z_PLIST";

/// Fixed query run by the extractor.
pub(crate) fn model_cache_query() -> String {
    format!("SELECT {MODEL_CACHE_CONTENT_COLUMN} FROM {MODEL_CACHE_TABLE}")
}

/// Fixed query run by the metadata source.
pub(crate) fn metadata_query() -> String {
    format!("SELECT {METADATA_PLIST_COLUMN} FROM {METADATA_TABLE} ORDER BY Z_VERSION LIMIT 1")
}

/// Validates that a name contains only alphanumeric characters and underscores.
pub(crate) fn validate_identifier(name: &str) -> Result<(), FixtureError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FixtureError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Table name of a root entity.
pub(crate) fn entity_table_name(entity: &str) -> String {
    format!("Z{}", entity.to_ascii_uppercase())
}

fn column_name(property: &str) -> String {
    format!("Z{}", property.to_ascii_uppercase())
}

fn column_type(attribute_type: AttributeType) -> &'static str {
    match attribute_type {
        AttributeType::Integer16
        | AttributeType::Integer32
        | AttributeType::Integer64
        | AttributeType::Boolean => "INTEGER",
        AttributeType::Decimal => "DECIMAL",
        AttributeType::Double | AttributeType::Float => "FLOAT",
        AttributeType::String | AttributeType::Uri => "VARCHAR",
        AttributeType::Date => "TIMESTAMP",
        AttributeType::Binary | AttributeType::Uuid | AttributeType::Transformable => "BLOB",
    }
}

/// Walks the parent chain up to the root entity.
///
/// Stops after visiting every entity once so a cyclic chain still terminates.
pub(crate) fn root_entity<'a>(model: &'a ObjectModel, entity: &'a EntityDescription) -> &'a str {
    let mut current = entity;
    for _ in 0..model.entities.len() {
        match current.parent.as_deref().and_then(|p| model.entity(p)) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    &current.name
}

/// Generates the `CREATE TABLE` statements for a store holding `model`.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidIdentifier`] if an entity or persistent
/// property name is not a safe SQL identifier.
pub fn generate_store_sql(model: &ObjectModel) -> Result<String, FixtureError> {
    let mut sql = String::from(
        r#"
CREATE TABLE IF NOT EXISTS Z_PRIMARYKEY (
    Z_ENT INTEGER PRIMARY KEY,
    Z_NAME VARCHAR,
    Z_SUPER INTEGER,
    Z_MAX INTEGER
);

CREATE TABLE IF NOT EXISTS Z_METADATA (
    Z_VERSION INTEGER PRIMARY KEY,
    Z_UUID VARCHAR(255),
    Z_PLIST BLOB
);

CREATE TABLE IF NOT EXISTS Z_MODELCACHE (
    Z_CONTENT BLOB
);
"#,
    );

    for root in model.entities.iter().filter(|e| e.parent.is_none()) {
        validate_identifier(&root.name)?;

        let mut seen: BTreeSet<String> = ["Z_PK", "Z_ENT", "Z_OPT"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut columns = vec![
            "    Z_PK INTEGER PRIMARY KEY".to_string(),
            "    Z_ENT INTEGER".to_string(),
            "    Z_OPT INTEGER".to_string(),
        ];

        let family = model
            .entities
            .iter()
            .filter(|e| root_entity(model, e) == root.name);
        for entity in family {
            validate_identifier(&entity.name)?;
            for attr in entity.persistent_attributes() {
                validate_identifier(&attr.name)?;
                let column = column_name(&attr.name);
                if seen.insert(column.clone()) {
                    columns.push(format!("    {column} {}", column_type(attr.attribute_type)));
                }
            }
            for rel in entity.relationships.iter().filter(|r| !r.to_many) {
                validate_identifier(&rel.name)?;
                let column = column_name(&rel.name);
                if seen.insert(column.clone()) {
                    columns.push(format!("    {column} INTEGER"));
                }
            }
        }

        sql.push_str(&format!(
            "\nCREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            entity_table_name(&root.name),
            columns.join(",\n")
        ));
    }

    Ok(sql)
}
