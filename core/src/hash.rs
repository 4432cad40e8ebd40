//! Entity version hashing.
//!
//! A store records one SHA-256 version hash per entity in its metadata. Two
//! models are store-compatible when every entity in the selected
//! configuration hashes identically.
//!
//! Only properties that affect the persisted layout feed the hash: names,
//! types, optionality, to-many-ness, inheritance and abstractness. Class
//! names, default values, delete rules, inverses, renaming identifiers and
//! transient attributes are ignored.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::{EntityDescription, ObjectModel};

/// Computes the hex-encoded version hash of a single entity.
///
/// Property order does not matter.
///
/// # Examples
///
/// ```
/// use store_model_core::*;
///
/// let a = EntityDescription::new("Note")
///     .with_attribute(AttributeDescription::required("title", AttributeType::String))
///     .with_attribute(AttributeDescription::optional("body", AttributeType::String));
/// let b = EntityDescription::new("Note")
///     .with_attribute(AttributeDescription::optional("body", AttributeType::String))
///     .with_attribute(AttributeDescription::required("title", AttributeType::String));
///
/// assert_eq!(entity_version_hash(&a), entity_version_hash(&b));
/// ```
pub fn entity_version_hash(entity: &EntityDescription) -> String {
    let mut properties: Vec<Vec<u8>> = entity
        .persistent_attributes()
        .map(|a| {
            encode_fields(&[
                "attr",
                &a.name,
                a.attribute_type.as_str(),
                bool_field(a.optional),
            ])
        })
        .collect();
    properties.extend(entity.relationships.iter().map(|r| {
        encode_fields(&[
            "rel",
            &r.name,
            &r.destination,
            bool_field(r.to_many),
            bool_field(r.optional),
        ])
    }));
    properties.sort();

    let mut hasher = Sha256::new();
    hasher.update(encode_fields(&[
        "entity",
        &entity.name,
        entity.parent.as_deref().unwrap_or(""),
        bool_field(entity.is_abstract),
    ]));
    for property in &properties {
        hasher.update(property);
    }
    format!("{:x}", hasher.finalize())
}

/// Length-prefixes every field so no name can spill into its neighbour.
fn encode_fields(fields: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(&(field.len() as u64).to_le_bytes());
        out.extend_from_slice(field.as_bytes());
    }
    out
}

fn bool_field(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

impl ObjectModel {
    /// Version hashes for every entity, keyed by entity name.
    pub fn entity_version_hashes(&self) -> BTreeMap<String, String> {
        self.entities
            .iter()
            .map(|e| (e.name.clone(), entity_version_hash(e)))
            .collect()
    }

    /// Version hashes restricted to the entities of `configuration`.
    pub fn configuration_version_hashes(
        &self,
        configuration: Option<&str>,
    ) -> BTreeMap<String, String> {
        self.entities_for_configuration(configuration)
            .into_iter()
            .map(|e| (e.name.clone(), entity_version_hash(e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttributeDescription, AttributeType, RelationshipDescription};

    fn mock_entity() -> EntityDescription {
        EntityDescription::new("MockEntity").with_attribute(AttributeDescription::required(
            "value",
            AttributeType::Integer64,
        ))
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = entity_version_hash(&mock_entity());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_ignores_non_layout_fields() {
        let base = mock_entity();
        let decorated = mock_entity().with_class_name("MockEntityClass");
        let mut defaulted = mock_entity();
        defaulted.attributes[0].default_value = Some("7".into());

        assert_eq!(entity_version_hash(&base), entity_version_hash(&decorated));
        assert_eq!(entity_version_hash(&base), entity_version_hash(&defaulted));
    }

    #[test]
    fn test_hash_ignores_transient_attributes() {
        let base = mock_entity();
        let with_transient = mock_entity().with_attribute(
            AttributeDescription::optional("scratch", AttributeType::String).transient(),
        );
        assert_eq!(entity_version_hash(&base), entity_version_hash(&with_transient));
    }

    #[test]
    fn test_hash_changes_with_layout() {
        let base = entity_version_hash(&mock_entity());

        let added = mock_entity().with_attribute(AttributeDescription::optional(
            "value2",
            AttributeType::Integer64,
        ));
        assert_ne!(base, entity_version_hash(&added));

        let mut retyped = mock_entity();
        retyped.attributes[0].attribute_type = AttributeType::String;
        assert_ne!(base, entity_version_hash(&retyped));

        let mut optional = mock_entity();
        optional.attributes[0].optional = true;
        assert_ne!(base, entity_version_hash(&optional));

        let related =
            mock_entity().with_relationship(RelationshipDescription::to_one("owner", "Person"));
        assert_ne!(base, entity_version_hash(&related));

        let child = mock_entity().with_parent("Base");
        assert_ne!(base, entity_version_hash(&child));
    }

    #[test]
    fn test_configuration_hashes() {
        let model = ObjectModel::new()
            .with_entity(mock_entity())
            .with_entity(EntityDescription::new("Other"))
            .with_configuration("Mocks", &["MockEntity"]);

        assert_eq!(model.entity_version_hashes().len(), 2);
        let scoped = model.configuration_version_hashes(Some("Mocks"));
        assert_eq!(scoped.len(), 1);
        assert!(scoped.contains_key("MockEntity"));
    }

    #[test]
    fn test_separator_in_names_does_not_collide() {
        let a = EntityDescription::new("Edge")
            .with_relationship(RelationshipDescription::to_one("a:b", "C"));
        let b = EntityDescription::new("Edge")
            .with_relationship(RelationshipDescription::to_one("a", "b:C"));
        assert_ne!(entity_version_hash(&a), entity_version_hash(&b));

        let parent = EntityDescription::new("Ab").with_parent("C");
        let renamed = EntityDescription::new("A").with_parent("bC");
        assert_ne!(entity_version_hash(&parent), entity_version_hash(&renamed));
    }
}
