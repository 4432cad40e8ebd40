//! Lightweight mapping inference.
//!
//! [`infer_mapping`] decides whether the rows of a store written with one
//! model can be carried over to another model without custom migration code,
//! and if so describes how each entity and property maps across.
//!
//! Entities and properties are matched by their renaming identifier first,
//! then by name. Changes that only add, drop, rename or relax structure are
//! accepted; changes that would need to rewrite or invent data are reported
//! as [`MigrationIssue`]s. Every issue is collected, so a failed inference
//! doubles as a schema diff.
//!
//! # Example
//!
//! ```
//! use store_model_core::*;
//!
//! let old = ObjectModel::new().with_entity(
//!     EntityDescription::new("Note")
//!         .with_attribute(AttributeDescription::required("title", AttributeType::String)),
//! );
//! let new = ObjectModel::new().with_entity(
//!     EntityDescription::new("Note")
//!         .with_attribute(AttributeDescription::required("title", AttributeType::String))
//!         .with_attribute(AttributeDescription::optional("body", AttributeType::String)),
//! );
//!
//! let mapping = infer_mapping(&old, &new).unwrap();
//! assert_eq!(mapping.entity_mappings[0].kind, MappingKind::Transform);
//!
//! let retyped = ObjectModel::new().with_entity(
//!     EntityDescription::new("Note")
//!         .with_attribute(AttributeDescription::required("title", AttributeType::Integer64)),
//! );
//! let err = infer_mapping(&old, &retyped).unwrap_err();
//! assert_eq!(err.issues.len(), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    AttributeDescription, AttributeType, EntityDescription, ObjectModel, RelationshipDescription,
};

/// How a source element carries over to the destination model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingKind {
    /// Unchanged; rows or values are copied as-is.
    Copy,
    /// Only exists in the destination model.
    Add,
    /// Only exists in the source model; data is dropped.
    Remove,
    /// Exists in both with a rename or a relaxed constraint.
    Transform,
}

/// Mapping of one attribute or relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub kind: MappingKind,
}

/// Mapping of one entity and its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub kind: MappingKind,
    pub attribute_mappings: Vec<PropertyMapping>,
    pub relationship_mappings: Vec<PropertyMapping>,
}

/// A complete inferred mapping between two models.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingModel {
    pub entity_mappings: Vec<EntityMapping>,
}

impl MappingModel {
    /// Finds the mapping whose destination is `entity`.
    pub fn mapping_for(&self, entity: &str) -> Option<&EntityMapping> {
        self.entity_mappings
            .iter()
            .find(|m| m.destination.as_deref() == Some(entity))
    }

    /// Returns `true` if every entity is copied unchanged.
    pub fn is_identity(&self) -> bool {
        self.entity_mappings
            .iter()
            .all(|m| m.kind == MappingKind::Copy)
    }
}

/// A change that cannot be migrated without custom code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MigrationIssue {
    #[error("{entity}.{attribute} changed type from {from:?} to {to:?}")]
    AttributeTypeChanged {
        entity: String,
        attribute: String,
        from: AttributeType,
        to: AttributeType,
    },
    #[error("{entity}.{attribute} became required without a default value")]
    AttributeBecameRequired { entity: String, attribute: String },
    #[error("required attribute {entity}.{attribute} added without a default value")]
    RequiredAttributeAdded { entity: String, attribute: String },
    #[error("{entity}.{relationship} now points at {to} instead of {from}")]
    RelationshipDestinationChanged {
        entity: String,
        relationship: String,
        from: String,
        to: String,
    },
    #[error("{entity}.{relationship} changed from to-many to to-one")]
    RelationshipBecameToOne { entity: String, relationship: String },
    #[error("{entity}.{relationship} became required")]
    RelationshipBecameRequired { entity: String, relationship: String },
    #[error("required relationship {entity}.{relationship} added")]
    RequiredRelationshipAdded { entity: String, relationship: String },
    #[error("{entity} changed parent from {from:?} to {to:?}")]
    ParentChanged {
        entity: String,
        from: Option<String>,
        to: Option<String>,
    },
    #[error("{entity}.{property} changed between attribute and relationship")]
    PropertyKindChanged { entity: String, property: String },
}

/// Inference failure carrying every incompatible change found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingError {
    pub issues: Vec<MigrationIssue>,
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot infer mapping: {} incompatible change(s)",
            self.issues.len()
        )?;
        for issue in &self.issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MappingError {}

/// Infers a mapping that migrates data from `source` to `destination`.
///
/// # Errors
///
/// Returns [`MappingError`] listing every change that cannot be migrated
/// automatically.
pub fn infer_mapping(
    source: &ObjectModel,
    destination: &ObjectModel,
) -> Result<MappingModel, MappingError> {
    let pairs: Vec<(Option<&EntityDescription>, &EntityDescription)> = destination
        .entities
        .iter()
        .map(|dest| {
            let src = match_by_identity(
                &source.entities,
                dest,
                |e| &e.name,
                |e| &e.renaming_identifier,
            );
            (src, dest)
        })
        .collect();

    // Source entity name -> destination entity name, for following renames
    // through relationship destinations and parents.
    let renamed: HashMap<&str, &str> = pairs
        .iter()
        .filter_map(|(src, dest)| src.map(|s| (s.name.as_str(), dest.name.as_str())))
        .collect();

    let mut issues = Vec::new();
    let mut mappings = Vec::new();

    for (src, dest) in &pairs {
        match src {
            Some(src) => mappings.push(map_entity(src, dest, &renamed, &mut issues)),
            None => mappings.push(EntityMapping {
                source: None,
                destination: Some(dest.name.clone()),
                kind: MappingKind::Add,
                attribute_mappings: Vec::new(),
                relationship_mappings: Vec::new(),
            }),
        }
    }

    let matched: HashSet<&str> = renamed.keys().copied().collect();
    for src in source.entities.iter().filter(|e| !matched.contains(e.name.as_str())) {
        mappings.push(EntityMapping {
            source: Some(src.name.clone()),
            destination: None,
            kind: MappingKind::Remove,
            attribute_mappings: Vec::new(),
            relationship_mappings: Vec::new(),
        });
    }

    if issues.is_empty() {
        debug!(entities = mappings.len(), "inferred lightweight mapping");
        Ok(MappingModel {
            entity_mappings: mappings,
        })
    } else {
        debug!(issues = issues.len(), "mapping inference failed");
        Err(MappingError { issues })
    }
}

/// Finds the source item matching `dest`: by renaming identifier, then name.
fn match_by_identity<'a, T>(
    sources: &'a [T],
    dest: &T,
    name: impl Fn(&T) -> &String,
    renaming: impl Fn(&T) -> &Option<String>,
) -> Option<&'a T> {
    renaming(dest)
        .as_ref()
        .and_then(|previous| sources.iter().find(|&s| name(s) == previous))
        .or_else(|| sources.iter().find(|&s| name(s) == name(dest)))
}

fn map_entity(
    src: &EntityDescription,
    dest: &EntityDescription,
    renamed: &HashMap<&str, &str>,
    issues: &mut Vec<MigrationIssue>,
) -> EntityMapping {
    let expected_parent = src
        .parent
        .as_deref()
        .map(|p| renamed.get(p).copied().unwrap_or(p));
    if expected_parent != dest.parent.as_deref() {
        issues.push(MigrationIssue::ParentChanged {
            entity: dest.name.clone(),
            from: src.parent.clone(),
            to: dest.parent.clone(),
        });
    }

    let attribute_mappings = map_attributes(src, dest, issues);
    let relationship_mappings = map_relationships(src, dest, renamed, issues);

    let unchanged = src.name == dest.name
        && attribute_mappings
            .iter()
            .chain(relationship_mappings.iter())
            .all(|m| m.kind == MappingKind::Copy);

    EntityMapping {
        source: Some(src.name.clone()),
        destination: Some(dest.name.clone()),
        kind: if unchanged {
            MappingKind::Copy
        } else {
            MappingKind::Transform
        },
        attribute_mappings,
        relationship_mappings,
    }
}

fn map_attributes(
    src: &EntityDescription,
    dest: &EntityDescription,
    issues: &mut Vec<MigrationIssue>,
) -> Vec<PropertyMapping> {
    let sources: Vec<AttributeDescription> = src.persistent_attributes().cloned().collect();
    let mut used = HashSet::new();
    let mut mappings = Vec::new();

    for attr in dest.persistent_attributes() {
        let matched = match_by_identity(&sources, attr, |a| &a.name, |a| &a.renaming_identifier);

        let Some(old) = matched else {
            if src.relationship(&attr.name).is_some() {
                issues.push(MigrationIssue::PropertyKindChanged {
                    entity: dest.name.clone(),
                    property: attr.name.clone(),
                });
            } else if !attr.optional && attr.default_value.is_none() {
                issues.push(MigrationIssue::RequiredAttributeAdded {
                    entity: dest.name.clone(),
                    attribute: attr.name.clone(),
                });
            }
            mappings.push(PropertyMapping {
                source: None,
                destination: Some(attr.name.clone()),
                kind: MappingKind::Add,
            });
            continue;
        };
        used.insert(old.name.clone());

        if old.attribute_type != attr.attribute_type {
            issues.push(MigrationIssue::AttributeTypeChanged {
                entity: dest.name.clone(),
                attribute: attr.name.clone(),
                from: old.attribute_type,
                to: attr.attribute_type,
            });
        }
        if old.optional && !attr.optional && attr.default_value.is_none() {
            issues.push(MigrationIssue::AttributeBecameRequired {
                entity: dest.name.clone(),
                attribute: attr.name.clone(),
            });
        }

        let unchanged = old.name == attr.name
            && old.attribute_type == attr.attribute_type
            && old.optional == attr.optional;
        mappings.push(PropertyMapping {
            source: Some(old.name.clone()),
            destination: Some(attr.name.clone()),
            kind: if unchanged {
                MappingKind::Copy
            } else {
                MappingKind::Transform
            },
        });
    }

    for old in sources.iter().filter(|a| !used.contains(&a.name)) {
        if dest.relationship(&old.name).is_some() {
            issues.push(MigrationIssue::PropertyKindChanged {
                entity: dest.name.clone(),
                property: old.name.clone(),
            });
        }
        mappings.push(PropertyMapping {
            source: Some(old.name.clone()),
            destination: None,
            kind: MappingKind::Remove,
        });
    }

    mappings
}

fn map_relationships(
    src: &EntityDescription,
    dest: &EntityDescription,
    renamed: &HashMap<&str, &str>,
    issues: &mut Vec<MigrationIssue>,
) -> Vec<PropertyMapping> {
    let sources: &[RelationshipDescription] = &src.relationships;
    let mut used = HashSet::new();
    let mut mappings = Vec::new();

    for rel in &dest.relationships {
        let matched = match_by_identity(sources, rel, |r| &r.name, |r| &r.renaming_identifier);

        let Some(old) = matched else {
            // Kind changes from an attribute were reported by map_attributes.
            let was_attribute = src.persistent_attributes().any(|a| a.name == rel.name);
            if !was_attribute && !rel.to_many && !rel.optional {
                issues.push(MigrationIssue::RequiredRelationshipAdded {
                    entity: dest.name.clone(),
                    relationship: rel.name.clone(),
                });
            }
            mappings.push(PropertyMapping {
                source: None,
                destination: Some(rel.name.clone()),
                kind: MappingKind::Add,
            });
            continue;
        };
        used.insert(old.name.as_str());

        let expected_destination = renamed
            .get(old.destination.as_str())
            .copied()
            .unwrap_or(old.destination.as_str());
        if expected_destination != rel.destination {
            issues.push(MigrationIssue::RelationshipDestinationChanged {
                entity: dest.name.clone(),
                relationship: rel.name.clone(),
                from: old.destination.clone(),
                to: rel.destination.clone(),
            });
        }
        if old.to_many && !rel.to_many {
            issues.push(MigrationIssue::RelationshipBecameToOne {
                entity: dest.name.clone(),
                relationship: rel.name.clone(),
            });
        }
        if !rel.to_many && old.optional && !rel.optional {
            issues.push(MigrationIssue::RelationshipBecameRequired {
                entity: dest.name.clone(),
                relationship: rel.name.clone(),
            });
        }

        let unchanged = old.name == rel.name
            && old.destination == rel.destination
            && old.to_many == rel.to_many
            && old.optional == rel.optional;
        mappings.push(PropertyMapping {
            source: Some(old.name.clone()),
            destination: Some(rel.name.clone()),
            kind: if unchanged {
                MappingKind::Copy
            } else {
                MappingKind::Transform
            },
        });
    }

    for old in sources.iter().filter(|r| !used.contains(r.name.as_str())) {
        mappings.push(PropertyMapping {
            source: Some(old.name.clone()),
            destination: None,
            kind: MappingKind::Remove,
        });
    }

    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_entity() -> EntityDescription {
        EntityDescription::new("MockEntity").with_attribute(AttributeDescription::required(
            "value",
            AttributeType::Integer64,
        ))
    }

    fn model(entities: Vec<EntityDescription>) -> ObjectModel {
        let mut model = ObjectModel::new();
        model.entities = entities;
        model
    }

    #[test]
    fn test_identical_models_map_to_identity() {
        let m = model(vec![mock_entity()]);
        let mapping = infer_mapping(&m, &m).unwrap();
        assert!(mapping.is_identity());
        assert_eq!(mapping.entity_mappings.len(), 1);
    }

    #[test]
    fn test_optional_attribute_added() {
        let old = model(vec![mock_entity()]);
        let new = model(vec![mock_entity().with_attribute(AttributeDescription::optional(
            "value2",
            AttributeType::Integer64,
        ))]);

        let mapping = infer_mapping(&old, &new).unwrap();
        let entity = mapping.mapping_for("MockEntity").unwrap();
        assert_eq!(entity.kind, MappingKind::Transform);
        assert!(entity
            .attribute_mappings
            .iter()
            .any(|m| m.destination.as_deref() == Some("value2") && m.kind == MappingKind::Add));
    }

    #[test]
    fn test_required_attribute_needs_default() {
        let old = model(vec![mock_entity()]);

        let without_default = model(vec![mock_entity().with_attribute(
            AttributeDescription::required("count", AttributeType::Integer32),
        )]);
        let err = infer_mapping(&old, &without_default).unwrap_err();
        assert_eq!(
            err.issues,
            vec![MigrationIssue::RequiredAttributeAdded {
                entity: "MockEntity".into(),
                attribute: "count".into(),
            }]
        );

        let with_default = model(vec![mock_entity().with_attribute(
            AttributeDescription::required("count", AttributeType::Integer32).with_default("0"),
        )]);
        assert!(infer_mapping(&old, &with_default).is_ok());
    }

    #[test]
    fn test_type_change_is_incompatible() {
        let old = model(vec![mock_entity()]);
        let new = model(vec![EntityDescription::new("MockEntity").with_attribute(
            AttributeDescription::required("value", AttributeType::String),
        )]);

        let err = infer_mapping(&old, &new).unwrap_err();
        assert_eq!(
            err.issues,
            vec![MigrationIssue::AttributeTypeChanged {
                entity: "MockEntity".into(),
                attribute: "value".into(),
                from: AttributeType::Integer64,
                to: AttributeType::String,
            }]
        );
        assert!(err.to_string().contains("MockEntity.value"));
    }

    #[test]
    fn test_optional_to_required_rules() {
        let old = model(vec![EntityDescription::new("E").with_attribute(
            AttributeDescription::optional("a", AttributeType::String),
        )]);
        let tightened = model(vec![EntityDescription::new("E").with_attribute(
            AttributeDescription::required("a", AttributeType::String),
        )]);
        let err = infer_mapping(&old, &tightened).unwrap_err();
        assert!(matches!(err.issues[0], MigrationIssue::AttributeBecameRequired { .. }));

        // Relaxing is always fine.
        assert!(infer_mapping(&tightened, &old).is_ok());
    }

    #[test]
    fn test_renames_follow_renaming_identifier() {
        let old = model(vec![
            EntityDescription::new("Person")
                .with_attribute(AttributeDescription::required("name", AttributeType::String)),
            EntityDescription::new("Pet")
                .with_relationship(RelationshipDescription::to_one("owner", "Person")),
        ]);
        let new = model(vec![
            EntityDescription::new("Owner").renamed_from("Person").with_attribute(
                AttributeDescription::required("fullName", AttributeType::String)
                    .renamed_from("name"),
            ),
            EntityDescription::new("Pet")
                .with_relationship(RelationshipDescription::to_one("owner", "Owner")),
        ]);

        let mapping = infer_mapping(&old, &new).unwrap();
        let owner = mapping.mapping_for("Owner").unwrap();
        assert_eq!(owner.source.as_deref(), Some("Person"));
        assert_eq!(owner.attribute_mappings[0].source.as_deref(), Some("name"));
        assert_eq!(owner.attribute_mappings[0].kind, MappingKind::Transform);
        assert!(mapping
            .entity_mappings
            .iter()
            .all(|m| m.kind != MappingKind::Remove));
    }

    #[test]
    fn test_entities_added_and_removed() {
        let old = model(vec![mock_entity(), EntityDescription::new("Legacy")]);
        let new = model(vec![mock_entity(), EntityDescription::new("Fresh")]);

        let mapping = infer_mapping(&old, &new).unwrap();
        let kinds: Vec<MappingKind> = mapping.entity_mappings.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MappingKind::Copy, MappingKind::Add, MappingKind::Remove]
        );
    }

    #[test]
    fn test_relationship_rules() {
        let old = model(vec![
            EntityDescription::new("Order")
                .with_relationship(RelationshipDescription::to_many("items", "Item"))
                .with_relationship(RelationshipDescription::to_one("customer", "Customer")),
            EntityDescription::new("Item"),
            EntityDescription::new("Customer"),
        ]);
        let new = model(vec![
            EntityDescription::new("Order")
                .with_relationship(RelationshipDescription::to_one("items", "Item"))
                .with_relationship(RelationshipDescription::to_one("customer", "Item"))
                .with_relationship(RelationshipDescription::to_one("store", "Item").required()),
            EntityDescription::new("Item"),
            EntityDescription::new("Customer"),
        ]);

        let err = infer_mapping(&old, &new).unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert!(err.issues.iter().any(|i| matches!(i, MigrationIssue::RelationshipBecameToOne { .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, MigrationIssue::RelationshipDestinationChanged { .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, MigrationIssue::RequiredRelationshipAdded { .. })));
    }

    #[test]
    fn test_parent_change_and_kind_change() {
        let old = model(vec![
            EntityDescription::new("Base"),
            EntityDescription::new("Doc")
                .with_attribute(AttributeDescription::optional("folder", AttributeType::String)),
        ]);
        let new = model(vec![
            EntityDescription::new("Base"),
            EntityDescription::new("Doc")
                .with_parent("Base")
                .with_relationship(RelationshipDescription::to_one("folder", "Base")),
        ]);

        let err = infer_mapping(&old, &new).unwrap_err();
        assert!(err.issues.iter().any(|i| matches!(i, MigrationIssue::ParentChanged { .. })));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, MigrationIssue::PropertyKindChanged { property, .. } if property == "folder")));
    }

    #[test]
    fn test_transient_attribute_replaced_by_required_relationship() {
        let new = model(vec![
            EntityDescription::new("Node")
                .with_relationship(RelationshipDescription::to_one("owner", "Person").required()),
            EntityDescription::new("Person"),
        ]);
        let plain = model(vec![EntityDescription::new("Node"), EntityDescription::new("Person")]);
        let with_transient = model(vec![
            EntityDescription::new("Node").with_attribute(
                AttributeDescription::optional("owner", AttributeType::String).transient(),
            ),
            EntityDescription::new("Person"),
        ]);

        for old in [plain, with_transient] {
            let err = infer_mapping(&old, &new).unwrap_err();
            assert_eq!(
                err.issues,
                vec![MigrationIssue::RequiredRelationshipAdded {
                    entity: "Node".to_string(),
                    relationship: "owner".to_string(),
                }]
            );
        }
    }
}
