//! Object-model validation.
//!
//! Validates structural invariants of an [`ObjectModel`], catching errors
//! such as duplicate entities or properties, dangling relationship
//! destinations, inheritance cycles and configurations that name unknown
//! entities.
//!
//! # Examples
//!
//! ```
//! use store_model_core::*;
//!
//! let model = ObjectModel::new().with_entity(
//!     EntityDescription::new("Note")
//!         .with_attribute(AttributeDescription::required("title", AttributeType::String)),
//! );
//! assert!(validate_model(&model).is_empty());
//!
//! // Invalid: relationship points at an entity the model does not define
//! let bad = ObjectModel::new().with_entity(
//!     EntityDescription::new("Note")
//!         .with_relationship(RelationshipDescription::to_one("folder", "Folder")),
//! );
//! assert!(!validate_model(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{EntityDescription, ObjectModel};

/// Model validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Entity name is empty or whitespace-only.
    #[error("entity name cannot be empty")]
    EmptyEntityName,
    /// Two entities share a name.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    /// Property name is empty or whitespace-only.
    #[error("property name cannot be empty in entity {0}")]
    EmptyPropertyName(String),
    /// Two properties (attributes or relationships) of one entity share a name.
    #[error("duplicate property {property} in entity {entity}")]
    DuplicateProperty { entity: String, property: String },
    /// Relationship destination is not an entity of the model.
    #[error("relationship {entity}.{relationship} points at unknown entity {destination}")]
    UnknownDestination {
        entity: String,
        relationship: String,
        destination: String,
    },
    /// Parent entity is not defined by the model.
    #[error("entity {entity} has unknown parent {parent}")]
    UnknownParent { entity: String, parent: String },
    /// The parent chain loops back on itself.
    #[error("inheritance cycle detected at path: {0}")]
    InheritanceCycle(String),
    /// A configuration lists an entity the model does not define.
    #[error("configuration {configuration} lists unknown entity {entity}")]
    UnknownConfigurationEntity {
        configuration: String,
        entity: String,
    },
}

/// Validates an object model, returning every problem found.
///
/// An empty vector means the model is structurally sound.
pub fn validate_model(model: &ObjectModel) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for entity in &model.entities {
        let name = entity.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyEntityName);
            continue;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateEntity(name.to_string()));
        }
        errors.extend(validate_properties(entity));
    }

    for entity in &model.entities {
        for relationship in &entity.relationships {
            if model.entity(&relationship.destination).is_none() {
                errors.push(ValidationError::UnknownDestination {
                    entity: entity.name.clone(),
                    relationship: relationship.name.clone(),
                    destination: relationship.destination.clone(),
                });
            }
        }
        if let Some(parent) = &entity.parent {
            if model.entity(parent).is_none() {
                errors.push(ValidationError::UnknownParent {
                    entity: entity.name.clone(),
                    parent: parent.clone(),
                });
            } else if let Some(cycle) = inheritance_cycle(model, entity) {
                errors.push(ValidationError::InheritanceCycle(cycle));
            }
        }
    }

    for (configuration, names) in &model.configurations {
        for name in names {
            if model.entity(name).is_none() {
                errors.push(ValidationError::UnknownConfigurationEntity {
                    configuration: configuration.clone(),
                    entity: name.clone(),
                });
            }
        }
    }

    errors
}

fn validate_properties(entity: &EntityDescription) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    let names = entity
        .attributes
        .iter()
        .map(|a| a.name.as_str())
        .chain(entity.relationships.iter().map(|r| r.name.as_str()));

    for name in names {
        let name = name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyPropertyName(entity.name.clone()));
            continue;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateProperty {
                entity: entity.name.clone(),
                property: name.to_string(),
            });
        }
    }

    errors
}

/// Walks the parent chain of `entity`; returns the looping path if any.
fn inheritance_cycle(model: &ObjectModel, entity: &EntityDescription) -> Option<String> {
    let mut path = vec![entity.name.as_str()];
    let mut current = entity;

    while let Some(parent) = current.parent.as_deref() {
        if path.contains(&parent) {
            path.push(parent);
            return Some(path.join(" -> "));
        }
        path.push(parent);
        current = model.entity(parent)?;
    }

    None
}
