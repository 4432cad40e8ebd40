//! Object-model type definitions.
//!
//! This module defines the data model a persistence engine caches inside its
//! stores: entities with attributes and relationships, grouped into named
//! configurations. The types are designed for serialization with [`serde`]
//! and round-trip through the keyed archive stored in a store's model cache.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Name of the implicit configuration that contains every entity.
pub const DEFAULT_CONFIGURATION: &str = "Default";

/// Primitive storage type of an attribute.
///
/// # Examples
///
/// ```
/// use store_model_core::AttributeType;
///
/// assert!(AttributeType::Integer64.is_numeric());
/// assert!(!AttributeType::String.is_numeric());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Integer16,
    Integer32,
    Integer64,
    Decimal,
    Double,
    Float,
    String,
    Boolean,
    Date,
    Binary,
    Uuid,
    Uri,
    /// Value stored through a value transformer as opaque bytes.
    Transformable,
}

impl AttributeType {
    /// Returns `true` for integer and floating-point types.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer16
                | Self::Integer32
                | Self::Integer64
                | Self::Decimal
                | Self::Double
                | Self::Float
        )
    }

    /// Stable name used in version hashes and SQL column types.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer16 => "integer16",
            Self::Integer32 => "integer32",
            Self::Integer64 => "integer64",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Uuid => "uuid",
            Self::Uri => "uri",
            Self::Transformable => "transformable",
        }
    }
}

/// What happens to destination objects when the source object is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeleteRule {
    #[default]
    Nullify,
    Cascade,
    Deny,
    NoAction,
}

/// Schema for an entity attribute.
///
/// Use [`required`](AttributeDescription::required) or
/// [`optional`](AttributeDescription::optional) to create attributes, then
/// chain builder methods.
///
/// # Examples
///
/// ```
/// use store_model_core::{AttributeDescription, AttributeType};
///
/// let value = AttributeDescription::required("value", AttributeType::Integer64)
///     .with_default("0");
/// assert!(!value.optional);
/// assert_eq!(value.default_value.as_deref(), Some("0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub name: String,
    pub attribute_type: AttributeType,
    pub optional: bool,
    /// Transient attributes are never written to the store.
    #[serde(default)]
    pub transient: bool,
    /// Literal default applied to existing rows during migration.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Previous name of this attribute, used to match renames.
    #[serde(default)]
    pub renaming_identifier: Option<String>,
}

impl AttributeDescription {
    /// Creates a non-optional attribute.
    pub fn required(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attribute_type,
            optional: false,
            transient: false,
            default_value: None,
            renaming_identifier: None,
        }
    }

    /// Creates an optional attribute.
    pub fn optional(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, attribute_type)
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    /// Marks the attribute as renamed from `previous`.
    pub fn renamed_from(mut self, previous: &str) -> Self {
        self.renaming_identifier = Some(previous.to_string());
        self
    }

    /// Marks the attribute as transient.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

/// Schema for a relationship between two entities.
///
/// # Examples
///
/// ```
/// use store_model_core::RelationshipDescription;
///
/// let items = RelationshipDescription::to_many("items", "Item").with_inverse("order");
/// assert!(items.to_many);
/// assert!(items.optional);
/// assert_eq!(items.inverse.as_deref(), Some("order"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescription {
    pub name: String,
    /// Name of the destination entity.
    pub destination: String,
    #[serde(default)]
    pub inverse: Option<String>,
    pub to_many: bool,
    pub optional: bool,
    #[serde(default)]
    pub delete_rule: DeleteRule,
    #[serde(default)]
    pub renaming_identifier: Option<String>,
}

impl RelationshipDescription {
    /// Creates an optional to-one relationship.
    pub fn to_one(name: &str, destination: &str) -> Self {
        Self {
            name: name.to_string(),
            destination: destination.to_string(),
            inverse: None,
            to_many: false,
            optional: true,
            delete_rule: DeleteRule::default(),
            renaming_identifier: None,
        }
    }

    /// Creates an optional to-many relationship.
    pub fn to_many(name: &str, destination: &str) -> Self {
        Self {
            to_many: true,
            ..Self::to_one(name, destination)
        }
    }

    /// Sets the inverse relationship name.
    pub fn with_inverse(mut self, inverse: &str) -> Self {
        self.inverse = Some(inverse.to_string());
        self
    }

    /// Marks the relationship as required.
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Sets the delete rule.
    pub fn with_delete_rule(mut self, rule: DeleteRule) -> Self {
        self.delete_rule = rule;
        self
    }

    /// Marks the relationship as renamed from `previous`.
    pub fn renamed_from(mut self, previous: &str) -> Self {
        self.renaming_identifier = Some(previous.to_string());
        self
    }
}

/// Schema for an entity.
///
/// # Examples
///
/// ```
/// use store_model_core::*;
///
/// let entity = EntityDescription::new("Order")
///     .with_attribute(AttributeDescription::required("number", AttributeType::Integer64))
///     .with_relationship(RelationshipDescription::to_many("items", "Item"));
///
/// assert!(entity.attribute("number").is_some());
/// assert!(entity.relationship("items").is_some());
/// assert!(entity.attribute("missing").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    /// Name of the class instantiated for this entity. Not part of the
    /// version hash.
    #[serde(default)]
    pub class_name: Option<String>,
    /// Parent entity in the inheritance hierarchy.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    pub attributes: Vec<AttributeDescription>,
    pub relationships: Vec<RelationshipDescription>,
    /// Previous entity name, used to match renames.
    #[serde(default)]
    pub renaming_identifier: Option<String>,
}

impl EntityDescription {
    /// Creates an empty concrete entity.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class_name: None,
            parent: None,
            is_abstract: false,
            attributes: Vec::new(),
            relationships: Vec::new(),
            renaming_identifier: None,
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, attribute: AttributeDescription) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a relationship.
    pub fn with_relationship(mut self, relationship: RelationshipDescription) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Sets the class name.
    pub fn with_class_name(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    /// Sets the parent entity.
    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Marks the entity as renamed from `previous`.
    pub fn renamed_from(mut self, previous: &str) -> Self {
        self.renaming_identifier = Some(previous.to_string());
        self
    }

    /// Marks the entity as abstract.
    pub fn abstract_entity(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Finds an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescription> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Finds a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescription> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Attributes that are written to the store.
    pub fn persistent_attributes(&self) -> impl Iterator<Item = &AttributeDescription> {
        self.attributes.iter().filter(|a| !a.transient)
    }
}

/// The object model a store was created with.
///
/// Configurations name subsets of entities; entities not listed in any
/// configuration are still part of the [`DEFAULT_CONFIGURATION`].
///
/// # Examples
///
/// ```
/// use store_model_core::*;
///
/// let model = ObjectModel::new()
///     .with_entity(EntityDescription::new("Note"))
///     .with_entity(EntityDescription::new("Tag"))
///     .with_configuration("Cloud", &["Note"]);
///
/// assert_eq!(model.entities_for_configuration(None).len(), 2);
/// assert_eq!(model.entities_for_configuration(Some("Cloud")).len(), 1);
/// assert!(model.entities_for_configuration(Some("Local")).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectModel {
    pub entities: Vec<EntityDescription>,
    /// Configuration name to entity names.
    #[serde(default)]
    pub configurations: BTreeMap<String, Vec<String>>,
    /// Free-form identifiers that distinguish model versions. Not part of
    /// the entity version hashes.
    #[serde(default)]
    pub version_identifiers: BTreeSet<String>,
}

impl ObjectModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity.
    pub fn with_entity(mut self, entity: EntityDescription) -> Self {
        self.entities.push(entity);
        self
    }

    /// Declares a named configuration.
    pub fn with_configuration(mut self, name: &str, entities: &[&str]) -> Self {
        self.configurations.insert(
            name.to_string(),
            entities.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    /// Adds a version identifier.
    pub fn with_version_identifier(mut self, identifier: &str) -> Self {
        self.version_identifiers.insert(identifier.to_string());
        self
    }

    /// Finds an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDescription> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Gets all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Entities belonging to a configuration.
    ///
    /// `None` and [`DEFAULT_CONFIGURATION`] select every entity. An unknown
    /// configuration name selects nothing.
    pub fn entities_for_configuration(&self, configuration: Option<&str>) -> Vec<&EntityDescription> {
        match configuration {
            None | Some(DEFAULT_CONFIGURATION) => self.entities.iter().collect(),
            Some(name) => match self.configurations.get(name) {
                Some(names) => self
                    .entities
                    .iter()
                    .filter(|e| names.iter().any(|n| *n == e.name))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// Returns `true` if the model declares `configuration`, treating the
    /// default configuration as always present.
    pub fn has_configuration(&self, configuration: Option<&str>) -> bool {
        match configuration {
            None | Some(DEFAULT_CONFIGURATION) => true,
            Some(name) => self.configurations.contains_key(name),
        }
    }
}
