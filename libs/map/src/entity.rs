//! Object-layer mapping: entities, attributes and relationships as the
//! domain model sees them.

use heck::ToShoutySnakeCase;
use serde::{Deserialize, Serialize};

/// A persistent entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjEntity {
    pub name: String,
    /// Type token the entity is registered under (e.g. `org.example.Artist`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Name of the table this entity is stored in.
    pub db_entity: String,
    #[serde(default)]
    pub attributes: Vec<ObjAttribute>,
    #[serde(default)]
    pub relationships: Vec<ObjRelationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjAttribute {
    pub name: String,
    #[serde(rename = "type", default = "default_attribute_type")]
    pub type_name: String,
    /// Dotted storage path. Multi-segment paths are flattened attributes
    /// reached through db relationships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_attribute_path: Option<String>,
}

fn default_attribute_type() -> String {
    "String".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjRelationship {
    pub name: String,
    pub target: String,
    /// Dotted chain of db relationships. More than one segment means the
    /// relationship is flattened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_relationship_path: Option<String>,
}

impl ObjEntity {
    pub fn new(name: impl Into<String>, db_entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: None,
            db_entity: db_entity.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ObjAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&ObjRelationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

impl ObjAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: default_attribute_type(),
            db_attribute_path: None,
        }
    }

    /// Storage path of the attribute. Unmapped attributes follow the
    /// `camelCase` to `SHOUTY_SNAKE` column convention.
    pub fn db_path(&self) -> String {
        match &self.db_attribute_path {
            Some(path) => path.clone(),
            None => self.name.to_shouty_snake_case(),
        }
    }

    pub fn is_flattened(&self) -> bool {
        self.db_path().contains('.')
    }
}

impl ObjRelationship {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            db_relationship_path: None,
        }
    }

    /// Names of the db relationships this relationship is built from, in
    /// traversal order. Defaults to a single db relationship of the same name.
    pub fn db_relationship_names(&self) -> Vec<&str> {
        match &self.db_relationship_path {
            Some(path) => path.split('.').collect(),
            None => vec![self.name.as_str()],
        }
    }

    pub fn is_flattened(&self) -> bool {
        self.db_relationship_names().len() > 1
    }
}
