//! Storage-layer mapping: tables, columns and foreign-key relationships.

use serde::{Deserialize, Serialize};

/// A table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub attributes: Vec<DbAttribute>,
    #[serde(default)]
    pub relationships: Vec<DbRelationship>,
}

/// A column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAttribute {
    pub name: String,
    #[serde(rename = "type", default = "default_column_type")]
    pub column_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub mandatory: bool,
}

fn default_column_type() -> String {
    "VARCHAR".to_string()
}

/// One column pair of a foreign-key join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbJoin {
    pub source: String,
    pub target: String,
}

impl DbJoin {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The same join seen from the other side.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

/// A foreign-key relationship between two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRelationship {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub to_many: bool,
    #[serde(default)]
    pub joins: Vec<DbJoin>,
}

impl DbRelationship {
    /// Whether `other`, declared on the target table, joins the same columns
    /// in the opposite direction.
    pub fn is_reverse_of(&self, source_entity: &str, other: &DbRelationship) -> bool {
        if other.target != source_entity || other.joins.len() != self.joins.len() {
            return false;
        }
        self.joins
            .iter()
            .all(|join| other.joins.contains(&join.reversed()))
    }
}

impl DbEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&DbAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&DbRelationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &DbAttribute> {
        self.attributes.iter().filter(|a| a.primary_key)
    }

    /// Fully qualified table name, `schema.name` when a schema is set.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}
