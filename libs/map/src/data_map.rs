//! A named group of object and db entities, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::DbEntity;
use crate::entity::ObjEntity;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMap {
    pub name: String,
    #[serde(default)]
    pub obj_entities: Vec<ObjEntity>,
    #[serde(default)]
    pub db_entities: Vec<DbEntity>,
}

impl DataMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            obj_entities: Vec::new(),
            db_entities: Vec::new(),
        }
    }

    pub fn with_obj_entity(mut self, entity: ObjEntity) -> Self {
        self.obj_entities.push(entity);
        self
    }

    pub fn with_db_entity(mut self, entity: DbEntity) -> Self {
        self.db_entities.push(entity);
        self
    }

    pub fn obj_entity(&self, name: &str) -> Option<&ObjEntity> {
        self.obj_entities.iter().find(|e| e.name == name)
    }

    pub fn db_entity(&self, name: &str) -> Option<&DbEntity> {
        self.db_entities.iter().find(|e| e.name == name)
    }

    /// Parse a data map from its JSON form and check internal references.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: DataMap = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let map = Self::from_json(&contents)?;
        tracing::debug!(
            path = %path.display(),
            obj_entities = map.obj_entities.len(),
            db_entities = map.db_entities.len(),
            "Loaded data map"
        );
        Ok(map)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every object entity must point at a table in this map, and every
    /// relationship must point at an entity in this map.
    pub fn validate(&self) -> Result<()> {
        for entity in &self.obj_entities {
            if self.db_entity(&entity.db_entity).is_none() {
                return Err(Error::InvalidMapping(format!(
                    "ObjEntity '{}' refers to unknown DbEntity '{}'",
                    entity.name, entity.db_entity
                )));
            }
            for rel in &entity.relationships {
                if self.obj_entity(&rel.target).is_none() {
                    return Err(Error::InvalidMapping(format!(
                        "Relationship '{}.{}' targets unknown ObjEntity '{}'",
                        entity.name, rel.name, rel.target
                    )));
                }
            }
        }

        for entity in &self.db_entities {
            for rel in &entity.relationships {
                if self.db_entity(&rel.target).is_none() {
                    return Err(Error::InvalidMapping(format!(
                        "Relationship '{}.{}' targets unknown DbEntity '{}'",
                        entity.name, rel.name, rel.target
                    )));
                }
            }
        }

        Ok(())
    }
}
