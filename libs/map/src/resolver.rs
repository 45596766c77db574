//! Catalog lookups across one or more data maps.
//!
//! [`MappingCatalog`] is the read-only interface the expression engine and
//! query layer resolve names through. [`EntityResolver`] is the in-memory
//! implementation backed by [`DataMap`]s.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data_map::DataMap;
use crate::db::{DbEntity, DbJoin, DbRelationship};
use crate::entity::ObjEntity;
use crate::error::{Error, Result};

/// Storage location of an object attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageColumn {
    /// Table that owns the column, after following any flattened hops.
    pub table: String,
    pub column: String,
    pub column_type: String,
    /// Dotted db path from the entity's own table to the column.
    pub db_path: String,
}

/// Storage view of an object relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    pub target_entity: String,
    pub to_many: bool,
    /// Join columns of every hop, in traversal order.
    pub join_columns: Vec<DbJoin>,
    /// Names of the underlying db relationships, in traversal order.
    pub db_path: Vec<String>,
}

/// Read-only access to the mapping catalog. Implementations must be free of
/// side effects; lookups may happen from many threads at once.
pub trait MappingCatalog: Send + Sync {
    fn obj_entity(&self, name: &str) -> Option<&ObjEntity>;

    fn db_entity(&self, name: &str) -> Option<&DbEntity>;

    fn require_obj_entity(&self, name: &str) -> Result<&ObjEntity> {
        self.obj_entity(name)
            .ok_or_else(|| Error::EntityNotFound(name.to_string()))
    }

    fn require_db_entity(&self, name: &str) -> Result<&DbEntity> {
        self.db_entity(name)
            .ok_or_else(|| Error::EntityNotFound(name.to_string()))
    }

    /// Follow the db relationships of an object relationship, returning each
    /// hop with the table it starts from.
    fn db_relationship_chain(
        &self,
        entity: &str,
        relationship: &str,
    ) -> Result<Vec<(&DbEntity, &DbRelationship)>> {
        let obj_entity = self.require_obj_entity(entity)?;
        let rel = obj_entity
            .relationship(relationship)
            .ok_or_else(|| Error::RelationshipNotFound {
                entity: entity.to_string(),
                relationship: relationship.to_string(),
            })?;

        let mut table = self.require_db_entity(&obj_entity.db_entity)?;
        let mut chain = Vec::new();
        for name in rel.db_relationship_names() {
            let db_rel = table
                .relationship(name)
                .ok_or_else(|| Error::RelationshipNotFound {
                    entity: table.name.clone(),
                    relationship: name.to_string(),
                })?;
            chain.push((table, db_rel));
            table = self.require_db_entity(&db_rel.target)?;
        }
        Ok(chain)
    }

    fn resolve_attribute(&self, entity: &str, attribute: &str) -> Result<StorageColumn> {
        let obj_entity = self.require_obj_entity(entity)?;
        let attr = obj_entity
            .attribute(attribute)
            .ok_or_else(|| Error::AttributeNotFound {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            })?;

        let db_path = attr.db_path();
        let mut table = self.require_db_entity(&obj_entity.db_entity)?;
        let mut segments = db_path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                let db_rel = table
                    .relationship(segment)
                    .ok_or_else(|| Error::RelationshipNotFound {
                        entity: table.name.clone(),
                        relationship: segment.to_string(),
                    })?;
                table = self.require_db_entity(&db_rel.target)?;
                continue;
            }

            let column = table
                .attribute(segment)
                .ok_or_else(|| Error::AttributeNotFound {
                    entity: table.name.clone(),
                    attribute: segment.to_string(),
                })?;
            return Ok(StorageColumn {
                table: table.name.clone(),
                column: column.name.clone(),
                column_type: column.column_type.clone(),
                db_path: db_path.clone(),
            });
        }

        Err(Error::InvalidMapping(format!(
            "Attribute '{}.{}' has an empty db path",
            entity, attribute
        )))
    }

    fn resolve_relationship(&self, entity: &str, relationship: &str) -> Result<RelationshipInfo> {
        let obj_entity = self.require_obj_entity(entity)?;
        let target_entity = obj_entity
            .relationship(relationship)
            .map(|r| r.target.clone())
            .ok_or_else(|| Error::RelationshipNotFound {
                entity: entity.to_string(),
                relationship: relationship.to_string(),
            })?;

        let chain = self.db_relationship_chain(entity, relationship)?;
        Ok(RelationshipInfo {
            target_entity,
            to_many: chain.iter().any(|(_, r)| r.to_many),
            join_columns: chain
                .iter()
                .flat_map(|(_, r)| r.joins.iter().cloned())
                .collect(),
            db_path: chain.iter().map(|(_, r)| r.name.clone()).collect(),
        })
    }

    /// The relationship on the target table that joins back to `db_entity`.
    fn reverse_db_relationship(
        &self,
        db_entity: &str,
        relationship: &str,
    ) -> Result<&DbRelationship> {
        let source = self.require_db_entity(db_entity)?;
        let forward = source
            .relationship(relationship)
            .ok_or_else(|| Error::RelationshipNotFound {
                entity: db_entity.to_string(),
                relationship: relationship.to_string(),
            })?;
        let target = self.require_db_entity(&forward.target)?;

        target
            .relationships
            .iter()
            .find(|candidate| forward.is_reverse_of(db_entity, candidate))
            .ok_or_else(|| Error::ReverseRelationshipNotFound {
                entity: db_entity.to_string(),
                relationship: relationship.to_string(),
            })
    }
}

/// Lookup index over a set of data maps.
#[derive(Debug, Default)]
pub struct EntityResolver {
    maps: Vec<Arc<DataMap>>,
    // name -> (map index, entity index)
    obj_index: HashMap<String, (usize, usize)>,
    db_index: HashMap<String, (usize, usize)>,
    class_index: HashMap<String, String>,
}

impl EntityResolver {
    pub fn new(maps: impl IntoIterator<Item = DataMap>) -> Self {
        let mut resolver = Self::default();
        for map in maps {
            resolver.add_data_map(map);
        }
        resolver
    }

    /// Register a data map. Entities from later maps shadow same-named
    /// entities of earlier ones.
    pub fn add_data_map(&mut self, map: DataMap) {
        let map_idx = self.maps.len();
        for (idx, entity) in map.obj_entities.iter().enumerate() {
            self.obj_index.insert(entity.name.clone(), (map_idx, idx));
            if let Some(class_name) = &entity.class_name {
                self.class_index
                    .insert(class_name.clone(), entity.name.clone());
            }
        }
        for (idx, entity) in map.db_entities.iter().enumerate() {
            self.db_index.insert(entity.name.clone(), (map_idx, idx));
        }
        tracing::debug!(
            data_map = %map.name,
            obj_entities = map.obj_entities.len(),
            "Registered data map"
        );
        self.maps.push(Arc::new(map));
    }

    pub fn data_maps(&self) -> &[Arc<DataMap>] {
        &self.maps
    }

    pub fn data_map(&self, name: &str) -> Option<&Arc<DataMap>> {
        self.maps.iter().find(|m| m.name == name)
    }

    /// Data map that declares the given object entity.
    pub fn data_map_for_obj_entity(&self, name: &str) -> Option<&Arc<DataMap>> {
        self.obj_index
            .get(name)
            .and_then(|(map_idx, _)| self.maps.get(*map_idx))
    }

    /// Object entity registered for a type token.
    pub fn obj_entity_for_class(&self, class_name: &str) -> Option<&ObjEntity> {
        self.class_index
            .get(class_name)
            .and_then(|name| self.obj_entity(name))
    }

    /// Object entities stored in the given table.
    pub fn obj_entities_for_db_entity(&self, db_entity: &str) -> Vec<&ObjEntity> {
        self.maps
            .iter()
            .flat_map(|m| m.obj_entities.iter())
            .filter(|e| e.db_entity == db_entity)
            .collect()
    }
}

impl MappingCatalog for EntityResolver {
    fn obj_entity(&self, name: &str) -> Option<&ObjEntity> {
        let (map_idx, idx) = self.obj_index.get(name)?;
        self.maps.get(*map_idx)?.obj_entities.get(*idx)
    }

    fn db_entity(&self, name: &str) -> Option<&DbEntity> {
        let (map_idx, idx) = self.db_index.get(name)?;
        self.maps.get(*map_idx)?.db_entities.get(*idx)
    }
}
