//! Query roots and their resolution against the mapping catalog

use std::fmt;
use std::sync::{Arc, Weak};

use cinnabar_exp::GraphNode;
use cinnabar_map::{DataMap, DbEntity, EntityResolver, MappingCatalog, ObjEntity};

use crate::error::{Error, Result};

/// What a query selects from.
#[derive(Debug, Clone)]
pub enum QueryRoot {
    /// Type token an object entity is registered under.
    Type(String),
    EntityName(String),
    ObjEntity(Arc<ObjEntity>),
    DbEntity(Arc<DbEntity>),
    DataMap(Arc<DataMap>),
    /// A persistent instance; its own entity is the root.
    Object(Arc<dyn GraphNode>),
}

/// Identity of a root for memoization. Names compare by value. Handles and
/// instances compare by allocation, and only while that allocation is alive,
/// so a key never matches a later value that reuses a freed address.
#[derive(Debug, Clone)]
pub(crate) enum RootKey {
    Type(String),
    EntityName(String),
    ObjEntity(Weak<ObjEntity>),
    DbEntity(Weak<DbEntity>),
    DataMap(Weak<DataMap>),
    Object(Weak<dyn GraphNode>),
}

fn same_live<T: ?Sized>(a: &Weak<T>, b: &Weak<T>) -> bool {
    a.strong_count() > 0 && Weak::ptr_eq(a, b)
}

impl PartialEq for RootKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RootKey::Type(a), RootKey::Type(b)) => a == b,
            (RootKey::EntityName(a), RootKey::EntityName(b)) => a == b,
            (RootKey::ObjEntity(a), RootKey::ObjEntity(b)) => same_live(a, b),
            (RootKey::DbEntity(a), RootKey::DbEntity(b)) => same_live(a, b),
            (RootKey::DataMap(a), RootKey::DataMap(b)) => same_live(a, b),
            (RootKey::Object(a), RootKey::Object(b)) => same_live(a, b),
            _ => false,
        }
    }
}

impl QueryRoot {
    pub fn entity(name: impl Into<String>) -> Self {
        QueryRoot::EntityName(name.into())
    }

    pub fn type_token(name: impl Into<String>) -> Self {
        QueryRoot::Type(name.into())
    }

    pub(crate) fn key(&self) -> RootKey {
        match self {
            QueryRoot::Type(name) => RootKey::Type(name.clone()),
            QueryRoot::EntityName(name) => RootKey::EntityName(name.clone()),
            QueryRoot::ObjEntity(entity) => RootKey::ObjEntity(Arc::downgrade(entity)),
            QueryRoot::DbEntity(entity) => RootKey::DbEntity(Arc::downgrade(entity)),
            QueryRoot::DataMap(map) => RootKey::DataMap(Arc::downgrade(map)),
            QueryRoot::Object(object) => RootKey::Object(Arc::downgrade(object)),
        }
    }

    /// Look the root up in `resolver`.
    pub fn resolve(&self, resolver: &EntityResolver) -> Result<ResolvedEntity> {
        match self {
            QueryRoot::Type(token) => {
                let entity = resolver.obj_entity_for_class(token).ok_or_else(|| {
                    Error::UnresolvableRoot(format!("no entity registered for type '{}'", token))
                })?;
                ResolvedEntity::for_obj_entity(resolver, entity.clone())
            }
            QueryRoot::EntityName(name) => {
                let entity = resolver
                    .obj_entity(name)
                    .ok_or_else(|| Error::UnresolvableRoot(format!("unknown entity '{}'", name)))?;
                ResolvedEntity::for_obj_entity(resolver, entity.clone())
            }
            QueryRoot::ObjEntity(entity) => ResolvedEntity::for_obj_entity(resolver, (**entity).clone()),
            QueryRoot::DbEntity(entity) => {
                let data_map = resolver
                    .data_maps()
                    .iter()
                    .find(|map| map.db_entity(&entity.name).is_some())
                    .cloned();
                Ok(ResolvedEntity {
                    obj_entity: None,
                    db_entity: Some((**entity).clone()),
                    data_map,
                })
            }
            QueryRoot::DataMap(map) => Ok(ResolvedEntity {
                obj_entity: None,
                db_entity: None,
                data_map: Some(Arc::clone(map)),
            }),
            QueryRoot::Object(object) => {
                let name = object.entity_name();
                let entity = resolver.obj_entity(name).ok_or_else(|| {
                    Error::UnresolvableRoot(format!("instance of unknown entity '{}'", name))
                })?;
                ResolvedEntity::for_obj_entity(resolver, entity.clone())
            }
        }
    }
}

impl fmt::Display for QueryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryRoot::Type(token) => write!(f, "type {}", token),
            QueryRoot::EntityName(name) => write!(f, "entity {}", name),
            QueryRoot::ObjEntity(entity) => write!(f, "obj entity {}", entity.name),
            QueryRoot::DbEntity(entity) => write!(f, "db entity {}", entity.name),
            QueryRoot::DataMap(map) => write!(f, "data map {}", map.name),
            QueryRoot::Object(object) => write!(f, "instance of {}", object.entity_name()),
        }
    }
}

impl From<&str> for QueryRoot {
    fn from(name: &str) -> Self {
        QueryRoot::EntityName(name.to_string())
    }
}

impl From<ObjEntity> for QueryRoot {
    fn from(entity: ObjEntity) -> Self {
        QueryRoot::ObjEntity(Arc::new(entity))
    }
}

impl From<DbEntity> for QueryRoot {
    fn from(entity: DbEntity) -> Self {
        QueryRoot::DbEntity(Arc::new(entity))
    }
}

/// Entity metadata a root resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub obj_entity: Option<ObjEntity>,
    pub db_entity: Option<DbEntity>,
    pub data_map: Option<Arc<DataMap>>,
}

impl ResolvedEntity {
    fn for_obj_entity(resolver: &EntityResolver, entity: ObjEntity) -> Result<Self> {
        let db_entity = resolver.require_db_entity(&entity.db_entity)?.clone();
        let data_map = resolver.data_map_for_obj_entity(&entity.name).cloned();
        Ok(Self {
            obj_entity: Some(entity),
            db_entity: Some(db_entity),
            data_map,
        })
    }

    /// Name used in cache keys and execution requests: the object entity,
    /// else the table, else the data map.
    pub fn name(&self) -> &str {
        if let Some(entity) = &self.obj_entity {
            &entity.name
        } else if let Some(entity) = &self.db_entity {
            &entity.name
        } else if let Some(map) = &self.data_map {
            &map.name
        } else {
            ""
        }
    }
}
