//! Mapping catalog for the object-relational expression engine
//!
//! Describes how domain entities map onto tables: object entities with their
//! attributes and relationships, db entities with columns and foreign-key
//! joins. The catalog is consumed read-only through [`MappingCatalog`].

pub mod data_map;
pub mod db;
pub mod entity;
pub mod error;
pub mod resolver;

pub use data_map::DataMap;
pub use db::{DbAttribute, DbEntity, DbJoin, DbRelationship};
pub use entity::{ObjAttribute, ObjEntity, ObjRelationship};
pub use error::{Error, Result};
pub use resolver::{EntityResolver, MappingCatalog, RelationshipInfo, StorageColumn};
