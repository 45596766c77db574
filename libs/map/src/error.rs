//! Error types for the mapping catalog

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Attribute '{attribute}' not found in entity '{entity}'")]
    AttributeNotFound { entity: String, attribute: String },

    #[error("Relationship '{relationship}' not found in entity '{entity}'")]
    RelationshipNotFound {
        entity: String,
        relationship: String,
    },

    #[error("No reverse relationship for '{relationship}' in entity '{entity}'")]
    ReverseRelationshipNotFound {
        entity: String,
        relationship: String,
    },

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
