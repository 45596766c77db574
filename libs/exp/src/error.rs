use thiserror::Error;

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing, binding, translating or evaluating
/// expressions. All of them are deterministic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        position: usize,
        line: usize,
        column: usize,
    },

    #[error("Malformed path '{path}': {reason}")]
    MalformedPathError { path: String, reason: String },

    #[error("Invalid expression structure: {0}")]
    StructureError(String),

    #[error("Missing required parameter: ${0}")]
    MissingParameterError(String),

    #[error("{0}")]
    ParameterCountError(String),

    #[error("Can't resolve path component '{segment}' in entity '{entity}'")]
    UnresolvableRelationshipError { segment: String, entity: String },

    #[error("Can't resolve attribute '{attribute}' in entity '{entity}'")]
    UnresolvableAttributeError { attribute: String, entity: String },

    #[error("{construct} can't be translated to {target}")]
    UnsupportedTranslationError { construct: String, target: String },

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Lock poisoned: {0}")]
    LockError(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, position: usize, line: usize, column: usize) -> Self {
        Error::ParseError {
            message: message.into(),
            position,
            line,
            column,
        }
    }

    pub(crate) fn malformed_path(path: &str, reason: impl Into<String>) -> Self {
        Error::MalformedPathError {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>, target: &str) -> Self {
        Error::UnsupportedTranslationError {
            construct: construct.into(),
            target: target.to_string(),
        }
    }
}

impl From<cinnabar_map::Error> for Error {
    fn from(err: cinnabar_map::Error) -> Self {
        match err {
            cinnabar_map::Error::RelationshipNotFound {
                entity,
                relationship,
            }
            | cinnabar_map::Error::ReverseRelationshipNotFound {
                entity,
                relationship,
            } => Error::UnresolvableRelationshipError {
                segment: relationship,
                entity,
            },
            cinnabar_map::Error::AttributeNotFound { entity, attribute } => {
                Error::UnresolvableAttributeError { attribute, entity }
            }
            other => Error::MappingError(other.to_string()),
        }
    }
}
