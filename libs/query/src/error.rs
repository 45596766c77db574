//! Error types for query construction and metadata resolution

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Expression(#[from] cinnabar_exp::Error),

    #[error(transparent)]
    Mapping(#[from] cinnabar_map::Error),

    #[error("Can't resolve query root: {0}")]
    UnresolvableRoot(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Unsupported qualifier: {0}")]
    UnsupportedQualifier(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, Error>;
