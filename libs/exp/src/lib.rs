//! Expression engine for object-relational queries
//!
//! Qualifiers over mapped entities, written in a small expression language:
//!
//! ```text
//! Expression String
//!      |
//!   Lexer -> Parser -> AST
//!      |
//!   +-- Binder      (parameters, pruning)
//!   +-- Evaluator   (in-memory filtering)
//!   +-- Translator  (object paths -> db paths)
//!   +-- Serializers (canonical text, EJBQL)
//! ```

pub mod ast;
pub mod binder;
pub mod cache;
pub mod context;
pub mod ejbql;
pub mod error;
pub mod eval;
pub mod factory;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod token;
pub mod translator;
pub mod value;

// Re-export main types
pub use ast::{BinaryOperator, Expression, NaryOperator, ParameterRef, UnaryOperator};
pub use binder::{params, params_positional, prune, transform, Transformed};
pub use cache::ExpressionCache;
pub use context::{EvalContext, NullInListPolicy};
pub use ejbql::{to_ejbql, to_ejbql_with_params};
pub use error::{Error, Result};
pub use eval::{evaluate, filter, first, matches, resolve_path, Evaluator};
pub use parser::parse;
pub use path::{Path, PathNamespace, Segment};
pub use translator::{translate_to_db_path, translate_to_related_entity, PathTranslator};
pub use value::{DataObject, DataRow, EnumValue, GraphNode, ObjectId, Value};
