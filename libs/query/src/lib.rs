//! Select queries over mapped entities
//!
//! Resolves query roots against the mapping catalog, derives result cache
//! keys, manages prefetch trees and hands planned requests to an execution
//! layer through [`QueryExecutor`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod ordering;
pub mod prefetch;
pub mod root;
pub mod select;

pub use cache::{CacheKeyParts, QueryCacheStrategy};
pub use config::QueryConfig;
pub use engine::QueryEngine;
pub use error::{Error, Result};
pub use executor::{ExecutionRequest, InMemoryExecutor, QueryExecutor};
pub use metadata::{QueryDescriptor, QueryMetadata};
pub use ordering::{order_list, sort_by_orderings, Ordering, SortOrder};
pub use prefetch::{PrefetchProcessor, PrefetchSemantics, PrefetchTreeNode};
pub use root::{QueryRoot, ResolvedEntity};
pub use select::{SelectQuery, EJBQL_ROOT_ID};
