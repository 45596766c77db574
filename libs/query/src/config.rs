//! Query engine configuration

use cinnabar_exp::{EvalContext, NullInListPolicy};
use serde::{Deserialize, Serialize};

use crate::cache::QueryCacheStrategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Strategy for queries that don't pick one.
    pub cache_strategy: QueryCacheStrategy,
    /// Prune the parts of a qualifier whose parameters are missing instead
    /// of failing.
    pub prune_missing_parameters: bool,
    pub null_in_list: NullInListPolicy,
    /// Parsed expressions kept in memory.
    pub expression_cache_capacity: usize,
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub json_logs: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_strategy: QueryCacheStrategy::NoCache,
            prune_missing_parameters: true,
            null_in_list: NullInListPolicy::default(),
            expression_cache_capacity: cinnabar_exp::cache::DEFAULT_CAPACITY,
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

impl QueryConfig {
    pub fn eval_context(&self) -> EvalContext {
        EvalContext::new().with_null_in_list(self.null_in_list)
    }
}
