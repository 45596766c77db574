//! Query engine
//!
//! Ties a mapping catalog, a [`QueryConfig`] and a shared expression cache
//! together. Queries created through the engine pick up its defaults.

use std::collections::HashMap;
use std::sync::Arc;

use cinnabar_exp::{filter, DataRow, EvalContext, Expression, ExpressionCache, Value};
use cinnabar_map::EntityResolver;

use crate::config::QueryConfig;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::root::QueryRoot;
use crate::select::SelectQuery;

pub struct QueryEngine {
    resolver: Arc<EntityResolver>,
    config: QueryConfig,
    expressions: ExpressionCache,
}

impl QueryEngine {
    pub fn new(resolver: Arc<EntityResolver>, config: QueryConfig) -> Self {
        let expressions = ExpressionCache::new(config.expression_cache_capacity);
        Self {
            resolver,
            config,
            expressions,
        }
    }

    pub fn resolver(&self) -> &Arc<EntityResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn eval_context(&self) -> EvalContext {
        self.config.eval_context()
    }

    /// Parse through the shared cache.
    pub fn parse(&self, text: &str) -> Result<Arc<Expression>> {
        Ok(self.expressions.get_or_parse(text)?)
    }

    /// A query over `root` with the configured cache strategy.
    pub fn query(&self, root: impl Into<QueryRoot>) -> SelectQuery {
        SelectQuery::new(root).cache(self.config.cache_strategy)
    }

    /// A query over `root` qualified by `qualifier`.
    pub fn query_where(&self, root: impl Into<QueryRoot>, qualifier: &str) -> Result<SelectQuery> {
        let qualifier = self.parse(qualifier)?;
        Ok(self.query(root).where_((*qualifier).clone()))
    }

    /// Bind parameters with the configured prune policy.
    pub fn bind(&self, query: &SelectQuery, values: &HashMap<String, Value>) -> Result<SelectQuery> {
        query.with_parameters_pruning(values, self.config.prune_missing_parameters)
    }

    pub fn select<E: QueryExecutor + ?Sized>(
        &self,
        query: &SelectQuery,
        executor: &E,
    ) -> Result<Vec<DataRow>> {
        query.select(executor, &self.resolver)
    }

    /// Filter objects in memory with a qualifier in text form.
    pub fn filter_objects(&self, qualifier: &str, objects: &[Value]) -> Result<Vec<Value>> {
        let expr = self.parse(qualifier)?;
        Ok(filter(&expr, objects, &self.eval_context())?)
    }

    pub fn cached_expressions(&self) -> usize {
        self.expressions.len()
    }
}
