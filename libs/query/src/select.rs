//! Select queries

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;

use cinnabar_exp::{params, to_ejbql_with_params, translate_to_db_path, DataRow, Expression, NaryOperator, Value};
use cinnabar_map::EntityResolver;
use tracing::{debug, trace};

use crate::cache::QueryCacheStrategy;
use crate::error::{Error, Result};
use crate::executor::{ExecutionRequest, QueryExecutor};
use crate::metadata::{QueryDescriptor, QueryMetadata};
use crate::ordering::Ordering;
use crate::prefetch::{PrefetchSemantics, PrefetchTreeNode};
use crate::root::{QueryRoot, ResolvedEntity};

/// Identification variable used for the root in rendered EJBQL.
pub const EJBQL_ROOT_ID: &str = "o";

/// A query selecting objects or rows of one root.
///
/// Built by chaining; every setter returns the updated query. Cloning a
/// query copies its prefetch tree, so derived queries can be changed
/// independently.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    root: QueryRoot,
    name: Option<String>,
    qualifier: Option<Expression>,
    orderings: Vec<Ordering>,
    parameters: BTreeMap<String, Value>,
    metadata: QueryMetadata,
}

fn combine(op: NaryOperator, existing: Option<Expression>, extra: Expression) -> Expression {
    match existing {
        None => extra,
        Some(Expression::Nary {
            op: inner,
            mut operands,
        }) if inner == op => {
            operands.push(extra);
            Expression::Nary { op, operands }
        }
        Some(existing) => Expression::Nary {
            op,
            operands: vec![existing, extra],
        },
    }
}

impl SelectQuery {
    pub fn new(root: impl Into<QueryRoot>) -> Self {
        Self {
            root: root.into(),
            name: None,
            qualifier: None,
            orderings: Vec::new(),
            parameters: BTreeMap::new(),
            metadata: QueryMetadata::new(),
        }
    }

    fn changed(mut self) -> Self {
        self.metadata.invalidate();
        self
    }

    /// Replace the qualifier.
    pub fn where_(mut self, qualifier: Expression) -> Self {
        self.qualifier = Some(qualifier);
        self.changed()
    }

    /// `and` the qualifier with `qualifier`.
    pub fn and_qualifier(mut self, qualifier: Expression) -> Self {
        self.qualifier = Some(combine(NaryOperator::And, self.qualifier.take(), qualifier));
        self.changed()
    }

    /// `or` the qualifier with `qualifier`.
    pub fn or_qualifier(mut self, qualifier: Expression) -> Self {
        self.qualifier = Some(combine(NaryOperator::Or, self.qualifier.take(), qualifier));
        self.changed()
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self.changed()
    }

    /// Fetch the relationship at `path` along with the results.
    pub fn prefetch(mut self, path: &str, semantics: PrefetchSemantics) -> Self {
        let tree = self
            .metadata
            .prefetch_tree
            .get_or_insert_with(PrefetchTreeNode::new_root);
        let node = tree.add_path(path);
        node.phantom = false;
        node.semantics = semantics;
        self.changed()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.metadata.fetch_limit = Some(limit);
        self.changed()
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.metadata.fetch_offset = Some(offset);
        self.changed()
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.metadata.page_size = Some(page_size);
        self
    }

    pub fn fetch_data_rows(mut self, fetch_data_rows: bool) -> Self {
        self.metadata.fetch_data_rows = fetch_data_rows;
        self.changed()
    }

    pub fn cache(mut self, strategy: QueryCacheStrategy) -> Self {
        self.metadata.cache_strategy = strategy;
        self.changed()
    }

    pub fn cache_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.cache_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Name the query. A named query caches under its name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.changed()
    }

    /// Copy of this query with parameters bound. Parts of the qualifier
    /// that depend on missing parameters are pruned.
    pub fn with_parameters<S: BuildHasher>(&self, values: &HashMap<String, Value, S>) -> Result<Self> {
        self.with_parameters_pruning(values, true)
    }

    /// Copy of this query with parameters bound. With `prune_missing` off, a
    /// missing required parameter is an error.
    pub fn with_parameters_pruning<S: BuildHasher>(
        &self,
        values: &HashMap<String, Value, S>,
        prune_missing: bool,
    ) -> Result<Self> {
        let mut bound = self.clone();
        if let Some(qualifier) = &self.qualifier {
            bound.qualifier = params(qualifier, values, prune_missing)?;
            trace!(
                qualifier = %qualifier,
                pruned = bound.qualifier.is_none(),
                "bound query parameters"
            );
        }
        bound
            .parameters
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(bound.changed())
    }

    pub fn root(&self) -> &QueryRoot {
        &self.root
    }

    pub fn qualifier(&self) -> Option<&Expression> {
        self.qualifier.as_ref()
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn query_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn descriptor(&self) -> QueryDescriptor<'_> {
        QueryDescriptor {
            name: self.name.as_deref(),
            qualifier: self.qualifier.as_ref(),
            parameters: &self.parameters,
            orderings: &self.orderings,
        }
    }

    /// Resolved metadata. Resolution is memoized on this query, so
    /// repeated calls with the same catalog share the resolved entity.
    pub fn metadata(&self, resolver: &Arc<EntityResolver>) -> Result<QueryMetadata> {
        self.metadata.resolve(&self.root, resolver, self.descriptor())?;
        Ok(self.metadata.clone())
    }

    fn to_db(&self, resolved: &ResolvedEntity, resolver: &EntityResolver, expr: &Expression) -> Result<Expression> {
        match &resolved.obj_entity {
            Some(entity) => Ok(translate_to_db_path(resolver, &entity.name, expr)?),
            None => Ok(expr.clone()),
        }
    }

    /// Build the request an executor receives.
    pub fn plan(&self, resolver: &Arc<EntityResolver>) -> Result<ExecutionRequest> {
        let metadata = self.metadata(resolver)?;
        let resolved = metadata
            .resolved()?
            .ok_or_else(|| Error::UnresolvableRoot(self.root.to_string()))?;

        let mut bindings = Vec::new();
        let (qualifier, ejbql) = match &self.qualifier {
            Some(qualifier) => {
                let translated = self.to_db(&resolved, resolver, qualifier)?;
                let clause = to_ejbql_with_params(qualifier, EJBQL_ROOT_ID, &mut bindings)?;
                (Some(translated), Some(clause))
            }
            None => (None, None),
        };
        let ejbql = format!(
            "select {root} from {entity} {root}{clause}",
            root = EJBQL_ROOT_ID,
            entity = resolved.name(),
            clause = ejbql.map(|c| format!(" where {}", c)).unwrap_or_default()
        );

        let orderings = self
            .orderings
            .iter()
            .map(|ordering| {
                Ok(Ordering {
                    expression: self.to_db(&resolved, resolver, &ordering.expression)?,
                    order: ordering.order,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutionRequest {
            entity: resolved.name().to_string(),
            db_entity: resolved.db_entity.as_ref().map(|e| e.name.clone()),
            qualifier,
            ejbql: Some(ejbql),
            bindings,
            orderings,
            limit: metadata.fetch_limit,
            offset: metadata.fetch_offset,
            fetch_data_rows: metadata.fetch_data_rows,
        })
    }

    /// Run the query through `executor`.
    pub fn select<E: QueryExecutor + ?Sized>(
        &self,
        executor: &E,
        resolver: &Arc<EntityResolver>,
    ) -> Result<Vec<DataRow>> {
        let request = self.plan(resolver)?;
        debug!(
            entity = %request.entity,
            ejbql = request.ejbql.as_deref().unwrap_or_default(),
            bindings = request.bindings.len(),
            "executing select"
        );
        executor.execute(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinnabar_exp::parse;

    #[test]
    fn test_qualifiers_chain() {
        let query = SelectQuery::new("Artist")
            .where_(parse("a = 1").unwrap())
            .and_qualifier(parse("b = 2").unwrap())
            .and_qualifier(parse("c = 3").unwrap());
        assert_eq!(query.qualifier().unwrap().to_string(), "a = 1 and b = 2 and c = 3");

        let query = query.or_qualifier(parse("d = 4").unwrap());
        assert_eq!(
            query.qualifier().unwrap().to_string(),
            "a = 1 and b = 2 and c = 3 or d = 4"
        );
    }

    #[test]
    fn test_with_parameters_prunes() {
        let query = SelectQuery::new("Artist").where_(parse("a = $x and b = $y").unwrap());
        let mut values = HashMap::new();
        values.insert("x".to_string(), Value::Int(1));
        let bound = query.with_parameters(&values).unwrap();
        assert_eq!(bound.qualifier().unwrap().to_string(), "a = 1");
        assert_eq!(bound.parameters().get("x"), Some(&Value::Int(1)));
        assert_eq!(query.qualifier().unwrap().to_string(), "a = $x and b = $y");

        assert!(query.with_parameters_pruning(&values, false).is_err());
    }

    #[test]
    fn test_derived_prefetch_does_not_alias() {
        let base = SelectQuery::new("Artist").prefetch("paintingArray", PrefetchSemantics::Disjoint);
        let derived = base.clone().prefetch("paintingArray.toGallery", PrefetchSemantics::Joint);
        let base_tree = base.metadata.prefetch_tree.as_ref().unwrap();
        assert_eq!(base_tree.non_phantom_nodes().len(), 1);
        let derived_tree = derived.metadata.prefetch_tree.as_ref().unwrap();
        assert_eq!(derived_tree.non_phantom_nodes().len(), 2);
    }
}
