//! Execution-layer seam
//!
//! A [`QueryExecutor`] receives a fully planned request: the qualifier with
//! db paths, the EJBQL rendering with its positional bindings, orderings and
//! paging. [`InMemoryExecutor`] runs requests against rows held in memory.
//!
//! Multi-segment db paths (`db:toArtist.ARTIST_NAME`) need a catalog: each
//! relationship hop follows the relationship's joins into the target
//! table's rows. A to-one hop with no matching row reads as an empty list,
//! so no comparison over it holds.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use cinnabar_exp::eval::operations::values_equal;
use cinnabar_exp::{matches, DataRow, EvalContext, Expression, GraphNode, Path, Value};
use cinnabar_map::{DbJoin, EntityResolver, MappingCatalog};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ordering::{sort_by_orderings, Ordering};

#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Name of the resolved root entity.
    pub entity: String,
    /// Table to read from.
    pub db_entity: Option<String>,
    /// Qualifier over db paths.
    pub qualifier: Option<Expression>,
    /// `select` statement with `?N` placeholders.
    pub ejbql: Option<String>,
    /// Placeholder values, `bindings[n - 1]` for `?n`.
    pub bindings: Vec<Value>,
    /// Orderings over db paths.
    pub orderings: Vec<Ordering>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub fetch_data_rows: bool,
}

pub trait QueryExecutor: Send + Sync {
    fn execute(&self, request: &ExecutionRequest) -> Result<Vec<DataRow>>;
}

type Tables = HashMap<String, Vec<Arc<DataRow>>>;

/// Rows grouped by table name.
#[derive(Debug, Default)]
pub struct InMemoryExecutor {
    tables: RwLock<Tables>,
    catalog: Option<Arc<EntityResolver>>,
    ctx: EvalContext,
}

impl InMemoryExecutor {
    pub fn new(ctx: EvalContext) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            catalog: None,
            ctx,
        }
    }

    /// Resolve relationship hops in db paths through `catalog`.
    pub fn with_catalog(mut self, catalog: Arc<EntityResolver>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn insert(&self, table: &str, row: DataRow) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| Error::Lock(format!("in-memory tables: {}", e)))?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(Arc::new(row));
        Ok(())
    }

    pub fn with_rows<I>(self, table: &str, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = DataRow>,
    {
        for row in rows {
            self.insert(table, row)?;
        }
        Ok(self)
    }

    fn snapshot(&self) -> Result<Tables> {
        let tables = self
            .tables
            .read()
            .map_err(|e| Error::Lock(format!("in-memory tables: {}", e)))?;
        Ok(tables.clone())
    }

    /// Fails on relationship hops this executor can't follow.
    fn check_path(&self, table: &str, path: &Path) -> Result<()> {
        if !path.is_db() || path.len() < 2 {
            return Ok(());
        }
        let Some(catalog) = &self.catalog else {
            return Err(Error::UnsupportedQualifier(format!(
                "'{}' crosses a relationship and no catalog is attached",
                path
            )));
        };
        let mut entity = table.to_string();
        for segment in &path.segments()[..path.len() - 1] {
            let relationship = catalog
                .db_entity(&entity)
                .and_then(|e| e.relationship(&segment.name))
                .ok_or_else(|| {
                    Error::UnsupportedQualifier(format!(
                        "'{}': no relationship '{}' on {}",
                        path, segment.name, entity
                    ))
                })?;
            entity = relationship.target.clone();
        }
        Ok(())
    }
}

/// Tables and catalog shared by every row of one execution.
struct JoinScope {
    tables: Tables,
    catalog: Option<Arc<EntityResolver>>,
}

impl fmt::Debug for JoinScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinScope")
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A row that resolves db relationship names to the rows they join.
#[derive(Debug)]
struct JoinedRow {
    table: String,
    row: Arc<DataRow>,
    scope: Arc<JoinScope>,
}

impl JoinedRow {
    fn value(table: &str, row: &Arc<DataRow>, scope: &Arc<JoinScope>) -> Value {
        Value::Object(Arc::new(JoinedRow {
            table: table.to_string(),
            row: Arc::clone(row),
            scope: Arc::clone(scope),
        }))
    }
}

fn joined(source: &DataRow, target: &DataRow, joins: &[DbJoin]) -> bool {
    !joins.is_empty()
        && joins.iter().all(|join| {
            match (source.get(&join.source), target.get(&join.target)) {
                (Some(a), Some(b)) if !a.is_null() && !b.is_null() => values_equal(a, b),
                _ => false,
            }
        })
}

impl GraphNode for JoinedRow {
    fn entity_name(&self) -> &str {
        self.row.entity_name()
    }

    fn property(&self, name: &str) -> Value {
        self.row.property(name)
    }

    fn db_property(&self, name: &str) -> Value {
        if let Some(value) = self.row.get(name) {
            return value.clone();
        }
        let relationship = self
            .scope
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.db_entity(&self.table))
            .and_then(|entity| entity.relationship(name));
        let Some(relationship) = relationship else {
            return Value::Null;
        };

        let mut related: Vec<Value> = self
            .scope
            .tables
            .get(&relationship.target)
            .map(|rows| {
                rows.iter()
                    .filter(|target| joined(&self.row, target, &relationship.joins))
                    .map(|target| JoinedRow::value(&relationship.target, target, &self.scope))
                    .collect()
            })
            .unwrap_or_default();

        if !relationship.to_many && related.len() == 1 {
            return related.remove(0);
        }
        Value::List(related)
    }
}

impl QueryExecutor for InMemoryExecutor {
    fn execute(&self, request: &ExecutionRequest) -> Result<Vec<DataRow>> {
        let table = request
            .db_entity
            .as_deref()
            .unwrap_or(request.entity.as_str());
        let paths = request
            .qualifier
            .iter()
            .chain(request.orderings.iter().map(|o| &o.expression))
            .flat_map(Expression::paths);
        for path in paths {
            self.check_path(table, path)?;
        }

        let scope = Arc::new(JoinScope {
            tables: self.snapshot()?,
            catalog: self.catalog.clone(),
        });
        let rows = scope.tables.get(table).cloned().unwrap_or_default();
        let scanned = rows.len();
        let as_value = |row: &Arc<DataRow>| JoinedRow::value(table, row, &scope);

        let mut selected = Vec::with_capacity(rows.len());
        for row in rows {
            let keep = match &request.qualifier {
                Some(qualifier) => matches(qualifier, &as_value(&row), &self.ctx)?,
                None => true,
            };
            if keep {
                selected.push(row);
            }
        }

        let sorted = sort_by_orderings(selected, &request.orderings, &self.ctx, as_value)?;
        let page: Vec<DataRow> = sorted
            .into_iter()
            .skip(request.offset.unwrap_or(0))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|row| (*row).clone())
            .collect();

        debug!(table, scanned, returned = page.len(), "executed in memory");
        Ok(page)
    }
}
