use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cinnabar_exp::{
    evaluate, params, parse as parse_expression, to_ejbql, to_ejbql_with_params,
    translate_to_db_path, translate_to_related_entity, DataRow, Value,
};
use cinnabar_map::{DataMap, EntityResolver};
use cinnabar_query::{
    InMemoryExecutor, Ordering, QueryCacheStrategy, QueryConfig, QueryEngine, SelectQuery,
    SortOrder,
};
use tracing::{debug, info};

/// Arguments shared by the commands that build a [`SelectQuery`].
pub struct QueryArgs<'a> {
    pub maps: &'a [PathBuf],
    pub entity: &'a str,
    pub expression: Option<&'a str>,
    pub params: Vec<(String, Value)>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

pub fn load_resolver(paths: &[PathBuf]) -> Result<Arc<EntityResolver>> {
    let maps = paths
        .iter()
        .map(|path| {
            let map = DataMap::from_file(path)
                .with_context(|| format!("Failed to load data map {}", path.display()))?;
            info!(map = %map.name, path = %path.display(), "loaded data map");
            Ok(map)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(EntityResolver::new(maps)))
}

fn read_json(arg: &str) -> Result<serde_json::Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Invalid JSON")
}

fn row_json(row: &DataRow) -> serde_json::Value {
    let columns = row
        .columns()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(columns)
}

pub fn parse(expression: &str, tree: bool) -> Result<String> {
    let expr = parse_expression(expression)?;
    Ok(if tree {
        format!("{:#?}", expr)
    } else {
        expr.to_string()
    })
}

pub fn eval(config: &QueryConfig, expression: &str, object: &str) -> Result<String> {
    let expr = parse_expression(expression)?;
    let root = Value::from_json(read_json(object)?);
    let value = evaluate(&expr, &root, &config.eval_context())?;
    Ok(value.to_json().to_string())
}

pub fn bind(expression: &str, values: Vec<(String, Value)>, prune_missing: bool) -> Result<String> {
    let expr = parse_expression(expression)?;
    let values: HashMap<String, Value> = values.into_iter().collect();
    Ok(match params(&expr, &values, prune_missing)? {
        Some(bound) => bound.to_string(),
        None => String::new(),
    })
}

pub fn translate(maps: &[PathBuf], entity: &str, expression: &str, via: Option<&str>) -> Result<String> {
    let resolver = load_resolver(maps)?;
    let expr = parse_expression(expression)?;
    let translated = match via {
        Some(path) => translate_to_related_entity(resolver.as_ref(), entity, &expr, path)?,
        None => translate_to_db_path(resolver.as_ref(), entity, &expr)?,
    };
    Ok(translated.to_string())
}

pub fn ejbql(expression: &str, root_id: &str, positional: bool) -> Result<String> {
    let expr = parse_expression(expression)?;
    if !positional {
        return Ok(to_ejbql(&expr, root_id)?);
    }
    let mut bindings = Vec::new();
    let clause = to_ejbql_with_params(&expr, root_id, &mut bindings)?;
    let mut out = clause;
    for (i, value) in bindings.iter().enumerate() {
        out.push_str(&format!("\n?{} = {}", i + 1, value));
    }
    Ok(out)
}

fn build_query(engine: &QueryEngine, args: &QueryArgs<'_>) -> Result<SelectQuery> {
    let mut query = match args.expression {
        Some(text) => engine.query_where(args.entity, text)?,
        None => engine.query(args.entity),
    };
    if let Some(offset) = args.offset {
        query = query.offset(offset);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if !args.params.is_empty() {
        let values: HashMap<String, Value> = args.params.iter().cloned().collect();
        query = engine.bind(&query, &values)?;
    }
    Ok(query)
}

pub fn cache_key(
    config: &QueryConfig,
    args: QueryArgs<'_>,
    strategy: Option<QueryCacheStrategy>,
    name: Option<String>,
    data_rows: bool,
) -> Result<String> {
    let engine = QueryEngine::new(load_resolver(args.maps)?, config.clone());
    let mut query = build_query(&engine, &args)?
        .cache(strategy.unwrap_or(QueryCacheStrategy::LocalCache))
        .fetch_data_rows(data_rows);
    if let Some(name) = name {
        query = query.name(name);
    }
    let metadata = query.metadata(engine.resolver())?;
    debug!(strategy = %metadata.cache_strategy, "computed query metadata");
    metadata
        .cache_key()?
        .ok_or_else(|| anyhow!("Queries with cache strategy '{}' have no cache key", metadata.cache_strategy))
}

fn load_rows(path: &Path, executor: InMemoryExecutor) -> Result<InMemoryExecutor> {
    let json: BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>> = serde_json::from_str(
        &fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
    )
    .with_context(|| format!("{} must map table names to arrays of rows", path.display()))?;

    let mut executor = executor;
    for (table, rows) in json {
        let rows = rows.into_iter().map(|columns| {
            columns
                .into_iter()
                .fold(DataRow::new(table.as_str()), |row, (column, value)| {
                    row.with(column, Value::from_json(value))
                })
        });
        executor = executor.with_rows(&table, rows)?;
    }
    Ok(executor)
}

pub fn select(
    config: &QueryConfig,
    args: QueryArgs<'_>,
    rows: &Path,
    orderings: Vec<(String, SortOrder)>,
) -> Result<String> {
    let engine = QueryEngine::new(load_resolver(args.maps)?, config.clone());
    let executor = InMemoryExecutor::new(engine.eval_context())
        .with_catalog(Arc::clone(engine.resolver()));
    let executor = load_rows(rows, executor)?;

    let mut query = build_query(&engine, &args)?;
    for (path, order) in orderings {
        query = query.order_by(Ordering::new(&path, order)?);
    }

    let result = engine.select(&query, &executor)?;
    info!(rows = result.len(), "select finished");
    let rows = result.iter().map(row_json).collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&rows)?)
}
