//! cinnabar - parse, evaluate and translate object-relational expressions

mod commands;
mod logging;
mod settings;

use std::path::PathBuf;

use anyhow::Context;
use cinnabar_exp::{NullInListPolicy, Value};
use cinnabar_query::{QueryCacheStrategy, SortOrder};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cinnabar", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./cinnabar.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `cinnabar_query=trace`
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// How `in` treats null list elements
    #[arg(long, global = true, value_parser = parse_null_policy)]
    null_in_list: Option<NullInListPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an expression and print its canonical form
    Parse {
        expression: String,
        /// Print the syntax tree instead
        #[arg(long)]
        tree: bool,
    },

    /// Evaluate an expression against a JSON object (inline or @file)
    Eval {
        expression: String,
        #[arg(long)]
        object: String,
    },

    /// Bind named parameters
    Bind {
        expression: String,
        #[command(flatten)]
        params: ParamArgs,
        /// Fail on missing parameters instead of pruning
        #[arg(long)]
        strict: bool,
    },

    /// Rewrite object paths into db paths, optionally relative to a related
    /// entity
    Translate {
        expression: String,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Relationship path to the entity the result should apply to
        #[arg(long)]
        via: Option<String>,
    },

    /// Render an expression as an EJBQL condition
    Ejbql {
        expression: String,
        #[arg(long, default_value = "o")]
        root_id: String,
        /// Replace literals with positional placeholders
        #[arg(long)]
        positional: bool,
    },

    /// Print the result cache key of a query
    CacheKey {
        expression: Option<String>,
        #[command(flatten)]
        catalog: CatalogArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        paging: PagingArgs,
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<QueryCacheStrategy>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        data_rows: bool,
    },

    /// Run a query against rows loaded from JSON (`{"TABLE": [{..}, ..]}`)
    Select {
        expression: Option<String>,
        #[command(flatten)]
        catalog: CatalogArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        paging: PagingArgs,
        /// Rows file
        #[arg(long)]
        rows: PathBuf,
        /// Sort key, `path` or `path:desc`
        #[arg(long = "order", value_parser = parse_order)]
        orderings: Vec<(String, SortOrder)>,
    },
}

#[derive(Args)]
struct CatalogArgs {
    /// Data map JSON file; repeat for several maps
    #[arg(long = "map", required = true)]
    maps: Vec<PathBuf>,
    /// Root entity
    #[arg(long)]
    entity: String,
}

#[derive(Args)]
struct ParamArgs {
    /// Parameter as `name=value`; the value is read as JSON, else as text
    #[arg(long = "param", value_parser = parse_param)]
    values: Vec<(String, Value)>,
}

#[derive(Args)]
struct PagingArgs {
    #[arg(long)]
    offset: Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
}

fn parse_param(text: &str) -> Result<(String, Value), String> {
    let (name, raw) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", text))?;
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(json),
        Err(_) => Value::String(raw.to_string()),
    };
    Ok((name.trim().to_string(), value))
}

fn parse_strategy(text: &str) -> Result<QueryCacheStrategy, String> {
    text.parse().map_err(|e: cinnabar_query::Error| e.to_string())
}

fn parse_null_policy(text: &str) -> Result<NullInListPolicy, String> {
    match text.to_ascii_lowercase().as_str() {
        "reject" => Ok(NullInListPolicy::Reject),
        "ignore" => Ok(NullInListPolicy::Ignore),
        other => Err(format!("expected 'reject' or 'ignore', got '{}'", other)),
    }
}

fn parse_order(text: &str) -> Result<(String, SortOrder), String> {
    let (path, direction) = match text.rsplit_once(':') {
        Some((path, direction)) if !path.is_empty() => (path, direction),
        _ => (text, "asc"),
    };
    let order = match direction.to_ascii_lowercase().as_str() {
        "asc" => SortOrder::Ascending,
        "desc" => SortOrder::Descending,
        "asci" => SortOrder::AscendingInsensitive,
        "desci" => SortOrder::DescendingInsensitive,
        other => return Err(format!("unknown sort direction '{}'", other)),
    };
    Ok((path.to_string(), order))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = settings::load_config(cli.config.as_deref())?;
    if let Some(filter) = cli.log_filter {
        config.log_filter = filter;
    }
    if cli.json_logs {
        config.json_logs = true;
    }
    if let Some(policy) = cli.null_in_list {
        config.null_in_list = policy;
    }

    logging::init_logging(&config.log_filter, config.json_logs)?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?config, "configuration loaded");

    let output = match cli.command {
        Command::Parse { expression, tree } => commands::parse(&expression, tree),
        Command::Eval { expression, object } => commands::eval(&config, &expression, &object),
        Command::Bind {
            expression,
            params,
            strict,
        } => commands::bind(
            &expression,
            params.values,
            !strict && config.prune_missing_parameters,
        ),
        Command::Translate {
            expression,
            catalog,
            via,
        } => commands::translate(&catalog.maps, &catalog.entity, &expression, via.as_deref()),
        Command::Ejbql {
            expression,
            root_id,
            positional,
        } => commands::ejbql(&expression, &root_id, positional),
        Command::CacheKey {
            expression,
            catalog,
            params,
            paging,
            strategy,
            name,
            data_rows,
        } => commands::cache_key(
            &config,
            commands::QueryArgs {
                maps: &catalog.maps,
                entity: &catalog.entity,
                expression: expression.as_deref(),
                params: params.values,
                offset: paging.offset,
                limit: paging.limit,
            },
            strategy,
            name,
            data_rows,
        ),
        Command::Select {
            expression,
            catalog,
            params,
            paging,
            rows,
            orderings,
        } => commands::select(
            &config,
            commands::QueryArgs {
                maps: &catalog.maps,
                entity: &catalog.entity,
                expression: expression.as_deref(),
                params: params.values,
                offset: paging.offset,
                limit: paging.limit,
            },
            &rows,
            orderings,
        ),
    }
    .context("Command failed")?;

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("x=5").unwrap(), ("x".to_string(), Value::Int(5)));
        assert_eq!(
            parse_param("name=Picasso").unwrap(),
            ("name".to_string(), Value::from("Picasso"))
        );
        assert_eq!(
            parse_param("ids=[1,2]").unwrap().1,
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(
            parse_order("paintingTitle").unwrap(),
            ("paintingTitle".to_string(), SortOrder::Ascending)
        );
        assert_eq!(
            parse_order("db:PRICE:desc").unwrap(),
            ("db:PRICE".to_string(), SortOrder::Descending)
        );
        assert!(parse_order("a:sideways").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
