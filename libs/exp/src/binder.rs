//! Parameter binding and copy-on-transform rewriting
//!
//! [`transform`] walks a tree pre-order and rebuilds it, letting a mapper
//! keep, replace or prune each node. Pruning propagates upward:
//!
//! - `and`/`or` drop pruned operands, collapse to their only remaining
//!   operand, and are pruned when none remain;
//! - every other node is pruned when any of its children is.
//!
//! The input tree is never modified.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::trace;

use crate::ast::Expression;
use crate::error::{Error, Result};
use crate::value::Value;

/// Outcome of the node mapper passed to [`transform`].
#[derive(Debug)]
pub enum Transformed {
    /// Keep the node and continue into its children.
    Keep,
    /// Use this node instead. Its children are not visited.
    Replace(Expression),
    /// Remove the node.
    Prune,
}

/// Rebuild `expr` through `f`. Returns `None` if the whole tree is pruned.
pub fn transform<F>(expr: &Expression, f: &mut F) -> Result<Option<Expression>>
where
    F: FnMut(&Expression) -> Result<Transformed>,
{
    match f(expr)? {
        Transformed::Prune => return Ok(None),
        Transformed::Replace(replacement) => return Ok(Some(replacement)),
        Transformed::Keep => {}
    }

    let rebuilt = match expr {
        Expression::Literal(_) | Expression::Parameter(_) | Expression::Path(_) => {
            Some(expr.clone())
        }
        Expression::Unary { op, operand } => {
            transform(operand, f)?.map(|operand| Expression::unary(*op, operand))
        }
        Expression::Binary { op, left, right } => {
            match (transform(left, f)?, transform(right, f)?) {
                (Some(left), Some(right)) => Some(Expression::binary(*op, left, right)),
                _ => None,
            }
        }
        Expression::Nary { op, operands } if op.is_connective() => {
            let mut kept = Vec::with_capacity(operands.len());
            for operand in operands {
                if let Some(operand) = transform(operand, f)? {
                    kept.push(operand);
                }
            }
            match kept.len() {
                0 => None,
                1 => kept.pop(),
                _ => Some(Expression::Nary {
                    op: *op,
                    operands: kept,
                }),
            }
        }
        Expression::Nary { op, operands } => {
            transform_all(operands, f)?.map(|operands| Expression::Nary { op: *op, operands })
        }
        Expression::Function { name, args } => {
            transform_all(args, f)?.map(|args| Expression::function(name.clone(), args))
        }
        Expression::CaseWhen {
            conditions,
            results,
            default,
        } => {
            let conditions = transform_all(conditions, f)?;
            let results = transform_all(results, f)?;
            let default = match default {
                Some(default) => match transform(default, f)? {
                    Some(default) => Some(Some(Box::new(default))),
                    None => None,
                },
                None => Some(None),
            };
            match (conditions, results, default) {
                (Some(conditions), Some(results), Some(default)) => Some(Expression::CaseWhen {
                    conditions,
                    results,
                    default,
                }),
                _ => None,
            }
        }
    };
    Ok(rebuilt)
}

/// Transform every item; `None` if any item was pruned.
fn transform_all<F>(items: &[Expression], f: &mut F) -> Result<Option<Vec<Expression>>>
where
    F: FnMut(&Expression) -> Result<Transformed>,
{
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match transform(item, f)? {
            Some(item) => out.push(item),
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

/// Literal node for a bound value. Lists expand into list literals.
fn bound_expression(value: &Value) -> Expression {
    match value {
        Value::List(items) => Expression::list(items.iter().cloned().map(Expression::Literal).collect()),
        other => Expression::Literal(other.clone()),
    }
}

/// Bind named parameters.
///
/// A missing required parameter is an error unless `prune_missing` is set,
/// in which case the part of the tree that depends on it is pruned.
/// Optional parameters are always pruned when missing. Returns `None` when
/// nothing is left.
pub fn params<S: BuildHasher>(
    expr: &Expression,
    values: &HashMap<String, Value, S>,
    prune_missing: bool,
) -> Result<Option<Expression>> {
    let bound = transform(expr, &mut |node| match node {
        Expression::Parameter(p) => match values.get(&p.name) {
            Some(value) => Ok(Transformed::Replace(bound_expression(value))),
            None if prune_missing || !p.required => {
                trace!(parameter = %p.name, "pruning unbound parameter");
                Ok(Transformed::Prune)
            }
            None => Err(Error::MissingParameterError(p.name.clone())),
        },
        _ => Ok(Transformed::Keep),
    })?;
    trace!(bound = values.len(), pruned = bound.is_none(), "bound named parameters");
    Ok(bound)
}

/// Bind parameters by position. The first occurrence of each distinct name
/// takes the next value; repeated names reuse it.
pub fn params_positional(expr: &Expression, values: &[Value]) -> Result<Expression> {
    let names = expr.parameter_names();
    if values.len() < names.len() {
        return Err(Error::ParameterCountError(format!(
            "Too few parameters to bind expression: {} given, {} needed",
            values.len(),
            names.len()
        )));
    }
    if values.len() > names.len() {
        return Err(Error::ParameterCountError(format!(
            "Too many parameters to bind expression: {} given, {} needed",
            values.len(),
            names.len()
        )));
    }

    let map: HashMap<String, Value> = names.into_iter().zip(values.iter().cloned()).collect();
    params(expr, &map, false)?.ok_or_else(|| {
        Error::StructureError("positional binding removed the whole expression".into())
    })
}

/// Remove every node for which `prune` returns true, with the same
/// propagation rules as parameter pruning.
pub fn prune<P>(expr: &Expression, mut prune: P) -> Result<Option<Expression>>
where
    P: FnMut(&Expression) -> bool,
{
    transform(expr, &mut |node| {
        Ok(if prune(node) {
            Transformed::Prune
        } else {
            Transformed::Keep
        })
    })
}
