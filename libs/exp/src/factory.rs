//! Builder helpers
//!
//! Shorthands for assembling expressions in code. Object-layer helpers take
//! a path in its text form; the `*_db_exp` variants address storage paths
//! and take the path without its `db:` prefix.

use crate::ast::{BinaryOperator, Expression, NaryOperator, ParameterRef};
use crate::error::{Error, Result};
use crate::parser::parse;
use crate::path::{Path, PathNamespace};
use crate::value::Value;

fn obj_path(path: &str) -> Result<Expression> {
    Expression::path(path)
}

fn db_path(path: &str) -> Result<Expression> {
    let parsed = Path::parse(path)?;
    Ok(Expression::Path(parsed.with_namespace(PathNamespace::Db)))
}

/// Literal node. Lists become list literals so they can feed `in`.
fn operand(value: Value) -> Expression {
    match value {
        Value::List(items) => Expression::list(items.into_iter().map(Expression::Literal).collect()),
        other => Expression::Literal(other),
    }
}

fn comparison(op: BinaryOperator, path: Expression, value: impl Into<Value>) -> Expression {
    Expression::binary(op, path, operand(value.into()))
}

fn range(
    op: NaryOperator,
    path: Expression,
    low: impl Into<Value>,
    high: impl Into<Value>,
) -> Result<Expression> {
    Expression::nary(
        op,
        vec![path, Expression::Literal(low.into()), Expression::Literal(high.into())],
    )
}

fn membership<I, V>(op: BinaryOperator, path: Expression, values: I) -> Expression
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let items = values
        .into_iter()
        .map(|v| Expression::Literal(v.into()))
        .collect();
    Expression::binary(op, path, Expression::list(items))
}

/// `path = value`.
pub fn match_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::Equal, obj_path(path)?, value))
}

pub fn match_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::Equal, db_path(path)?, value))
}

/// `path != value`.
pub fn no_match_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::NotEqual, obj_path(path)?, value))
}

pub fn no_match_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::NotEqual, db_path(path)?, value))
}

pub fn less_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LessThan, obj_path(path)?, value))
}

pub fn less_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LessThan, db_path(path)?, value))
}

pub fn less_or_equal_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LessThanOrEqual, obj_path(path)?, value))
}

pub fn less_or_equal_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LessThanOrEqual, db_path(path)?, value))
}

pub fn greater_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::GreaterThan, obj_path(path)?, value))
}

pub fn greater_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::GreaterThan, db_path(path)?, value))
}

pub fn greater_or_equal_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::GreaterThanOrEqual, obj_path(path)?, value))
}

pub fn greater_or_equal_db_exp(path: &str, value: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::GreaterThanOrEqual, db_path(path)?, value))
}

pub fn like_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::Like, obj_path(path)?, pattern))
}

pub fn like_db_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::Like, db_path(path)?, pattern))
}

pub fn not_like_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::NotLike, obj_path(path)?, pattern))
}

pub fn like_ignore_case_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LikeIgnoreCase, obj_path(path)?, pattern))
}

pub fn like_ignore_case_db_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::LikeIgnoreCase, db_path(path)?, pattern))
}

pub fn not_like_ignore_case_exp(path: &str, pattern: impl Into<Value>) -> Result<Expression> {
    Ok(comparison(BinaryOperator::NotLikeIgnoreCase, obj_path(path)?, pattern))
}

/// `path in (values...)`. An empty list matches nothing.
pub fn in_exp<I, V>(path: &str, values: I) -> Result<Expression>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Ok(membership(BinaryOperator::In, obj_path(path)?, values))
}

pub fn in_db_exp<I, V>(path: &str, values: I) -> Result<Expression>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Ok(membership(BinaryOperator::In, db_path(path)?, values))
}

pub fn not_in_exp<I, V>(path: &str, values: I) -> Result<Expression>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Ok(membership(BinaryOperator::NotIn, obj_path(path)?, values))
}

pub fn between_exp(path: &str, low: impl Into<Value>, high: impl Into<Value>) -> Result<Expression> {
    range(NaryOperator::Between, obj_path(path)?, low, high)
}

pub fn between_db_exp(
    path: &str,
    low: impl Into<Value>,
    high: impl Into<Value>,
) -> Result<Expression> {
    range(NaryOperator::Between, db_path(path)?, low, high)
}

pub fn not_between_exp(
    path: &str,
    low: impl Into<Value>,
    high: impl Into<Value>,
) -> Result<Expression> {
    range(NaryOperator::NotBetween, obj_path(path)?, low, high)
}

/// `path = $name`, with an optional parameter when `required` is false.
pub fn match_parameter_exp(path: &str, name: &str, required: bool) -> Result<Expression> {
    let parameter = if required {
        ParameterRef::new(name)
    } else {
        ParameterRef::optional(name)
    };
    Ok(Expression::binary(
        BinaryOperator::Equal,
        obj_path(path)?,
        Expression::Parameter(parameter),
    ))
}

/// Conjunction of `path = value` for every entry.
pub fn match_all_exp<I, K, V>(pairs: I) -> Result<Expression>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let operands = pairs
        .into_iter()
        .map(|(path, value)| match_exp(path.as_ref(), value))
        .collect::<Result<Vec<_>>>()?;
    and_exp(operands)
}

/// Disjunction of `path = value` for every value.
pub fn match_any_exp<I, V>(path: &str, values: I) -> Result<Expression>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let operands = values
        .into_iter()
        .map(|value| match_exp(path, value))
        .collect::<Result<Vec<_>>>()?;
    or_exp(operands)
}

fn connective(op: NaryOperator, operands: Vec<Expression>) -> Result<Expression> {
    let mut flat = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Expression::Nary { op: inner, operands } if inner == op => flat.extend(operands),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => Err(Error::StructureError(format!(
            "{:?} needs at least one operand",
            op
        ))),
        1 => Ok(flat.remove(0)),
        _ => Expression::nary(op, flat),
    }
}

/// Join `operands` with `and`. Nested conjunctions are flattened and a
/// single operand is returned as is.
pub fn and_exp(operands: Vec<Expression>) -> Result<Expression> {
    connective(NaryOperator::And, operands)
}

/// Join `operands` with `or`, flattening nested disjunctions.
pub fn or_exp(operands: Vec<Expression>) -> Result<Expression> {
    connective(NaryOperator::Or, operands)
}

pub fn exp_true() -> Expression {
    Expression::literal(true)
}

pub fn exp_false() -> Expression {
    Expression::literal(false)
}

/// Parse `text` and bind its parameters positionally.
pub fn exp(text: &str, values: &[Value]) -> Result<Expression> {
    let parsed = parse(text)?;
    if values.is_empty() && parsed.parameter_names().is_empty() {
        return Ok(parsed);
    }
    crate::binder::params_positional(&parsed, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons_render_canonically() {
        assert_eq!(match_exp("artistName", "Picasso").unwrap().to_string(), "artistName = \"Picasso\"");
        assert_eq!(match_db_exp("ARTIST_NAME", Value::Null).unwrap().to_string(), "db:ARTIST_NAME = null");
        assert_eq!(greater_exp("estimatedPrice", 100).unwrap().to_string(), "estimatedPrice > 100");
        assert_eq!(
            between_exp("estimatedPrice", 1, 10).unwrap().to_string(),
            "estimatedPrice between 1 and 10"
        );
        assert_eq!(
            like_ignore_case_exp("artistName", "pic%").unwrap().to_string(),
            "artistName likeIgnoreCase \"pic%\""
        );
    }

    #[test]
    fn test_in_exp() {
        let expr = in_exp("artistName", ["a", "b"]).unwrap();
        assert_eq!(expr.to_string(), "artistName in (\"a\", \"b\")");
        let empty = in_exp("artistName", Vec::<Value>::new()).unwrap();
        assert_eq!(empty.to_string(), "artistName in ()");
    }

    #[test]
    fn test_connectives_flatten() {
        let a = match_exp("a", 1).unwrap();
        let b = match_exp("b", 2).unwrap();
        let c = match_exp("c", 3).unwrap();
        let ab = and_exp(vec![a.clone(), b]).unwrap();
        let abc = and_exp(vec![ab, c]).unwrap();
        assert_eq!(abc.to_string(), "a = 1 and b = 2 and c = 3");
        assert_eq!(and_exp(vec![a.clone()]).unwrap(), a);
        assert!(or_exp(vec![]).is_err());
    }

    #[test]
    fn test_match_any_and_all() {
        let any = match_any_exp("a", [1, 2]).unwrap();
        assert_eq!(any.to_string(), "a = 1 or a = 2");
        let all = match_all_exp([("a", 1), ("b", 2)]).unwrap();
        assert_eq!(all.to_string(), "a = 1 and b = 2");
    }

    #[test]
    fn test_exp_binds_positionally() {
        let expr = exp("a = $x and b = $y", &[Value::Int(1), Value::from("z")]).unwrap();
        assert_eq!(expr.to_string(), "a = 1 and b = \"z\"");
        assert!(exp("a = $x", &[]).is_err());
    }

    #[test]
    fn test_malformed_path() {
        assert!(matches!(match_exp("a..b", 1), Err(Error::MalformedPathError { .. })));
    }
}
