//! In-memory evaluation
//!
//! Evaluates an [`Expression`] against a root [`Value`], usually an object
//! implementing [`GraphNode`](crate::value::GraphNode).
//!
//! - Object-layer paths read `property`, `db:` paths read `db_property`.
//!   A to-many hop yields a list; further segments map over its elements
//!   and flatten. Null element values stay in the list, so
//!   `toMany.attr = null` holds when any element's `attr` is null.
//! - Logic is three-valued: `Null` is unknown. `matches` treats unknown as
//!   false.
//! - A comparison whose left side is a list and right side is a scalar is
//!   true if any element satisfies it.

pub mod functions;
pub mod operations;

use tracing::trace;

use crate::ast::{BinaryOperator, Expression, NaryOperator, UnaryOperator};
use crate::context::{EvalContext, NullInListPolicy};
use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::Value;

use operations::{any_of, values_equal};

pub struct Evaluator<'a> {
    ctx: &'a EvalContext,
}

/// Evaluate `expr` with `root` as the starting point of its paths.
pub fn evaluate(expr: &Expression, root: &Value, ctx: &EvalContext) -> Result<Value> {
    Evaluator::new(ctx).evaluate(expr, root)
}

/// Whether `expr` evaluates to true for `root`.
pub fn matches(expr: &Expression, root: &Value, ctx: &EvalContext) -> Result<bool> {
    Evaluator::new(ctx).matches(expr, root)
}

/// Objects for which `expr` is true, in input order.
pub fn filter(expr: &Expression, objects: &[Value], ctx: &EvalContext) -> Result<Vec<Value>> {
    let evaluator = Evaluator::new(ctx);
    let mut matched = Vec::new();
    for object in objects {
        if evaluator.matches(expr, object)? {
            matched.push(object.clone());
        }
    }
    trace!(total = objects.len(), matched = matched.len(), "filtered objects");
    Ok(matched)
}

/// First object for which `expr` is true.
pub fn first(expr: &Expression, objects: &[Value], ctx: &EvalContext) -> Result<Option<Value>> {
    let evaluator = Evaluator::new(ctx);
    for object in objects {
        if evaluator.matches(expr, object)? {
            return Ok(Some(object.clone()));
        }
    }
    Ok(None)
}

/// Walk `path` from `root`.
pub fn resolve_path(path: &Path, root: &Value) -> Value {
    let db = path.is_db();
    path.segments()
        .iter()
        .fold(root.clone(), |current, segment| step(&current, &segment.name, db))
}

fn step(value: &Value, name: &str, db: bool) -> Value {
    match value {
        Value::Object(node) => {
            if db {
                node.db_property(name)
            } else {
                node.property(name)
            }
        }
        Value::List(items) => {
            let mut out = Vec::new();
            for item in items {
                match step(item, name, db) {
                    Value::List(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            Value::List(out)
        }
        _ => Value::Null,
    }
}

fn negate_truth(value: Value) -> Value {
    match value {
        Value::Boolean(b) => Value::Boolean(!b),
        other => other,
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a EvalContext) -> Self {
        Self { ctx }
    }

    pub fn matches(&self, expr: &Expression, root: &Value) -> Result<bool> {
        match self.evaluate(expr, root)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::EvaluationError(format!(
                "Expected a boolean condition, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn evaluate(&self, expr: &Expression, root: &Value) -> Result<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(p) => Err(Error::EvaluationError(format!(
                "Unbound parameter ${}",
                p.name
            ))),
            Expression::Path(path) => Ok(resolve_path(path, root)),
            Expression::Unary { op, operand } => {
                let value = self.evaluate(operand, root)?;
                match op {
                    UnaryOperator::Not => match value {
                        Value::Boolean(b) => Ok(Value::Boolean(!b)),
                        Value::Null => Ok(Value::Null),
                        other => Err(Error::EvaluationError(format!(
                            "'not' requires a boolean, got {}",
                            other.type_name()
                        ))),
                    },
                    UnaryOperator::Negate => operations::negate(&value),
                    UnaryOperator::BitwiseNot => operations::bitwise_not(&value),
                }
            }
            Expression::Binary { op, left, right } => {
                let left = self.evaluate(left, root)?;
                let right = self.evaluate(right, root)?;
                self.binary(*op, &left, &right)
            }
            Expression::Nary { op, operands } => self.nary(*op, operands, root),
            Expression::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, root))
                    .collect::<Result<Vec<_>>>()?;
                functions::call(name, &args, root, self.ctx)
            }
            Expression::CaseWhen {
                conditions,
                results,
                default,
            } => {
                for (condition, result) in conditions.iter().zip(results) {
                    if self.matches(condition, root)? {
                        return self.evaluate(result, root);
                    }
                }
                match default {
                    Some(default) => self.evaluate(default, root),
                    None => Ok(Value::Null),
                }
            }
        }
    }

    fn binary(&self, op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
        match op {
            BinaryOperator::In => self.membership(left, right),
            BinaryOperator::NotIn => self.membership(left, right).map(negate_truth),
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => operations::arithmetic(op, left, right),
            op if op.is_bitwise() => operations::bitwise(op, left, right),
            op => operations::compare(op, left, right),
        }
    }

    /// `left in right`. A non-list right side is a single-element list.
    fn membership(&self, left: &Value, right: &Value) -> Result<Value> {
        if let Value::List(items) = left {
            return any_of(items, |item| self.membership(item, right));
        }

        let candidates: &[Value] = match right {
            Value::Null => return Ok(Value::Null),
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        };
        if candidates.is_empty() {
            return Ok(Value::Boolean(false));
        }
        if self.ctx.null_in_list == NullInListPolicy::Reject && candidates.iter().any(Value::is_null) {
            return Err(Error::EvaluationError(
                "null is not allowed in an 'in' list".into(),
            ));
        }
        if left.is_null() {
            return Ok(Value::Null);
        }

        let found = candidates
            .iter()
            .filter(|candidate| !candidate.is_null())
            .any(|candidate| values_equal(left, candidate));
        Ok(Value::Boolean(found))
    }

    fn nary(&self, op: NaryOperator, operands: &[Expression], root: &Value) -> Result<Value> {
        match op {
            NaryOperator::And | NaryOperator::Or => {
                // The value that settles the outcome on its own
                let decisive = op == NaryOperator::Or;
                let mut unknown = false;
                for operand in operands {
                    match self.evaluate(operand, root)? {
                        Value::Boolean(b) if b == decisive => return Ok(Value::Boolean(decisive)),
                        Value::Boolean(_) => {}
                        Value::Null => unknown = true,
                        other => {
                            return Err(Error::EvaluationError(format!(
                                "'{}' requires boolean operands, got {}",
                                if decisive { "or" } else { "and" },
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(if unknown {
                    Value::Null
                } else {
                    Value::Boolean(!decisive)
                })
            }
            NaryOperator::List => operands
                .iter()
                .map(|operand| self.evaluate(operand, root))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            NaryOperator::Between | NaryOperator::NotBetween => {
                let [value, low, high] = operands else {
                    return Err(Error::StructureError(format!(
                        "between needs 3 operands, got {}",
                        operands.len()
                    )));
                };
                let value = self.evaluate(value, root)?;
                let low = self.evaluate(low, root)?;
                let high = self.evaluate(high, root)?;
                let result = match &value {
                    Value::List(items) => any_of(items, |item| between(item, &low, &high))?,
                    scalar => between(scalar, &low, &high)?,
                };
                Ok(if op == NaryOperator::NotBetween {
                    negate_truth(result)
                } else {
                    result
                })
            }
        }
    }
}

fn between(value: &Value, low: &Value, high: &Value) -> Result<Value> {
    if value.is_null() || low.is_null() || high.is_null() {
        return Ok(Value::Null);
    }
    let above = operations::compare(BinaryOperator::GreaterThanOrEqual, value, low)?;
    let below = operations::compare(BinaryOperator::LessThanOrEqual, value, high)?;
    Ok(Value::Boolean(
        above == Value::Boolean(true) && below == Value::Boolean(true),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::DataObject;

    fn eval(text: &str) -> Value {
        evaluate(&parse(text).unwrap(), &Value::Null, &EvalContext::default()).unwrap()
    }

    #[test]
    fn test_literals_and_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("1 - 0.1 - 0.2"), Value::Double(0.7));
        assert_eq!(eval("7 / 2"), Value::Int(3));
        assert_eq!(eval("-(3)"), Value::Int(-3));
    }

    #[test]
    fn test_bitwise_precedence() {
        assert_eq!(eval("1 << 1 & 2"), Value::Long(2));
        assert_eq!(eval("2*2|2"), Value::Long(6));
        assert_eq!(eval("~7"), Value::Long(-8));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("null < 1"), Value::Null);
        assert_eq!(eval("null < 1 or true"), Value::Boolean(true));
        assert_eq!(eval("null < 1 and false"), Value::Boolean(false));
        assert_eq!(eval("null < 1 and true"), Value::Null);
        assert_eq!(eval("not (null < 1)"), Value::Null);
    }

    #[test]
    fn test_case_when() {
        assert_eq!(eval("case when 1 = 2 then 'a' when 2 = 2 then 'b' end"), Value::from("b"));
        assert_eq!(eval("case when 1 = 2 then 'a' end"), Value::Null);
        assert_eq!(eval("case when 1 = 2 then 'a' else 'c' end"), Value::from("c"));
    }

    #[test]
    fn test_path_through_to_many() {
        let painting = |title: &str| {
            std::sync::Arc::new(DataObject::new("Painting").with("paintingTitle", title))
        };
        let artist = DataObject::new("Artist")
            .with_many("paintingArray", vec![painting("p1"), painting("p2")])
            .into_value();
        let path = Path::parse("paintingArray.paintingTitle").unwrap();
        assert_eq!(
            resolve_path(&path, &artist),
            Value::List(vec![Value::from("p1"), Value::from("p2")])
        );
        let expr = parse("paintingArray.paintingTitle = 'p2'").unwrap();
        assert!(matches(&expr, &artist, &EvalContext::default()).unwrap());
    }

    #[test]
    fn test_to_many_keeps_null_elements() {
        let artist = DataObject::new("Artist")
            .with_many(
                "paintingArray",
                vec![
                    std::sync::Arc::new(DataObject::new("Painting").with("paintingTitle", "p1")),
                    std::sync::Arc::new(DataObject::new("Painting")),
                ],
            )
            .into_value();
        let path = Path::parse("paintingArray.paintingTitle").unwrap();
        assert_eq!(
            resolve_path(&path, &artist),
            Value::List(vec![Value::from("p1"), Value::Null])
        );
    }

    #[test]
    fn test_unbound_parameter_fails() {
        let expr = parse("a = $x").unwrap();
        assert!(evaluate(&expr, &Value::Null, &EvalContext::default()).is_err());
    }

    #[test]
    fn test_non_boolean_condition() {
        let expr = parse("'abc'").unwrap();
        assert!(matches(&expr, &Value::Null, &EvalContext::default()).is_err());
    }
}
