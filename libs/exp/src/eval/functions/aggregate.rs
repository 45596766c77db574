//! Aggregates: `count`, `min`, `max`, `avg` and `sum`.
//!
//! Aggregates run over the collection their argument resolves to. Nulls are
//! skipped; an empty input yields null (or 0 for `count`).

use std::cmp::Ordering;

use crate::ast::BinaryOperator;
use crate::error::{Error, Result};
use crate::eval::operations::{arithmetic, compare_order};
use crate::value::Value;

/// Non-null items of an aggregate input.
fn items(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().filter(|v| !v.is_null()).collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// `count()` counts the evaluation root; `count(x)` counts non-null values.
pub fn count(value: &Value, skip_nulls: bool) -> Value {
    let n = if skip_nulls {
        items(value).len()
    } else {
        match value {
            Value::List(list) => list.len(),
            _ => 1,
        }
    };
    Value::Long(n as i64)
}

fn extreme(function: &str, value: &Value, wanted: Ordering) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for item in items(value) {
        best = match best {
            None => Some(item),
            Some(current) => {
                let ordering = compare_order(item, current).ok_or_else(|| {
                    Error::EvaluationError(format!(
                        "{}() can't compare {} with {}",
                        function,
                        item.type_name(),
                        current.type_name()
                    ))
                })?;
                Some(if ordering == wanted { item } else { current })
            }
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

pub fn min(value: &Value) -> Result<Value> {
    extreme("min", value, Ordering::Less)
}

pub fn max(value: &Value) -> Result<Value> {
    extreme("max", value, Ordering::Greater)
}

/// Sum in the widest kind of its inputs.
pub fn sum(value: &Value) -> Result<Value> {
    let mut total: Option<Value> = None;
    for item in items(value) {
        total = Some(match total {
            None => arithmetic(BinaryOperator::Add, &Value::Int(0), item)?,
            Some(acc) => arithmetic(BinaryOperator::Add, &acc, item)?,
        });
    }
    Ok(total.unwrap_or(Value::Null))
}

/// Mean as `Double`.
pub fn avg(value: &Value) -> Result<Value> {
    let values = items(value);
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let mut total = 0.0;
    for item in &values {
        total += item.to_f64().ok_or_else(|| {
            Error::EvaluationError(format!("avg() requires numbers, got {}", item.type_name()))
        })?;
    }
    Ok(Value::Double(total / values.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: Vec<Value>) -> Value {
        Value::List(values)
    }

    #[test]
    fn test_count() {
        let values = list(vec![Value::Int(1), Value::Null, Value::Int(3)]);
        assert_eq!(count(&values, true), Value::Long(2));
        assert_eq!(count(&values, false), Value::Long(3));
        assert_eq!(count(&Value::Null, true), Value::Long(0));
        assert_eq!(count(&Value::Int(4), false), Value::Long(1));
    }

    #[test]
    fn test_min_max() {
        let values = list(vec![Value::Int(3), Value::Double(1.5), Value::Long(7)]);
        assert_eq!(min(&values).unwrap(), Value::Double(1.5));
        assert_eq!(max(&values).unwrap(), Value::Long(7));
        assert_eq!(max(&list(vec![])).unwrap(), Value::Null);
    }

    #[test]
    fn test_sum_keeps_widest_kind() {
        assert_eq!(sum(&list(vec![Value::Int(1), Value::Int(2)])).unwrap(), Value::Int(3));
        assert_eq!(
            sum(&list(vec![Value::Int(1), Value::Long(2)])).unwrap(),
            Value::Long(3)
        );
        assert_eq!(
            sum(&list(vec![Value::Double(0.1), Value::Double(0.2)])).unwrap(),
            Value::Double(0.3)
        );
    }

    #[test]
    fn test_avg_is_double() {
        assert_eq!(
            avg(&list(vec![Value::Int(1), Value::Int(2)])).unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(avg(&list(vec![Value::Null])).unwrap(), Value::Null);
    }
}
