//! Math functions: `abs`, `sqrt` and `mod`.

use crate::error::{Error, Result};
use crate::eval::operations::remainder;
use crate::value::Value;

pub fn abs(value: &Value) -> Result<Value> {
    let result = match value {
        Value::Null => Value::Null,
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .unwrap_or(Value::Long(i64::from(*i).abs())),
        Value::Long(l) => Value::Long(
            l.checked_abs()
                .ok_or_else(|| Error::EvaluationError("Arithmetic overflow in abs()".into()))?,
        ),
        Value::Float(f) => Value::Float(f.abs()),
        Value::Double(d) => Value::Double(d.abs()),
        Value::Decimal(d) => Value::Decimal(d.abs()),
        other => {
            return Err(Error::EvaluationError(format!(
                "abs() requires a number, got {}",
                other.type_name()
            )))
        }
    };
    Ok(result)
}

pub fn sqrt(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let number = value.to_f64().ok_or_else(|| {
        Error::EvaluationError(format!("sqrt() requires a number, got {}", value.type_name()))
    })?;
    if number < 0.0 {
        return Err(Error::EvaluationError(format!(
            "sqrt() of negative number {}",
            number
        )));
    }
    Ok(Value::Double(number.sqrt()))
}

pub fn modulo(left: &Value, right: &Value) -> Result<Value> {
    remainder(left, right)
}
