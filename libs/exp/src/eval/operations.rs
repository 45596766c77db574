//! Value-level operators: comparison, arithmetic and bitwise.
//!
//! Numeric kinds promote along Int → Long → Float → Double → Decimal.
//! Fractional arithmetic runs in `Decimal` and converts back to the widest
//! operand kind, so `1 - 0.1 - 0.2` is exactly `0.7`.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;

use crate::ast::BinaryOperator;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NumericKind {
    Int,
    Long,
    Float,
    Double,
    Decimal,
}

fn numeric_kind(value: &Value) -> Option<NumericKind> {
    match value {
        Value::Int(_) => Some(NumericKind::Int),
        Value::Long(_) => Some(NumericKind::Long),
        Value::Float(_) => Some(NumericKind::Float),
        Value::Double(_) => Some(NumericKind::Double),
        Value::Decimal(_) => Some(NumericKind::Decimal),
        _ => None,
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(i64::from(*i)),
        Value::Long(l) => Some(*l),
        _ => None,
    }
}

/// Shortest decimal form back to binary floating point.
pub(crate) fn decimal_to_f64(d: Decimal) -> Option<f64> {
    d.normalize().to_string().parse().ok()
}

/// Text of a scalar without literal decoration (no quotes, no suffixes).
pub(crate) fn plain_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Long(l) => l.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Date(d) => d.to_string(),
        Value::Time(t) => t.to_string(),
        Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        Value::Enum(e) => e.constant.clone(),
        _ => return None,
    };
    Some(text)
}

fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (integral(left), integral(right)) {
        return Some(a.cmp(&b));
    }
    match (left.to_decimal(), right.to_decimal()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        // NaN and infinities have no decimal form
        _ => left.to_f64()?.partial_cmp(&right.to_f64()?),
    }
}

/// Primary key value of an object, when it has a single-column key.
fn object_key(value: &Value) -> Option<Value> {
    match value {
        Value::Object(node) => node
            .object_id()
            .filter(|id| !id.is_temporary())
            .and_then(|id| id.single_key_value().cloned()),
        _ => None,
    }
}

fn midnight(date: chrono::NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Equality used by `=`, `in` and friends. Numeric kinds compare by value,
/// enums match their constant name, objects match their id or primary key.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (a, b) if a.is_numeric() && b.is_numeric() => numeric_cmp(a, b) == Some(Ordering::Equal),
        (Value::Object(_), Value::Object(_)) => left == right,
        (Value::Object(node), Value::ObjectId(id)) | (Value::ObjectId(id), Value::Object(node)) => {
            !id.is_temporary() && node.object_id().as_ref() == Some(id)
        }
        (Value::Object(_), other) | (other, Value::Object(_)) => {
            let object = if matches!(left, Value::Object(_)) { left } else { right };
            match object_key(object) {
                Some(key) => values_equal(&key, other),
                None => false,
            }
        }
        (Value::Enum(e), Value::String(s)) | (Value::String(s), Value::Enum(e)) => e.constant == *s,
        (Value::Date(d), Value::DateTime(dt)) | (Value::DateTime(dt), Value::Date(d)) => {
            midnight(*d) == *dt
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

/// Ordering for `<`, `>`, `between`, `min`/`max` and sorting. `None` when
/// the values have no common order.
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (a, b) if a.is_numeric() && b.is_numeric() => numeric_cmp(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::DateTime(b)) => Some(midnight(*a).cmp(b)),
        (Value::DateTime(a), Value::Date(b)) => Some(a.cmp(&midnight(*b))),
        (Value::Enum(a), Value::Enum(b)) if a.type_name == b.type_name => {
            Some(a.constant.cmp(&b.constant))
        }
        (Value::Enum(a), Value::String(b)) => Some(a.constant.cmp(b)),
        (Value::String(a), Value::Enum(b)) => Some(a.cmp(&b.constant)),
        (Value::Object(_), _) => compare_order(&object_key(left)?, right),
        (_, Value::Object(_)) => compare_order(left, &object_key(right)?),
        _ => None,
    }
}

/// Compile a like pattern. `%` matches any sequence, `_` and `?` match a
/// single character; everything else is literal.
pub fn like_regex(pattern: &str, ignore_case: bool) -> Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' | '?' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .dot_matches_new_line(true)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| Error::EvaluationError(format!("Invalid like pattern '{}': {}", pattern, e)))
}

/// Evaluate a comparison operator other than `in`. Null operands follow
/// three-valued logic: `=`/`!=` treat null as a value, everything else is
/// unknown.
pub fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    // Collection on the left, scalar on the right: any element may satisfy.
    if let (Value::List(items), false) = (left, matches!(right, Value::List(_))) {
        return any_of(items, |item| compare(op, item, right));
    }

    match op {
        BinaryOperator::Equal => Ok(Value::Boolean(null_aware_equal(left, right))),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!null_aware_equal(left, right))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let ordering = compare_order(left, right).ok_or_else(|| {
                Error::EvaluationError(format!(
                    "Can't compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }
        BinaryOperator::Like
        | BinaryOperator::NotLike
        | BinaryOperator::LikeIgnoreCase
        | BinaryOperator::NotLikeIgnoreCase => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let pattern = right.as_str().ok_or_else(|| {
                Error::EvaluationError(format!(
                    "Like pattern must be a string, got {}",
                    right.type_name()
                ))
            })?;
            let text = plain_text(left).ok_or_else(|| {
                Error::EvaluationError(format!("Can't match {} against a pattern", left.type_name()))
            })?;
            let ignore_case = matches!(
                op,
                BinaryOperator::LikeIgnoreCase | BinaryOperator::NotLikeIgnoreCase
            );
            let negated = matches!(op, BinaryOperator::NotLike | BinaryOperator::NotLikeIgnoreCase);
            let matched = like_regex(pattern, ignore_case)?.is_match(&text);
            Ok(Value::Boolean(matched != negated))
        }
        other => Err(Error::EvaluationError(format!(
            "'{}' is not a comparison",
            other.symbol()
        ))),
    }
}

fn null_aware_equal(left: &Value, right: &Value) -> bool {
    match (left.is_null(), right.is_null()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => values_equal(left, right),
    }
}

/// True if any item yields true; unknown if none did but some were unknown.
pub(crate) fn any_of<F>(items: &[Value], mut test: F) -> Result<Value>
where
    F: FnMut(&Value) -> Result<Value>,
{
    let mut unknown = false;
    for item in items {
        match test(item)? {
            Value::Boolean(true) => return Ok(Value::Boolean(true)),
            Value::Null => unknown = true,
            _ => {}
        }
    }
    Ok(if unknown {
        Value::Null
    } else {
        Value::Boolean(false)
    })
}

fn type_error(op: BinaryOperator, left: &Value, right: &Value) -> Error {
    Error::EvaluationError(format!(
        "Can't apply '{}' to {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn overflow(op: BinaryOperator) -> Error {
    Error::EvaluationError(format!("Arithmetic overflow in '{}'", op.symbol()))
}

fn division_by_zero() -> Error {
    Error::EvaluationError("Division by zero".into())
}

fn integral_result(value: i64, kind: NumericKind) -> Value {
    match (kind, i32::try_from(value)) {
        (NumericKind::Int, Ok(small)) => Value::Int(small),
        _ => Value::Long(value),
    }
}

/// `+ - * /` over numeric operands. Null propagates.
pub fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let (Some(lk), Some(rk)) = (numeric_kind(left), numeric_kind(right)) else {
        return Err(type_error(op, left, right));
    };
    let kind = lk.max(rk);

    if kind <= NumericKind::Long {
        let (Some(a), Some(b)) = (integral(left), integral(right)) else {
            return Err(type_error(op, left, right));
        };
        let result = match op {
            BinaryOperator::Add => a.checked_add(b),
            BinaryOperator::Subtract => a.checked_sub(b),
            BinaryOperator::Multiply => a.checked_mul(b),
            BinaryOperator::Divide => {
                if b == 0 {
                    return Err(division_by_zero());
                }
                a.checked_div(b)
            }
            _ => return Err(type_error(op, left, right)),
        };
        return result
            .map(|value| integral_result(value, kind))
            .ok_or_else(|| overflow(op));
    }

    if let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) {
        let result = match op {
            BinaryOperator::Add => a.checked_add(b),
            BinaryOperator::Subtract => a.checked_sub(b),
            BinaryOperator::Multiply => a.checked_mul(b),
            BinaryOperator::Divide => {
                if b.is_zero() {
                    return Err(division_by_zero());
                }
                a.checked_div(b)
            }
            _ => return Err(type_error(op, left, right)),
        };
        match result.and_then(|result| fractional_result(result, kind)) {
            Some(value) => return Ok(value),
            None if kind == NumericKind::Decimal => return Err(overflow(op)),
            // Past the Decimal range floats carry on in binary floating point
            None => {}
        }
    }

    let (Some(a), Some(b)) = (left.to_f64(), right.to_f64()) else {
        return Err(type_error(op, left, right));
    };
    let result = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        _ => return Err(type_error(op, left, right)),
    };
    Ok(if kind == NumericKind::Float {
        Value::Float(result as f32)
    } else {
        Value::Double(result)
    })
}

fn fractional_result(result: Decimal, kind: NumericKind) -> Option<Value> {
    match kind {
        NumericKind::Decimal => Some(Value::Decimal(result)),
        NumericKind::Float => result.normalize().to_string().parse().ok().map(Value::Float),
        _ => decimal_to_f64(result).map(Value::Double),
    }
}

/// Remainder with the same promotion rules as [`arithmetic`].
pub fn remainder(left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let err = || {
        Error::EvaluationError(format!(
            "mod() needs numeric arguments, got {} and {}",
            left.type_name(),
            right.type_name()
        ))
    };
    let kind = numeric_kind(left).ok_or_else(err)?.max(numeric_kind(right).ok_or_else(err)?);

    if kind <= NumericKind::Long {
        let (Some(a), Some(b)) = (integral(left), integral(right)) else {
            return Err(err());
        };
        if b == 0 {
            return Err(division_by_zero());
        }
        return Ok(integral_result(a.wrapping_rem(b), kind));
    }

    let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) else {
        return Err(err());
    };
    if b.is_zero() {
        return Err(division_by_zero());
    }
    a.checked_rem(b)
        .and_then(|r| fractional_result(r, kind))
        .ok_or_else(|| Error::EvaluationError("Arithmetic overflow in mod()".into()))
}

fn bitwise_operand(op: &str, value: &Value) -> Result<i64> {
    integral(value).ok_or_else(|| {
        Error::EvaluationError(format!(
            "'{}' needs integral operands, got {}",
            op,
            value.type_name()
        ))
    })
}

/// `& | ^ << >>` over integral operands. The result is always `Long`.
pub fn bitwise(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let a = bitwise_operand(op.symbol(), left)?;
    let b = bitwise_operand(op.symbol(), right)?;
    let result = match op {
        BinaryOperator::BitwiseAnd => a & b,
        BinaryOperator::BitwiseOr => a | b,
        BinaryOperator::BitwiseXor => a ^ b,
        BinaryOperator::ShiftLeft => a.wrapping_shl(b as u32),
        BinaryOperator::ShiftRight => a.wrapping_shr(b as u32),
        _ => return Err(type_error(op, left, right)),
    };
    Ok(Value::Long(result))
}

pub fn bitwise_not(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Long(!bitwise_operand("~", value)?))
}

pub fn negate(value: &Value) -> Result<Value> {
    let result = match value {
        Value::Null => Value::Null,
        Value::Int(i) => i.checked_neg().map(Value::Int).unwrap_or(Value::Long(-i64::from(*i))),
        Value::Long(l) => Value::Long(
            l.checked_neg()
                .ok_or_else(|| Error::EvaluationError("Arithmetic overflow in '-'".into()))?,
        ),
        Value::Float(f) => Value::Float(-*f),
        Value::Double(d) => Value::Double(-*d),
        Value::Decimal(d) => Value::Decimal(-*d),
        other => {
            return Err(Error::EvaluationError(format!(
                "Can't negate {}",
                other.type_name()
            )))
        }
    };
    Ok(result)
}
