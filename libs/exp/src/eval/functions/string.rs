//! String functions: `trim`, `upper`, `lower`, `length`, `concat`,
//! `substring` and `locate`.
//!
//! Positions are 1-based and count characters, not bytes. A null argument
//! yields null.

use crate::error::{Error, Result};
use crate::eval::operations::plain_text;
use crate::value::Value;

fn string_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::EvaluationError(format!(
            "{}() requires a string, got {}",
            function,
            value.type_name()
        ))
    })
}

fn int_arg(function: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(i64::from(*i)),
        Value::Long(l) => Ok(*l),
        other => Err(Error::EvaluationError(format!(
            "{}() requires an integer position, got {}",
            function,
            other.type_name()
        ))),
    }
}

pub fn trim(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::String(string_arg("trim", value)?.trim().to_string()))
}

pub fn upper(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::String(string_arg("upper", value)?.to_uppercase()))
}

pub fn lower(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::String(string_arg("lower", value)?.to_lowercase()))
}

pub fn length(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let count = string_arg("length", value)?.chars().count();
    Ok(Value::Int(i32::try_from(count).unwrap_or(i32::MAX)))
}

/// Concatenates the text of all arguments. Any null argument makes the
/// whole result null.
pub fn concat(values: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for value in values {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let text = plain_text(value).ok_or_else(|| {
            Error::EvaluationError(format!("concat() can't use {}", value.type_name()))
        })?;
        out.push_str(&text);
    }
    Ok(Value::String(out))
}

/// `substring(s, start[, length])`
pub fn substring(values: &[Value]) -> Result<Value> {
    if values.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let text = string_arg("substring", &values[0])?;
    let start = int_arg("substring", &values[1])?.max(1) as usize;
    let chars = text.chars().skip(start - 1);
    let result: String = match values.get(2) {
        Some(len) => chars.take(int_arg("substring", len)?.max(0) as usize).collect(),
        None => chars.collect(),
    };
    Ok(Value::String(result))
}

/// `locate(needle, haystack[, start])`: 1-based position of the first match
/// at or after `start`, or 0.
pub fn locate(values: &[Value]) -> Result<Value> {
    if values.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let needle: Vec<char> = string_arg("locate", &values[0])?.chars().collect();
    let haystack: Vec<char> = string_arg("locate", &values[1])?.chars().collect();
    let start = match values.get(2) {
        Some(v) => int_arg("locate", v)?.max(1) as usize - 1,
        None => 0,
    };

    if needle.is_empty() {
        return Ok(Value::Int(if start <= haystack.len() { start as i32 + 1 } else { 0 }));
    }

    let position = (start..haystack.len())
        .find(|&i| haystack[i..].starts_with(&needle))
        .map(|i| i as i32 + 1)
        .unwrap_or(0);
    Ok(Value::Int(position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(upper(&s("abc")).unwrap(), s("ABC"));
        assert_eq!(lower(&s("ABC")).unwrap(), s("abc"));
        assert_eq!(trim(&s("  a b ")).unwrap(), s("a b"));
        assert_eq!(upper(&Value::Null).unwrap(), Value::Null);
        assert!(upper(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(length(&s("héllo")).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat(&[s("a"), Value::Long(1), s("b")]).unwrap(), s("a1b"));
        assert_eq!(concat(&[s("a"), Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_substring() {
        assert_eq!(substring(&[s("abcdef"), Value::Int(2), Value::Int(3)]).unwrap(), s("bcd"));
        assert_eq!(substring(&[s("abcdef"), Value::Int(4)]).unwrap(), s("def"));
        assert_eq!(substring(&[s("abc"), Value::Int(10)]).unwrap(), s(""));
    }

    #[test]
    fn test_locate() {
        assert_eq!(locate(&[s("c"), s("abcabc")]).unwrap(), Value::Int(3));
        assert_eq!(locate(&[s("c"), s("abcabc"), Value::Int(4)]).unwrap(), Value::Int(6));
        assert_eq!(locate(&[s("x"), s("abc")]).unwrap(), Value::Int(0));
    }
}
