//! Date and time functions.
//!
//! `dayOfWeek` counts from Sunday = 1, `week` is the ISO week number.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::value::Value;

pub fn current_date(ctx: &EvalContext) -> Value {
    Value::Date(ctx.now().date())
}

pub fn current_time(ctx: &EvalContext) -> Value {
    Value::Time(ctx.now().time())
}

pub fn now(ctx: &EvalContext) -> Value {
    Value::DateTime(ctx.now())
}

fn date_part(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        _ => None,
    }
}

fn time_part(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(t) => Some(*t),
        Value::DateTime(dt) => Some(dt.time()),
        _ => None,
    }
}

/// Extract a calendar or clock field by function name.
pub fn extract(function: &str, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let field = match function {
        "year" | "month" | "week" | "dayOfYear" | "dayOfMonth" | "dayOfWeek" => {
            date_part(value).map(|d| match function {
                "year" => d.year(),
                "month" => d.month() as i32,
                "week" => d.iso_week().week() as i32,
                "dayOfYear" => d.ordinal() as i32,
                "dayOfMonth" => d.day() as i32,
                _ => d.weekday().number_from_sunday() as i32,
            })
        }
        "hour" | "minute" | "second" => time_part(value).map(|t| match function {
            "hour" => t.hour() as i32,
            "minute" => t.minute() as i32,
            _ => t.second() as i32,
        }),
        _ => {
            return Err(Error::EvaluationError(format!(
                "Unknown date field function '{}'",
                function
            )))
        }
    };

    field.map(Value::Int).ok_or_else(|| {
        Error::EvaluationError(format!(
            "{}() can't be applied to {}",
            function,
            value.type_name()
        ))
    })
}
