//! Built-in function implementations, dispatched by name from the
//! [`crate::functions`] registry.

pub mod aggregate;
pub mod math;
pub mod string;
pub mod temporal;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions::get_function;
use crate::value::Value;

/// Call a function on already evaluated arguments. `root` is the evaluation
/// root, counted by `count()` without arguments.
pub fn call(name: &str, args: &[Value], root: &Value, ctx: &EvalContext) -> Result<Value> {
    let metadata = get_function(name)
        .ok_or_else(|| Error::EvaluationError(format!("Unknown function '{}'", name)))?;
    if !metadata.accepts(args.len()) {
        return Err(Error::EvaluationError(format!(
            "Function '{}' expects {} argument(s), got {}",
            name,
            metadata.arity(),
            args.len()
        )));
    }

    match name {
        "trim" => string::trim(&args[0]),
        "upper" => string::upper(&args[0]),
        "lower" => string::lower(&args[0]),
        "length" => string::length(&args[0]),
        "concat" => string::concat(args),
        "substring" => string::substring(args),
        "locate" => string::locate(args),

        "abs" => math::abs(&args[0]),
        "sqrt" => math::sqrt(&args[0]),
        "mod" => math::modulo(&args[0], &args[1]),

        "count" => Ok(match args.first() {
            Some(arg) => aggregate::count(arg, true),
            None => aggregate::count(root, false),
        }),
        "min" => aggregate::min(&args[0]),
        "max" => aggregate::max(&args[0]),
        "avg" => aggregate::avg(&args[0]),
        "sum" => aggregate::sum(&args[0]),

        "currentDate" => Ok(temporal::current_date(ctx)),
        "currentTime" => Ok(temporal::current_time(ctx)),
        "now" => Ok(temporal::now(ctx)),
        field => temporal::extract(field, &args[0]),
    }
}
