//! Function registry
//!
//! Maps function names to their metadata. Uses a compile-time perfect hash
//! map (phf), so lookups are O(1) with no runtime allocation.

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    String,
    Math,
    Aggregate,
    DateTime,
}

/// Function metadata
#[derive(Debug, Clone, Copy)]
pub struct FunctionMetadata {
    pub id: u16,
    pub name: &'static str,
    pub kind: FunctionKind,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
}

impl FunctionMetadata {
    pub fn accepts(&self, arg_count: usize) -> bool {
        arg_count >= self.min_args && self.max_args.map(|max| arg_count <= max).unwrap_or(true)
    }

    /// Human readable arity, e.g. "1", "2 to 3" or "at least 2".
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

static FUNCTIONS_BY_NAME: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    // String functions
    "trim" => FunctionMetadata { id: 0, name: "trim", kind: FunctionKind::String, min_args: 1, max_args: Some(1) },
    "upper" => FunctionMetadata { id: 1, name: "upper", kind: FunctionKind::String, min_args: 1, max_args: Some(1) },
    "lower" => FunctionMetadata { id: 2, name: "lower", kind: FunctionKind::String, min_args: 1, max_args: Some(1) },
    "length" => FunctionMetadata { id: 3, name: "length", kind: FunctionKind::String, min_args: 1, max_args: Some(1) },
    "concat" => FunctionMetadata { id: 4, name: "concat", kind: FunctionKind::String, min_args: 2, max_args: None },
    "substring" => FunctionMetadata { id: 5, name: "substring", kind: FunctionKind::String, min_args: 2, max_args: Some(3) },
    "locate" => FunctionMetadata { id: 6, name: "locate", kind: FunctionKind::String, min_args: 2, max_args: Some(3) },

    // Math functions
    "abs" => FunctionMetadata { id: 100, name: "abs", kind: FunctionKind::Math, min_args: 1, max_args: Some(1) },
    "sqrt" => FunctionMetadata { id: 101, name: "sqrt", kind: FunctionKind::Math, min_args: 1, max_args: Some(1) },
    "mod" => FunctionMetadata { id: 102, name: "mod", kind: FunctionKind::Math, min_args: 2, max_args: Some(2) },

    // Aggregates
    "count" => FunctionMetadata { id: 200, name: "count", kind: FunctionKind::Aggregate, min_args: 0, max_args: Some(1) },
    "min" => FunctionMetadata { id: 201, name: "min", kind: FunctionKind::Aggregate, min_args: 1, max_args: Some(1) },
    "max" => FunctionMetadata { id: 202, name: "max", kind: FunctionKind::Aggregate, min_args: 1, max_args: Some(1) },
    "avg" => FunctionMetadata { id: 203, name: "avg", kind: FunctionKind::Aggregate, min_args: 1, max_args: Some(1) },
    "sum" => FunctionMetadata { id: 204, name: "sum", kind: FunctionKind::Aggregate, min_args: 1, max_args: Some(1) },

    // Date and time
    "currentDate" => FunctionMetadata { id: 300, name: "currentDate", kind: FunctionKind::DateTime, min_args: 0, max_args: Some(0) },
    "currentTime" => FunctionMetadata { id: 301, name: "currentTime", kind: FunctionKind::DateTime, min_args: 0, max_args: Some(0) },
    "now" => FunctionMetadata { id: 302, name: "now", kind: FunctionKind::DateTime, min_args: 0, max_args: Some(0) },
    "year" => FunctionMetadata { id: 303, name: "year", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "month" => FunctionMetadata { id: 304, name: "month", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "week" => FunctionMetadata { id: 305, name: "week", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "dayOfYear" => FunctionMetadata { id: 306, name: "dayOfYear", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "dayOfMonth" => FunctionMetadata { id: 307, name: "dayOfMonth", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "dayOfWeek" => FunctionMetadata { id: 308, name: "dayOfWeek", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "hour" => FunctionMetadata { id: 309, name: "hour", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "minute" => FunctionMetadata { id: 310, name: "minute", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
    "second" => FunctionMetadata { id: 311, name: "second", kind: FunctionKind::DateTime, min_args: 1, max_args: Some(1) },
};

/// Look up function metadata by name
pub fn get_function(name: &str) -> Option<&'static FunctionMetadata> {
    FUNCTIONS_BY_NAME.get(name)
}

pub fn is_function(name: &str) -> bool {
    FUNCTIONS_BY_NAME.contains_key(name)
}
