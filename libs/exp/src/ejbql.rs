//! EJBQL rendering
//!
//! Renders an expression as an EJBQL condition relative to an identification
//! variable. Object paths become `root.path`, db paths `db:root.PATH`.
//! With a parameter accumulator every literal is replaced by a positional
//! placeholder `?N` and its value pushed in traversal order.

use crate::ast::{
    BinaryOperator, Expression, NaryOperator, UnaryOperator, PREC_COMPARISON, PREC_NOT,
    PREC_UNARY,
};
use crate::error::{Error, Result};
use crate::path::{Path, DB_PREFIX, OUTER_JOIN_MARKER, SPLIT_SEPARATOR};
use crate::value::Value;

const TARGET: &str = "EJBQL";

/// Render `expr` with inline literals.
pub fn to_ejbql(expr: &Expression, root_id: &str) -> Result<String> {
    let mut writer = EjbqlWriter::new(root_id, None);
    writer.write(expr)?;
    Ok(writer.out)
}

/// Render `expr` with positional placeholders, appending literal values to
/// `bindings`. Placeholder numbers continue after the values already there.
/// On error `bindings` is left as it was.
pub fn to_ejbql_with_params(
    expr: &Expression,
    root_id: &str,
    bindings: &mut Vec<Value>,
) -> Result<String> {
    let mut writer = EjbqlWriter::new(root_id, Some(bindings.len()));
    writer.write(expr)?;
    bindings.extend(writer.bindings.unwrap_or_default());
    Ok(writer.out)
}

struct EjbqlWriter<'a> {
    root_id: &'a str,
    /// Values collected by this rendering, numbered after `first_placeholder`.
    bindings: Option<Vec<Value>>,
    first_placeholder: usize,
    out: String,
}

impl<'a> EjbqlWriter<'a> {
    fn new(root_id: &'a str, existing_bindings: Option<usize>) -> Self {
        Self {
            root_id,
            bindings: existing_bindings.map(|_| Vec::new()),
            first_placeholder: existing_bindings.unwrap_or(0),
            out: String::new(),
        }
    }

    fn write(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Literal(value) => self.write_literal(value),
            Expression::Parameter(p) => {
                self.out.push(':');
                self.out.push_str(&p.name);
                Ok(())
            }
            Expression::Path(path) => {
                self.write_path(path);
                Ok(())
            }
            Expression::Unary { op, operand } => match op {
                UnaryOperator::Not => {
                    self.out.push_str("not ");
                    self.write_operand(operand, operand.precedence() < PREC_NOT)
                }
                UnaryOperator::Negate => {
                    self.out.push('-');
                    self.write_operand(operand, operand.precedence() < PREC_UNARY)
                }
                UnaryOperator::BitwiseNot => Err(Error::unsupported("Bitwise not", TARGET)),
            },
            Expression::Binary { op, left, right } => self.write_binary(*op, left, right),
            Expression::Nary { op, operands } => self.write_nary(*op, operands),
            Expression::Function { name, args } => self.write_function(name, args),
            Expression::CaseWhen { .. } => Err(Error::unsupported("CASE WHEN", TARGET)),
        }
    }

    fn write_operand(&mut self, expr: &Expression, wrap: bool) -> Result<()> {
        if wrap {
            self.out.push('(');
            self.write(expr)?;
            self.out.push(')');
            Ok(())
        } else {
            self.write(expr)
        }
    }

    fn write_binary(&mut self, op: BinaryOperator, left: &Expression, right: &Expression) -> Result<()> {
        if op.is_bitwise() {
            return Err(Error::unsupported(
                format!("Bitwise operator '{}'", op.symbol()),
                TARGET,
            ));
        }

        let is_null = matches!(right, Expression::Literal(Value::Null));
        let (wrap_left, wrap_right) = if op.is_comparison() {
            (
                left.precedence() <= PREC_COMPARISON,
                right.precedence() <= PREC_COMPARISON,
            )
        } else {
            (left.precedence() < op.precedence(), right.precedence() <= op.precedence())
        };

        match op {
            BinaryOperator::Equal | BinaryOperator::NotEqual if is_null => {
                self.write_operand(left, wrap_left)?;
                self.out.push_str(if op == BinaryOperator::Equal {
                    " is null"
                } else {
                    " is not null"
                });
                return Ok(());
            }
            BinaryOperator::LikeIgnoreCase | BinaryOperator::NotLikeIgnoreCase => {
                self.out.push_str("upper(");
                self.write(left)?;
                self.out.push_str(if op == BinaryOperator::LikeIgnoreCase {
                    ") like upper("
                } else {
                    ") not like upper("
                });
                self.write(right)?;
                self.out.push(')');
                return Ok(());
            }
            _ => {}
        }

        let symbol = match op {
            BinaryOperator::NotEqual => "<>",
            other => other.symbol(),
        };
        self.write_operand(left, wrap_left)?;
        self.out.push(' ');
        self.out.push_str(symbol);
        self.out.push(' ');
        self.write_operand(right, wrap_right)
    }

    fn write_nary(&mut self, op: NaryOperator, operands: &[Expression]) -> Result<()> {
        match op {
            NaryOperator::And | NaryOperator::Or => {
                let keyword = if op == NaryOperator::And { " and " } else { " or " };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(keyword);
                    }
                    self.write_operand(operand, operand.precedence() <= op.precedence())?;
                }
                Ok(())
            }
            NaryOperator::List => {
                self.out.push('(');
                self.write_comma_separated(operands)?;
                self.out.push(')');
                Ok(())
            }
            NaryOperator::Between | NaryOperator::NotBetween => {
                let keyword = if op == NaryOperator::Between {
                    " between "
                } else {
                    " not between "
                };
                for (i, operand) in operands.iter().enumerate() {
                    match i {
                        0 => {}
                        1 => self.out.push_str(keyword),
                        _ => self.out.push_str(" and "),
                    }
                    self.write_operand(operand, operand.precedence() <= PREC_COMPARISON)?;
                }
                Ok(())
            }
        }
    }

    fn write_function(&mut self, name: &str, args: &[Expression]) -> Result<()> {
        let keyword = match name {
            "currentDate" => Some("CURRENT_DATE"),
            "currentTime" => Some("CURRENT_TIME"),
            "now" => Some("CURRENT_TIMESTAMP"),
            _ => None,
        };
        if let Some(keyword) = keyword {
            self.out.push_str(keyword);
            return Ok(());
        }

        match name {
            "trim" | "upper" | "lower" | "length" | "concat" | "substring" | "locate" | "abs"
            | "sqrt" | "mod" | "min" | "max" | "avg" | "sum" => {}
            "count" if args.is_empty() => {
                self.out.push_str("count(");
                self.out.push_str(self.root_id);
                self.out.push(')');
                return Ok(());
            }
            "count" => {}
            other => return Err(Error::unsupported(format!("Function '{}'", other), TARGET)),
        }

        self.out.push_str(name);
        self.out.push('(');
        self.write_comma_separated(args)?;
        self.out.push(')');
        Ok(())
    }

    fn write_comma_separated(&mut self, items: &[Expression]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write(item)?;
        }
        Ok(())
    }

    fn write_path(&mut self, path: &Path) {
        if path.is_db() {
            self.out.push_str(DB_PREFIX);
        }
        self.out.push_str(self.root_id);
        for segment in path.segments() {
            self.out
                .push(if segment.split { SPLIT_SEPARATOR } else { '.' });
            self.out.push_str(&segment.name);
            if segment.outer {
                self.out.push(OUTER_JOIN_MARKER);
            }
        }
    }

    fn write_literal(&mut self, value: &Value) -> Result<()> {
        if let Some(bindings) = self.bindings.as_mut() {
            bindings.push(value.clone());
            let placeholder = format!("?{}", self.first_placeholder + bindings.len());
            self.out.push_str(&placeholder);
            return Ok(());
        }
        let text = inline_literal(value)?;
        self.out.push_str(&text);
        Ok(())
    }
}

fn inline_literal(value: &Value) -> Result<String> {
    let text = match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Date(d) => format!("{{d '{}'}}", d),
        Value::Time(t) => format!("{{t '{}'}}", t.format("%H:%M:%S")),
        Value::DateTime(dt) => format!("{{ts '{}'}}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Object(node) => {
            let key = node
                .object_id()
                .and_then(|id| id.single_key_value().cloned())
                .ok_or_else(|| {
                    Error::unsupported(
                        format!("{} without a single-column primary key", node.entity_name()),
                        TARGET,
                    )
                })?;
            inline_literal(&key)?
        }
        Value::ObjectId(id) => {
            let key = id.single_key_value().ok_or_else(|| {
                Error::unsupported(format!("Object id {}", id), TARGET)
            })?;
            inline_literal(key)?
        }
        Value::List(items) => {
            let items = items
                .iter()
                .map(inline_literal)
                .collect::<Result<Vec<_>>>()?;
            format!("({})", items.join(", "))
        }
        other => other.to_string(),
    };
    Ok(text)
}
