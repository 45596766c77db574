//! Expression tree
//!
//! [`Expression`] is a closed sum type. Nodes own their children and are
//! never mutated after construction; binding and translation build new
//! trees.
//!
//! `Display` produces the canonical text form, which parses back into an
//! equal tree. Parentheses are emitted only where precedence requires them.
//!
//! Precedence (lowest to highest):
//! 1. or
//! 2. and
//! 3. not
//! 4. comparisons (=, !=, <, <=, >, >=, like, likeIgnoreCase, in, between)
//! 5. bitwise or (|)
//! 6. bitwise xor (^)
//! 7. bitwise and (&)
//! 8. shifts (<<, >>)
//! 9. additive (+, -)
//! 10. multiplicative (*, /)
//! 11. unary (-, ~)
//! 12. primary (literal, parameter, path, function, list, case)

use std::fmt;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),

    /// `$name`
    Parameter(ParameterRef),

    Path(Path),

    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Connectives, list literals and range tests
    Nary {
        op: NaryOperator,
        operands: Vec<Expression>,
    },

    Function {
        name: String,
        args: Vec<Expression>,
    },

    /// `case when c1 then r1 ... [else d] end`
    CaseWhen {
        conditions: Vec<Expression>,
        results: Vec<Expression>,
        default: Option<Box<Expression>>,
    },
}

/// Reference to a named parameter. Optional parameters are pruned when
/// unbound, regardless of the binder's prune policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    pub name: String,
    pub required: bool,
}

impl ParameterRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

impl fmt::Display for ParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)?;
        if !self.required {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
    LikeIgnoreCase,
    NotLikeIgnoreCase,
    In,
    NotIn,
    Add,
    Subtract,
    Multiply,
    Divide,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NaryOperator {
    And,
    Or,
    List,
    Between,
    NotBetween,
}

pub(crate) const PREC_OR: u8 = 1;
pub(crate) const PREC_AND: u8 = 2;
pub(crate) const PREC_NOT: u8 = 3;
pub(crate) const PREC_COMPARISON: u8 = 4;
pub(crate) const PREC_UNARY: u8 = 11;
pub(crate) const PREC_PRIMARY: u8 = 12;

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "not ",
            UnaryOperator::Negate => "-",
            UnaryOperator::BitwiseNot => "~",
        }
    }
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Like => "like",
            BinaryOperator::NotLike => "not like",
            BinaryOperator::LikeIgnoreCase => "likeIgnoreCase",
            BinaryOperator::NotLikeIgnoreCase => "not likeIgnoreCase",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::BitwiseOr => 5,
            BinaryOperator::BitwiseXor => 6,
            BinaryOperator::BitwiseAnd => 7,
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => 8,
            BinaryOperator::Add | BinaryOperator::Subtract => 9,
            BinaryOperator::Multiply | BinaryOperator::Divide => 10,
            _ => PREC_COMPARISON,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == PREC_COMPARISON
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseXor
                | BinaryOperator::ShiftLeft
                | BinaryOperator::ShiftRight
        )
    }

    /// The operator with inverted outcome, for the comparisons that have one.
    pub fn negated(self) -> Option<BinaryOperator> {
        let op = match self {
            BinaryOperator::Equal => BinaryOperator::NotEqual,
            BinaryOperator::NotEqual => BinaryOperator::Equal,
            BinaryOperator::LessThan => BinaryOperator::GreaterThanOrEqual,
            BinaryOperator::LessThanOrEqual => BinaryOperator::GreaterThan,
            BinaryOperator::GreaterThan => BinaryOperator::LessThanOrEqual,
            BinaryOperator::GreaterThanOrEqual => BinaryOperator::LessThan,
            BinaryOperator::Like => BinaryOperator::NotLike,
            BinaryOperator::NotLike => BinaryOperator::Like,
            BinaryOperator::LikeIgnoreCase => BinaryOperator::NotLikeIgnoreCase,
            BinaryOperator::NotLikeIgnoreCase => BinaryOperator::LikeIgnoreCase,
            BinaryOperator::In => BinaryOperator::NotIn,
            BinaryOperator::NotIn => BinaryOperator::In,
            _ => return None,
        };
        Some(op)
    }
}

impl NaryOperator {
    pub fn precedence(self) -> u8 {
        match self {
            NaryOperator::Or => PREC_OR,
            NaryOperator::And => PREC_AND,
            NaryOperator::Between | NaryOperator::NotBetween => PREC_COMPARISON,
            NaryOperator::List => PREC_PRIMARY,
        }
    }

    pub fn is_connective(self) -> bool {
        matches!(self, NaryOperator::And | NaryOperator::Or)
    }
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Expression {
        Expression::Literal(value.into())
    }

    pub fn parameter(name: impl Into<String>) -> Expression {
        Expression::Parameter(ParameterRef::new(name))
    }

    /// Path expression from its text form.
    pub fn path(text: &str) -> Result<Expression> {
        Ok(Expression::Path(Path::parse(text)?))
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Expression {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// N-ary node. Range tests take exactly three operands and connectives
    /// at least one.
    pub fn nary(op: NaryOperator, operands: Vec<Expression>) -> Result<Expression> {
        match op {
            NaryOperator::Between | NaryOperator::NotBetween if operands.len() != 3 => {
                return Err(Error::StructureError(format!(
                    "between needs 3 operands, got {}",
                    operands.len()
                )));
            }
            NaryOperator::And | NaryOperator::Or if operands.is_empty() => {
                return Err(Error::StructureError(format!(
                    "{:?} needs at least one operand",
                    op
                )));
            }
            _ => {}
        }
        Ok(Expression::Nary { op, operands })
    }

    pub fn list(items: Vec<Expression>) -> Expression {
        Expression::Nary {
            op: NaryOperator::List,
            operands: items,
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    pub fn case_when(
        conditions: Vec<Expression>,
        results: Vec<Expression>,
        default: Option<Expression>,
    ) -> Result<Expression> {
        if conditions.is_empty() {
            return Err(Error::StructureError(
                "case needs at least one when clause".into(),
            ));
        }
        if conditions.len() != results.len() {
            return Err(Error::StructureError(format!(
                "case has {} conditions but {} results",
                conditions.len(),
                results.len()
            )));
        }
        Ok(Expression::CaseWhen {
            conditions,
            results,
            default: default.map(Box::new),
        })
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Expression::Unary {
                op: UnaryOperator::Not,
                ..
            } => PREC_NOT,
            Expression::Unary { .. } => PREC_UNARY,
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Nary { op, .. } => op.precedence(),
            _ => PREC_PRIMARY,
        }
    }

    /// Direct children in traversal order. Case clauses interleave each
    /// condition with its result, followed by the default.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_) | Expression::Parameter(_) | Expression::Path(_) => Vec::new(),
            Expression::Unary { operand, .. } => vec![operand.as_ref()],
            Expression::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::Nary { operands, .. } => operands.iter().collect(),
            Expression::Function { args, .. } => args.iter().collect(),
            Expression::CaseWhen {
                conditions,
                results,
                default,
            } => {
                let mut children: Vec<&Expression> = conditions
                    .iter()
                    .zip(results.iter())
                    .flat_map(|(c, r)| [c, r])
                    .collect();
                if let Some(default) = default {
                    children.push(default.as_ref());
                }
                children
            }
        }
    }

    /// Pre-order walk over this node and all descendants.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Distinct parameter names in traversal order.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        self.walk(&mut |node| {
            if let Expression::Parameter(p) = node {
                if !names.contains(&p.name) {
                    names.push(p.name.clone());
                }
            }
        });
        names
    }

    /// All paths in traversal order.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = Vec::new();
        self.walk(&mut |node| {
            if let Expression::Path(path) = node {
                paths.push(path);
            }
        });
        paths
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Expression::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_numeric_literal(&self) -> bool {
        matches!(self, Expression::Literal(v) if v.is_numeric())
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Path(path) => write!(f, "{}", path),
            Expression::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                let wrap = match op {
                    UnaryOperator::Not => operand.precedence() < PREC_NOT,
                    // -(3) stays a negation, -3 would lex as a literal
                    UnaryOperator::Negate => {
                        operand.precedence() < PREC_UNARY || operand.is_numeric_literal()
                    }
                    UnaryOperator::BitwiseNot => operand.precedence() < PREC_UNARY,
                };
                write_operand(f, operand, wrap)
            }
            Expression::Binary { op, left, right } => {
                let prec = op.precedence();
                let (wrap_left, wrap_right) = if op.is_comparison() {
                    (
                        left.precedence() <= PREC_COMPARISON,
                        right.precedence() <= PREC_COMPARISON,
                    )
                } else {
                    (left.precedence() < prec, right.precedence() <= prec)
                };
                write_operand(f, left, wrap_left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, wrap_right)
            }
            Expression::Nary { op, operands } => match op {
                NaryOperator::And | NaryOperator::Or => {
                    let keyword = if *op == NaryOperator::And { " and " } else { " or " };
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            f.write_str(keyword)?;
                        }
                        write_operand(f, operand, operand.precedence() <= op.precedence())?;
                    }
                    Ok(())
                }
                NaryOperator::List => {
                    f.write_str("(")?;
                    write_comma_separated(f, operands)?;
                    f.write_str(")")
                }
                NaryOperator::Between | NaryOperator::NotBetween => {
                    let keyword = if *op == NaryOperator::Between {
                        " between "
                    } else {
                        " not between "
                    };
                    for (i, operand) in operands.iter().enumerate() {
                        match i {
                            0 => {}
                            1 => f.write_str(keyword)?,
                            _ => f.write_str(" and ")?,
                        }
                        write_operand(f, operand, operand.precedence() <= PREC_COMPARISON)?;
                    }
                    Ok(())
                }
            },
            Expression::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_comma_separated(f, args)?;
                f.write_str(")")
            }
            Expression::CaseWhen {
                conditions,
                results,
                default,
            } => {
                f.write_str("case")?;
                for (condition, result) in conditions.iter().zip(results) {
                    write!(f, " when {} then {}", condition, result)?;
                }
                if let Some(default) = default {
                    write!(f, " else {}", default)?;
                }
                f.write_str(" end")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> Expression {
        Expression::path(text).unwrap()
    }

    #[test]
    fn test_between_arity() {
        let err = Expression::nary(
            NaryOperator::Between,
            vec![path("a"), Expression::literal(1)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::StructureError(_)));
        assert!(Expression::nary(NaryOperator::And, vec![]).is_err());
        assert!(Expression::nary(NaryOperator::List, vec![]).is_ok());
    }

    #[test]
    fn test_case_arity() {
        assert!(Expression::case_when(vec![], vec![], None).is_err());
        assert!(Expression::case_when(vec![path("a")], vec![], None).is_err());
        let case = Expression::case_when(
            vec![path("a")],
            vec![Expression::literal(1)],
            Some(Expression::literal(2)),
        )
        .unwrap();
        assert_eq!(case.to_string(), "case when a then 1 else 2 end");
    }

    #[test]
    fn test_display_parenthesizes_by_precedence() {
        let sum = Expression::binary(BinaryOperator::Add, path("a"), Expression::literal(1));
        let product = Expression::binary(BinaryOperator::Multiply, sum.clone(), path("b"));
        assert_eq!(product.to_string(), "(a + 1) * b");

        let diff = Expression::binary(BinaryOperator::Subtract, path("x"), sum);
        assert_eq!(diff.to_string(), "x - (a + 1)");

        let or = Expression::nary(NaryOperator::Or, vec![path("p"), path("q")]).unwrap();
        let and = Expression::nary(NaryOperator::And, vec![or, path("r")]).unwrap();
        assert_eq!(and.to_string(), "(p or q) and r");
    }

    #[test]
    fn test_display_negated_literal() {
        let neg = Expression::unary(UnaryOperator::Negate, Expression::literal(3));
        assert_eq!(neg.to_string(), "-(3)");
        assert_eq!(Expression::literal(-3).to_string(), "-3");
        let not = Expression::unary(
            UnaryOperator::Not,
            Expression::binary(BinaryOperator::Equal, path("a"), Expression::literal(1)),
        );
        assert_eq!(not.to_string(), "not a = 1");
    }

    #[test]
    fn test_parameter_names_are_distinct_in_order() {
        let expr = Expression::nary(
            NaryOperator::And,
            vec![
                Expression::binary(BinaryOperator::Equal, path("a"), Expression::parameter("x")),
                Expression::binary(BinaryOperator::Equal, path("b"), Expression::parameter("y")),
                Expression::binary(BinaryOperator::Equal, path("c"), Expression::parameter("x")),
            ],
        )
        .unwrap();
        assert_eq!(expr.parameter_names(), vec!["x", "y"]);
        assert_eq!(expr.paths().len(), 3);
    }
}
