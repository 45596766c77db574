//! Expression parser - converts expression strings to [`Expression`] trees
//!
//! Recursive descent parser. Precedence (lowest to highest):
//! 1. or (`||`)
//! 2. and (`&&`)
//! 3. not (`!`)
//! 4. comparisons, non-associative
//! 5. bitwise or (`|`)
//! 6. bitwise xor (`^`)
//! 7. bitwise and (`&`)
//! 8. shifts (`<<`, `>>`)
//! 9. additive (`+`, `-`)
//! 10. multiplicative (`*`, `/`)
//! 11. unary (`-`, `~`)
//! 12. primary (literal, parameter, path, function call, parenthesized, case)
//!
//! `and`/`or` chains collect into a single n-ary node. A `-` in front of a
//! numeric literal folds into a negative literal.

use std::str::FromStr;

use crate::ast::{BinaryOperator, Expression, NaryOperator, ParameterRef, UnaryOperator};
use crate::error::{Error, Result};
use crate::functions::get_function;
use crate::lexer::Lexer;
use crate::path::Path;
use crate::token::{Token, TokenType};
use crate::value::{EnumValue, Value};

/// Parser for expression strings
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 64;

/// Parse a complete expression.
pub fn parse(input: &str) -> Result<Expression> {
    Parser::new(input).parse()
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            recursion_depth: 0,
        }
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn current_token_is_one_of(&self, types: &[TokenType]) -> bool {
        types.contains(&self.current_token.token_type)
    }

    fn error_at(&self, message: impl Into<String>) -> Error {
        let token = &self.current_token;
        Error::parse(message, token.position, token.line, token.column)
    }

    /// Error for the current token in a position where it doesn't fit. Lexer
    /// errors surface with their own message.
    fn unexpected(&self, context: &str) -> Error {
        if self.current_token_is(TokenType::Error) {
            return self.error_at(self.current_token.value.clone());
        }
        self.error_at(format!(
            "Unexpected {} {}",
            self.current_token.describe(),
            context
        ))
    }

    /// Expect a specific token type and advance
    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token> {
        if self.current_token_is(token_type) {
            let token = self.current_token.clone();
            self.advance();
            Ok(token)
        } else {
            Err(self.unexpected(&format!("(expected {})", what)))
        }
    }

    /// Parse the entire expression (top-level entry point)
    pub fn parse(&mut self) -> Result<Expression> {
        if self.current_token_is(TokenType::Eof) {
            return Err(self.error_at("Empty expression"));
        }

        let expr = self.parse_expression()?;

        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected("after end of expression"));
        }

        Ok(expr)
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(self.error_at(format!(
                "Expression too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        Ok(())
    }

    fn decrement_recursion_depth(&mut self) {
        self.recursion_depth -= 1;
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.check_recursion_depth()?;
        let expr = self.parse_or_expression()?;
        self.decrement_recursion_depth();
        Ok(expr)
    }

    fn parse_or_expression(&mut self) -> Result<Expression> {
        let first = self.parse_and_expression()?;
        if !self.current_token_is(TokenType::Or) {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.current_token_is(TokenType::Or) {
            self.advance(); // Skip 'or'
            operands.push(self.parse_and_expression()?);
        }
        Ok(Expression::Nary {
            op: NaryOperator::Or,
            operands,
        })
    }

    fn parse_and_expression(&mut self) -> Result<Expression> {
        let first = self.parse_not_expression()?;
        if !self.current_token_is(TokenType::And) {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.current_token_is(TokenType::And) {
            self.advance(); // Skip 'and'
            operands.push(self.parse_not_expression()?);
        }
        Ok(Expression::Nary {
            op: NaryOperator::And,
            operands,
        })
    }

    fn parse_not_expression(&mut self) -> Result<Expression> {
        if !self.current_token_is(TokenType::Not) {
            return self.parse_comparison();
        }

        self.check_recursion_depth()?;
        self.advance(); // Skip 'not'
        let operand = self.parse_not_expression()?;
        self.decrement_recursion_depth();
        Ok(Expression::unary(UnaryOperator::Not, operand))
    }

    fn comparison_operator(token_type: TokenType) -> Option<BinaryOperator> {
        let op = match token_type {
            TokenType::Equal => BinaryOperator::Equal,
            TokenType::NotEqual => BinaryOperator::NotEqual,
            TokenType::LessThan => BinaryOperator::LessThan,
            TokenType::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
            TokenType::GreaterThan => BinaryOperator::GreaterThan,
            TokenType::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
            _ => return None,
        };
        Some(op)
    }

    const COMPARISON_TOKENS: &'static [TokenType] = &[
        TokenType::Equal,
        TokenType::NotEqual,
        TokenType::LessThan,
        TokenType::LessThanOrEqual,
        TokenType::GreaterThan,
        TokenType::GreaterThanOrEqual,
        TokenType::Like,
        TokenType::LikeIgnoreCase,
        TokenType::In,
        TokenType::Between,
    ];

    /// Parse comparison: scalar (op scalar)?
    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_bitwise_or()?;

        let negated = self.current_token_is(TokenType::Not);
        if negated {
            self.advance(); // Skip 'not'
        }

        let token_type = self.current_token.token_type;
        let expr = if let Some(op) = Self::comparison_operator(token_type).filter(|_| !negated) {
            self.advance();
            let right = self.parse_bitwise_or()?;
            Expression::binary(op, left, right)
        } else {
            match token_type {
                TokenType::Like | TokenType::LikeIgnoreCase => {
                    let op = match (token_type, negated) {
                        (TokenType::Like, false) => BinaryOperator::Like,
                        (TokenType::Like, true) => BinaryOperator::NotLike,
                        (_, false) => BinaryOperator::LikeIgnoreCase,
                        (_, true) => BinaryOperator::NotLikeIgnoreCase,
                    };
                    self.advance();
                    let pattern = self.parse_bitwise_or()?;
                    Expression::binary(op, left, pattern)
                }
                TokenType::In => {
                    self.advance();
                    let op = if negated {
                        BinaryOperator::NotIn
                    } else {
                        BinaryOperator::In
                    };
                    let right = self.parse_in_operand()?;
                    Expression::binary(op, left, right)
                }
                TokenType::Between => {
                    self.advance();
                    let low = self.parse_bitwise_or()?;
                    self.expect(TokenType::And, "'and' in between")?;
                    let high = self.parse_bitwise_or()?;
                    let op = if negated {
                        NaryOperator::NotBetween
                    } else {
                        NaryOperator::Between
                    };
                    Expression::Nary {
                        op,
                        operands: vec![left, low, high],
                    }
                }
                _ if negated => {
                    return Err(self.unexpected("after 'not' (expected like, likeIgnoreCase, in or between)"));
                }
                _ => return Ok(left),
            }
        };

        if self.current_token_is_one_of(Self::COMPARISON_TOKENS) {
            return Err(self.error_at("Comparison operators can't be chained"));
        }

        Ok(expr)
    }

    /// Right side of `in`: a parenthesized list, or any scalar that
    /// evaluates to a collection.
    fn parse_in_operand(&mut self) -> Result<Expression> {
        if !self.current_token_is(TokenType::OpenParen) {
            return self.parse_bitwise_or();
        }

        self.advance(); // Skip '('
        let mut items = Vec::new();
        if !self.current_token_is(TokenType::CloseParen) {
            loop {
                items.push(self.parse_expression()?);
                if self.current_token_is(TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen, "')' closing the list")?;
        Ok(Expression::list(items))
    }

    /// Left-associative binary level over `next`.
    fn parse_binary_level(
        &mut self,
        operators: &[(TokenType, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expression>,
    ) -> Result<Expression> {
        let mut left = next(self)?;

        while let Some((_, op)) = operators
            .iter()
            .find(|(token_type, _)| self.current_token_is(*token_type))
        {
            let op = *op;
            self.advance();
            let right = next(self)?;
            left = Expression::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[(TokenType::Pipe, BinaryOperator::BitwiseOr)],
            Self::parse_bitwise_xor,
        )
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[(TokenType::Caret, BinaryOperator::BitwiseXor)],
            Self::parse_bitwise_and,
        )
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[(TokenType::Ampersand, BinaryOperator::BitwiseAnd)],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[
                (TokenType::ShiftLeft, BinaryOperator::ShiftLeft),
                (TokenType::ShiftRight, BinaryOperator::ShiftRight),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[
                (TokenType::Plus, BinaryOperator::Add),
                (TokenType::Minus, BinaryOperator::Subtract),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        self.parse_binary_level(
            &[
                (TokenType::Multiply, BinaryOperator::Multiply),
                (TokenType::Divide, BinaryOperator::Divide),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.current_token.token_type {
            TokenType::Minus => UnaryOperator::Negate,
            TokenType::Tilde => UnaryOperator::BitwiseNot,
            _ => return self.parse_primary(),
        };

        self.check_recursion_depth()?;
        self.advance(); // Skip operator

        let expr = if op == UnaryOperator::Negate && self.current_token.token_type.is_numeric_literal() {
            let token = self.current_token.clone();
            self.advance();
            Expression::Literal(self.numeric_literal(&token, true)?)
        } else {
            let operand = self.parse_unary()?;
            Expression::unary(op, operand)
        };

        self.decrement_recursion_depth();
        Ok(expr)
    }

    fn numeric_literal(&self, token: &Token, negative: bool) -> Result<Value> {
        let text = token.value.as_str();
        let out_of_range = || {
            Error::parse(
                format!("Numeric literal '{}' is out of range", text),
                token.position,
                token.line,
                token.column,
            )
        };

        let value = match token.token_type {
            TokenType::IntegerLiteral | TokenType::LongLiteral => {
                let magnitude: i128 = text.parse().map_err(|_| out_of_range())?;
                let n = if negative { -magnitude } else { magnitude };
                if token.token_type == TokenType::IntegerLiteral {
                    if let Ok(small) = i32::try_from(n) {
                        return Ok(Value::Int(small));
                    }
                }
                Value::Long(i64::try_from(n).map_err(|_| out_of_range())?)
            }
            TokenType::FloatLiteral => {
                let f: f32 = text.parse().map_err(|_| out_of_range())?;
                if !f.is_finite() {
                    return Err(out_of_range());
                }
                Value::Float(if negative { -f } else { f })
            }
            _ => {
                let d: f64 = text.parse().map_err(|_| out_of_range())?;
                if !d.is_finite() {
                    return Err(out_of_range());
                }
                Value::Double(if negative { -d } else { d })
            }
        };
        Ok(value)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.current_token.clone();

        match token.token_type {
            TokenType::IntegerLiteral
            | TokenType::LongLiteral
            | TokenType::FloatLiteral
            | TokenType::DoubleLiteral => {
                self.advance();
                Ok(Expression::Literal(self.numeric_literal(&token, false)?))
            }
            TokenType::StringLiteral => {
                self.advance();
                Ok(Expression::Literal(Value::String(token.value)))
            }
            TokenType::True | TokenType::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(
                    token.token_type == TokenType::True,
                )))
            }
            TokenType::Null => {
                self.advance();
                Ok(Expression::Literal(Value::Null))
            }
            TokenType::EnumLiteral => {
                self.advance();
                let value = EnumValue::parse(&token.value).ok_or_else(|| {
                    Error::parse(
                        format!("Invalid enum literal 'enum:{}'", token.value),
                        token.position,
                        token.line,
                        token.column,
                    )
                })?;
                Ok(Expression::Literal(Value::Enum(value)))
            }
            TokenType::Parameter => {
                self.advance();
                Ok(match token.value.strip_suffix('?') {
                    Some(name) => Expression::Parameter(ParameterRef::optional(name)),
                    None => Expression::parameter(token.value),
                })
            }
            TokenType::Path => {
                self.advance();
                if self.current_token_is(TokenType::OpenParen) && is_plain_name(&token.value) {
                    return self.parse_function_call(token);
                }
                let path = Path::parse(&token.value)?;
                Ok(Expression::Path(path))
            }
            TokenType::OpenParen => {
                self.advance(); // Skip '('
                let expr = self.parse_expression()?;
                if self.current_token_is(TokenType::Comma) {
                    return Err(self.error_at("List literals are only allowed after 'in'"));
                }
                self.expect(TokenType::CloseParen, "')'")?;
                Ok(expr)
            }
            TokenType::Case => self.parse_case(),
            _ => Err(self.unexpected("(expected a value)")),
        }
    }

    fn parse_function_call(&mut self, name_token: Token) -> Result<Expression> {
        let name = name_token.value;
        let metadata = get_function(&name).ok_or_else(|| {
            Error::parse(
                format!("Unknown function '{}'", name),
                name_token.position,
                name_token.line,
                name_token.column,
            )
        })?;

        self.advance(); // Skip '('
        let mut args = Vec::new();
        if !self.current_token_is(TokenType::CloseParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.current_token_is(TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen, "')' closing the argument list")?;

        if !metadata.accepts(args.len()) {
            return Err(Error::parse(
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    metadata.arity(),
                    args.len()
                ),
                name_token.position,
                name_token.line,
                name_token.column,
            ));
        }

        Ok(Expression::Function { name, args })
    }

    fn parse_case(&mut self) -> Result<Expression> {
        self.check_recursion_depth()?;
        self.advance(); // Skip 'case'

        let mut conditions = Vec::new();
        let mut results = Vec::new();
        while self.current_token_is(TokenType::When) {
            self.advance();
            conditions.push(self.parse_expression()?);
            self.expect(TokenType::Then, "'then'")?;
            results.push(self.parse_expression()?);
        }
        if conditions.is_empty() {
            return Err(self.unexpected("(expected 'when')"));
        }

        let default = if self.current_token_is(TokenType::Else) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenType::End, "'end'")?;

        self.decrement_recursion_depth();
        Expression::case_when(conditions, results, default)
    }
}

/// A bare identifier, without namespace, separators or markers.
fn is_plain_name(text: &str) -> bool {
    !text.contains(|c| matches!(c, '.' | ':' | '+' | '|'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParameterRef;

    #[test]
    fn test_path() {
        let expr = parse("toArtist.artistName").unwrap();
        assert_eq!(expr, Expression::path("toArtist.artistName").unwrap());
    }

    #[test]
    fn test_equality() {
        let expr = parse("artistName = 'bla'").unwrap();
        assert!(matches!(
            expr,
            Expression::Binary {
                op: BinaryOperator::Equal,
                ..
            }
        ));
    }

    #[test]
    fn test_and_chain_is_flat() {
        let expr = parse("a = 1 and b = 2 and c = 3").unwrap();
        match expr {
            Expression::Nary {
                op: NaryOperator::And,
                operands,
            } => assert_eq!(operands.len(), 3),
            other => panic!("Expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let expr = parse("a = 1 or b = 2 and c = 3").unwrap();
        match expr {
            Expression::Nary {
                op: NaryOperator::Or,
                operands,
            } => {
                assert!(matches!(
                    operands[1],
                    Expression::Nary {
                        op: NaryOperator::And,
                        ..
                    }
                ));
            }
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_symbolic_connectives() {
        assert_eq!(
            parse("a = 1 && !(b = 2) || c = 3").unwrap(),
            parse("a = 1 and not (b = 2) or c = 3").unwrap()
        );
    }

    #[test]
    fn test_numeric_kinds() {
        assert_eq!(parse("1").unwrap(), Expression::literal(1));
        assert_eq!(parse("3000000000").unwrap(), Expression::literal(3_000_000_000i64));
        assert_eq!(parse("1L").unwrap(), Expression::literal(1i64));
        assert_eq!(parse("1.5").unwrap(), Expression::literal(1.5f64));
        assert_eq!(parse("1.5f").unwrap(), Expression::literal(1.5f32));
        assert_eq!(parse("2d").unwrap(), Expression::literal(2.0f64));
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(parse("-3").unwrap(), Expression::literal(-3));
        assert_eq!(parse("-2147483648").unwrap(), Expression::literal(i32::MIN));
        assert_eq!(parse("-1.5").unwrap(), Expression::literal(-1.5f64));
        assert!(matches!(
            parse("-a").unwrap(),
            Expression::Unary {
                op: UnaryOperator::Negate,
                ..
            }
        ));
    }

    #[test]
    fn test_bitwise_precedence() {
        // (1 << 1) & 2
        let expr = parse("1 << 1 & 2").unwrap();
        assert!(matches!(
            expr,
            Expression::Binary {
                op: BinaryOperator::BitwiseAnd,
                ..
            }
        ));
        // (2 * 2) | 2
        let expr = parse("2*2|2").unwrap();
        assert!(matches!(
            expr,
            Expression::Binary {
                op: BinaryOperator::BitwiseOr,
                ..
            }
        ));
    }

    #[test]
    fn test_arithmetic_is_left_associative() {
        let expr = parse("a - b - c").unwrap();
        match expr {
            Expression::Binary {
                op: BinaryOperator::Subtract,
                left,
                ..
            } => assert!(matches!(
                *left,
                Expression::Binary {
                    op: BinaryOperator::Subtract,
                    ..
                }
            )),
            other => panic!("Expected Subtract, got {:?}", other),
        }
    }

    #[test]
    fn test_negated_comparisons() {
        for (text, op) in [
            ("a not like 'x%'", BinaryOperator::NotLike),
            ("a not likeIgnoreCase 'x%'", BinaryOperator::NotLikeIgnoreCase),
            ("a not in (1, 2)", BinaryOperator::NotIn),
        ] {
            match parse(text).unwrap() {
                Expression::Binary { op: actual, .. } => assert_eq!(actual, op, "{}", text),
                other => panic!("Expected binary for '{}', got {:?}", text, other),
            }
        }
        assert!(matches!(
            parse("a not between 1 and 2").unwrap(),
            Expression::Nary {
                op: NaryOperator::NotBetween,
                ..
            }
        ));
    }

    #[test]
    fn test_between_inside_and() {
        let expr = parse("a between 1 and 2 and b = 3").unwrap();
        match expr {
            Expression::Nary {
                op: NaryOperator::And,
                operands,
            } => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(
                    operands[0],
                    Expression::Nary {
                        op: NaryOperator::Between,
                        ..
                    }
                ));
            }
            other => panic!("Expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_in_operands() {
        let expr = parse("a in ('x', 'y')").unwrap();
        match expr {
            Expression::Binary { right, .. } => assert_eq!(
                *right,
                Expression::list(vec![Expression::literal("x"), Expression::literal("y")])
            ),
            other => panic!("Expected In, got {:?}", other),
        }
        assert!(parse("a in $names").is_ok());
        assert!(parse("a in ()").is_ok());
    }

    #[test]
    fn test_parameters_and_enums() {
        let expr = parse("a = $name").unwrap();
        match expr {
            Expression::Binary { right, .. } => {
                assert_eq!(*right, Expression::Parameter(ParameterRef::new("name")))
            }
            other => panic!("Expected Equal, got {:?}", other),
        }
        let expr = parse("a = $name?").unwrap();
        match expr {
            Expression::Binary { right, .. } => {
                assert_eq!(*right, Expression::Parameter(ParameterRef::optional("name")))
            }
            other => panic!("Expected Equal, got {:?}", other),
        }
        let expr = parse("a = enum:org.example.ExpEnum1.THREE").unwrap();
        match expr {
            Expression::Binary { right, .. } => assert_eq!(
                *right,
                Expression::literal(EnumValue::new("org.example.ExpEnum1", "THREE"))
            ),
            other => panic!("Expected Equal, got {:?}", other),
        }
    }

    #[test]
    fn test_function_calls() {
        assert!(matches!(
            parse("upper(artistName) = 'X'").unwrap(),
            Expression::Binary { .. }
        ));
        assert!(parse("count()").is_ok());
        assert!(parse("substring(a, 1, 2)").is_ok());
    }

    #[test]
    fn test_function_errors() {
        let err = parse("nosuch(a)").unwrap_err();
        assert!(err.to_string().contains("Unknown function 'nosuch'"));
        let err = parse("upper(a, b)").unwrap_err();
        assert!(err.to_string().contains("expects 1 argument(s), got 2"));
    }

    #[test]
    fn test_case_when() {
        let expr = parse("case when a = 1 then 'one' when a = 2 then 'two' else 'many' end").unwrap();
        match expr {
            Expression::CaseWhen {
                conditions,
                default,
                ..
            } => {
                assert_eq!(conditions.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("Expected CaseWhen, got {:?}", other),
        }
        assert!(parse("case else 1 end").is_err());
        assert!(parse("case when a then 1").is_err());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            parse("a = 1 AND b LIKE 'x' Or NOT c").unwrap(),
            parse("a = 1 and b like 'x' or not c").unwrap()
        );
    }

    #[test]
    fn test_errors() {
        for text in [
            "",
            "a =",
            "a = 1 b",
            "(a = 1",
            "a = = 1",
            "a < b < c",
            "a not = 1",
            "(1, 2) = a",
            "a between 1",
            "'open",
            "a..b",
        ] {
            assert!(parse(text).is_err(), "expected '{}' to fail", text);
        }
    }

    #[test]
    fn test_error_position() {
        let err = parse("a = 1 and\n b = ").unwrap_err();
        match err {
            Error::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_recursion_limit() {
        let deep = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        let err = parse(&deep).unwrap_err();
        assert!(err.to_string().contains("too deeply nested"));
    }
}
