//! Token types for the expression lexer

#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    IntegerLiteral, // 123 (Int or Long depending on magnitude)
    LongLiteral,    // 123L
    FloatLiteral,   // 1.5f
    DoubleLiteral,  // 1.5, 1e3, 1.5d
    EnumLiteral,    // enum:pkg.Type.CONST

    // Paths and names
    Path,      // a.b+.c, db:A.B, obj:a
    Parameter, // $name

    // Keywords
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Like,
    LikeIgnoreCase,
    In,
    Between,
    Case,
    When,
    Then,
    Else,
    End,

    // Operators
    Plus,               // +
    Minus,              // -
    Multiply,           // *
    Divide,             // /
    Ampersand,          // &
    Pipe,               // |
    Caret,              // ^
    Tilde,              // ~
    ShiftLeft,          // <<
    ShiftRight,         // >>
    Equal,              // = or ==
    NotEqual,           // != or <>
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Delimiters
    OpenParen,  // (
    CloseParen, // )
    Comma,      // ,

    Eof,

    Error,
}

impl TokenType {
    pub fn is_numeric_literal(self) -> bool {
        matches!(
            self,
            TokenType::IntegerLiteral
                | TokenType::LongLiteral
                | TokenType::FloatLiteral
                | TokenType::DoubleLiteral
        )
    }

    /// Keyword for a bare word, matched case-insensitively.
    pub fn keyword(word: &str) -> Option<TokenType> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "true" => TokenType::True,
            "false" => TokenType::False,
            "null" => TokenType::Null,
            "and" => TokenType::And,
            "or" => TokenType::Or,
            "not" => TokenType::Not,
            "like" => TokenType::Like,
            "likeignorecase" => TokenType::LikeIgnoreCase,
            "in" => TokenType::In,
            "between" => TokenType::Between,
            "case" => TokenType::Case,
            "when" => TokenType::When,
            "then" => TokenType::Then,
            "else" => TokenType::Else,
            "end" => TokenType::End,
            _ => return None,
        };
        Some(keyword)
    }
}

/// A token in the expression text
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: String,
        position: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value,
            position,
            line,
            column,
        }
    }

    pub fn eof(position: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: TokenType::Eof,
            value: String::new(),
            position,
            line,
            column,
        }
    }

    pub fn error(message: String, position: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: TokenType::Error,
            value: message,
            position,
            line,
            column,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self.token_type {
            TokenType::Eof => "end of input".to_string(),
            TokenType::StringLiteral => format!("string '{}'", self.value),
            _ => format!("'{}'", self.value),
        }
    }
}
