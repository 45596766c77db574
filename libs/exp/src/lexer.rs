//! Expression lexer - tokenizes expression strings
//!
//! Paths are lexed as a single token, including their namespace prefix and
//! segment markers. A `+` directly after a segment name is an outer-join
//! marker when it ends the path (`a+`, `a+.b`); a `|` directly between two
//! segment names is a split marker (`a|b`). With surrounding whitespace both
//! characters are operators.

use crate::path::{is_identifier_char, is_identifier_start};
use crate::token::{Token, TokenType};

pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;
        while let Some(c) = self.current_char {
            if is_identifier_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read the remainder of a path after its first segment name. Returns
    /// whether any separator or marker was consumed.
    fn read_path_tail(&mut self, text: &mut String) -> bool {
        let mut compound = false;
        loop {
            match self.current_char {
                Some('+')
                    if matches!(
                        self.peek(),
                        None | Some('.') | Some('|') | Some(')') | Some(',')
                    ) || self.peek().map(char::is_whitespace).unwrap_or(false) =>
                {
                    text.push('+');
                    self.advance();
                    compound = true;
                }
                Some(sep @ ('.' | '|')) if self.peek().map(is_identifier_start).unwrap_or(false) => {
                    text.push(sep);
                    self.advance();
                    text.push_str(&self.read_identifier());
                    compound = true;
                }
                _ => return compound,
            }
        }
    }

    /// Read a path, enum literal or keyword.
    fn read_word(&mut self, position: usize, line: usize, column: usize) -> Token {
        let word = self.read_identifier();

        if self.current_char == Some(':') {
            match word.as_str() {
                "enum" => {
                    self.advance();
                    let mut name = self.read_identifier();
                    while self.current_char == Some('.')
                        && self.peek().map(is_identifier_start).unwrap_or(false)
                    {
                        self.advance();
                        name.push('.');
                        name.push_str(&self.read_identifier());
                    }
                    if !name.contains('.') {
                        return Token::error(
                            format!("Invalid enum literal 'enum:{}'", name),
                            position,
                            line,
                            column,
                        );
                    }
                    return Token::new(TokenType::EnumLiteral, name, position, line, column);
                }
                "db" | "obj" => {
                    self.advance();
                    let mut text = format!("{}:", word);
                    if self.current_char == Some('|') {
                        text.push('|');
                        self.advance();
                    }
                    if !self.current_char.map(is_identifier_start).unwrap_or(false) {
                        return Token::error(
                            format!("Expected path after '{}'", text),
                            position,
                            line,
                            column,
                        );
                    }
                    text.push_str(&self.read_identifier());
                    self.read_path_tail(&mut text);
                    return Token::new(TokenType::Path, text, position, line, column);
                }
                _ => {}
            }
        }

        let mut text = word;
        if !self.read_path_tail(&mut text) {
            if let Some(keyword) = TokenType::keyword(&text) {
                return Token::new(keyword, text, position, line, column);
            }
        }
        Token::new(TokenType::Path, text, position, line, column)
    }

    /// Read a string literal quoted with `quote`. A doubled quote or a
    /// backslash escape produces a literal quote.
    fn read_string(&mut self, quote: char) -> Result<String, String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                if self.peek() == Some(quote) {
                    value.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // Skip closing quote
                    return Ok(value);
                }
            } else if c == '\\' {
                self.advance();
                let Some(escaped) = self.current_char else {
                    return Err("Incomplete escape sequence".into());
                };
                match escaped {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    'u' => {
                        self.advance(); // Skip 'u'
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.current_char {
                                Some(h) if h.is_ascii_hexdigit() => {
                                    hex.push(h);
                                    self.advance();
                                }
                                _ => return Err("Invalid unicode escape sequence".into()),
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| "Invalid unicode code point".to_string())?;
                        value.push(
                            char::from_u32(code)
                                .ok_or_else(|| "Invalid unicode character".to_string())?,
                        );
                        continue; // Already positioned after the sequence
                    }
                    other => value.push(other),
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Err("Unterminated string literal".into())
    }

    fn consume_digits(&mut self) {
        while self.current_char.map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }
    }

    /// Read a numeric literal and classify it by its shape and suffix. The
    /// token value excludes the suffix.
    fn read_number(&mut self) -> Result<(String, TokenType), String> {
        let start_pos = self.position;
        let mut fractional = false;

        self.consume_digits();

        if self.current_char == Some('.') && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            fractional = true;
            self.advance();
            self.consume_digits();
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            let after = self.peek();
            let signed_digit = matches!(after, Some('+') | Some('-'))
                && self
                    .chars
                    .get(self.position + 2)
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false);
            if after.map(|c| c.is_ascii_digit()).unwrap_or(false) || signed_digit {
                fractional = true;
                self.advance();
                if signed_digit {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        let text: String = self.chars[start_pos..self.position].iter().collect();

        let token_type = match self.current_char {
            Some('L') | Some('l') if !fractional => {
                self.advance();
                TokenType::LongLiteral
            }
            Some('f') | Some('F') => {
                self.advance();
                TokenType::FloatLiteral
            }
            Some('d') | Some('D') => {
                self.advance();
                TokenType::DoubleLiteral
            }
            _ if fractional => TokenType::DoubleLiteral,
            _ => TokenType::IntegerLiteral,
        };

        if self.current_char.map(is_identifier_char).unwrap_or(false) {
            return Err(format!("Invalid numeric literal '{}'", text));
        }

        Ok((text, token_type))
    }

    fn single(&mut self, token_type: TokenType, text: &str, position: usize, line: usize, column: usize) -> Token {
        self.advance();
        Token::new(token_type, text.into(), position, line, column)
    }

    /// Two-character operator if the next char matches, else `fallback`.
    fn pair(
        &mut self,
        next: char,
        token_type: TokenType,
        text: &str,
        fallback: (TokenType, &str),
        position: usize,
        line: usize,
        column: usize,
    ) -> Token {
        self.advance();
        if self.current_char == Some(next) {
            self.advance();
            Token::new(token_type, text.into(), position, line, column)
        } else {
            Token::new(fallback.0, fallback.1.into(), position, line, column)
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(position, line, column);
        };

        match c {
            '(' => self.single(TokenType::OpenParen, "(", position, line, column),
            ')' => self.single(TokenType::CloseParen, ")", position, line, column),
            ',' => self.single(TokenType::Comma, ",", position, line, column),
            '+' => self.single(TokenType::Plus, "+", position, line, column),
            '-' => self.single(TokenType::Minus, "-", position, line, column),
            '*' => self.single(TokenType::Multiply, "*", position, line, column),
            '/' => self.single(TokenType::Divide, "/", position, line, column),
            '^' => self.single(TokenType::Caret, "^", position, line, column),
            '~' => self.single(TokenType::Tilde, "~", position, line, column),
            '=' => self.pair(
                '=',
                TokenType::Equal,
                "==",
                (TokenType::Equal, "="),
                position,
                line,
                column,
            ),
            '&' => self.pair(
                '&',
                TokenType::And,
                "&&",
                (TokenType::Ampersand, "&"),
                position,
                line,
                column,
            ),
            '|' => self.pair(
                '|',
                TokenType::Or,
                "||",
                (TokenType::Pipe, "|"),
                position,
                line,
                column,
            ),
            '!' => self.pair(
                '=',
                TokenType::NotEqual,
                "!=",
                (TokenType::Not, "!"),
                position,
                line,
                column,
            ),
            '<' => {
                self.advance();
                match self.current_char {
                    Some('=') => self.single(TokenType::LessThanOrEqual, "<=", position, line, column),
                    Some('>') => self.single(TokenType::NotEqual, "<>", position, line, column),
                    Some('<') => self.single(TokenType::ShiftLeft, "<<", position, line, column),
                    _ => Token::new(TokenType::LessThan, "<".into(), position, line, column),
                }
            }
            '>' => {
                self.advance();
                match self.current_char {
                    Some('=') => {
                        self.single(TokenType::GreaterThanOrEqual, ">=", position, line, column)
                    }
                    Some('>') => self.single(TokenType::ShiftRight, ">>", position, line, column),
                    _ => Token::new(TokenType::GreaterThan, ">".into(), position, line, column),
                }
            }
            '\'' | '"' => match self.read_string(c) {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position, line, column),
                Err(e) => Token::error(e, position, line, column),
            },
            '$' => {
                self.advance();
                if !self.current_char.map(is_identifier_start).unwrap_or(false) {
                    return Token::error(
                        "Expected parameter name after '$'".into(),
                        position,
                        line,
                        column,
                    );
                }
                let mut name = self.read_identifier();
                // `$name?` marks an optional parameter
                if self.current_char == Some('?') {
                    self.advance();
                    name.push('?');
                }
                Token::new(TokenType::Parameter, name, position, line, column)
            }
            c if c.is_ascii_digit() => match self.read_number() {
                Ok((value, token_type)) => Token::new(token_type, value, position, line, column),
                Err(e) => Token::error(e, position, line, column),
            },
            c if is_identifier_start(c) => self.read_word(position, line, column),
            other => {
                self.advance();
                Token::error(
                    format!("Unexpected character '{}'", other),
                    position,
                    line,
                    column,
                )
            }
        }
    }

    /// Tokenize the whole input, including the trailing `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.token_type, TokenType::Eof | TokenType::Error);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    fn values(input: &str) -> Vec<String> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_numeric_kinds() {
        assert_eq!(
            types("1 2L 3.0 4f 5.5d 1e3"),
            vec![
                TokenType::IntegerLiteral,
                TokenType::LongLiteral,
                TokenType::DoubleLiteral,
                TokenType::FloatLiteral,
                TokenType::DoubleLiteral,
                TokenType::DoubleLiteral,
                TokenType::Eof
            ]
        );
        assert_eq!(values("123L")[0], "123");
    }

    #[test]
    fn test_invalid_number() {
        assert_eq!(types("12abc")[0], TokenType::Error);
    }

    #[test]
    fn test_paths_and_markers() {
        assert_eq!(values("paintingArray+.toGallery")[0], "paintingArray+.toGallery");
        assert_eq!(values("db:toArtist.ARTIST_NAME")[0], "db:toArtist.ARTIST_NAME");
        assert_eq!(values("exhibits|paintings")[0], "exhibits|paintings");
        assert_eq!(values("obj:|exhibits.paintings")[0], "obj:|exhibits.paintings");
        assert_eq!(types("a+")[0], TokenType::Path);
    }

    #[test]
    fn test_operators_need_whitespace_to_split_paths() {
        assert_eq!(
            types("a | b"),
            vec![TokenType::Path, TokenType::Pipe, TokenType::Path, TokenType::Eof]
        );
        assert_eq!(
            types("a+1"),
            vec![
                TokenType::Path,
                TokenType::Plus,
                TokenType::IntegerLiteral,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            types("a and b OR not c likeIgnoreCase"),
            vec![
                TokenType::Path,
                TokenType::And,
                TokenType::Path,
                TokenType::Or,
                TokenType::Not,
                TokenType::Path,
                TokenType::LikeIgnoreCase,
                TokenType::Eof
            ]
        );
        // Dotted words are never keywords
        assert_eq!(types("in.x")[0], TokenType::Path);
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            types("= == != <> < <= > >= << >>"),
            vec![
                TokenType::Equal,
                TokenType::Equal,
                TokenType::NotEqual,
                TokenType::NotEqual,
                TokenType::LessThan,
                TokenType::LessThanOrEqual,
                TokenType::GreaterThan,
                TokenType::GreaterThanOrEqual,
                TokenType::ShiftLeft,
                TokenType::ShiftRight,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(values("'abc'")[0], "abc");
        assert_eq!(values("\"abc\"")[0], "abc");
        assert_eq!(values("'it''s'")[0], "it's");
        assert_eq!(values("\"a\\\"b\"")[0], "a\"b");
        assert_eq!(values("'\\u0041'")[0], "A");
        assert_eq!(types("'open")[0], TokenType::Error);
    }

    #[test]
    fn test_enum_and_parameters() {
        let tokens = Lexer::new("enum:org.example.ExpEnum1.ONE = $x").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::EnumLiteral);
        assert_eq!(tokens[0].value, "org.example.ExpEnum1.ONE");
        assert_eq!(tokens[2].token_type, TokenType::Parameter);
        assert_eq!(tokens[2].value, "x");
        assert_eq!(types("$ x")[0], TokenType::Error);
        assert_eq!(Lexer::new("$x? = 1").tokenize()[0].value, "x?");
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("a =\n  b").tokenize();
        assert_eq!(tokens[1].column, 3);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[2].column, 3);
        assert_eq!(tokens[2].position, 6);
    }
}
