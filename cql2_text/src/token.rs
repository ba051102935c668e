//! Token types for the CQL2 text lexer

#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    NumberLiteral,

    // Bare words: property names, function names and keywords
    Identifier,
    // "double quoted" property names
    DelimitedIdentifier,

    // Operators
    Equal,              // =
    NotEqual,           // <>
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    Plus,               // +
    Minus,              // -
    Star,               // *
    Slash,              // /
    Percent,            // %
    Caret,              // ^

    // Delimiters
    OpenParen,  // (
    CloseParen, // )
    Comma,      // ,

    Eof,
}

/// A token in the CQL2 text expression
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, position: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            position,
        }
    }

    pub fn eof(position: usize) -> Self {
        Self::new(TokenType::Eof, String::new(), position)
    }

    /// Case-insensitive keyword check for bare words
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Identifier && self.value.eq_ignore_ascii_case(keyword)
    }
}
