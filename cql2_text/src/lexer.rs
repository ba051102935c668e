//! CQL2 text lexer - tokenizes filter strings
//!
//! Keywords are not distinguished here: they come out as identifiers and the
//! parser matches them case-insensitively.

use crate::error::{Cql2Error, Result};
use crate::token::{Token, TokenType};

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Read a single-quoted string; `''` is an escaped quote
    fn read_string(&mut self) -> Result<String> {
        let start = self.position;
        self.advance();

        let mut value = String::new();
        loop {
            match self.current() {
                Some('\'') if self.peek() == Some('\'') => {
                    value.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(Cql2Error::ParseError(format!(
                        "Unterminated string literal starting at position {}",
                        start
                    )))
                }
            }
        }
    }

    /// Read a double-quoted identifier; `""` is an escaped quote
    fn read_delimited_identifier(&mut self) -> Result<String> {
        let start = self.position;
        self.advance();

        let mut value = String::new();
        loop {
            match self.current() {
                Some('"') if self.peek() == Some('"') => {
                    value.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(Cql2Error::ParseError(format!(
                        "Unterminated quoted identifier starting at position {}",
                        start
                    )))
                }
            }
        }
    }

    fn read_number(&mut self) -> String {
        let start = self.position;

        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.current() == Some('.') {
            self.advance();
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let exponent_digit = match self.peek() {
                Some('+' | '-') => self
                    .chars
                    .get(self.position + 2)
                    .is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_digit {
                self.advance();
                if matches!(self.current(), Some('+' | '-')) {
                    self.advance();
                }
                while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        self.chars[start..self.position].iter().collect()
    }

    /// Property paths such as `eo:cloud_cover` or `properties.datetime`
    fn read_identifier(&mut self) -> String {
        let start = self.position;

        while matches!(self.current(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | ':' | '.'))
        {
            self.advance();
        }

        self.chars[start..self.position].iter().collect()
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let position = self.position;
        let Some(c) = self.current() else {
            return Ok(Token::eof(position));
        };

        let token = match c {
            '\'' => Token::new(TokenType::StringLiteral, self.read_string()?, position),
            '"' => Token::new(
                TokenType::DelimitedIdentifier,
                self.read_delimited_identifier()?,
                position,
            ),
            '0'..='9' => Token::new(TokenType::NumberLiteral, self.read_number(), position),
            '.' if self.peek().is_some_and(|n| n.is_ascii_digit()) => {
                Token::new(TokenType::NumberLiteral, self.read_number(), position)
            }
            c if c.is_alphabetic() || c == '_' => {
                Token::new(TokenType::Identifier, self.read_identifier(), position)
            }
            '(' => self.single(TokenType::OpenParen, "("),
            ')' => self.single(TokenType::CloseParen, ")"),
            ',' => self.single(TokenType::Comma, ","),
            '+' => self.single(TokenType::Plus, "+"),
            '-' => self.single(TokenType::Minus, "-"),
            '*' => self.single(TokenType::Star, "*"),
            '/' => self.single(TokenType::Slash, "/"),
            '%' => self.single(TokenType::Percent, "%"),
            '^' => self.single(TokenType::Caret, "^"),
            '=' => self.single(TokenType::Equal, "="),
            '<' => match self.peek() {
                Some('=') => self.double(TokenType::LessThanOrEqual, "<="),
                Some('>') => self.double(TokenType::NotEqual, "<>"),
                _ => self.single(TokenType::LessThan, "<"),
            },
            '>' => match self.peek() {
                Some('=') => self.double(TokenType::GreaterThanOrEqual, ">="),
                _ => self.single(TokenType::GreaterThan, ">"),
            },
            '!' if self.peek() == Some('=') => self.double(TokenType::NotEqual, "!="),
            other => {
                return Err(Cql2Error::ParseError(format!(
                    "Unexpected character '{}' at position {}",
                    other, position
                )))
            }
        };

        Ok(token)
    }

    fn single(&mut self, token_type: TokenType, text: &str) -> Token {
        let token = Token::new(token_type, text, self.position);
        self.advance();
        token
    }

    fn double(&mut self, token_type: TokenType, text: &str) -> Token {
        let token = Token::new(token_type, text, self.position);
        self.advance();
        self.advance();
        token
    }

    /// Tokenize the whole input, ending with an `Eof` token
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
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
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_comparison_tokens() {
        assert_eq!(
            types("a <> 1 AND b <= 2.5"),
            vec![
                TokenType::Identifier,
                TokenType::NotEqual,
                TokenType::NumberLiteral,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::LessThanOrEqual,
                TokenType::NumberLiteral,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_string_with_escaped_quote() {
        let tokens = Lexer::new("'it''s'").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::StringLiteral);
        assert_eq!(tokens[0].value, "it's");
    }

    #[test]
    fn test_prefixed_property_names() {
        let tokens = Lexer::new("eo:cloud_cover properties.datetime \"weird name\"")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].value, "eo:cloud_cover");
        assert_eq!(tokens[1].value, "properties.datetime");
        assert_eq!(tokens[2].token_type, TokenType::DelimitedIdentifier);
        assert_eq!(tokens[2].value, "weird name");
    }

    #[test]
    fn test_exponent_numbers() {
        let tokens = Lexer::new("1.5e-3 2E10").tokenize().unwrap();
        assert_eq!(tokens[0].value, "1.5e-3");
        assert_eq!(tokens[1].value, "2E10");
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            types("a + 2 * b ^ 3 % 4 / 5"),
            vec![
                TokenType::Identifier,
                TokenType::Plus,
                TokenType::NumberLiteral,
                TokenType::Star,
                TokenType::Identifier,
                TokenType::Caret,
                TokenType::NumberLiteral,
                TokenType::Percent,
                TokenType::NumberLiteral,
                TokenType::Slash,
                TokenType::NumberLiteral,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Lexer::new("id = 'x").tokenize(),
            Err(Cql2Error::ParseError(_))
        ));
    }
}
