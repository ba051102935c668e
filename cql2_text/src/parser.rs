//! CQL2 text parser - converts filter strings to an AST
//!
//! Recursive descent parser. Precedence (lowest to highest):
//! 1. OR
//! 2. AND
//! 3. NOT
//! 4. predicates (comparison, LIKE, BETWEEN, IN, IS NULL)
//! 5. `+` `-`
//! 6. `*` `/` `%` `div`
//! 7. `^`
//! 8. scalars (literals, properties, function calls, geometries, groups
//!    and array literals)
//!
//! Every nesting level and every arithmetic operator counts against
//! `MAX_RECURSION_DEPTH`, so hostile input fails with a parse error.

use crate::ast::{ArithmeticOp, ComparisonOp, Expr, Literal};
use crate::error::{Cql2Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Number, Value};

const MAX_RECURSION_DEPTH: usize = 64;

const RESERVED_WORDS: &[&str] = &[
    "AND", "OR", "NOT", "LIKE", "BETWEEN", "IN", "IS", "NULL", "DIV",
];

/// Parser for CQL2 text expressions
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    recursion_depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            position: 0,
            recursion_depth: 0,
        })
    }

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn current_is(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token> {
        let token = self.current().clone();
        if token.token_type != token_type {
            return Err(unexpected(&token, &format!("{:?}", token_type)));
        }
        self.advance();
        Ok(token)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.current().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(unexpected(self.current(), keyword))
        }
    }

    /// Parse the entire expression
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or_expression()?;

        if !self.current_is(TokenType::Eof) {
            return Err(unexpected(self.current(), "end of input"));
        }

        Ok(expr)
    }

    fn enter(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Cql2Error::ParseError(format!(
                "Expression too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
    }

    fn leave_times(&mut self, times: usize) {
        self.recursion_depth = self.recursion_depth.saturating_sub(times);
    }

    fn parse_or_expression(&mut self) -> Result<Expr> {
        let mut args = vec![self.parse_and_expression()?];
        while self.eat_keyword("OR") {
            args.push(self.parse_and_expression()?);
        }
        Ok(collapse(args, Expr::Or))
    }

    fn parse_and_expression(&mut self) -> Result<Expr> {
        let mut args = vec![self.parse_not_expression()?];
        while self.eat_keyword("AND") {
            args.push(self.parse_not_expression()?);
        }
        Ok(collapse(args, Expr::And))
    }

    fn parse_not_expression(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = if self.eat_keyword("NOT") {
            Expr::Not(Box::new(self.parse_not_expression()?))
        } else {
            self.parse_predicate()?
        };
        self.leave();
        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        if let Some(op) = comparison_op(self.current().token_type) {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        if self.current().is_keyword("IS") {
            self.advance();
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(negate(Expr::IsNull(Box::new(left)), negated));
        }

        let negated = self.current().is_keyword("NOT")
            && self.peek().is_some_and(|next| {
                next.is_keyword("LIKE") || next.is_keyword("BETWEEN") || next.is_keyword("IN")
            });
        if negated {
            self.advance();
        }

        let predicate = if self.eat_keyword("LIKE") {
            Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(self.parse_additive()?),
            }
        } else if self.eat_keyword("BETWEEN") {
            let low = self.parse_additive()?;
            self.expect_keyword("AND")?;
            let high = self.parse_additive()?;
            Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
            }
        } else if self.eat_keyword("IN") {
            self.expect(TokenType::OpenParen)?;
            let list = self.parse_scalar_list()?;
            self.expect(TokenType::CloseParen)?;
            Expr::In {
                expr: Box::new(left),
                list,
            }
        } else {
            // Boolean-valued functions, properties and groups stand on their own
            return Ok(left);
        };

        Ok(negate(predicate, negated))
    }

    fn parse_scalar_list(&mut self) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.current_is(TokenType::CloseParen) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_additive()?);
            if self.current_is(TokenType::Comma) {
                self.advance();
            } else {
                return Ok(items);
            }
        }
    }

    /// `+` and `-`, left associative
    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        let mut operators = 0;

        loop {
            let op = match self.current().token_type {
                TokenType::Plus => ArithmeticOp::Add,
                TokenType::Minus => ArithmeticOp::Subtract,
                _ => break,
            };
            self.advance();
            self.enter()?;
            operators += 1;

            let right = self.parse_multiplicative()?;
            left = arithmetic(op, left, right);
        }

        self.leave_times(operators);
        Ok(left)
    }

    /// `*`, `/`, `%` and `div`, left associative
    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_power()?;
        let mut operators = 0;

        loop {
            let op = match self.current().token_type {
                TokenType::Star => ArithmeticOp::Multiply,
                TokenType::Slash => ArithmeticOp::Divide,
                TokenType::Percent => ArithmeticOp::Modulo,
                _ if self.current().is_keyword("DIV") => ArithmeticOp::IntegerDivide,
                _ => break,
            };
            self.advance();
            self.enter()?;
            operators += 1;

            let right = self.parse_power()?;
            left = arithmetic(op, left, right);
        }

        self.leave_times(operators);
        Ok(left)
    }

    /// `^`, right associative
    fn parse_power(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_scalar()?];
        while self.current_is(TokenType::Caret) {
            self.advance();
            self.enter()?;
            operands.push(self.parse_scalar()?);
        }
        self.leave_times(operands.len() - 1);

        let mut result = operands.pop().ok_or_else(|| {
            Cql2Error::ParseError("Expected a value before '^'".to_string())
        })?;
        while let Some(base) = operands.pop() {
            result = arithmetic(ArithmeticOp::Power, base, result);
        }
        Ok(result)
    }

    fn parse_scalar(&mut self) -> Result<Expr> {
        self.enter()?;
        let token = self.current().clone();

        let expr = match token.token_type {
            TokenType::StringLiteral => {
                self.advance();
                Expr::Literal(Literal::String(token.value))
            }
            TokenType::NumberLiteral | TokenType::Minus => {
                Expr::Literal(Literal::Number(self.parse_signed_number()?))
            }
            TokenType::DelimitedIdentifier => {
                self.advance();
                Expr::Property(token.value)
            }
            TokenType::Identifier => self.parse_word(token)?,
            TokenType::OpenParen => self.parse_group()?,
            _ => return Err(unexpected(&token, "a value")),
        };

        self.leave();
        Ok(expr)
    }

    /// `(expr)` groups, `(a, b, ...)` and `()` are array literals
    fn parse_group(&mut self) -> Result<Expr> {
        self.expect(TokenType::OpenParen)?;
        if self.current_is(TokenType::CloseParen) {
            self.advance();
            return Ok(Expr::Array(Vec::new()));
        }

        let first = self.parse_or_expression()?;
        if !self.current_is(TokenType::Comma) {
            self.expect(TokenType::CloseParen)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.current_is(TokenType::Comma) {
            self.advance();
            items.push(self.parse_or_expression()?);
        }
        self.expect(TokenType::CloseParen)?;
        Ok(Expr::Array(items))
    }

    fn parse_word(&mut self, token: Token) -> Result<Expr> {
        let upper = token.value.to_ascii_uppercase();
        let called = self
            .peek()
            .is_some_and(|next| next.token_type == TokenType::OpenParen);

        match upper.as_str() {
            "TRUE" | "FALSE" => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(upper == "TRUE")))
            }
            "TIMESTAMP" if called => {
                let value = self.parse_quoted_argument()?;
                DateTime::parse_from_rfc3339(&value)
                    .map_err(|e| Cql2Error::InvalidTemporal(format!("{}: {}", value, e)))?;
                Ok(Expr::Literal(Literal::Timestamp(value)))
            }
            "DATE" if called => {
                let value = self.parse_quoted_argument()?;
                NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|e| Cql2Error::InvalidTemporal(format!("{}: {}", value, e)))?;
                Ok(Expr::Literal(Literal::Date(value)))
            }
            "INTERVAL" if called => {
                self.advance();
                self.expect(TokenType::OpenParen)?;
                let start = self.parse_additive()?;
                self.expect(TokenType::Comma)?;
                let end = self.parse_additive()?;
                self.expect(TokenType::CloseParen)?;
                Ok(Expr::Interval(Box::new(start), Box::new(end)))
            }
            "BBOX" if called => {
                self.advance();
                self.parse_bbox()
            }
            _ if geometry_type(&upper).is_some() => {
                self.advance();
                Ok(Expr::Geometry(self.parse_geometry(&upper)?))
            }
            _ if called => {
                self.advance();
                self.expect(TokenType::OpenParen)?;
                let args = self.parse_scalar_list()?;
                self.expect(TokenType::CloseParen)?;
                Ok(Expr::Function {
                    name: function_name(&token.value),
                    args,
                })
            }
            _ if RESERVED_WORDS.contains(&upper.as_str()) => Err(unexpected(&token, "a value")),
            _ => {
                self.advance();
                Ok(Expr::Property(token.value))
            }
        }
    }

    /// `KEYWORD('value')`, returning the string
    fn parse_quoted_argument(&mut self) -> Result<String> {
        self.advance();
        self.expect(TokenType::OpenParen)?;
        let value = self.expect(TokenType::StringLiteral)?.value;
        self.expect(TokenType::CloseParen)?;
        Ok(value)
    }

    fn parse_signed_number(&mut self) -> Result<Number> {
        let negative = self.current_is(TokenType::Minus);
        if negative {
            self.advance();
        }
        let token = self.expect(TokenType::NumberLiteral)?;
        parse_number(&token.value, negative)
    }

    fn parse_bbox(&mut self) -> Result<Expr> {
        self.expect(TokenType::OpenParen)?;
        let mut values = vec![self.parse_signed_number()?];
        while self.current_is(TokenType::Comma) {
            self.advance();
            values.push(self.parse_signed_number()?);
        }
        self.expect(TokenType::CloseParen)?;

        if values.len() != 4 && values.len() != 6 {
            return Err(Cql2Error::InvalidGeometry(format!(
                "BBOX expects 4 or 6 values, got {}",
                values.len()
            )));
        }
        Ok(Expr::Bbox(values))
    }

    fn parse_geometry(&mut self, keyword: &str) -> Result<Value> {
        self.enter()?;

        // Optional dimension marker: POINT Z (...), POINT ZM (...)
        if self.current_is(TokenType::Identifier)
            && matches!(
                self.current().value.to_ascii_uppercase().as_str(),
                "Z" | "M" | "ZM"
            )
        {
            self.advance();
        }

        let geometry_type = geometry_type(keyword).ok_or_else(|| {
            Cql2Error::InvalidGeometry(format!("Unknown geometry type {}", keyword))
        })?;

        let geometry = if geometry_type == "GeometryCollection" {
            self.expect(TokenType::OpenParen)?;
            let mut geometries = Vec::new();
            loop {
                let token = self.expect(TokenType::Identifier)?;
                geometries.push(self.parse_geometry(&token.value.to_ascii_uppercase())?);
                if self.current_is(TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenType::CloseParen)?;
            json!({ "type": geometry_type, "geometries": geometries })
        } else {
            let coordinates = match geometry_type {
                "Point" => {
                    self.expect(TokenType::OpenParen)?;
                    let point = self.parse_position()?;
                    self.expect(TokenType::CloseParen)?;
                    point
                }
                "LineString" => self.parse_position_list()?,
                "Polygon" | "MultiLineString" => self.parse_nested(Self::parse_position_list)?,
                "MultiPoint" => self.parse_multipoint()?,
                _ => self.parse_nested(|parser| parser.parse_nested(Self::parse_position_list))?,
            };
            json!({ "type": geometry_type, "coordinates": coordinates })
        };

        self.leave();
        Ok(geometry)
    }

    /// Whitespace-separated ordinates: `1 2` or `1 2 3`
    fn parse_position(&mut self) -> Result<Value> {
        let mut ordinates = Vec::new();
        while self.current_is(TokenType::NumberLiteral) || self.current_is(TokenType::Minus) {
            ordinates.push(Value::Number(self.parse_signed_number()?));
        }
        if ordinates.len() < 2 {
            return Err(Cql2Error::InvalidGeometry(format!(
                "Position needs at least two ordinates near position {}",
                self.current().position
            )));
        }
        Ok(Value::Array(ordinates))
    }

    /// `(x y, x y, ...)`
    fn parse_position_list(&mut self) -> Result<Value> {
        self.expect(TokenType::OpenParen)?;
        let mut positions = vec![self.parse_position()?];
        while self.current_is(TokenType::Comma) {
            self.advance();
            positions.push(self.parse_position()?);
        }
        self.expect(TokenType::CloseParen)?;
        Ok(Value::Array(positions))
    }

    /// `(inner, inner, ...)`
    fn parse_nested<F>(&mut self, inner: F) -> Result<Value>
    where
        F: Fn(&mut Self) -> Result<Value>,
    {
        self.expect(TokenType::OpenParen)?;
        let mut parts = vec![inner(self)?];
        while self.current_is(TokenType::Comma) {
            self.advance();
            parts.push(inner(self)?);
        }
        self.expect(TokenType::CloseParen)?;
        Ok(Value::Array(parts))
    }

    /// Accepts both `((1 2), (3 4))` and `(1 2, 3 4)`
    fn parse_multipoint(&mut self) -> Result<Value> {
        let wrapped = self
            .peek()
            .is_some_and(|next| next.token_type == TokenType::OpenParen);
        if wrapped {
            self.parse_nested(|parser| {
                parser.expect(TokenType::OpenParen)?;
                let point = parser.parse_position()?;
                parser.expect(TokenType::CloseParen)?;
                Ok(point)
            })
        } else {
            self.parse_position_list()
        }
    }
}

fn unexpected(token: &Token, expected: &str) -> Cql2Error {
    if token.token_type == TokenType::Eof {
        Cql2Error::ParseError(format!("Expected {}, but reached end of input", expected))
    } else {
        Cql2Error::ParseError(format!(
            "Expected {}, got '{}' at position {}",
            expected, token.value, token.position
        ))
    }
}

fn collapse(mut args: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if args.len() == 1 {
        args.remove(0)
    } else {
        combine(args)
    }
}

fn arithmetic(op: ArithmeticOp, left: Expr, right: Expr) -> Expr {
    Expr::Arithmetic {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn negate(expr: Expr, negated: bool) -> Expr {
    if negated {
        Expr::Not(Box::new(expr))
    } else {
        expr
    }
}

fn comparison_op(token_type: TokenType) -> Option<ComparisonOp> {
    match token_type {
        TokenType::Equal => Some(ComparisonOp::Equal),
        TokenType::NotEqual => Some(ComparisonOp::NotEqual),
        TokenType::LessThan => Some(ComparisonOp::LessThan),
        TokenType::LessThanOrEqual => Some(ComparisonOp::LessThanOrEqual),
        TokenType::GreaterThan => Some(ComparisonOp::GreaterThan),
        TokenType::GreaterThanOrEqual => Some(ComparisonOp::GreaterThanOrEqual),
        _ => None,
    }
}

fn geometry_type(keyword: &str) -> Option<&'static str> {
    match keyword {
        "POINT" => Some("Point"),
        "LINESTRING" => Some("LineString"),
        "POLYGON" => Some("Polygon"),
        "MULTIPOINT" => Some("MultiPoint"),
        "MULTILINESTRING" => Some("MultiLineString"),
        "MULTIPOLYGON" => Some("MultiPolygon"),
        "GEOMETRYCOLLECTION" => Some("GeometryCollection"),
        _ => None,
    }
}

/// Standard spatial, temporal and array operators are lower-cased,
/// custom functions keep their spelling.
fn function_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let standard = ["s_", "t_", "a_"].iter().any(|p| lower.starts_with(p))
        || matches!(lower.as_str(), "casei" | "accenti");
    if standard {
        lower
    } else {
        name.to_string()
    }
}

fn parse_number(text: &str, negative: bool) -> Result<Number> {
    let signed = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };

    if !text.contains(['.', 'e', 'E']) {
        if let Ok(n) = signed.parse::<i64>() {
            return Ok(Number::from(n));
        }
    }

    signed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| Cql2Error::ParseError(format!("Invalid number {}", signed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(input: &str) -> Value {
        Parser::new(input).unwrap().parse().unwrap().to_json()
    }

    #[test]
    fn test_simple_equality() {
        assert_eq!(
            parse("id='x'"),
            json!({"op": "=", "args": [{"property": "id"}, "x"]})
        );
    }

    #[test]
    fn test_and_chain_is_flat() {
        assert_eq!(
            parse("a = 1 AND b > 2.5 and c <> 'z'"),
            json!({"op": "and", "args": [
                {"op": "=", "args": [{"property": "a"}, 1]},
                {"op": ">", "args": [{"property": "b"}, 2.5]},
                {"op": "<>", "args": [{"property": "c"}, "z"]}
            ]})
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        assert_eq!(
            parse("a = 1 OR b = 2 AND c = 3"),
            json!({"op": "or", "args": [
                {"op": "=", "args": [{"property": "a"}, 1]},
                {"op": "and", "args": [
                    {"op": "=", "args": [{"property": "b"}, 2]},
                    {"op": "=", "args": [{"property": "c"}, 3]}
                ]}
            ]})
        );
    }

    #[test]
    fn test_parentheses_and_not() {
        assert_eq!(
            parse("NOT (a = 1 OR b = 2)"),
            json!({"op": "not", "args": [
                {"op": "or", "args": [
                    {"op": "=", "args": [{"property": "a"}, 1]},
                    {"op": "=", "args": [{"property": "b"}, 2]}
                ]}
            ]})
        );
    }

    #[test]
    fn test_like_between_in() {
        assert_eq!(
            parse("title LIKE 'Landsat%'"),
            json!({"op": "like", "args": [{"property": "title"}, "Landsat%"]})
        );
        assert_eq!(
            parse("eo:cloud_cover BETWEEN 0 AND 10"),
            json!({"op": "between", "args": [{"property": "eo:cloud_cover"}, 0, 10]})
        );
        assert_eq!(
            parse("collection NOT IN ('a', 'b')"),
            json!({"op": "not", "args": [
                {"op": "in", "args": [{"property": "collection"}, ["a", "b"]]}
            ]})
        );
    }

    #[test]
    fn test_is_null() {
        assert_eq!(
            parse("platform IS NOT NULL"),
            json!({"op": "not", "args": [{"op": "isNull", "args": [{"property": "platform"}]}]})
        );
    }

    #[test]
    fn test_temporal_literals() {
        assert_eq!(
            parse("datetime > TIMESTAMP('2020-01-01T00:00:00Z')"),
            json!({"op": ">", "args": [
                {"property": "datetime"},
                {"timestamp": "2020-01-01T00:00:00Z"}
            ]})
        );
        assert_eq!(
            parse("T_INTERSECTS(datetime, INTERVAL('2020-01-01', '..'))"),
            json!({"op": "t_intersects", "args": [
                {"property": "datetime"},
                {"interval": ["2020-01-01", ".."]}
            ]})
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let err = Parser::new("datetime > TIMESTAMP('yesterday')")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Cql2Error::InvalidTemporal(_)));
    }

    #[test]
    fn test_spatial_predicate_with_polygon() {
        assert_eq!(
            parse("S_INTERSECTS(geometry, POLYGON((0 0, 1 0, 1 1, 0 0)))"),
            json!({"op": "s_intersects", "args": [
                {"property": "geometry"},
                {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            ]})
        );
    }

    #[test]
    fn test_point_and_bbox() {
        assert_eq!(
            parse("s_within(geometry, BBOX(-10, -5.5, 10, 5.5))"),
            json!({"op": "s_within", "args": [
                {"property": "geometry"},
                {"bbox": [-10, -5.5, 10, 5.5]}
            ]})
        );
        assert_eq!(
            parse("S_EQUALS(geometry, POINT Z (1 2 3))"),
            json!({"op": "s_equals", "args": [
                {"property": "geometry"},
                {"type": "Point", "coordinates": [1, 2, 3]}
            ]})
        );
    }

    #[test]
    fn test_multipoint_both_forms() {
        let expected = json!({"type": "MultiPoint", "coordinates": [[1, 2], [3, 4]]});
        assert_eq!(
            parse("S_INTERSECTS(geometry, MULTIPOINT((1 2), (3 4)))")["args"][1],
            expected
        );
        assert_eq!(
            parse("S_INTERSECTS(geometry, MULTIPOINT(1 2, 3 4))")["args"][1],
            expected
        );
    }

    #[test]
    fn test_quoted_property_and_boolean() {
        assert_eq!(
            parse("\"my property\" = true"),
            json!({"op": "=", "args": [{"property": "my property"}, true]})
        );
    }

    #[test]
    fn test_array_literals() {
        assert_eq!(
            parse("A_CONTAINS(tags, ('a', 'b'))"),
            json!({"op": "a_contains", "args": [{"property": "tags"}, ["a", "b"]]})
        );
        assert_eq!(
            parse("a_overlaps(tags, ())"),
            json!({"op": "a_overlaps", "args": [{"property": "tags"}, []]})
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(
            parse("a + 2 * b > 10"),
            json!({"op": ">", "args": [
                {"op": "+", "args": [
                    {"property": "a"},
                    {"op": "*", "args": [2, {"property": "b"}]}
                ]},
                10
            ]})
        );
        assert_eq!(
            parse("(a - 1) div 2 = 3"),
            json!({"op": "=", "args": [
                {"op": "div", "args": [
                    {"op": "-", "args": [{"property": "a"}, 1]},
                    2
                ]},
                3
            ]})
        );
        assert_eq!(
            parse("x = 2 ^ 3 ^ 2")["args"][1],
            json!({"op": "^", "args": [2, {"op": "^", "args": [3, 2]}]})
        );
        assert_eq!(
            parse("x = -1")["args"][1],
            json!(-1)
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let inputs = [
            format!("x = {}1{}", "f(".repeat(10_000), ")".repeat(10_000)),
            format!("{}a = 1{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("x = {}", "INTERVAL(".repeat(10_000)),
            format!("{}a = 1", "NOT ".repeat(10_000)),
            format!("x = {}", vec!["1"; 10_000].join(" + ")),
            format!("x = {}", vec!["2"; 10_000].join(" ^ ")),
        ];

        for input in inputs {
            let err = crate::to_json(&input).unwrap_err();
            assert!(
                matches!(&err, Cql2Error::ParseError(message) if message.contains("too deeply nested")),
                "unexpected error: {}",
                err
            );
        }
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let input = format!("x = {}1{}", "f(".repeat(10), ")".repeat(10));
        assert!(crate::to_json(&input).is_ok());
    }

    #[test]
    fn test_errors() {
        for input in ["id = ", "id = 'x' garbage", "(a = 1", "AND = 1", "s_intersects(geometry, BBOX(1, 2))"] {
            assert!(
                Parser::new(input).and_then(|mut p| p.parse()).is_err(),
                "should reject: {}",
                input
            );
        }
    }
}
