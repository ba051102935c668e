//! CQL2 text filters
//!
//! Parses the text encoding of CQL2 (`id='x' AND eo:cloud_cover < 10`) and
//! renders it as CQL2-JSON, the structured form the search engine accepts.
//!
//! ```rust
//! use serde_json::json;
//!
//! let filter = cql2_text::to_json("id='x'").unwrap();
//! assert_eq!(filter, json!({"op": "=", "args": [{"property": "id"}, "x"]}));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{ArithmeticOp, ComparisonOp, Expr, Literal};
pub use error::{Cql2Error, Result};
pub use parser::Parser;

/// Parse a CQL2 text expression
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}

/// Parse a CQL2 text expression and render it as CQL2-JSON
pub fn to_json(input: &str) -> Result<serde_json::Value> {
    parse(input).map(|expr| expr.to_json())
}
