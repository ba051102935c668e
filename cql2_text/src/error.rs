//! Error types for the CQL2 text parser

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Cql2Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Cql2Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid temporal literal: {0}")]
    InvalidTemporal(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}
