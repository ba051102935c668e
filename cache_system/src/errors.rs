//! Error types for base item caching

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// The collection has no base item. A valid collection always has one.
    #[error("A base item for {0} does not exist.")]
    BaseItemNotFound(String),

    #[error("Base item for {0} is not a JSON object")]
    InvalidBaseItem(String),
}
