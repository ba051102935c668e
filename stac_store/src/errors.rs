//! Error taxonomy of the data-access boundary
//!
//! Every failure that leaves this crate is a [`StacError`]. Low-level
//! database failures are translated exactly once, by SQLSTATE, in
//! [`translate_sqlstate`].

use cache_system::CacheError;
use cql2_text::Cql2Error;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StacError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Kind of a [`StacError`], without its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    ForeignKeyViolation,
    InvalidQueryParameter,
    DatabaseError,
}

impl ErrorKind {
    /// Outward HTTP status for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::ForeignKeyViolation | ErrorKind::InvalidQueryParameter => 400,
            ErrorKind::DatabaseError => 500,
        }
    }
}

impl StacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StacError::Conflict(_) => ErrorKind::Conflict,
            StacError::NotFound(_) => ErrorKind::NotFound,
            StacError::ForeignKeyViolation(_) => ErrorKind::ForeignKeyViolation,
            StacError::InvalidQueryParameter(_) => ErrorKind::InvalidQueryParameter,
            StacError::DatabaseError(_) => ErrorKind::DatabaseError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StacError::Conflict(m)
            | StacError::NotFound(m)
            | StacError::ForeignKeyViolation(m)
            | StacError::InvalidQueryParameter(m)
            | StacError::DatabaseError(m) => m,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// SQLSTATE codes with a dedicated translation
pub mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const NO_DATA_FOUND: &str = "P0002";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const INVALID_DATETIME_FORMAT: &str = "22007";
    pub const DATETIME_FIELD_OVERFLOW: &str = "22008";
}

/// Map a database failure, identified by its SQLSTATE, to the taxonomy
pub fn translate_sqlstate(code: Option<&str>, message: &str) -> StacError {
    let message = message.to_string();
    match code {
        Some(sqlstate::UNIQUE_VIOLATION) => StacError::Conflict(message),
        Some(sqlstate::NO_DATA_FOUND) => StacError::NotFound(message),
        Some(sqlstate::NOT_NULL_VIOLATION) => StacError::DatabaseError(message),
        Some(sqlstate::FOREIGN_KEY_VIOLATION) => StacError::ForeignKeyViolation(message),
        Some(sqlstate::INVALID_DATETIME_FORMAT | sqlstate::DATETIME_FIELD_OVERFLOW) => {
            StacError::InvalidQueryParameter(message)
        }
        _ => StacError::DatabaseError(message),
    }
}

impl From<sqlx::Error> for StacError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StacError::NotFound("No rows found".to_string()),
            sqlx::Error::Database(db_error) => {
                let code = db_error.code();
                translate_sqlstate(code.as_deref(), db_error.message())
            }
            sqlx::Error::PoolTimedOut => StacError::DatabaseError(
                "Timed out waiting for a database connection".to_string(),
            ),
            sqlx::Error::PoolClosed => {
                StacError::DatabaseError("Connection pool is closed".to_string())
            }
            other => StacError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StacError {
    fn from(error: serde_json::Error) -> Self {
        StacError::DatabaseError(format!("Invalid JSON: {}", error))
    }
}

impl From<CacheError> for StacError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::BaseItemNotFound(_) => StacError::NotFound(error.to_string()),
            CacheError::InvalidBaseItem(_) => StacError::DatabaseError(error.to_string()),
        }
    }
}

impl From<Cql2Error> for StacError {
    fn from(error: Cql2Error) -> Self {
        StacError::InvalidQueryParameter(format!("Invalid cql2-text filter: {}", error))
    }
}

/// Run a database call, translating whatever it fails with.
///
/// Wraps both ad-hoc function calls and searches so that no raw driver
/// error crosses the boundary.
pub async fn translate_errors<T, E, Fut>(call: Fut) -> Result<T, StacError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<StacError>,
{
    call.await.map_err(|error| {
        let error = error.into();
        match error.kind() {
            ErrorKind::DatabaseError => tracing::warn!(error = %error, "database call failed"),
            kind => tracing::debug!(?kind, error = %error, "database call rejected"),
        }
        error
    })
}
