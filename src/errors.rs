//! Error types for the pgstac-access crate
//!
//! [`PgStacError`] covers startup. Once the pools are open every operation
//! fails with a [`StacError`].

use crate::credentials::CredentialError;
use config::ConfigError;
use thiserror::Error;

pub use stac_store::{ErrorKind, StacError};

#[derive(Error, Debug)]
pub enum PgStacError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Warming up a pool failed
    #[error("Pool error: {0}")]
    Pool(#[from] StacError),
}
