//! # pgstac-access
//!
//! Connection, credential and search orchestration between a STAC API and a
//! pgstac database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pgstac_access::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let db = Arc::new(PgStac::open(&config.database_settings()?).await?);
//!
//!     let client = CoreClient::new(db.clone(), config.api.clone());
//!     let ctx = RequestContext::get(
//!         "http://localhost:8080/",
//!         "http://localhost:8080/search?collections=sentinel-2&limit=5",
//!     )?;
//!     let params = SearchParams::from_query("collections=sentinel-2&limit=5")?;
//!
//!     let page = client.get_search(&ctx, params).await?;
//!     println!("{} items", page["numberReturned"]);
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod client;
pub mod core;
pub mod credentials;
pub mod errors;
pub mod prelude;
pub mod transactions;

// Re-export the main public types for convenience
pub use crate::client::CoreClient;
pub use crate::core::{Intent, PgStac, PooledConnection};
pub use credentials::{Credential, CredentialError, CredentialProvider, TokenIssuer, TokenRequest};
pub use errors::{ErrorKind, PgStacError, StacError};
pub use transactions::{BulkMethod, TransactionsClient};

// Re-export centralized config
pub use config::{ApiSettings, AppConfig, DatabaseSettings, PoolRole, PoolSettings};

// Re-export internal crates used in the public API
pub use cache_system;
pub use config;
pub use stac_store;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
