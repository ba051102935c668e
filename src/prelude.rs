//! Convenience re-exports for common pgstac-access usage
//!
//! # Example
//!
//! ```rust
//! use pgstac_access::prelude::*;
//!
//! let limits = Limits::default();
//! assert_eq!(limits.normalize(None).unwrap(), 10);
//! ```

// Pools, credentials and clients
pub use crate::client::CoreClient;
pub use crate::core::{Intent, PgStac, PooledConnection};
pub use crate::credentials::{CredentialProvider, TokenIssuer, TokenRequest};
pub use crate::errors::{ErrorKind, PgStacError, StacError};
pub use crate::transactions::{BulkMethod, TransactionsClient};

// Re-export centralized config
pub use config::{ApiSettings, AppConfig, DatabaseSettings, PoolRole, PoolSettings};

// Search arguments, links and engine calls
pub use stac_store::prelude::*;

// Hydration cache
pub use cache_system::prelude::*;

// Common external dependencies
pub use async_trait::async_trait;
pub use sqlx;
pub use tokio;
