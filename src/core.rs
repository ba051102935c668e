//! Connection pool management
//!
//! [`PgStac`] owns the reader and writer pools for the lifetime of the
//! process. Connections are handed out as [`PooledConnection`] guards that
//! return to their pool when dropped.

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgConnection, PgPool, Postgres};
use std::ops::{Deref, DerefMut};

use crate::credentials::CredentialProvider;
use crate::errors::PgStacError;
use crate::{debug_log, trace_log};
use config::{ConfigError, DatabaseSettings, PoolRole, PoolSettings};
use stac_store::{translate_errors, StacError};

/// What a connection is acquired for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
}

impl Intent {
    pub fn role(&self) -> PoolRole {
        match self {
            Intent::Read => PoolRole::Reader,
            Intent::Write => PoolRole::Writer,
        }
    }
}

/// A checked-out connection. Dropping it releases the connection, also
/// when the owning future is cancelled.
#[derive(Debug)]
pub struct PooledConnection {
    role: PoolRole,
    conn: PoolConnection<Postgres>,
}

impl PooledConnection {
    pub fn role(&self) -> PoolRole {
        self.role
    }
}

impl Deref for PooledConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

#[derive(Debug)]
struct ManagedPool {
    role: PoolRole,
    pool: PgPool,
    settings: PoolSettings,
    /// Password is minted per connection attempt
    dynamic: bool,
    /// Serializes acquisitions of a dynamic pool
    connect: tokio::sync::Mutex<()>,
}

impl ManagedPool {
    /// Check out a connection.
    ///
    /// A dynamic pool never opens connections in the background, so every
    /// connection attempt happens here, right after a fresh password was
    /// installed. The lock keeps a concurrent acquisition from connecting
    /// with a password minted for another one.
    async fn acquire(
        &self,
        credentials: &CredentialProvider,
    ) -> Result<PoolConnection<Postgres>, StacError> {
        if !self.dynamic {
            return translate_errors(self.pool.acquire()).await;
        }

        let _guard = self.connect.lock().await;
        let password = credentials.password(self.role).await?;
        self.pool
            .set_connect_options(connect_options(&self.settings, &password));
        debug_log!("installed fresh credentials for {} pool", self.role);

        translate_errors(self.pool.acquire()).await
    }

    /// Open the configured minimum of connections of a dynamic pool
    async fn warm_up(&self, credentials: &CredentialProvider) -> Result<(), StacError> {
        let mut opened = Vec::with_capacity(self.settings.min_connections as usize);
        for _ in 0..self.settings.min_connections {
            opened.push(self.acquire(credentials).await?);
        }
        Ok(())
    }
}

/// Connection options for one pool, authenticated with `password`
pub fn connect_options(settings: &PoolSettings, password: &str) -> PgConnectOptions {
    let server = &settings.server_settings;

    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .database(&settings.database)
        .username(&settings.username)
        .password(password)
        .application_name(&server.application_name)
        .options([("search_path", server.search_path.as_str())]);

    for (name, value) in &server.extra {
        options = options.options([(name.as_str(), value.as_str())]);
    }

    if settings.uses_iam() {
        options = options.ssl_mode(PgSslMode::Require);
    }

    options
}

/// Pool sizing and timeouts. A dynamic pool keeps no background minimum,
/// since sqlx would reconnect with whatever password it last saw.
fn pool_options(
    role: PoolRole,
    settings: &PoolSettings,
    dynamic: bool,
) -> Result<PgPoolOptions, ConfigError> {
    let min_connections = if dynamic { 0 } else { settings.min_connections };

    Ok(PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(settings.max_connections)
        .idle_timeout(settings.idle_timeout()?)
        .max_lifetime(settings.max_lifetime()?)
        .acquire_timeout(settings.acquire_timeout()?)
        .after_connect(move |_conn, _meta| {
            Box::pin(async move {
                tracing::debug!(%role, "opened database connection");
                Ok(())
            })
        }))
}

/// Reader and writer pools
#[derive(Debug)]
pub struct PgStac {
    reader: ManagedPool,
    writer: Option<ManagedPool>,
    credentials: CredentialProvider,
}

impl PgStac {
    /// Open both pools, minting IAM tokens through RDS when configured
    pub async fn open(settings: &DatabaseSettings) -> Result<Self, PgStacError> {
        Self::open_with(settings, CredentialProvider::from_settings(settings)).await
    }

    /// Open both pools and connect eagerly
    pub async fn open_with(
        settings: &DatabaseSettings,
        credentials: CredentialProvider,
    ) -> Result<Self, PgStacError> {
        Self::build(settings, credentials, false).await
    }

    /// Create both pools without connecting. Credentials are still
    /// resolved, so a missing token issuer fails here.
    pub async fn open_lazy(
        settings: &DatabaseSettings,
        credentials: CredentialProvider,
    ) -> Result<Self, PgStacError> {
        Self::build(settings, credentials, true).await
    }

    async fn build(
        settings: &DatabaseSettings,
        credentials: CredentialProvider,
        lazy: bool,
    ) -> Result<Self, PgStacError> {
        settings.validate()?;

        let reader =
            Self::open_pool(PoolRole::Reader, &settings.reader, &credentials, lazy).await?;
        let writer = match &settings.writer {
            Some(writer) => {
                Some(Self::open_pool(PoolRole::Writer, writer, &credentials, lazy).await?)
            }
            None => {
                tracing::info!("no writer configured, running read-only");
                None
            }
        };

        Ok(Self {
            reader,
            writer,
            credentials,
        })
    }

    async fn open_pool(
        role: PoolRole,
        settings: &PoolSettings,
        credentials: &CredentialProvider,
        lazy: bool,
    ) -> Result<ManagedPool, PgStacError> {
        let dynamic = credentials.is_dynamic(role);
        let password = credentials.password(role).await?;
        let options = connect_options(settings, &password);
        let pool_options = pool_options(role, settings, dynamic)?;

        let pool = if lazy {
            pool_options.connect_lazy_with(options)
        } else {
            pool_options.connect_with(options).await?
        };

        let managed = ManagedPool {
            role,
            pool,
            settings: settings.clone(),
            dynamic,
            connect: tokio::sync::Mutex::new(()),
        };

        if dynamic && !lazy {
            managed.warm_up(credentials).await?;
        }

        tracing::info!(
            %role,
            target = %settings.target(),
            min = settings.min_connections,
            max = settings.max_connections,
            iam = settings.uses_iam(),
            "opened connection pool"
        );

        Ok(managed)
    }

    fn managed(&self, intent: Intent) -> Result<&ManagedPool, StacError> {
        match intent {
            Intent::Read => Ok(&self.reader),
            Intent::Write => self
                .writer
                .as_ref()
                .ok_or_else(|| StacError::DatabaseError("no write pool configured".to_string())),
        }
    }

    /// Whether a writer pool is available
    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    pub fn reader_pool(&self) -> &PgPool {
        &self.reader.pool
    }

    pub fn writer_pool(&self) -> Option<&PgPool> {
        self.writer.as_ref().map(|w| &w.pool)
    }

    /// Check out a connection for `intent`.
    ///
    /// With dynamic credentials a fresh token is minted for the
    /// acquisition, so any connection it opens uses a new token.
    pub async fn acquire(&self, intent: Intent) -> Result<PooledConnection, StacError> {
        let managed = self.managed(intent)?;

        trace_log!("acquiring {} connection", managed.role);
        let conn = managed.acquire(&self.credentials).await?;

        Ok(PooledConnection {
            role: managed.role,
            conn,
        })
    }

    /// Round trip on the reader
    pub async fn health_check(&self) -> Result<(), StacError> {
        let mut conn = self.acquire(Intent::Read).await?;
        translate_errors(sqlx::query("SELECT 1").execute(&mut *conn)).await?;
        Ok(())
    }

    /// Close both pools. Safe to call more than once.
    pub async fn close(&self) {
        for managed in std::iter::once(&self.reader).chain(self.writer.as_ref()) {
            if !managed.pool.is_closed() {
                managed.pool.close().await;
                tracing::info!(role = %managed.role, "closed connection pool");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reader.pool.is_closed() && self.writer.as_ref().is_none_or(|w| w.pool.is_closed())
    }
}
