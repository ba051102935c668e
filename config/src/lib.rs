//! # Configuration Management for pgstac-access
//!
//! This crate provides the typed settings bundle consumed by the connection
//! pools, the credential provider and the search layer.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{PoolRole, PostgresSettings};
//!
//! let settings = PostgresSettings {
//!     pguser: Some("username".to_string()),
//!     pgpassword: Some("password".to_string()),
//!     pghost: Some("localhost".to_string()),
//!     pgdatabase: Some("pgstac".to_string()),
//!     ..PostgresSettings::default()
//! };
//!
//! let reader = settings.pool_settings(PoolRole::Reader).unwrap();
//! assert_eq!(reader.host, "localhost");
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [postgres]
//! pguser = "username"
//! pgpassword = "password"
//! pghost = "reader.local"
//! pghost_writer = "writer.local"
//! pgport = 5432
//! pgdatabase = "pgstac"
//! db_min_conn_size = 1
//! db_max_conn_size = 10
//!
//! [postgres.server_settings]
//! search_path = "pgstac,public"
//! application_name = "pgstac"
//!
//! [api]
//! use_api_hydrate = true
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from PGSTAC_CONFIG, ./pgstac.toml, then PG* environment variables
//! let config = AppConfig::load()?;
//! # Ok::<(), config::ConfigError>(())
//! ```

pub mod legacy;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use std::{env, path::Path};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "./pgstac.toml";
const CONFIG_PATH_ENV: &str = "PGSTAC_CONFIG";

/// Characters that may not appear in item or collection ids
pub const DEFAULT_INVALID_ID_CHARS: &[char] = &[
    ':', '/', '?', '#', '[', ']', '@', '!', '$', '&', '\'', '(', ')', '*', '+', ',', ';', '=',
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which of the two pools a setting or connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolRole {
    Reader,
    Writer,
}

impl fmt::Display for PoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolRole::Reader => f.write_str("reader"),
            PoolRole::Writer => f.write_str("writer"),
        }
    }
}

/// Server-side session parameters installed on every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub search_path: String,
    pub application_name: String,
    /// Any additional `SET`-able runtime parameters
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            search_path: "pgstac,public".to_string(),
            application_name: "pgstac".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Postgres connection settings shared by both pools
///
/// The writer pool reuses everything here and only swaps in
/// `pghost_writer` / `pguser_writer` when they are set.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub pguser: Option<String>,
    pub pguser_writer: Option<String>,
    pub pgpassword: Option<String>,
    pub pghost: Option<String>,
    pub pghost_writer: Option<String>,
    pub pgport: u16,
    pub pgdatabase: Option<String>,

    /// Use short-lived AWS RDS IAM tokens instead of `pgpassword`
    pub use_iam_auth: bool,
    pub aws_region: Option<String>,

    pub db_min_conn_size: u32,
    pub db_max_conn_size: u32,
    /// Seconds a connection may sit idle before it is closed
    pub db_max_inactive_conn_lifetime: f64,
    /// Seconds after which a connection is recycled regardless of use
    pub db_max_conn_lifetime: Option<f64>,
    /// Seconds to wait for a free pool slot
    pub db_acquire_timeout: f64,

    pub server_settings: ServerSettings,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            pguser: None,
            pguser_writer: None,
            pgpassword: None,
            pghost: None,
            pghost_writer: None,
            pgport: 5432,
            pgdatabase: None,
            use_iam_auth: false,
            aws_region: None,
            db_min_conn_size: 1,
            db_max_conn_size: 10,
            db_max_inactive_conn_lifetime: 300.0,
            db_max_conn_lifetime: None,
            db_acquire_timeout: 30.0,
            server_settings: ServerSettings::default(),
        }
    }
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("pguser", &self.pguser)
            .field("pguser_writer", &self.pguser_writer)
            .field("pgpassword", &self.pgpassword.as_ref().map(|_| "***"))
            .field("pghost", &self.pghost)
            .field("pghost_writer", &self.pghost_writer)
            .field("pgport", &self.pgport)
            .field("pgdatabase", &self.pgdatabase)
            .field("use_iam_auth", &self.use_iam_auth)
            .field("aws_region", &self.aws_region)
            .field("db_min_conn_size", &self.db_min_conn_size)
            .field("db_max_conn_size", &self.db_max_conn_size)
            .field("server_settings", &self.server_settings)
            .finish()
    }
}

/// How a pool authenticates its connections
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AuthMode {
    /// Fixed password from configuration
    Password { password: String },
    /// Fresh IAM token minted for every new connection
    Iam { region: Option<String> },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Password { .. } => f.write_str("Password(***)"),
            AuthMode::Iam { region } => f.debug_struct("Iam").field("region", region).finish(),
        }
    }
}

/// Fully resolved settings for one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    pub auth: AuthMode,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_max_inactive_lifetime")]
    pub max_inactive_lifetime_seconds: f64,
    #[serde(default)]
    pub max_lifetime_seconds: Option<f64>,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: f64,
    #[serde(default)]
    pub server_settings: ServerSettings,
}

fn default_port() -> u16 {
    5432
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_max_inactive_lifetime() -> f64 {
    300.0
}

fn default_acquire_timeout() -> f64 {
    30.0
}

impl PoolSettings {
    pub fn idle_timeout(&self) -> Result<Duration, ConfigError> {
        seconds(
            "max_inactive_lifetime_seconds",
            self.max_inactive_lifetime_seconds,
        )
    }

    pub fn max_lifetime(&self) -> Result<Option<Duration>, ConfigError> {
        self.max_lifetime_seconds
            .map(|value| seconds("max_lifetime_seconds", value))
            .transpose()
    }

    pub fn acquire_timeout(&self) -> Result<Duration, ConfigError> {
        seconds("acquire_timeout_seconds", self.acquire_timeout_seconds)
    }

    pub fn uses_iam(&self) -> bool {
        matches!(self.auth, AuthMode::Iam { .. })
    }

    /// `user@host:port/db`, safe to log
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid(
                "Database host cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid(
                "Database port cannot be zero".to_string(),
            ));
        }
        if self.database.is_empty() {
            return Err(ConfigError::Invalid(
                "Database name cannot be empty".to_string(),
            ));
        }
        if self.username.is_empty() {
            return Err(ConfigError::Invalid(
                "Database username cannot be empty".to_string(),
            ));
        }
        if self.min_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database min_connections must be greater than 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.acquire_timeout_seconds == 0.0 {
            return Err(ConfigError::Invalid(
                "Database acquire_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        self.idle_timeout()?;
        self.max_lifetime()?;
        self.acquire_timeout()?;
        Ok(())
    }
}

/// Finite, non-negative seconds as a [`Duration`]
fn seconds(name: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        ConfigError::Invalid(format!(
            "Database {} must be a finite, non-negative number of seconds, got {}: {}",
            name, value, e
        ))
    })
}

/// Settings for both pools. `writer` is absent for read-only deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub reader: PoolSettings,
    #[serde(default)]
    pub writer: Option<PoolSettings>,
}

impl DatabaseSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reader.validate()?;
        if let Some(writer) = &self.writer {
            writer.validate()?;
        }
        Ok(())
    }
}

impl PostgresSettings {
    /// Derive the settings of one pool from this shared object
    pub fn pool_settings(&self, role: PoolRole) -> Result<PoolSettings, ConfigError> {
        let host = match role {
            PoolRole::Reader => self.pghost.clone(),
            PoolRole::Writer => self.pghost_writer.clone().or_else(|| self.pghost.clone()),
        }
        .ok_or_else(|| ConfigError::Invalid("Database host must be set (PGHOST)".to_string()))?;

        let username = match role {
            PoolRole::Reader => self.pguser.clone(),
            PoolRole::Writer => self.pguser_writer.clone().or_else(|| self.pguser.clone()),
        }
        .ok_or_else(|| {
            ConfigError::Invalid("Database username must be set (PGUSER)".to_string())
        })?;

        let database = self.pgdatabase.clone().ok_or_else(|| {
            ConfigError::Invalid("Database name must be set (PGDATABASE)".to_string())
        })?;

        let auth = if self.use_iam_auth {
            AuthMode::Iam {
                region: self.aws_region.clone(),
            }
        } else {
            let password = self.pgpassword.clone().ok_or_else(|| {
                ConfigError::Invalid(
                    "Either a password (PGPASSWORD) or IAM auth must be configured".to_string(),
                )
            })?;
            AuthMode::Password { password }
        };

        let settings = PoolSettings {
            host,
            port: self.pgport,
            database,
            username,
            auth,
            min_connections: self.db_min_conn_size,
            max_connections: self.db_max_conn_size,
            max_inactive_lifetime_seconds: self.db_max_inactive_conn_lifetime,
            max_lifetime_seconds: self.db_max_conn_lifetime,
            acquire_timeout_seconds: self.db_acquire_timeout,
            server_settings: self.server_settings.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Both pools from this object; the writer is skipped when `read_only`
    pub fn database_settings(&self, read_only: bool) -> Result<DatabaseSettings, ConfigError> {
        let reader = self.pool_settings(PoolRole::Reader)?;
        let writer = if read_only {
            None
        } else {
            Some(self.pool_settings(PoolRole::Writer)?)
        };
        Ok(DatabaseSettings { reader, writer })
    }

    /// Overlay `PG*` (and legacy `POSTGRES_*`) variables from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (values, _migrated) = legacy::resolve_env(&lookup);

        if let Some(v) = values.get("pguser") {
            self.pguser = Some(v.clone());
        }
        if let Some(v) = values.get("pgpassword") {
            self.pgpassword = Some(v.clone());
        }
        if let Some(v) = values.get("pghost") {
            self.pghost = Some(v.clone());
        }
        if let Some(v) = values.get("pghost_writer") {
            self.pghost_writer = Some(v.clone());
        }
        if let Some(v) = values.get("pgdatabase") {
            self.pgdatabase = Some(v.clone());
        }
        if let Some(v) = values.get("pgport") {
            self.pgport = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("Invalid PGPORT value: {}", v)))?;
        }
        if let Some(v) = values.get("pguser_writer") {
            self.pguser_writer = Some(v.clone());
        }
        if let Some(v) = values.get("use_iam_auth") {
            self.use_iam_auth = parse_bool(v)?;
        }
        if let Some(v) = lookup("AWS_REGION") {
            self.aws_region = Some(v);
        }
        if let Some(v) = lookup("DB_MIN_CONN_SIZE") {
            self.db_min_conn_size = parse_number("DB_MIN_CONN_SIZE", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_CONN_SIZE") {
            self.db_max_conn_size = parse_number("DB_MAX_CONN_SIZE", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_INACTIVE_CONN_LIFETIME") {
            self.db_max_inactive_conn_lifetime =
                parse_number("DB_MAX_INACTIVE_CONN_LIFETIME", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_CONN_LIFETIME") {
            self.db_max_conn_lifetime = Some(parse_number("DB_MAX_CONN_LIFETIME", &v)?);
        }
        if let Some(v) = lookup("DB_ACQUIRE_TIMEOUT") {
            self.db_acquire_timeout = parse_number("DB_ACQUIRE_TIMEOUT", &v)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("Invalid {} value: {}", name, value)))
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "Invalid boolean value: {}",
            other
        ))),
    }
}

/// Settings of the search layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Hydrate items here instead of inside the database
    pub use_api_hydrate: bool,
    /// Drop do-not-merge markers left after hydration
    pub exclude_hydrate_markers: bool,
    pub invalid_id_chars: Vec<char>,
    /// Run without a writer pool
    pub read_only: bool,
    pub enable_collection_search: bool,
    /// Advertise `queryables` links on collections
    pub enable_filter: bool,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            use_api_hydrate: false,
            exclude_hydrate_markers: true,
            invalid_id_chars: DEFAULT_INVALID_ID_CHARS.to_vec(),
            read_only: false,
            enable_collection_search: true,
            enable_filter: true,
            default_limit: 10,
            max_limit: 10000,
        }
    }
}

impl ApiSettings {
    /// Overlay `USE_API_HYDRATE` and the other API variables from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("USE_API_HYDRATE") {
            self.use_api_hydrate = parse_bool(&v)?;
        }
        if let Some(v) = lookup("EXCLUDE_HYDRATE_MARKERS") {
            self.exclude_hydrate_markers = parse_bool(&v)?;
        }
        if let Some(v) = lookup("READ_ONLY") {
            self.read_only = parse_bool(&v)?;
        }
        if let Some(v) = lookup("ENABLE_COLLECTION_SEARCH") {
            self.enable_collection_search = parse_bool(&v)?;
        }
        if let Some(v) = lookup("ENABLE_FILTER") {
            self.enable_filter = parse_bool(&v)?;
        }
        if let Some(v) = lookup("DEFAULT_LIMIT") {
            self.default_limit = parse_number("DEFAULT_LIMIT", &v)?;
        }
        if let Some(v) = lookup("MAX_LIMIT") {
            self.max_limit = parse_number("MAX_LIMIT", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "max_limit must be greater than 0".to_string(),
            ));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(
                "default_limit must be between 1 and max_limit".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub postgres: PostgresSettings,
    pub api: ApiSettings,
    /// Fully independent per-pool settings; overrides `postgres` when set
    pub database: Option<DatabaseSettings>,
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults,
    /// then overlay the process environment
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let mut config = if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::read_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::read_file(DEFAULT_CONFIG_PATH)?
        } else {
            info!("no configuration file found, using defaults and environment");
            Self::default()
        };

        config.postgres.apply_env(|key| env::var(key).ok())?;
        config.api.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document, folding legacy names
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut document: toml::Table = toml::from_str(content)?;
        if let Some(toml::Value::Table(postgres)) = document.get_mut("postgres") {
            legacy::migrate_table(postgres);
        }
        let config: Self = toml::Value::Table(document).try_into()?;
        Ok(config)
    }

    /// Pool settings for both pools, honoring the explicit `database` block
    pub fn database_settings(&self) -> Result<DatabaseSettings, ConfigError> {
        let mut settings = match &self.database {
            Some(explicit) => explicit.clone(),
            None => self.postgres.database_settings(self.api.read_only)?,
        };
        if self.api.read_only {
            settings.writer = None;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.database_settings()?;
        Ok(())
    }
}

/// Build a lookup closure over a fixed map, handy for tests and embedding
pub fn map_lookup(values: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key| values.get(key).cloned()
}
