//! Database credentials
//!
//! A pool authenticates either with a fixed password or with a short-lived
//! token minted by an identity service. Tokens are never cached: every
//! call to [`CredentialProvider::password`] mints a new one.

use async_trait::async_trait;
use config::{AuthMode, DatabaseSettings, PoolRole, PoolSettings};
use stac_store::StacError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("Failed to generate IAM authentication token: {0}")]
    TokenGeneration(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("No credentials configured for the {0} pool")]
    NotConfigured(PoolRole),
}

impl From<CredentialError> for StacError {
    fn from(error: CredentialError) -> Self {
        StacError::DatabaseError(error.to_string())
    }
}

/// Login a token is minted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// `None` falls back to the issuer's default region
    pub region: Option<String>,
}

impl TokenRequest {
    pub fn for_pool(settings: &PoolSettings) -> Self {
        let region = match &settings.auth {
            AuthMode::Iam { region } => region.clone(),
            AuthMode::Password { .. } => None,
        };

        Self {
            host: settings.host.clone(),
            port: settings.port,
            username: settings.username.clone(),
            region,
        }
    }
}

/// Identity service that mints short-lived database passwords
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn generate_token(&self, request: &TokenRequest) -> Result<String, CredentialError>;
}

/// Password source of one pool
#[derive(Clone)]
pub enum Credential {
    Static(String),
    Dynamic(Arc<dyn TokenIssuer>),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Static(_) => f.write_str("Static(***)"),
            Credential::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

#[derive(Debug, Clone)]
struct RoleCredential {
    credential: Credential,
    request: TokenRequest,
}

/// Resolves the password of each pool at connection time
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    roles: HashMap<PoolRole, RoleCredential>,
}

impl CredentialProvider {
    /// Credentials for both pools; IAM pools use `issuer`
    pub fn new(settings: &DatabaseSettings, issuer: Arc<dyn TokenIssuer>) -> Self {
        let mut roles = HashMap::new();
        roles.insert(
            PoolRole::Reader,
            Self::role_credential(&settings.reader, &issuer),
        );
        if let Some(writer) = &settings.writer {
            roles.insert(PoolRole::Writer, Self::role_credential(writer, &issuer));
        }
        Self { roles }
    }

    /// Credentials for both pools, minting IAM tokens through RDS
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        Self::new(settings, Arc::new(RdsTokenIssuer::default()))
    }

    fn role_credential(settings: &PoolSettings, issuer: &Arc<dyn TokenIssuer>) -> RoleCredential {
        let credential = match &settings.auth {
            AuthMode::Password { password } => Credential::Static(password.clone()),
            AuthMode::Iam { .. } => Credential::Dynamic(Arc::clone(issuer)),
        };

        RoleCredential {
            credential,
            request: TokenRequest::for_pool(settings),
        }
    }

    pub fn is_dynamic(&self, role: PoolRole) -> bool {
        matches!(
            self.roles.get(&role).map(|r| &r.credential),
            Some(Credential::Dynamic(_))
        )
    }

    /// Password for a new connection of `role`
    pub async fn password(&self, role: PoolRole) -> Result<String, CredentialError> {
        let entry = self
            .roles
            .get(&role)
            .ok_or(CredentialError::NotConfigured(role))?;

        match &entry.credential {
            Credential::Static(password) => Ok(password.clone()),
            Credential::Dynamic(issuer) => {
                let request = &entry.request;
                tracing::debug!(
                    %role,
                    host = %request.host,
                    port = request.port,
                    user = %request.username,
                    region = ?request.region,
                    "generating IAM authentication token"
                );
                let token = issuer.generate_token(request).await;
                if let Err(error) = &token {
                    tracing::warn!(%role, %error, "token generation failed");
                }
                token
            }
        }
    }
}

/// Mints AWS RDS IAM authentication tokens
#[derive(Debug, Clone, Default)]
pub struct RdsTokenIssuer;

#[cfg(feature = "iam")]
#[async_trait]
impl TokenIssuer for RdsTokenIssuer {
    async fn generate_token(&self, request: &TokenRequest) -> Result<String, CredentialError> {
        use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config};
        use aws_sdk_rds::config::Region;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &request.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let config = Config::builder()
            .hostname(&request.host)
            .port(u64::from(request.port))
            .username(&request.username)
            .build()
            .map_err(|e| CredentialError::TokenGeneration(e.to_string()))?;

        let token = AuthTokenGenerator::new(config)
            .auth_token(&sdk_config)
            .await
            .map_err(|e| CredentialError::TokenGeneration(e.to_string()))?;

        Ok(token.as_str().to_string())
    }
}

#[cfg(not(feature = "iam"))]
#[async_trait]
impl TokenIssuer for RdsTokenIssuer {
    async fn generate_token(&self, _request: &TokenRequest) -> Result<String, CredentialError> {
        Err(CredentialError::MissingDependency(
            "IAM authentication requires building with the `iam` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ServerSettings;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingIssuer {
        calls: AtomicUsize,
        requests: Mutex<Vec<TokenRequest>>,
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn generate_token(&self, request: &TokenRequest) -> Result<String, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .map_err(|_| CredentialError::TokenGeneration("poisoned".to_string()))?
                .push(request.clone());
            Ok(format!("token-{}", n))
        }
    }

    struct FailingIssuer;

    #[async_trait]
    impl TokenIssuer for FailingIssuer {
        async fn generate_token(&self, _request: &TokenRequest) -> Result<String, CredentialError> {
            Err(CredentialError::TokenGeneration("access denied".to_string()))
        }
    }

    fn pool(host: &str, user: &str, auth: AuthMode) -> PoolSettings {
        PoolSettings {
            host: host.to_string(),
            port: 5432,
            database: "pgstac".to_string(),
            username: user.to_string(),
            auth,
            min_connections: 1,
            max_connections: 10,
            max_inactive_lifetime_seconds: 300.0,
            max_lifetime_seconds: None,
            acquire_timeout_seconds: 30.0,
            server_settings: ServerSettings::default(),
        }
    }

    fn iam(region: &str) -> AuthMode {
        AuthMode::Iam {
            region: Some(region.to_string()),
        }
    }

    #[tokio::test]
    async fn test_static_password_is_returned_unchanged() {
        let settings = DatabaseSettings {
            reader: pool(
                "reader",
                "reader_user",
                AuthMode::Password {
                    password: "secret".to_string(),
                },
            ),
            writer: None,
        };
        let provider = CredentialProvider::new(&settings, Arc::new(CountingIssuer::default()));

        assert_eq!(provider.password(PoolRole::Reader).await.unwrap(), "secret");
        assert!(!provider.is_dynamic(PoolRole::Reader));
        assert_eq!(
            provider.password(PoolRole::Writer).await.unwrap_err(),
            CredentialError::NotConfigured(PoolRole::Writer)
        );
    }

    #[tokio::test]
    async fn test_dynamic_tokens_are_minted_per_call() {
        let settings = DatabaseSettings {
            reader: pool("reader.rds", "reader_user", iam("us-west-2")),
            writer: Some(pool("writer.rds", "writer_user", iam("us-west-2"))),
        };
        let issuer = Arc::new(CountingIssuer::default());
        let provider = CredentialProvider::new(&settings, issuer.clone());

        let first = provider.password(PoolRole::Reader).await.unwrap();
        let second = provider.password(PoolRole::Reader).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);

        provider.password(PoolRole::Writer).await.unwrap();
        let requests = issuer.requests.lock().unwrap();
        assert_eq!(requests[0].host, "reader.rds");
        assert_eq!(requests[2].host, "writer.rds");
        assert_eq!(requests[2].username, "writer_user");
        assert_eq!(requests[2].region.as_deref(), Some("us-west-2"));
    }

    #[tokio::test]
    async fn test_token_failure_is_database_error() {
        let settings = DatabaseSettings {
            reader: pool("reader.rds", "reader_user", iam("eu-west-1")),
            writer: None,
        };
        let provider = CredentialProvider::new(&settings, Arc::new(FailingIssuer));

        let error = StacError::from(provider.password(PoolRole::Reader).await.unwrap_err());
        assert_eq!(
            error,
            StacError::DatabaseError(
                "Failed to generate IAM authentication token: access denied".to_string()
            )
        );
    }

    #[cfg(not(feature = "iam"))]
    #[tokio::test]
    async fn test_missing_iam_feature_is_surfaced() {
        let settings = DatabaseSettings {
            reader: pool("reader.rds", "reader_user", iam("eu-west-1")),
            writer: None,
        };
        let provider = CredentialProvider::from_settings(&settings);

        assert!(matches!(
            provider.password(PoolRole::Reader).await,
            Err(CredentialError::MissingDependency(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::Static("hunter2".to_string());
        assert!(!format!("{:?}", credential).contains("hunter2"));
    }
}
