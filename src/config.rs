//! Process-wide store configuration and collection scoping.

use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("store configuration already initialized")]
    AlreadyInitialized,
    #[error("store configuration not initialized")]
    NotInitialized,
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid scope mode: {0} (expected \"shared\" or \"per-user\")")]
    InvalidScope(String),
}

/// Which collection the tracker reads and writes.
///
/// The scoping policy is a deployment decision: a shared board visible to
/// every client of the app, or a private board per signed-in principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Shared,
    PerUser,
}

impl ScopeMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per-user" | "per_user" => Ok(Self::PerUser),
            other => Err(ConfigError::InvalidScope(other.to_string())),
        }
    }
}

/// The signed-in principal, as provided by the host application.
///
/// Token/anonymous sign-in is assumed to happen outside this crate; all the
/// sync core needs is a stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Store location of one project collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePath(String);

impl ScopePath {
    /// Collection shared between every client of the app
    pub fn shared(app_id: &str) -> Self {
        Self(format!("apps/{}/shared/projects", app_id))
    }

    /// Collection private to one principal
    pub fn per_user(app_id: &str, user_id: &str) -> Self {
        Self(format!("apps/{}/users/{}/projects", app_id, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection settings for the remote collection store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Document store base URL (e.g., "https://store.example.com/v1")
    pub base_url: String,
    /// Bearer token for authenticated access, if the deployment requires one
    pub api_token: Option<String>,
    /// Application namespace within the store
    pub app_id: String,
    /// Scoping policy for the project collection
    pub scope: ScopeMode,
}

impl StoreConfig {
    /// Read configuration from `FOCAL_SERVER_URL`, `FOCAL_API_TOKEN`,
    /// `FOCAL_APP_ID` and `FOCAL_SCOPE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("FOCAL_SERVER_URL")
            .map_err(|_| ConfigError::MissingVar("FOCAL_SERVER_URL"))?;
        let api_token = std::env::var("FOCAL_API_TOKEN").ok().filter(|t| !t.is_empty());
        let app_id =
            std::env::var("FOCAL_APP_ID").unwrap_or_else(|_| "focal".to_string());
        let scope = match std::env::var("FOCAL_SCOPE") {
            Ok(value) => ScopeMode::parse(&value)?,
            Err(_) => ScopeMode::Shared,
        };

        Ok(Self {
            base_url,
            api_token,
            app_id,
            scope,
        })
    }

    /// Resolve the collection path for the configured scope mode.
    ///
    /// Returns `None` when the policy is per-user and nobody is signed in yet.
    pub fn scope_path(&self, identity: Option<&Identity>) -> Option<ScopePath> {
        match self.scope {
            ScopeMode::Shared => Some(ScopePath::shared(&self.app_id)),
            ScopeMode::PerUser => {
                identity.map(|who| ScopePath::per_user(&self.app_id, &who.user_id))
            }
        }
    }
}

static CONFIG: OnceLock<StoreConfig> = OnceLock::new();

/// Install the process-wide store configuration. Must be called once, before
/// any store client is constructed.
pub fn init(config: StoreConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Get the process-wide store configuration.
pub fn get() -> Result<&'static StoreConfig, ConfigError> {
    CONFIG.get().ok_or(ConfigError::NotInitialized)
}
