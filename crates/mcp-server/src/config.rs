//! Tool-server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `MCP_SERVER_HOST` - Bind address (default: 127.0.0.1)
//! - `MCP_SERVER_PORT` - Listen port (default: 3001)
//! - `PROGEAR_ENV` - `development` or `production` (default: production)
//! - `OKTA_ISSUER` - Authorization server issuer; enables JWKS verification
//! - `OKTA_CUSTOM_AUTH_SERVER_AUDIENCE` - Expected `aud` claim
//! - `MCP_JWT_ALGORITHMS` - Comma-separated allowed algorithms (default: RS256)
//! - `MCP_JWKS_CACHE_TTL_SECS` - JWKS cache lifetime (default: 300)
//! - `MCP_ENFORCE_SCOPES` - Reject verified tokens lacking a tool's scope (default: false)
//! - `CATALOG_PATH` - YAML catalog replacing the bundled data set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other}")),
        }
    }
}

/// Bearer-token settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub algorithms: Vec<Algorithm>,
    pub jwks_cache_ttl: Duration,
    pub enforce_scopes: bool,
}

/// Tool-server configuration.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub auth: AuthConfig,
    pub catalog_path: Option<PathBuf>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub log_json: bool,
}

impl McpServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = parse_or(&get, "MCP_SERVER_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(&get, "MCP_SERVER_PORT", 3001_u16)?;
        let environment = parse_or(&get, "PROGEAR_ENV", Environment::Production)?;

        let algorithms = match get("MCP_JWT_ALGORITHMS") {
            Some(list) => parse_algorithms(&list)?,
            None => vec![Algorithm::RS256],
        };
        let ttl_secs = parse_or(&get, "MCP_JWKS_CACHE_TTL_SECS", 300_u64)?;
        let enforce_scopes = get("MCP_ENFORCE_SCOPES").is_some_and(|v| is_truthy(&v));

        let auth = AuthConfig {
            issuer: get("OKTA_ISSUER"),
            audience: get("OKTA_CUSTOM_AUTH_SERVER_AUDIENCE"),
            algorithms,
            jwks_cache_ttl: Duration::from_secs(ttl_secs),
            enforce_scopes,
        };

        Ok(Self {
            host,
            port,
            environment,
            auth,
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
            log_json: get("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            environment: Environment::Production,
            auth: AuthConfig {
                issuer: None,
                audience: None,
                algorithms: vec![Algorithm::RS256],
                jwks_cache_ttl: Duration::from_secs(300),
                enforce_scopes: false,
            },
            catalog_path: None,
            sentry_dsn: None,
            sentry_environment: None,
            log_json: false,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when it is unset.
fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_algorithms(list: &str) -> Result<Vec<Algorithm>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Algorithm::from_str(name).map_err(|e| {
                ConfigError::InvalidEnvVar("MCP_JWT_ALGORITHMS".to_string(), e.to_string())
            })
        })
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
