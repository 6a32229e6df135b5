//! Agent backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `BACKEND_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKEND_PORT` - Listen port (default: 8000)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: `http://localhost:3000`)
//! - `MCP_SERVER_URL` - Tool server base URL (default: `http://localhost:3001`)
//! - `CATALOG_PATH` - Catalog used for routing hints (default: bundled data)
//!
//! ## Identity provider
//! - `OKTA_DOMAIN` - Org domain, with or without scheme
//! - `OKTA_CLIENT_ID` - Public client id handed to the browser
//! - `OKTA_ISSUER` - Issuer of user tokens; enables JWKS verification
//! - `OKTA_AUDIENCE` - Expected `aud` of user tokens (optional)
//!
//! ## Agents (`<KIND>` is `SALES`, `INVENTORY`, `CUSTOMER` or `PRICING`)
//! - `<KIND>_AGENT_ID` - Agent client id
//! - `<KIND>_AGENT_PRIVATE_KEY` - RS256 private key (PEM, `\n` escapes allowed)
//! - `<KIND>_AGENT_KEY_ID` - `kid` of the agent's registered public key
//! - `<KIND>_AUTH_SERVER_ID` - Custom authorization server (default: `default`)
//! - `<KIND>_AUTH_SERVER_AUDIENCE` - Resource indicator for the exchange
//!
//! ## Observability
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use progear_core::AgentKind;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Public identity-provider settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OktaConfig {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl OktaConfig {
    /// Org base URL derived from `OKTA_DOMAIN`.
    ///
    /// A bare domain gets an `https://` scheme.
    #[must_use]
    pub fn base_url(&self) -> Option<Url> {
        let domain = self.domain.as_deref()?.trim_end_matches('/');
        let candidate = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        Url::parse(&candidate).ok()
    }
}

/// Credentials of one agent registered with the identity provider.
#[derive(Debug, Clone)]
pub struct AgentCredentials {
    pub agent_id: Option<String>,
    pub private_key: Option<SecretString>,
    pub key_id: Option<String>,
    pub auth_server_id: String,
    pub audience: Option<String>,
}

impl AgentCredentials {
    /// Whether the agent can perform a real token exchange.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.agent_id.is_some() && self.private_key.is_some()
    }
}

impl Default for AgentCredentials {
    fn default() -> Self {
        Self {
            agent_id: None,
            private_key: None,
            key_id: None,
            auth_server_id: "default".to_string(),
            audience: None,
        }
    }
}

/// Agent backend configuration.
#[derive(Debug, Clone)]
pub struct AgentApiConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub mcp_server_url: Url,
    pub okta: OktaConfig,
    pub agents: BTreeMap<AgentKind, AgentCredentials>,
    pub catalog_path: Option<PathBuf>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub log_json: bool,
}

impl AgentApiConfig {
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

        let host = parse_or(&get, "BACKEND_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(&get, "BACKEND_PORT", 8000_u16)?;

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let mcp_server_url = get("MCP_SERVER_URL")
            .unwrap_or_else(|| "http://localhost:3001".to_string());
        let mcp_server_url = Url::parse(&mcp_server_url)
            .map_err(|e| ConfigError::InvalidEnvVar("MCP_SERVER_URL".to_string(), e.to_string()))?;

        let okta = OktaConfig {
            domain: get("OKTA_DOMAIN"),
            client_id: get("OKTA_CLIENT_ID"),
            issuer: get("OKTA_ISSUER"),
            audience: get("OKTA_AUDIENCE"),
        };

        let agents = AgentKind::ALL
            .into_iter()
            .map(|kind| (kind, agent_credentials(&get, kind)))
            .collect();

        Ok(Self {
            host,
            port,
            cors_origins,
            mcp_server_url,
            okta,
            agents,
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

    /// Credentials for an agent; every kind is present after loading.
    #[must_use]
    pub fn agent(&self, kind: AgentKind) -> Option<&AgentCredentials> {
        self.agents.get(&kind)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn agent_credentials(get: &impl Fn(&str) -> Option<String>, kind: AgentKind) -> AgentCredentials {
    let var = |suffix: &str| get(&format!("{}_{suffix}", kind.env_prefix()));

    AgentCredentials {
        agent_id: var("AGENT_ID"),
        // Keys pasted into a single-line .env value carry literal "\n".
        private_key: var("AGENT_PRIVATE_KEY")
            .map(|pem| SecretString::from(pem.replace("\\n", "\n"))),
        key_id: var("AGENT_KEY_ID"),
        auth_server_id: var("AUTH_SERVER_ID").unwrap_or_else(|| "default".to_string()),
        audience: var("AUTH_SERVER_AUDIENCE"),
    }
}

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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AgentApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AgentApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.mcp_server_url.as_str(), "http://localhost:3001/");
        assert_eq!(config.agents.len(), 4);
        assert!(
            config
                .agents
                .values()
                .all(|creds| !creds.is_configured() && creds.auth_server_id == "default")
        );
    }

    #[test]
    fn test_agent_credentials_from_prefix() {
        let config = load(&[
            ("PRICING_AGENT_ID", "wlp-pricing"),
            ("PRICING_AGENT_PRIVATE_KEY", "-----BEGIN-----\\nabc\\n-----END-----"),
            ("PRICING_AGENT_KEY_ID", "kid-1"),
            ("PRICING_AUTH_SERVER_ID", "aus-pricing"),
        ])
        .unwrap();

        let pricing = config.agent(AgentKind::Pricing).unwrap();
        assert!(pricing.is_configured());
        assert_eq!(pricing.auth_server_id, "aus-pricing");
        assert_eq!(
            pricing.private_key.as_ref().unwrap().expose_secret(),
            "-----BEGIN-----\nabc\n-----END-----"
        );
        assert!(!config.agent(AgentKind::Sales).unwrap().is_configured());
    }

    #[test]
    fn test_id_without_key_is_not_configured() {
        let config = load(&[("SALES_AGENT_ID", "wlp-sales")]).unwrap();
        assert!(!config.agent(AgentKind::Sales).unwrap().is_configured());
    }

    #[test]
    fn test_cors_origins_split() {
        let config = load(&[(
            "CORS_ORIGINS",
            "http://localhost:3000, https://sales.progear.example ,",
        )])
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://sales.progear.example"]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("BACKEND_PORT", "http")]).is_err());
        assert!(matches!(
            load(&[("MCP_SERVER_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "MCP_SERVER_URL"
        ));
    }

    #[test]
    fn test_okta_base_url() {
        let bare = OktaConfig {
            domain: Some("progear.okta.com".to_string()),
            ..OktaConfig::default()
        };
        assert_eq!(bare.base_url().unwrap().as_str(), "https://progear.okta.com/");

        let local = OktaConfig {
            domain: Some("http://127.0.0.1:9000/".to_string()),
            ..OktaConfig::default()
        };
        assert_eq!(local.base_url().unwrap().as_str(), "http://127.0.0.1:9000/");
        assert!(OktaConfig::default().base_url().is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_private_key() {
        let creds = AgentCredentials {
            agent_id: Some("wlp-sales".to_string()),
            private_key: Some(SecretString::from("super-secret-pem")),
            ..AgentCredentials::default()
        };

        let debug_output = format!("{creds:?}");
        assert!(debug_output.contains("wlp-sales"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-pem"));
    }
}
