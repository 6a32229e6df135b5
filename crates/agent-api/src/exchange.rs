//! Delegated token exchange for agents.
//!
//! A configured agent turns the signed-in user's token into an MCP access
//! token in two grants, both authenticated with an RS256 client assertion
//! signed by the agent's private key:
//!
//! 1. Token exchange at the org authorization server, trading the user's
//!    token for an identity assertion JWT (ID-JAG) aimed at the agent's
//!    custom authorization server.
//! 2. JWT-bearer grant at that authorization server, redeeming the ID-JAG
//!    for an access token carrying the agent's scopes.
//!
//! Policy refusals (`access_denied`, `invalid_scope`, `no_matching_policy`)
//! surface as [`ExchangeError::Denied`] so callers can tell them apart from
//! outages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use progear_core::AgentKind;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::AgentCredentials;

pub const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const ID_JAG_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id-jag";
pub const ID_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of a client assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

/// OAuth error codes that mean "policy said no" rather than "broken".
const DENIAL_CODES: [&str; 3] = ["access_denied", "invalid_scope", "no_matching_policy"];

/// Errors from the token exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("agent {0} has no client credentials")]
    NotConfigured(AgentKind),

    #[error("OKTA_DOMAIN is not configured")]
    MissingDomain,

    #[error("client assertion failed: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The authorization server refused by policy.
    #[error("{error}: {description}")]
    Denied { error: String, description: String },

    /// Any other OAuth error response.
    #[error("token endpoint returned {status} ({error}): {description}")]
    OAuth {
        status: u16,
        error: String,
        description: String,
    },
}

impl ExchangeError {
    /// Whether the failure is a policy refusal.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// The OAuth error code when the server sent one.
    #[must_use]
    pub fn oauth_code(&self) -> Option<&str> {
        match self {
            Self::Denied { error, .. } | Self::OAuth { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Sign a client assertion (RFC 7523) for `agent_id` addressed to `audience`.
///
/// # Errors
///
/// Returns `ExchangeError::Assertion` if the key is not a valid RSA PEM.
pub fn client_assertion(
    agent_id: &str,
    key_id: Option<&str>,
    private_key: &SecretString,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String, ExchangeError> {
    let key = EncodingKey::from_rsa_pem(private_key.expose_secret().as_bytes())?;
    let header = Header {
        kid: key_id.map(str::to_string),
        ..Header::new(Algorithm::RS256)
    };
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: agent_id.to_string(),
        sub: agent_id.to_string(),
        aud: audience.to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    Ok(encode(&header, &claims, &key)?)
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

/// OAuth error body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// An access token obtained for an agent.
#[derive(Debug)]
pub struct AgentToken {
    pub access_token: SecretString,
    pub scopes: Vec<String>,
    pub expires_in: Option<u64>,
}

/// Performs the two-step exchange against the identity provider.
#[derive(Clone)]
pub struct TokenExchanger {
    inner: Arc<TokenExchangerInner>,
}

struct TokenExchangerInner {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl TokenExchanger {
    /// `base_url` is the org URL; `None` makes every exchange fail with
    /// `ExchangeError::MissingDomain`.
    #[must_use]
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            inner: Arc::new(TokenExchangerInner {
                client: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    fn base(&self) -> Result<&Url, ExchangeError> {
        self.inner.base_url.as_ref().ok_or(ExchangeError::MissingDomain)
    }

    /// Org authorization server token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when no domain is configured.
    pub fn org_token_endpoint(&self) -> Result<Url, ExchangeError> {
        Ok(self.base()?.join("oauth2/v1/token")?)
    }

    /// Issuer URL of a custom authorization server.
    ///
    /// # Errors
    ///
    /// Returns an error when no domain is configured.
    pub fn auth_server_issuer(&self, auth_server_id: &str) -> Result<Url, ExchangeError> {
        Ok(self.base()?.join(&format!("oauth2/{auth_server_id}"))?)
    }

    fn auth_server_token_endpoint(&self, auth_server_id: &str) -> Result<Url, ExchangeError> {
        Ok(self
            .base()?
            .join(&format!("oauth2/{auth_server_id}/v1/token"))?)
    }

    /// Exchange the user's token for an MCP access token for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Denied` when policy refuses either grant and
    /// other variants for configuration or transport failures.
    #[instrument(skip(self, creds, subject_token), fields(agent = %kind))]
    pub async fn exchange(
        &self,
        kind: AgentKind,
        creds: &AgentCredentials,
        subject_token: &str,
    ) -> Result<AgentToken, ExchangeError> {
        let (Some(agent_id), Some(private_key)) = (&creds.agent_id, &creds.private_key) else {
            return Err(ExchangeError::NotConfigured(kind));
        };
        let scope = kind.scopes().join(" ");
        let key_id = creds.key_id.as_deref();

        // Step 1: user token -> ID-JAG
        let org_endpoint = self.org_token_endpoint()?;
        let audience = self.auth_server_issuer(&creds.auth_server_id)?;
        let assertion = client_assertion(
            agent_id,
            key_id,
            private_key,
            org_endpoint.as_str(),
            Utc::now(),
        )?;

        let mut form = vec![
            ("grant_type", TOKEN_EXCHANGE_GRANT),
            ("requested_token_type", ID_JAG_TOKEN_TYPE),
            ("subject_token", subject_token),
            ("subject_token_type", ID_TOKEN_TYPE),
            ("audience", audience.as_str()),
            ("scope", scope.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];
        if let Some(resource) = creds.audience.as_deref() {
            form.push(("resource", resource));
        }
        let id_jag = self.post_token(&org_endpoint, &form).await?;
        tracing::info!("ID-JAG issued");

        // Step 2: ID-JAG -> access token
        let endpoint = self.auth_server_token_endpoint(&creds.auth_server_id)?;
        let assertion =
            client_assertion(agent_id, key_id, private_key, endpoint.as_str(), Utc::now())?;
        let form = [
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", id_jag.access_token.as_str()),
            ("scope", scope.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];
        let granted = self.post_token(&endpoint, &form).await?;

        let scopes = granted.scope.as_deref().map_or_else(
            || kind.scopes().iter().map(|s| (*s).to_string()).collect(),
            |scope| scope.split_whitespace().map(str::to_string).collect(),
        );
        tracing::info!(scopes = ?scopes, "Agent token issued");

        Ok(AgentToken {
            access_token: SecretString::from(granted.access_token),
            scopes,
            expires_in: granted.expires_in,
        })
    }

    async fn post_token(
        &self,
        endpoint: &Url,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, ExchangeError> {
        let response = self
            .inner
            .client
            .post(endpoint.clone())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let (error, description) = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(parsed) => (parsed.error, parsed.error_description.unwrap_or_default()),
            Err(_) => (format!("http_{}", status.as_u16()), body),
        };

        tracing::warn!(
            endpoint = %endpoint,
            status = status.as_u16(),
            error = %error,
            "Token endpoint refused grant"
        );

        if DENIAL_CODES.contains(&error.as_str()) {
            Err(ExchangeError::Denied { error, description })
        } else {
            Err(ExchangeError::OAuth {
                status: status.as_u16(),
                error,
                description,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use axum::{
        Form, Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::post,
    };
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use serde_json::json;

    use super::*;

    pub const TEST_PRIVATE_KEY: &str = include_str!("../testdata/agent-key.pem");
    pub const TEST_PUBLIC_KEY: &str = include_str!("../testdata/agent-key.pub.pem");

    pub fn test_credentials(agent_id: &str) -> AgentCredentials {
        AgentCredentials {
            agent_id: Some(agent_id.to_string()),
            private_key: Some(SecretString::from(TEST_PRIVATE_KEY)),
            key_id: Some("agent-kid".to_string()),
            auth_server_id: "aus-progear".to_string(),
            audience: None,
        }
    }

    /// How the mock authorization server answers.
    #[derive(Clone, Copy)]
    pub enum MockIdp {
        Grant,
        Deny,
        Broken,
    }

    async fn org_token(
        State(mode): State<MockIdp>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        assert_eq!(form["grant_type"], TOKEN_EXCHANGE_GRANT);
        assert_eq!(form["requested_token_type"], ID_JAG_TOKEN_TYPE);
        assert_eq!(form["client_assertion_type"], CLIENT_ASSERTION_TYPE);
        match mode {
            MockIdp::Grant => Json(json!({
                "access_token": format!("id-jag-for-{}", form["subject_token"]),
                "issued_token_type": ID_JAG_TOKEN_TYPE,
                "token_type": "N_A",
                "expires_in": 300,
            }))
            .into_response(),
            MockIdp::Deny => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "access_denied",
                    "error_description": "User is not assigned to the agent",
                })),
            )
                .into_response(),
            MockIdp::Broken => (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response(),
        }
    }

    async fn auth_server_token(
        Path(auth_server_id): Path<String>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        assert_eq!(form["grant_type"], JWT_BEARER_GRANT);
        Json(json!({
            "access_token": format!("mcp-token-{auth_server_id}"),
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": form["scope"],
        }))
        .into_response()
    }

    /// Spawn a mock identity provider and return its base URL.
    pub async fn spawn_idp(mode: MockIdp) -> Url {
        let app = Router::new()
            .route("/oauth2/v1/token", post(org_token))
            .route("/oauth2/{auth_server_id}/v1/token", post(auth_server_token))
            .with_state(mode);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_client_assertion_claims() {
        let now = Utc::now();
        let token = client_assertion(
            "wlp-sales",
            Some("agent-kid"),
            &SecretString::from(TEST_PRIVATE_KEY),
            "https://progear.okta.com/oauth2/v1/token",
            now,
        )
        .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("agent-kid"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://progear.okta.com/oauth2/v1/token"]);
        let data = decode::<AssertionClaims>(
            &token,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.iss, "wlp-sales");
        assert_eq!(data.claims.sub, "wlp-sales");
        assert_eq!(data.claims.exp - data.claims.iat, ASSERTION_LIFETIME_SECS);
        assert!(!data.claims.jti.is_empty());
    }

    #[test]
    fn test_client_assertion_rejects_bad_key() {
        let result = client_assertion(
            "wlp-sales",
            None,
            &SecretString::from("not a pem"),
            "https://progear.okta.com/oauth2/v1/token",
            Utc::now(),
        );
        assert!(matches!(result, Err(ExchangeError::Assertion(_))));
    }

    #[test]
    fn test_endpoints() {
        let exchanger = TokenExchanger::new(Some(Url::parse("https://progear.okta.com/").unwrap()));
        assert_eq!(
            exchanger.org_token_endpoint().unwrap().as_str(),
            "https://progear.okta.com/oauth2/v1/token"
        );
        assert_eq!(
            exchanger.auth_server_issuer("aus-1").unwrap().as_str(),
            "https://progear.okta.com/oauth2/aus-1"
        );

        let unconfigured = TokenExchanger::new(None);
        assert!(matches!(
            unconfigured.org_token_endpoint(),
            Err(ExchangeError::MissingDomain)
        ));
    }

    #[tokio::test]
    async fn test_exchange_granted() {
        let exchanger = TokenExchanger::new(Some(spawn_idp(MockIdp::Grant).await));
        let token = exchanger
            .exchange(AgentKind::Pricing, &test_credentials("wlp-pricing"), "user-id-token")
            .await
            .unwrap();

        assert_eq!(token.access_token.expose_secret(), "mcp-token-aus-progear");
        assert_eq!(
            token.scopes,
            vec!["pricing:read", "pricing:margin", "pricing:discount"]
        );
        assert_eq!(token.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_exchange_denied() {
        let exchanger = TokenExchanger::new(Some(spawn_idp(MockIdp::Deny).await));
        let err = exchanger
            .exchange(AgentKind::Sales, &test_credentials("wlp-sales"), "user-id-token")
            .await
            .unwrap_err();

        assert!(err.is_denied());
        assert_eq!(err.oauth_code(), Some("access_denied"));
    }

    #[tokio::test]
    async fn test_exchange_upstream_failure_is_not_denial() {
        let exchanger = TokenExchanger::new(Some(spawn_idp(MockIdp::Broken).await));
        let err = exchanger
            .exchange(AgentKind::Sales, &test_credentials("wlp-sales"), "user-id-token")
            .await
            .unwrap_err();

        assert!(!err.is_denied());
        assert!(matches!(err, ExchangeError::OAuth { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_exchange_requires_credentials() {
        let exchanger = TokenExchanger::new(Some(Url::parse("https://progear.okta.com/").unwrap()));
        let err = exchanger
            .exchange(AgentKind::Customer, &AgentCredentials::default(), "user-id-token")
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::NotConfigured(AgentKind::Customer)));
    }
}
