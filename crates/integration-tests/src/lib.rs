//! Integration test harness for ProGear.
//!
//! Runs the whole request path in-process on ephemeral ports:
//!
//! ```text
//! reqwest ─► agent-api ─► mock IdP (ID-JAG, jwt-bearer)
//!                │
//!                └──────► mcp-server (verifies IdP-signed tokens, enforces scopes)
//! ```
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p progear-integration-tests
//! ```
//!
//! # Mock identity provider
//!
//! Authorization servers behave by id:
//! - `aus-denied` refuses the ID-JAG request with `access_denied`;
//! - `aus-narrow` grants only the first requested scope;
//! - any other id grants every requested scope.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use progear_agent_api::config::AgentApiConfig;
use progear_agent_api::exchange::{ID_JAG_TOKEN_TYPE, JWT_BEARER_GRANT, TOKEN_EXCHANGE_GRANT};
use progear_core::Catalog;
use progear_mcp_server::auth::{StaticKeys, TokenGuard, TokenVerifier, VerifierSettings};
use progear_mcp_server::config::McpServerConfig;
use serde_json::{Value, json};
use url::Url;

/// RSA key the configured agents sign client assertions with.
pub const AGENT_PRIVATE_KEY: &str = include_str!("../../agent-api/testdata/agent-key.pem");

const USER_KID: &str = "user-kid";
const USER_SECRET: &[u8] = b"progear-integration-user";
const IDP_KID: &str = "idp-kid";
const IDP_SECRET: &[u8] = b"progear-integration-idp";

/// Authorization server that denies every exchange.
pub const DENYING_AUTH_SERVER: &str = "aus-denied";
/// Authorization server that grants only the first requested scope.
pub const NARROW_AUTH_SERVER: &str = "aus-narrow";

fn sign(kid: &str, secret: &[u8], claims: &Value) -> String {
    let header = Header {
        kid: Some(kid.to_string()),
        ..Header::new(Algorithm::HS256)
    };
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("sign token")
}

fn hs256_verifier(kid: &str, secret: &[u8]) -> TokenVerifier {
    TokenVerifier::new(
        Arc::new(StaticKeys::new().with_key(kid, DecodingKey::from_secret(secret))),
        VerifierSettings {
            issuer: None,
            audience: None,
            algorithms: vec![Algorithm::HS256],
        },
    )
}

fn expiry() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

/// A signed-in user's ID token, accepted by the agent backend.
#[must_use]
pub fn user_token(email: &str, groups: &[&str]) -> String {
    sign(
        USER_KID,
        USER_SECRET,
        &json!({
            "sub": format!("00u-{email}"),
            "email": email,
            "name": "Integration User",
            "groups": groups,
            "exp": expiry(),
        }),
    )
}

/// An agent access token as issued by the mock IdP, accepted by the tool
/// server.
#[must_use]
pub fn agent_token(auth_server_id: &str, scopes: &[&str]) -> String {
    sign(
        IDP_KID,
        IDP_SECRET,
        &json!({
            "sub": "agent",
            "iss": format!("mock-idp/{auth_server_id}"),
            "exp": expiry(),
            "scp": scopes,
        }),
    )
}

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn serve(app: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    Url::parse(&format!("http://{addr}/")).expect("base URL")
}

fn oauth_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}

async fn org_token(Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("grant_type").map(String::as_str) != Some(TOKEN_EXCHANGE_GRANT) {
        return oauth_error("unsupported_grant_type", "expected token exchange");
    }
    let audience = form.get("audience").cloned().unwrap_or_default();
    if audience.ends_with(DENYING_AUTH_SERVER) {
        return oauth_error("access_denied", "Policy does not allow this agent");
    }

    Json(json!({
        "access_token": format!("id-jag:{audience}"),
        "issued_token_type": ID_JAG_TOKEN_TYPE,
        "token_type": "N_A",
        "expires_in": 300,
    }))
    .into_response()
}

async fn auth_server_token(
    Path(auth_server_id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT) {
        return oauth_error("unsupported_grant_type", "expected jwt-bearer");
    }
    let requested: Vec<&str> = form
        .get("scope")
        .map(|s| s.split_whitespace().collect())
        .unwrap_or_default();
    let granted: Vec<&str> = if auth_server_id == NARROW_AUTH_SERVER {
        requested.into_iter().take(1).collect()
    } else {
        requested
    };

    Json(json!({
        "access_token": agent_token(&auth_server_id, &granted),
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": granted.join(" "),
    }))
    .into_response()
}

/// Spawn the mock identity provider.
pub async fn spawn_idp() -> Url {
    let app = Router::new()
        .route("/oauth2/v1/token", post(org_token))
        .route("/oauth2/{auth_server_id}/v1/token", post(auth_server_token));
    serve(app).await
}

/// Spawn the tool server in production mode, trusting the mock IdP.
pub async fn spawn_mcp_server(enforce_scopes: bool) -> Url {
    let mut config = McpServerConfig::default();
    config.auth.enforce_scopes = enforce_scopes;
    let guard = TokenGuard::new(Some(hs256_verifier(IDP_KID, IDP_SECRET)), false);
    let state = progear_mcp_server::state::AppState::with_guard(
        config,
        Catalog::builtin().expect("bundled catalog"),
        guard,
    );
    serve(progear_mcp_server::app(state)).await
}

/// Spawn the agent backend.
///
/// Inventory, sales and pricing are registered with the IdP (pricing on
/// the denying server, sales on the narrow one); the customer agent runs in
/// demo mode.
pub async fn spawn_agent_api(idp: &Url, mcp: &Url) -> Url {
    let vars: HashMap<&str, String> = HashMap::from([
        ("OKTA_DOMAIN", idp.to_string()),
        ("MCP_SERVER_URL", mcp.to_string()),
        ("INVENTORY_AGENT_ID", "wlp-inventory".to_string()),
        ("INVENTORY_AGENT_PRIVATE_KEY", AGENT_PRIVATE_KEY.to_string()),
        ("INVENTORY_AGENT_KEY_ID", "inventory-kid".to_string()),
        ("INVENTORY_AUTH_SERVER_ID", "aus-inventory".to_string()),
        ("SALES_AGENT_ID", "wlp-sales".to_string()),
        ("SALES_AGENT_PRIVATE_KEY", AGENT_PRIVATE_KEY.to_string()),
        ("SALES_AGENT_KEY_ID", "sales-kid".to_string()),
        ("SALES_AUTH_SERVER_ID", NARROW_AUTH_SERVER.to_string()),
        ("PRICING_AGENT_ID", "wlp-pricing".to_string()),
        ("PRICING_AGENT_PRIVATE_KEY", AGENT_PRIVATE_KEY.to_string()),
        ("PRICING_AGENT_KEY_ID", "pricing-kid".to_string()),
        ("PRICING_AUTH_SERVER_ID", DENYING_AUTH_SERVER.to_string()),
    ]);
    let config =
        AgentApiConfig::from_lookup(|key| vars.get(key).cloned()).expect("agent-api config");

    let catalog = Catalog::builtin().expect("bundled catalog");
    let state = progear_agent_api::state::AppState::with_verifier(
        config,
        &catalog,
        Some(hs256_verifier(USER_KID, USER_SECRET)),
    );
    serve(progear_agent_api::app(state)).await
}

/// The three services wired together.
pub struct Stack {
    pub idp: Url,
    pub mcp: Url,
    pub api: Url,
    pub client: reqwest::Client,
}

impl Stack {
    /// Start all services with scope enforcement on the tool server.
    pub async fn start() -> Self {
        let idp = spawn_idp().await;
        let mcp = spawn_mcp_server(true).await;
        let api = spawn_agent_api(&idp, &mcp).await;
        Self {
            idp,
            mcp,
            api,
            client: reqwest::Client::new(),
        }
    }

    /// Send a chat message, optionally as a signed-in user.
    pub async fn chat(&self, message: &str, user: Option<&str>) -> Value {
        let url = self.api.join("api/chat").expect("chat URL");
        let mut request = self.client.post(url).json(&json!({ "message": message }));
        if let Some(token) = user {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("chat request");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("chat response body")
    }
}
