//! Chat orchestration.
//!
//! One chat turn runs through four stages:
//!
//! ```text
//! message ─► route (keywords) ─► per agent: token ─► tool call ─► compose
//! ```
//!
//! Agents registered with the identity provider obtain their MCP token via
//! [`TokenExchanger`]; the rest run in demo mode, where [`AccessPolicy`]
//! decides from the user's groups and granted agents get a `demo-` token.
//! Every stage is recorded as an [`AgentFlowStep`] for the UI.

pub mod planner;
pub mod summary;

use std::collections::BTreeMap;
use std::sync::Arc;

use progear_core::{AccessDecision, AccessPolicy, AgentKind};
use progear_mcp_server::auth::TokenClaims;
use progear_mcp_server::auth::middleware::DEMO_TOKEN_PREFIX;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AgentCredentials;
use crate::exchange::TokenExchanger;
use crate::mcp_client::{McpClient, McpClientError};

pub use planner::{Mentions, RoutingHints, plan};

/// Failures that abort a chat turn.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("tool server unavailable: {0}")]
    ToolServer(#[source] McpClientError),
}

/// The signed-in user as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub groups: Vec<String>,
}

impl UserInfo {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            sub: None,
            email: "anonymous".to_string(),
            name: None,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            sub: Some(claims.sub.clone()),
            email: claims
                .claim_str("email")
                .unwrap_or(claims.sub.as_str())
                .to_string(),
            name: claims.claim_str("name").map(str::to_string),
            groups: claims.groups(),
        }
    }
}

/// Who is chatting: their raw token (when validated) and identity.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub token: Option<String>,
    pub info: UserInfo,
}

impl UserContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            token: None,
            info: UserInfo::anonymous(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Granted,
    Denied,
    Error,
}

impl ExchangeStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

/// Outcome of obtaining a token for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenExchange {
    pub agent: AgentKind,
    pub agent_name: &'static str,
    pub color: &'static str,
    pub success: bool,
    pub access_denied: bool,
    pub status: ExchangeStatus,
    pub scopes: Vec<String>,
    pub error: Option<String>,
    pub demo_mode: bool,
}

impl TokenExchange {
    fn new(agent: AgentKind, status: ExchangeStatus, demo_mode: bool) -> Self {
        Self {
            agent,
            agent_name: agent.display_name(),
            color: agent.color(),
            success: status == ExchangeStatus::Granted,
            access_denied: status == ExchangeStatus::Denied,
            status,
            scopes: Vec::new(),
            error: None,
            demo_mode,
        }
    }

    fn granted(agent: AgentKind, scopes: Vec<String>, demo_mode: bool) -> Self {
        Self {
            scopes,
            ..Self::new(agent, ExchangeStatus::Granted, demo_mode)
        }
    }

    fn refused(agent: AgentKind, status: ExchangeStatus, error: String, demo_mode: bool) -> Self {
        Self {
            error: Some(error),
            ..Self::new(agent, status, demo_mode)
        }
    }
}

/// One entry of the agent flow shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFlowStep {
    pub step: String,
    pub action: String,
    pub status: String,
    pub color: Option<&'static str>,
    pub agents: Option<Vec<AgentKind>>,
}

impl AgentFlowStep {
    fn new(step: &str, action: impl Into<String>, status: &str) -> Self {
        Self {
            step: step.to_string(),
            action: action.into(),
            status: status.to_string(),
            color: None,
            agents: None,
        }
    }

    /// The single step reported when a turn fails outright.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message, "error")
    }

    fn colored(mut self, color: &'static str) -> Self {
        self.color = Some(color);
        self
    }
}

/// Result of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub content: String,
    pub agent_flow: Vec<AgentFlowStep>,
    pub token_exchanges: Vec<TokenExchange>,
}

/// Routes chat messages to agents and calls their tools.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    agents: BTreeMap<AgentKind, AgentCredentials>,
    exchanger: TokenExchanger,
    mcp: McpClient,
    hints: RoutingHints,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        agents: BTreeMap<AgentKind, AgentCredentials>,
        exchanger: TokenExchanger,
        mcp: McpClient,
        hints: RoutingHints,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                agents,
                exchanger,
                mcp,
                hints,
            }),
        }
    }

    /// Process one chat message for `user`.
    ///
    /// Token refusals and tool errors are reported in the outcome; only an
    /// unreachable tool server aborts the turn.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::ToolServer` when a tool call fails at the
    /// transport level.
    pub async fn process(
        &self,
        message: &str,
        user: &UserContext,
        request_id: Option<&str>,
    ) -> Result<ChatOutcome, OrchestratorError> {
        let selected = AgentKind::route(message);
        let mentions = Mentions::extract(message, &self.inner.hints);
        info!(agents = ?selected, user = %user.info.email, "Routing chat message");

        let names: Vec<&str> = selected.iter().map(|kind| kind.display_name()).collect();
        let mut flow = vec![AgentFlowStep {
            agents: Some(selected.clone()),
            ..AgentFlowStep::new(
                "routing",
                format!("Routed to {}", names.join(", ")),
                "completed",
            )
        }];
        let mut exchanges = Vec::with_capacity(selected.len());
        let mut sections = Vec::with_capacity(selected.len());

        for kind in selected {
            let (exchange, token) = self.acquire_token(kind, user).await;
            flow.push(
                AgentFlowStep::new(
                    "token_exchange",
                    if exchange.demo_mode {
                        format!("{}: demo policy check", kind.display_name())
                    } else {
                        format!("{}: ID-JAG token exchange", kind.display_name())
                    },
                    exchange.status.as_str(),
                )
                .colored(kind.color()),
            );

            let body = match (&token, &exchange.error) {
                (Some(token), _) => {
                    self.run_tool(kind, &mentions, token, request_id, &mut flow)
                        .await?
                }
                (None, Some(reason)) if exchange.access_denied => {
                    format!("Access denied ({reason}).")
                }
                (None, reason) => format!(
                    "Token exchange failed: {}.",
                    reason.as_deref().unwrap_or("unknown error")
                ),
            };
            sections.push(format!("**{}**\n{body}", kind.display_name()));
            exchanges.push(exchange);
        }

        let granted = exchanges.iter().filter(|e| e.success).count();
        flow.push(AgentFlowStep::new(
            "response",
            format!("Combined results from {granted} of {} agents", exchanges.len()),
            "completed",
        ));

        Ok(ChatOutcome {
            content: sections.join("\n\n"),
            agent_flow: flow,
            token_exchanges: exchanges,
        })
    }

    /// Obtain an MCP token for `kind`, by exchange or by demo policy.
    async fn acquire_token(
        &self,
        kind: AgentKind,
        user: &UserContext,
    ) -> (TokenExchange, Option<String>) {
        let creds = self
            .inner
            .agents
            .get(&kind)
            .filter(|creds| creds.is_configured());

        if let (Some(creds), Some(subject)) = (creds, user.token.as_deref()) {
            return match self.inner.exchanger.exchange(kind, creds, subject).await {
                Ok(token) => (
                    TokenExchange::granted(kind, token.scopes, false),
                    Some(token.access_token.expose_secret().to_string()),
                ),
                Err(e) if e.is_denied() => {
                    let reason = e.oauth_code().unwrap_or("access_denied").to_string();
                    info!(agent = %kind, reason = %reason, "Token exchange denied");
                    (
                        TokenExchange::refused(kind, ExchangeStatus::Denied, reason, false),
                        None,
                    )
                }
                Err(e) => {
                    warn!(agent = %kind, error = %e, "Token exchange failed");
                    (
                        TokenExchange::refused(kind, ExchangeStatus::Error, e.to_string(), false),
                        None,
                    )
                }
            };
        }

        match AccessPolicy.evaluate(kind, user.info.groups.as_slice()) {
            AccessDecision::Granted { scopes } => {
                let token = format!("{DEMO_TOKEN_PREFIX}{kind}-{}", Uuid::new_v4());
                let scopes = scopes.into_iter().map(str::to_string).collect();
                (TokenExchange::granted(kind, scopes, true), Some(token))
            }
            AccessDecision::Denied { reason } => (
                TokenExchange::refused(kind, ExchangeStatus::Denied, reason.to_string(), true),
                None,
            ),
        }
    }

    async fn run_tool(
        &self,
        kind: AgentKind,
        mentions: &Mentions,
        token: &str,
        request_id: Option<&str>,
        flow: &mut Vec<AgentFlowStep>,
    ) -> Result<String, OrchestratorError> {
        let Some(call) = plan(kind, mentions) else {
            return Ok(
                "Name a product id (e.g. BB-PRO-001) or a category to look up pricing."
                    .to_string(),
            );
        };
        let action = format!("{} called {}", kind.display_name(), call.tool);

        match self.inner.mcp.call(&call, token, request_id).await {
            Ok(body) => {
                flow.push(
                    AgentFlowStep::new("tool_call", action, "completed").colored(kind.color()),
                );
                Ok(summary::summarize(call.tool, &body))
            }
            Err(McpClientError::Tool { message, .. }) => {
                flow.push(AgentFlowStep::new("tool_call", action, "error").colored(kind.color()));
                Ok(message)
            }
            Err(e) => Err(OrchestratorError::ToolServer(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use progear_core::Catalog;
    use progear_mcp_server::auth::TokenGuard;
    use progear_mcp_server::config::McpServerConfig;
    use progear_mcp_server::state::AppState as McpState;
    use url::Url;

    use super::*;
    use crate::exchange::tests::{MockIdp, spawn_idp, test_credentials};

    /// Tool server in production mode without a verifier: any bearer token
    /// is accepted, requests without one are rejected.
    async fn spawn_mcp() -> Url {
        let state = McpState::with_guard(
            McpServerConfig::default(),
            Catalog::builtin().unwrap(),
            TokenGuard::new(None, false),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, progear_mcp_server::app(state))
                .await
                .unwrap();
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn orchestrator(
        agents: BTreeMap<AgentKind, AgentCredentials>,
        idp: Option<Url>,
        mcp: Url,
    ) -> Orchestrator {
        Orchestrator::new(
            agents,
            TokenExchanger::new(idp),
            McpClient::new(mcp),
            RoutingHints::from_catalog(&Catalog::builtin().unwrap()),
        )
    }

    fn user(groups: &[&str]) -> UserContext {
        UserContext {
            token: Some("user-id-token".to_string()),
            info: UserInfo {
                sub: Some("00u1".to_string()),
                email: "sam@progear.example".to_string(),
                name: Some("Sam Rep".to_string()),
                groups: groups.iter().map(|g| (*g).to_string()).collect(),
            },
        }
    }

    #[tokio::test]
    async fn test_demo_mode_sales_user() {
        let orch = orchestrator(BTreeMap::new(), None, spawn_mcp().await);
        let outcome = orch
            .process(
                "What's the bulk price for 100 BB-PRO-001 for a gold customer?",
                &user(&["ProGear-Sales"]),
                Some("req-1"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.token_exchanges.len(), 2);
        let pricing = outcome
            .token_exchanges
            .iter()
            .find(|e| e.agent == AgentKind::Pricing)
            .unwrap();
        assert!(pricing.success && pricing.demo_mode);
        assert_eq!(pricing.scopes, vec!["pricing:read"]);
        assert!(outcome.content.contains("**ProGear Pricing Agent**"));
        assert!(outcome.content.contains("18% off"));
        assert_eq!(outcome.agent_flow.first().unwrap().step, "routing");
        assert_eq!(outcome.agent_flow.last().unwrap().step, "response");
    }

    #[tokio::test]
    async fn test_demo_mode_denies_without_groups() {
        let orch = orchestrator(BTreeMap::new(), None, spawn_mcp().await);
        let outcome = orch
            .process("check stock", &UserContext::anonymous(), None)
            .await
            .unwrap();

        let inventory = &outcome.token_exchanges[0];
        assert_eq!(inventory.status, ExchangeStatus::Denied);
        assert!(inventory.access_denied);
        assert_eq!(inventory.error.as_deref(), Some("no_matching_policy"));
        assert!(outcome.content.contains("Access denied (no_matching_policy)."));
        assert!(outcome.agent_flow.iter().all(|s| s.step != "tool_call"));
    }

    #[tokio::test]
    async fn test_tool_error_is_reported_in_content() {
        let orch = orchestrator(BTreeMap::new(), None, spawn_mcp().await);
        let outcome = orch
            .process("customer history for CUST-999", &user(&["ProGear-Sales"]), None)
            .await
            .unwrap();

        assert!(outcome.content.contains("Customer not found"));
        assert!(
            outcome
                .agent_flow
                .iter()
                .any(|s| s.step == "tool_call" && s.status == "error")
        );
    }

    #[tokio::test]
    async fn test_configured_agent_uses_exchange() {
        let agents = BTreeMap::from([(AgentKind::Inventory, test_credentials("wlp-inventory"))]);
        let orch = orchestrator(
            agents,
            Some(spawn_idp(MockIdp::Grant).await),
            spawn_mcp().await,
        );
        let outcome = orch
            .process("stock of BB-PRO-001", &user(&[]), None)
            .await
            .unwrap();

        let inventory = &outcome.token_exchanges[0];
        assert!(inventory.success);
        assert!(!inventory.demo_mode);
        assert!(outcome.content.contains("Pro Game Basketball (BB-PRO-001)"));
    }

    #[tokio::test]
    async fn test_configured_agent_denied_by_policy() {
        let agents = BTreeMap::from([(AgentKind::Inventory, test_credentials("wlp-inventory"))]);
        let orch = orchestrator(
            agents,
            Some(spawn_idp(MockIdp::Deny).await),
            spawn_mcp().await,
        );
        let outcome = orch
            .process("stock of BB-PRO-001", &user(&["ProGear-Warehouse"]), None)
            .await
            .unwrap();

        let inventory = &outcome.token_exchanges[0];
        assert_eq!(inventory.status, ExchangeStatus::Denied);
        assert_eq!(inventory.error.as_deref(), Some("access_denied"));
    }

    #[tokio::test]
    async fn test_unreachable_tool_server_aborts() {
        let orch = orchestrator(
            BTreeMap::new(),
            None,
            Url::parse("http://127.0.0.1:9").unwrap(),
        );
        let err = orch
            .process("show orders", &user(&["ProGear-Sales"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolServer(_)));
    }

    #[test]
    fn test_user_info_serialization() {
        let anon = serde_json::to_value(UserInfo::anonymous()).unwrap();
        assert_eq!(anon, serde_json::json!({"email": "anonymous", "groups": []}));
    }
}
