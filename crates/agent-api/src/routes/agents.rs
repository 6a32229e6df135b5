//! Agent metadata and public sign-in settings.

use axum::{Json, extract::State};
use progear_core::AgentKind;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AgentCard {
    #[serde(rename = "type")]
    kind: AgentKind,
    name: &'static str,
    description: &'static str,
    color: &'static str,
    icon: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AgentConfigResponse {
    agents: Vec<AgentCard>,
}

/// Display metadata for the four agents.
pub async fn agent_config() -> Json<AgentConfigResponse> {
    let agents = AgentKind::ALL
        .into_iter()
        .map(|kind| AgentCard {
            kind,
            name: kind.display_name(),
            description: kind.description(),
            color: kind.color(),
            icon: kind.icon(),
        })
        .collect();
    Json(AgentConfigResponse { agents })
}

#[derive(Debug, Serialize)]
pub struct AgentStatus {
    name: &'static str,
    #[serde(rename = "type")]
    kind: AgentKind,
    description: &'static str,
    color: &'static str,
    configured: bool,
    has_private_key: bool,
    scopes: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct AgentStatusResponse {
    agents: Vec<AgentStatus>,
    count: usize,
    orchestrator: &'static str,
}

/// Which agents are registered with the identity provider.
///
/// Agents without an id run in demo mode.
pub async fn agent_status(State(state): State<AppState>) -> Json<AgentStatusResponse> {
    let agents: Vec<_> = AgentKind::ALL
        .into_iter()
        .map(|kind| {
            let creds = state.config().agent(kind);
            let configured = creds.is_some_and(|c| c.agent_id.is_some());
            AgentStatus {
                name: kind.display_name(),
                kind,
                description: if configured {
                    kind.description()
                } else {
                    "Demo mode"
                },
                color: kind.color(),
                configured,
                has_private_key: creds.is_some_and(|c| c.private_key.is_some()),
                scopes: kind.scopes(),
            }
        })
        .collect();

    Json(AgentStatusResponse {
        count: agents.len(),
        agents,
        orchestrator: "keyword-router",
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaPublicConfig {
    domain: String,
    client_id: String,
    issuer: String,
}

/// Sign-in settings for the browser. Never includes secrets.
pub async fn okta_config(State(state): State<AppState>) -> Json<OktaPublicConfig> {
    let okta = &state.config().okta;
    Json(OktaPublicConfig {
        domain: okta.domain.clone().unwrap_or_default(),
        client_id: okta.client_id.clone().unwrap_or_default(),
        issuer: okta.issuer.clone().unwrap_or_default(),
    })
}
