//! Chat endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
};
use progear_mcp_server::middleware::REQUEST_ID_HEADER;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::orchestrator::{AgentFlowStep, TokenExchange, UserContext, UserInfo};
use crate::state::AppState;

/// Session id reported when the client does not send one.
const DEFAULT_SESSION_ID: &str = "session-1";

/// One earlier turn of the conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Accepted for client compatibility; turns are answered independently.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    content: String,
    session_id: String,
    agent_flow: Vec<AgentFlowStep>,
    token_exchanges: Vec<TokenExchange>,
    user_info: UserInfo,
}

/// Resolve the caller from an optional bearer token.
///
/// Any token that cannot be verified, or a missing verifier, yields the
/// anonymous user.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> UserContext {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        return UserContext::anonymous();
    };
    let Some(verifier) = state.user_verifier() else {
        warn!("OKTA_ISSUER not set, treating caller as anonymous");
        return UserContext::anonymous();
    };

    match verifier.verify(token).await {
        Ok(claims) => {
            let info = UserInfo::from_claims(&claims);
            info!(user = %info.email, "User authenticated");
            UserContext {
                token: Some(token.to_string()),
                info,
            }
        }
        Err(e) => {
            warn!(error = %e, "User token validation failed");
            UserContext::anonymous()
        }
    }
}

/// Route a chat message through the agents.
///
/// Orchestration failures are answered with `200` and a single error step
/// so the UI can render them in the conversation.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    let user = authenticate(&state, &headers).await;
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    info!(
        chars = request.message.chars().count(),
        history = request.history.len(),
        authenticated = user.token.is_some(),
        "Chat request"
    );

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let response = match state
        .orchestrator()
        .process(&request.message, &user, request_id)
        .await
    {
        Ok(outcome) => ChatResponse {
            content: outcome.content,
            session_id,
            agent_flow: outcome.agent_flow,
            token_exchanges: outcome.token_exchanges,
            user_info: user.info,
        },
        Err(e) => {
            tracing::error!(error = %e, "Orchestrator error");
            ChatResponse {
                content: format!("I encountered an error processing your request: {e}"),
                session_id,
                agent_flow: vec![AgentFlowStep::error(e.to_string())],
                token_exchanges: Vec::new(),
                user_info: user.info,
            }
        }
    };

    Ok(Json(response))
}
