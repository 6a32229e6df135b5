//! HTTP route handlers for the agent backend.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                   - API info
//! GET  /health             - Health check
//!
//! # Agents
//! GET  /api/agents/config  - Agent display metadata for the UI
//! GET  /api/agents/status  - Per-agent configuration state
//! GET  /api/config/okta    - Public sign-in settings for the browser
//!
//! # Chat
//! POST /api/chat           - Route a message through the agents
//! ```

pub mod agents;
pub mod chat;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/agents/config", get(agents::agent_config))
        .route("/agents/status", get(agents::agent_status))
        .route("/config/okta", get(agents::okta_config))
        .route("/chat", post(chat::chat))
}
