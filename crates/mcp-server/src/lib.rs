//! ProGear MCP tool server library.
//!
//! Serves the sales catalog as REST tools under `/mcp/tools/*`, guarded by
//! bearer tokens issued to the sales agents. Exposed as a library so the
//! router can be exercised in tests and the agent backend can reuse the
//! token verifier.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::auth::validate_token;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the complete router: health check, token-guarded tools, and the
/// tracing, request-id and security-header layers.
pub fn app(state: AppState) -> Router {
    let tools = routes::tool_routes().route_layer(from_fn_with_state(
        state.token_guard().clone(),
        validate_token,
    ));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/mcp/tools", tools)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
