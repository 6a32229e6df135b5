//! ProGear agent backend.
//!
//! This binary serves the chat API on port 8000.
//!
//! # Architecture
//!
//! - Axum REST endpoints under `/api/*`
//! - Keyword router selecting one or more of four agents per message
//! - Per-agent ID-JAG token exchange against the identity provider
//! - Tool calls forwarded to the MCP server with the agent's token
//!
//! Agents without credentials run in demo mode: a local group policy stands
//! in for the authorization server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use progear_agent_api::{app, config::AgentApiConfig, state::AppState};
use progear_core::{AgentKind, Catalog};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AgentApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = AgentApiConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "progear_agent_api=info,tower_http=debug".into());

    let (json_layer, text_layer) = if config.log_json {
        (
            Some(tracing_subscriber::fmt::layer().json().flatten_event(true)),
            None,
        )
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path),
        None => Catalog::builtin(),
    }
    .expect("Failed to load catalog");

    for kind in AgentKind::ALL {
        let configured = config.agent(kind).is_some_and(|c| c.is_configured());
        tracing::info!(
            agent = %kind,
            mode = if configured { "token-exchange" } else { "demo" },
            "Agent registered"
        );
    }
    if config.okta.issuer.is_none() {
        tracing::warn!("OKTA_ISSUER not set, all chat users will be anonymous");
    }
    if config.okta.base_url().is_none() {
        tracing::warn!("OKTA_DOMAIN not set, configured agents cannot exchange tokens");
    }
    tracing::info!(url = %config.mcp_server_url, "Using MCP tool server");

    let addr = config.socket_addr();
    let state = AppState::new(config, &catalog).expect("Failed to initialize application state");

    let app = app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("agent-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
