//! Application state shared across handlers.

use std::sync::Arc;

use jsonwebtoken::Algorithm;
use progear_core::Catalog;
use progear_mcp_server::auth::keys::DEFAULT_JWKS_TTL;
use progear_mcp_server::auth::{AuthError, RemoteJwks, TokenVerifier, VerifierSettings};

use crate::config::AgentApiConfig;
use crate::exchange::TokenExchanger;
use crate::mcp_client::McpClient;
use crate::orchestrator::{Orchestrator, RoutingHints};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AgentApiConfig,
    orchestrator: Orchestrator,
    user_verifier: Option<TokenVerifier>,
}

impl AppState {
    /// Create application state. User tokens are verified against the JWKS
    /// of `OKTA_ISSUER` when it is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer URL is invalid.
    pub fn new(config: AgentApiConfig, catalog: &Catalog) -> Result<Self, AuthError> {
        let user_verifier = config
            .okta
            .issuer
            .as_deref()
            .map(|issuer| {
                let jwks = RemoteJwks::for_issuer(issuer, DEFAULT_JWKS_TTL)?;
                Ok::<_, AuthError>(TokenVerifier::new(
                    Arc::new(jwks),
                    VerifierSettings {
                        issuer: Some(issuer.to_string()),
                        audience: config.okta.audience.clone(),
                        algorithms: vec![Algorithm::RS256],
                    },
                ))
            })
            .transpose()?;

        Ok(Self::with_verifier(config, catalog, user_verifier))
    }

    /// Create application state with an explicit user-token verifier.
    #[must_use]
    pub fn with_verifier(
        config: AgentApiConfig,
        catalog: &Catalog,
        user_verifier: Option<TokenVerifier>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            config.agents.clone(),
            TokenExchanger::new(config.okta.base_url()),
            McpClient::new(config.mcp_server_url.clone()),
            RoutingHints::from_catalog(catalog),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
                user_verifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AgentApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    #[must_use]
    pub fn user_verifier(&self) -> Option<&TokenVerifier> {
        self.inner.user_verifier.as_ref()
    }
}
