//! Application state shared across handlers.

use std::sync::Arc;

use progear_core::{Catalog, ToolScope};

use crate::auth::{AuthError, Caller, RemoteJwks, TokenGuard, TokenVerifier, VerifierSettings};
use crate::config::McpServerConfig;
use crate::error::AppError;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The catalog is immutable after startup, so
/// handlers read it without locking.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: McpServerConfig,
    catalog: Catalog,
    guard: TokenGuard,
}

impl AppState {
    /// Create application state, wiring JWKS verification when an issuer is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer URL is invalid.
    pub fn new(config: McpServerConfig, catalog: Catalog) -> Result<Self, AuthError> {
        let verifier = config
            .auth
            .issuer
            .as_deref()
            .map(|issuer| {
                let jwks = RemoteJwks::for_issuer(issuer, config.auth.jwks_cache_ttl)?;
                Ok::<_, AuthError>(TokenVerifier::new(
                    Arc::new(jwks),
                    VerifierSettings {
                        issuer: Some(issuer.to_string()),
                        audience: config.auth.audience.clone(),
                        algorithms: config.auth.algorithms.clone(),
                    },
                ))
            })
            .transpose()?;

        let guard = TokenGuard::new(verifier, config.is_development());
        Ok(Self::with_guard(config, catalog, guard))
    }

    /// Create application state with an explicit token guard.
    #[must_use]
    pub fn with_guard(config: McpServerConfig, catalog: Catalog, guard: TokenGuard) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                guard,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &McpServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn token_guard(&self) -> &TokenGuard {
        &self.inner.guard
    }

    /// Check the caller against a tool's scope when enforcement is on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InsufficientScope` for a verified caller whose
    /// token lacks `scope`.
    pub fn authorize(&self, caller: &Caller, scope: ToolScope) -> Result<(), AppError> {
        if self.inner.config.auth.enforce_scopes && !caller.satisfies(scope.as_str()) {
            tracing::warn!(caller = caller.label(), scope = scope.as_str(), "Scope check failed");
            return Err(AppError::InsufficientScope(scope.as_str()));
        }
        Ok(())
    }
}
