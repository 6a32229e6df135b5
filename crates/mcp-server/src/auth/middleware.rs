//! Token-validation middleware and the [`Caller`] extractor.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{info, warn};

use super::{TokenClaims, TokenVerifier};

/// Prefix of locally issued demo-mode agent tokens.
pub const DEMO_TOKEN_PREFIX: &str = "demo-";

/// Who is calling, as established by [`validate_token`].
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    /// No token; only reachable in development mode.
    Anonymous,
    /// A `demo-` token minted by the agent backend in demo mode.
    Demo,
    /// A token accepted without verification because no issuer is configured.
    Unverified,
    /// A token whose signature and claims were verified.
    Verified(Arc<TokenClaims>),
}

impl Caller {
    /// Whether the caller may use an endpoint requiring `scope`.
    ///
    /// Only verified tokens carry scopes; other callers were already let
    /// through by the acceptance chain and are not restricted further.
    #[must_use]
    pub fn satisfies(&self, scope: &str) -> bool {
        match self {
            Self::Verified(claims) => claims.has_scope(scope),
            Self::Anonymous | Self::Demo | Self::Unverified => true,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Demo => "demo",
            Self::Unverified => "unverified",
            Self::Verified(claims) => &claims.sub,
        }
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Missing,
    Invalid,
}

impl TokenRejection {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Missing => "Missing authorization header",
            Self::Invalid => "Invalid token",
        }
    }
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": self.message() })),
        )
            .into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer realm=\"progear-mcp\""),
        );
        response
    }
}

/// The token acceptance chain.
#[derive(Clone)]
pub struct TokenGuard {
    verifier: Option<TokenVerifier>,
    allow_missing: bool,
}

impl TokenGuard {
    /// `verifier` is `None` when no issuer is configured; `allow_missing`
    /// lets requests without a token through (development mode).
    #[must_use]
    pub const fn new(verifier: Option<TokenVerifier>, allow_missing: bool) -> Self {
        Self {
            verifier,
            allow_missing,
        }
    }

    #[must_use]
    pub const fn has_verifier(&self) -> bool {
        self.verifier.is_some()
    }

    /// Decide on a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns `TokenRejection::Missing` when there is no bearer token
    /// outside development mode, and `TokenRejection::Invalid` when
    /// verification fails.
    pub async fn check(&self, authorization: Option<&str>) -> Result<Caller, TokenRejection> {
        let token = authorization
            .filter(|value| value.starts_with("Bearer "))
            .and_then(|value| value.split(' ').nth(1));

        let Some(token) = token else {
            if self.allow_missing {
                info!("No token, allowing request in development mode");
                return Ok(Caller::Anonymous);
            }
            return Err(TokenRejection::Missing);
        };

        if token.starts_with(DEMO_TOKEN_PREFIX) {
            info!("Demo token accepted");
            return Ok(Caller::Demo);
        }

        let Some(verifier) = &self.verifier else {
            info!("No JWKS configured, accepting token without verification");
            return Ok(Caller::Unverified);
        };

        match verifier.verify(token).await {
            Ok(claims) => {
                info!(sub = %claims.sub, "Token validated");
                Ok(Caller::Verified(Arc::new(claims)))
            }
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                Err(TokenRejection::Invalid)
            }
        }
    }
}

/// Middleware that runs [`TokenGuard::check`] and stores the [`Caller`] in
/// request extensions.
pub async fn validate_token(
    State(guard): State<TokenGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match guard.check(authorization).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = TokenRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(TokenRejection::Missing)
    }
}
