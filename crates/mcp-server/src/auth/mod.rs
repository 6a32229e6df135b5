//! Bearer-token validation for the tool server.
//!
//! Tokens are checked in a fixed order (see [`middleware::validate_token`]):
//! development bypass, demo tokens, unverified acceptance when no issuer is
//! configured, and finally full JWT verification against the issuer's JWKS.
//!
//! The agent backend reuses [`TokenVerifier`] to validate user tokens.

pub mod claims;
pub mod keys;
pub mod middleware;
pub mod verifier;

use jsonwebtoken::Algorithm;
use thiserror::Error;

pub use claims::{Audience, TokenClaims};
pub use keys::{KeySource, RemoteJwks, StaticKeys};
pub use middleware::{Caller, TokenGuard, validate_token};
pub use verifier::{TokenVerifier, VerifierSettings};

/// Errors raised while verifying a token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Header or claims could not be decoded, or a standard check failed.
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("algorithm {0:?} is not allowed")]
    AlgorithmNotAllowed(Algorithm),

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("no signing key with id {0}")]
    UnknownKeyId(String),

    /// The JWKS endpoint could not be fetched or parsed.
    #[error("JWKS unavailable: {0}")]
    Jwks(String),
}
