//! JWT signature and claim verification.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use tracing::debug;

use super::{AuthError, KeySource, TokenClaims};

/// What a token must satisfy besides a valid signature and `exp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Expected `iss`. Unchecked when `None`.
    pub issuer: Option<String>,
    /// Expected `aud`. Unchecked when `None`.
    pub audience: Option<String>,
    /// Algorithms a token header may name.
    pub algorithms: Vec<Algorithm>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            algorithms: vec![Algorithm::RS256],
        }
    }
}

/// Verifies bearer tokens against a [`KeySource`].
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<dyn KeySource>,
    settings: VerifierSettings,
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeySource>, settings: VerifierSettings) -> Self {
        Self { keys, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is malformed, names a disallowed
    /// algorithm or an unknown key, or if the signature, `exp`, issuer or
    /// audience check fails.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token)?;
        if !self.settings.algorithms.contains(&header.alg) {
            return Err(AuthError::AlgorithmNotAllowed(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        if let Some(issuer) = &self.settings.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<TokenClaims>(token, &key, &validation)?;
        debug!(sub = %data.claims.sub, kid = %kid, "Token signature verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use jsonwebtoken::{DecodingKey, EncodingKey, Header, encode};
    use serde_json::{Value, json};

    use super::*;
    use crate::auth::StaticKeys;

    pub const TEST_SECRET: &[u8] = b"progear-mcp-test-secret";
    pub const TEST_KID: &str = "test-key";
    pub const TEST_ISSUER: &str = "https://progear.okta.com/oauth2/default";
    pub const TEST_AUDIENCE: &str = "api://progear";

    pub fn sign(claims: &Value) -> String {
        let header = Header {
            kid: Some(TEST_KID.to_string()),
            ..Header::new(Algorithm::HS256)
        };
        encode(&header, claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
    }

    pub fn valid_claims(scopes: &[&str]) -> Value {
        json!({
            "sub": "sales-agent",
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "exp": unix_now() + 3600,
            "iat": unix_now(),
            "scp": scopes,
        })
    }

    fn unix_now() -> i64 {
        i64::try_from(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        )
        .unwrap()
    }

    pub fn test_verifier(audience: Option<&str>) -> TokenVerifier {
        let keys = StaticKeys::new().with_key(TEST_KID, DecodingKey::from_secret(TEST_SECRET));
        TokenVerifier::new(
            Arc::new(keys),
            VerifierSettings {
                issuer: Some(TEST_ISSUER.to_string()),
                audience: audience.map(str::to_string),
                algorithms: vec![Algorithm::HS256],
            },
        )
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let token = sign(&valid_claims(&["inventory:read"]));
        let claims = test_verifier(Some(TEST_AUDIENCE))
            .verify(&token)
            .await
            .unwrap();
        assert_eq!(claims.sub, "sales-agent");
        assert!(claims.has_scope("inventory:read"));
    }

    #[tokio::test]
    async fn test_verify_without_audience_ignores_aud() {
        let mut claims = valid_claims(&[]);
        claims["aud"] = json!("api://somewhere-else");
        assert!(test_verifier(None).verify(&sign(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_audience() {
        let mut claims = valid_claims(&[]);
        claims["aud"] = json!("api://somewhere-else");
        assert!(matches!(
            test_verifier(Some(TEST_AUDIENCE)).verify(&sign(&claims)).await,
            Err(AuthError::Jwt(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_issuer() {
        let mut claims = valid_claims(&[]);
        claims["iss"] = json!("https://evil.example.com");
        assert!(test_verifier(None).verify(&sign(&claims)).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_rejects_expired() {
        let mut claims = valid_claims(&[]);
        claims["exp"] = json!(1_000_000);
        assert!(test_verifier(None).verify(&sign(&claims)).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_signature() {
        let header = Header {
            kid: Some(TEST_KID.to_string()),
            ..Header::new(Algorithm::HS256)
        };
        let token = encode(
            &header,
            &valid_claims(&[]),
            &EncodingKey::from_secret(b"someone-elses-secret"),
        )
        .unwrap();
        assert!(test_verifier(None).verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_rejects_disallowed_algorithm() {
        let header = Header {
            kid: Some(TEST_KID.to_string()),
            ..Header::new(Algorithm::HS512)
        };
        let token = encode(
            &header,
            &valid_claims(&[]),
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();
        assert!(matches!(
            test_verifier(None).verify(&token).await,
            Err(AuthError::AlgorithmNotAllowed(Algorithm::HS512))
        ));
    }

    #[tokio::test]
    async fn test_verify_requires_kid() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &valid_claims(&[]),
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();
        assert!(matches!(
            test_verifier(None).verify(&token).await,
            Err(AuthError::MissingKeyId)
        ));
    }

    #[tokio::test]
    async fn test_verify_garbage() {
        assert!(matches!(
            test_verifier(None).verify("not-a-jwt").await,
            Err(AuthError::Jwt(_))
        ));
    }
}
