//! Signing-key sources for token verification.
//!
//! Production tokens are verified against the issuer's JWKS, fetched over
//! HTTP and cached with `moka`. Tests and local tooling use [`StaticKeys`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use moka::future::Cache;
use tracing::{debug, instrument};
use url::Url;

use super::AuthError;

/// Default JWKS cache lifetime.
pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(300);

/// Minimum interval between refetches forced by an unknown `kid`.
pub const DEFAULT_REFETCH_COOLDOWN: Duration = Duration::from_secs(30);

/// Resolves the verification key for a token's `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Return the decoding key for `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownKeyId` if no such key exists, or
    /// `AuthError::Jwks` if the key set could not be loaded.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError>;
}

/// JWKS fetched from `<issuer>/v1/keys`.
///
/// The whole key set is cached under a single entry. Concurrent misses
/// share one fetch. A `kid` missing from the cached set triggers a refetch
/// so signing-key rotation is picked up before the TTL expires, at most
/// once per cooldown window. Inside the window unknown ids are rejected
/// against the cached set.
#[derive(Clone)]
pub struct RemoteJwks {
    inner: Arc<RemoteJwksInner>,
}

struct RemoteJwksInner {
    client: reqwest::Client,
    url: Url,
    cache: Cache<(), Arc<JwkSet>>,
    refetch_cooldown: Cache<(), ()>,
}

impl RemoteJwks {
    /// Create a key source for an issuer URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Jwks` if the issuer is not a valid URL.
    pub fn for_issuer(issuer: &str, ttl: Duration) -> Result<Self, AuthError> {
        let url = Url::parse(&format!("{}/v1/keys", issuer.trim_end_matches('/')))
            .map_err(|e| AuthError::Jwks(format!("invalid issuer URL: {e}")))?;
        Ok(Self::new(url, ttl))
    }

    /// Create a key source for an explicit JWKS URL.
    #[must_use]
    pub fn new(url: Url, ttl: Duration) -> Self {
        Self::with_refetch_cooldown(url, ttl, DEFAULT_REFETCH_COOLDOWN)
    }

    /// Create a key source with a custom unknown-`kid` refetch cooldown.
    #[must_use]
    pub fn with_refetch_cooldown(url: Url, ttl: Duration, cooldown: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        let refetch_cooldown = Cache::builder()
            .max_capacity(1)
            .time_to_live(cooldown)
            .build();

        Self {
            inner: Arc::new(RemoteJwksInner {
                client: reqwest::Client::new(),
                url,
                cache,
                refetch_cooldown,
            }),
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    #[instrument(skip(self), fields(url = %self.inner.url))]
    async fn fetch(&self) -> Result<Arc<JwkSet>, AuthError> {
        debug!("Fetching JWKS");

        let response = self
            .inner
            .client
            .get(self.inner.url.clone())
            .send()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Jwks(format!("HTTP {status}")));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;
        debug!(keys = set.keys.len(), "JWKS loaded");
        Ok(Arc::new(set))
    }

    async fn key_set(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.inner
            .cache
            .try_get_with((), self.fetch())
            .await
            .map_err(|e| match e.as_ref() {
                AuthError::Jwks(msg) => AuthError::Jwks(msg.clone()),
                other => AuthError::Jwks(other.to_string()),
            })
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let set = self.key_set().await?;
        if let Some(jwk) = set.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        let slot = self.inner.refetch_cooldown.entry(()).or_insert(()).await;
        if !slot.is_fresh() {
            debug!(kid, "Unknown key id, refetch cooling down");
            return Err(AuthError::UnknownKeyId(kid.to_string()));
        }

        debug!(kid, "Unknown key id, refetching JWKS");
        self.inner.cache.invalidate(&()).await;
        let set = self.key_set().await?;
        let jwk = set
            .find(kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

/// In-memory keys by `kid`.
#[derive(Clone, Default)]
pub struct StaticKeys {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }
}

#[async_trait]
impl KeySource for StaticKeys {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}
