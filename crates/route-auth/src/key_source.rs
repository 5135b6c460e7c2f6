//! Sources of the identity provider's current public signing key.
//!
//! The authenticator asks its [`KeySource`] for a key on cold start and again
//! whenever a token fails signature verification against the cached key.
//! Implementations may block on network I/O and may be called concurrently.

use crate::observability::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Default timeout for a single key fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by a [`KeySource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("identity provider returned status {0}")]
    Status(u16),

    #[error("could not decode key response: {0}")]
    Decode(String),
}

/// Fetches the identity provider's current public signing key.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Return the key material, normally PEM text.
    async fn fetch_key(&self) -> Result<String, KeySourceError>;
}

/// Token key response from a UAA-style `/token_key` endpoint.
///
/// Only `value` is needed; the remaining fields describe the key and are
/// accepted but ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenKeyResponse {
    /// PEM-encoded verification key.
    pub value: String,

    /// Signature algorithm advertised by the provider.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key ID.
    #[serde(default)]
    pub kid: Option<String>,
}

/// Key source that fetches from the identity provider over HTTP.
pub struct HttpKeySource {
    /// URL of the token key endpoint.
    token_key_url: String,

    /// HTTP client for fetching keys.
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a key source with the default fetch timeout.
    pub fn new(token_key_url: String) -> Self {
        Self::with_timeout(token_key_url, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a key source with a custom fetch timeout.
    pub fn with_timeout(token_key_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "route_auth.key_source", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            token_key_url,
            http_client,
        }
    }

    pub fn token_key_url(&self) -> &str {
        &self.token_key_url
    }

    async fn request_key(&self) -> Result<String, KeySourceError> {
        let response = self
            .http_client
            .get(&self.token_key_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "route_auth.key_source", error = %e, "Failed to fetch signing key");
                KeySourceError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "route_auth.key_source",
                status = %status,
                "Token key endpoint returned error"
            );
            return Err(KeySourceError::Status(status.as_u16()));
        }

        let body: TokenKeyResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "route_auth.key_source", error = %e, "Failed to parse token key response");
            KeySourceError::Decode(e.to_string())
        })?;

        tracing::info!(
            target: "route_auth.key_source",
            alg = body.alg.as_deref().unwrap_or("unspecified"),
            kid = body.kid.as_deref().unwrap_or("unspecified"),
            "Fetched signing key from identity provider"
        );

        Ok(body.value)
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %self.token_key_url))]
    async fn fetch_key(&self) -> Result<String, KeySourceError> {
        let start = Instant::now();
        let result = self.request_key().await;
        metrics::record_key_fetch_duration(start.elapsed());
        result
    }
}

/// Key source that always hands back the same key.
///
/// Suitable when the key is distributed out of band; picking up a rotated
/// key then requires a restart.
#[derive(Clone)]
pub struct StaticKeySource {
    key: String,
}

impl StaticKeySource {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch_key(&self) -> Result<String, KeySourceError> {
        Ok(self.key.clone())
    }
}
