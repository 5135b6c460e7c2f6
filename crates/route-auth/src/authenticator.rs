//! The authentication gate in front of routing table mutations.
//!
//! [`TokenAuthenticator`] verifies `bearer <jwt>` credentials against the
//! identity provider's public key, caching the key across requests. When a
//! token's signature does not match the cached key, the key is refetched
//! once and verification retried, so a provider-side key rotation is picked
//! up without a restart. A second mismatch against the fresh key is final.
//!
//! # Concurrency
//!
//! The cached key is the only shared mutable state. Readers take the shared
//! side of a `RwLock` and clone an `Arc`; a refetch runs outside the lock and
//! holds the write side only for the swap. Every call that starts after a
//! swap completes sees the new key.
//!
//! Concurrent refetches are not coalesced and publish in completion order.
//! A fetch that returns the key it set out to replace, after another task
//! has already published a different one, is dropped instead of rolling the
//! cache back; the caller verifies against the newer cached key.

use crate::claims::{check_scopes, TokenClaims};
use crate::config::{AuthConfig, ConfigError};
use crate::errors::AuthError;
use crate::key_source::{HttpKeySource, KeySource};
use crate::observability::metrics;
use crate::signing_key::{validate_pem, SigningKey};
use crate::verifier::{JwtSignatureVerifier, SignatureVerifier, VerificationError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Scheme literal expected in the `Authorization` header. Matched exactly.
pub const BEARER_SCHEME: &str = "bearer";

/// Verification attempts per call: one against the cached key, one after a refetch.
const MAX_VERIFY_ATTEMPTS: u32 = 2;

/// Split a raw `Authorization` header value into its token.
///
/// The value must be exactly two parts separated by a single space, and the
/// first part must be the lowercase `bearer` literal.
pub fn parse_bearer(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedHeader);
    };

    if scheme != BEARER_SCHEME {
        return Err(AuthError::UnsupportedScheme(scheme.to_string()));
    }

    Ok(token)
}

/// Verifies bearer tokens and enforces scopes, refetching the signing key on rotation.
pub struct TokenAuthenticator {
    key_source: Arc<dyn KeySource>,
    verifier: Arc<dyn SignatureVerifier>,
    signing_key: RwLock<Option<SigningKey>>,
}

impl TokenAuthenticator {
    /// Create an authenticator with an empty key cache.
    ///
    /// The first call to [`authorize`](Self::authorize) fetches the key.
    pub fn new(key_source: Arc<dyn KeySource>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            key_source,
            verifier,
            signing_key: RwLock::new(None),
        }
    }

    /// Create an authenticator whose cache starts out holding `signing_key`.
    pub fn with_signing_key(
        key_source: Arc<dyn KeySource>,
        verifier: Arc<dyn SignatureVerifier>,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            key_source,
            verifier,
            signing_key: RwLock::new(Some(signing_key)),
        }
    }

    /// Authenticate `header_value` and require one of `required_scopes`.
    ///
    /// An empty `required_scopes` admits any token that verifies.
    ///
    /// # Errors
    ///
    /// - `MalformedHeader` / `UnsupportedScheme` if the header is not `bearer <token>`
    /// - `KeySourceFailure` / `InvalidKeyFormat` if a needed key fetch fails
    /// - `InvalidToken` if the token does not verify, even after a key refetch
    /// - `MissingScopeClaim` / `InsufficientScope` if the scopes do not allow the call
    #[instrument(skip_all, name = "route_auth.authorize", fields(required_scopes = ?required_scopes))]
    pub async fn authorize(
        &self,
        header_value: &str,
        required_scopes: &[&str],
    ) -> Result<(), AuthError> {
        let result = self.authorize_inner(header_value, required_scopes).await;
        match &result {
            Ok(()) => metrics::record_authorization("success"),
            Err(e) => metrics::record_authorization(e.kind_label()),
        }
        result
    }

    async fn authorize_inner(
        &self,
        header_value: &str,
        required_scopes: &[&str],
    ) -> Result<(), AuthError> {
        let token = parse_bearer(header_value).map_err(|e| {
            tracing::debug!(target: "route_auth.authenticator", error = %e, "Rejected authorization header");
            e
        })?;

        let claims = self.verify_with_rotation(token).await?;
        check_scopes(&claims, required_scopes)?;

        tracing::debug!(target: "route_auth.authenticator", "Token authorized");
        Ok(())
    }

    /// Verify `token`, refetching the key once if the signature does not match.
    async fn verify_with_rotation(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut force_refresh = false;

        for attempt in 1..=MAX_VERIFY_ATTEMPTS {
            let key = self.current_key(force_refresh).await?;

            match self.verifier.verify(token, &key) {
                Ok(claims) => return Ok(claims),
                Err(e) if e.triggers_key_refresh() && attempt < MAX_VERIFY_ATTEMPTS => {
                    tracing::info!(
                        target: "route_auth.authenticator",
                        error = %e,
                        "Token signature did not match cached key, refetching signing key"
                    );
                    force_refresh = true;
                }
                Err(e) => {
                    tracing::debug!(
                        target: "route_auth.authenticator",
                        error = %e,
                        attempt,
                        "Token verification failed"
                    );
                    return Err(AuthError::InvalidToken(e));
                }
            }
        }

        // Every iteration returns on its final attempt
        Err(AuthError::InvalidToken(VerificationError::SignatureMismatch))
    }

    /// Return the cached key, fetching one if the cache is empty or `force_refresh` is set.
    async fn current_key(&self, force_refresh: bool) -> Result<SigningKey, AuthError> {
        if !force_refresh {
            if let Some(key) = self.signing_key.read().await.as_ref() {
                return Ok(key.clone());
            }
        }

        self.refresh_key().await
    }

    /// Fetch, validate and publish a fresh signing key.
    ///
    /// The fetch happens without holding the lock. A key that fails PEM
    /// validation is never published, and neither is a stale key that
    /// would overwrite a newer one published while the fetch was in flight.
    #[instrument(skip(self), name = "route_auth.refresh_key")]
    async fn refresh_key(&self) -> Result<SigningKey, AuthError> {
        let replacing = self.cached_key().await;

        let fetched = self.key_source.fetch_key().await.map_err(|e| {
            tracing::warn!(target: "route_auth.authenticator", error = %e, "Signing key fetch failed");
            metrics::record_key_fetch("error");
            AuthError::KeySourceFailure(e)
        })?;

        let key = SigningKey::parse(fetched).map_err(|e| {
            tracing::error!(target: "route_auth.authenticator", error = %e, "Fetched signing key rejected");
            metrics::record_key_fetch("invalid_format");
            AuthError::InvalidKeyFormat
        })?;

        metrics::record_key_fetch("success");

        let mut cached = self.signing_key.write().await;
        let superseded = match cached.as_ref() {
            Some(current) if replacing.as_ref() == Some(&key) && current != &key => {
                Some(current.clone())
            }
            _ => None,
        };
        if let Some(current) = superseded {
            tracing::info!(
                target: "route_auth.authenticator",
                "Fetched signing key already superseded, keeping newer cached key"
            );
            return Ok(current);
        }

        *cached = Some(key.clone());
        tracing::info!(target: "route_auth.authenticator", "Signing key cache refreshed");
        Ok(key)
    }

    /// Check that a signing key is cached and still PEM encoded.
    ///
    /// Never touches the network.
    pub async fn check_signing_key_health(&self) -> Result<(), AuthError> {
        let cached = self.signing_key.read().await;
        let key = cached.as_ref().ok_or(AuthError::NoKeyConfigured)?;
        validate_pem(key.as_str()).map_err(|_| AuthError::InvalidKeyFormat)
    }

    /// Snapshot of the cached key, if any.
    pub async fn cached_key(&self) -> Option<SigningKey> {
        self.signing_key.read().await.clone()
    }
}

/// The authentication gate, selected once at startup.
///
/// `Disabled` admits every request and reports healthy; it exists for
/// environments that run without an identity provider.
pub enum Authenticator {
    Verifying(TokenAuthenticator),
    Disabled,
}

impl Authenticator {
    /// Build the gate described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configured algorithm cannot verify with a
    /// public key.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let Some(settings) = config.verification() else {
            tracing::warn!(
                target: "route_auth.authenticator",
                "Authentication disabled, all requests will be admitted"
            );
            return Ok(Authenticator::Disabled);
        };

        let mut verifier = JwtSignatureVerifier::new(settings.algorithm)
            .map_err(|e| ConfigError::InvalidAlgorithm(e.to_string()))?
            .with_leeway(settings.clock_skew);
        if let Some(issuer) = &settings.issuer {
            verifier = verifier.with_issuer(issuer);
        }
        if let Some(audience) = &settings.audience {
            verifier = verifier.with_audience(audience);
        }

        let key_source = HttpKeySource::with_timeout(
            settings.token_key_url.clone(),
            settings.key_fetch_timeout,
        );

        let key_source: Arc<dyn KeySource> = Arc::new(key_source);
        let verifier: Arc<dyn SignatureVerifier> = Arc::new(verifier);

        let authenticator = match &settings.initial_key {
            Some(key) => TokenAuthenticator::with_signing_key(key_source, verifier, key.clone()),
            None => TokenAuthenticator::new(key_source, verifier),
        };

        tracing::info!(
            target: "route_auth.authenticator",
            token_key_url = %settings.token_key_url,
            algorithm = ?settings.algorithm,
            preseeded_key = settings.initial_key.is_some(),
            "Token authentication enabled"
        );

        Ok(Authenticator::Verifying(authenticator))
    }

    /// See [`TokenAuthenticator::authorize`]. Always succeeds when disabled.
    pub async fn authorize(
        &self,
        header_value: &str,
        required_scopes: &[&str],
    ) -> Result<(), AuthError> {
        match self {
            Authenticator::Verifying(inner) => inner.authorize(header_value, required_scopes).await,
            Authenticator::Disabled => Ok(()),
        }
    }

    /// See [`TokenAuthenticator::check_signing_key_health`]. Always succeeds when disabled.
    pub async fn check_signing_key_health(&self) -> Result<(), AuthError> {
        match self {
            Authenticator::Verifying(inner) => inner.check_signing_key_health().await,
            Authenticator::Disabled => Ok(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Authenticator::Verifying(_))
    }
}

impl From<TokenAuthenticator> for Authenticator {
    fn from(inner: TokenAuthenticator) -> Self {
        Authenticator::Verifying(inner)
    }
}
