//! Authentication configuration.
//!
//! Configuration is loaded from environment variables. A pre-seeded signing
//! key is validated at load time so a misconfigured key fails startup rather
//! than the first request.

use crate::key_source::DEFAULT_FETCH_TIMEOUT;
use crate::signing_key::SigningKey;
use crate::verifier::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default token verification algorithm (UAA signs with RS256).
pub const DEFAULT_JWT_ALGORITHM: Algorithm = Algorithm::RS256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid AUTH_DISABLED value: {0}")]
    InvalidAuthDisabled(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid key fetch timeout configuration: {0}")]
    InvalidKeyFetchTimeout(String),

    #[error("Invalid UAA_PUBLIC_KEY: {0}")]
    InvalidSigningKey(String),
}

/// Settings used when token verification is enabled.
#[derive(Debug, Clone)]
pub struct VerificationSettings {
    /// Identity provider endpoint serving the current signing key.
    pub token_key_url: String,

    /// Key to seed the cache with before the first fetch.
    pub initial_key: Option<SigningKey>,

    /// Signature algorithm tokens must use.
    pub algorithm: Algorithm,

    /// Clock skew tolerance for `exp`/`nbf`.
    pub clock_skew: Duration,

    /// Required `iss` claim, if any.
    pub issuer: Option<String>,

    /// Required `aud` entry, if any.
    pub audience: Option<String>,

    /// Timeout for one signing key fetch.
    pub key_fetch_timeout: Duration,
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    verification: Option<VerificationSettings>,
}

impl AuthConfig {
    /// Configuration for the pass-through gate.
    pub fn disabled() -> Self {
        Self { verification: None }
    }

    /// Configuration for the verifying gate.
    pub fn enabled(settings: VerificationSettings) -> Self {
        Self {
            verification: Some(settings),
        }
    }

    /// Verification settings, or `None` when authentication is disabled.
    pub fn verification(&self) -> Option<&VerificationSettings> {
        self.verification.as_ref()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let disabled = match vars.get("AUTH_DISABLED").map(|v| v.trim()) {
            None | Some("") => false,
            Some(value) => value.parse::<bool>().map_err(|_| {
                ConfigError::InvalidAuthDisabled(format!(
                    "AUTH_DISABLED must be 'true' or 'false', got '{}'",
                    value
                ))
            })?,
        };

        if disabled {
            return Ok(Self::disabled());
        }

        let token_key_url = vars
            .get("UAA_TOKEN_KEY_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("UAA_TOKEN_KEY_URL".to_string()))?
            .clone();

        let initial_key = match vars.get("UAA_PUBLIC_KEY").filter(|v| !v.trim().is_empty()) {
            Some(pem) => Some(
                SigningKey::parse(pem.clone())
                    .map_err(|e| ConfigError::InvalidSigningKey(e.to_string()))?,
            ),
            None => None,
        };

        let algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => {
                let algorithm = Algorithm::from_str(value).map_err(|e| {
                    ConfigError::InvalidAlgorithm(format!(
                        "JWT_ALGORITHM must name a JWT algorithm, got '{}': {}",
                        value, e
                    ))
                })?;
                if matches!(
                    algorithm,
                    Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
                ) {
                    return Err(ConfigError::InvalidAlgorithm(format!(
                        "JWT_ALGORITHM must be an asymmetric algorithm, got '{}'",
                        value
                    )));
                }
                algorithm
            }
            None => DEFAULT_JWT_ALGORITHM,
        };

        // Parse JWT clock skew tolerance with validation
        let clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwtClockSkew(
                    "JWT_CLOCK_SKEW_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let key_fetch_timeout = if let Some(value_str) = vars.get("KEY_FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidKeyFetchTimeout(format!(
                    "KEY_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidKeyFetchTimeout(
                    "KEY_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_FETCH_TIMEOUT
        };

        let issuer = vars.get("JWT_ISSUER").filter(|v| !v.is_empty()).cloned();
        let audience = vars.get("JWT_AUDIENCE").filter(|v| !v.is_empty()).cloned();

        Ok(Self::enabled(VerificationSettings {
            token_key_url,
            initial_key,
            algorithm,
            clock_skew,
            issuer,
            audience,
            key_fetch_timeout,
        }))
    }
}
