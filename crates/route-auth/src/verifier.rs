//! JWT signature and claim verification.
//!
//! The authenticator treats verification as a pure function of a token and
//! a key. What it needs back is the failure class: a signature that does not
//! match the cached key may mean the identity provider rotated keys and is
//! worth one refetch, while any other failure is final.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the configured asymmetric algorithm is accepted; HMAC is refused
//!   because the key is public
//! - `exp` is required; `exp` and `nbf` are validated with clock skew leeway

use crate::claims::TokenClaims;
use crate::signing_key::SigningKey;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical identity provider tokens are well under 2KB. Larger tokens are
/// rejected before any base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for `exp`/`nbf` (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Signature does not match the key it was checked against.
    #[error("signature does not match signing key")]
    SignatureMismatch,

    /// The key decoded as PEM but cannot verify the configured algorithm.
    #[error("signing key unusable: {0}")]
    UnusableKey(String),

    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("claim rejected: {0}")]
    ClaimRejected(String),
}

impl VerificationError {
    /// Whether refetching the signing key could turn this failure into a success.
    pub fn triggers_key_refresh(&self) -> bool {
        matches!(
            self,
            VerificationError::SignatureMismatch | VerificationError::UnusableKey(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => VerificationError::SignatureMismatch,
            ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => VerificationError::UnusableKey(err.to_string()),
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            ErrorKind::ImmatureSignature => VerificationError::NotYetValid,
            ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject => VerificationError::ClaimRejected(err.to_string()),
            _ => VerificationError::Malformed(err.to_string()),
        }
    }
}

/// Verifies a token string against a signing key.
pub trait SignatureVerifier: Send + Sync {
    /// Check the token's signature and standard claims, returning its claims.
    fn verify(&self, token: &str, key: &SigningKey) -> Result<TokenClaims, VerificationError>;
}

/// HMAC was configured; a shared secret cannot be verified with a public key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported verification algorithm: {0:?}")]
pub struct UnsupportedAlgorithm(pub Algorithm);

/// [`SignatureVerifier`] backed by `jsonwebtoken`.
#[derive(Clone)]
pub struct JwtSignatureVerifier {
    algorithm: Algorithm,
    validation: Validation,
}

impl JwtSignatureVerifier {
    /// Create a verifier for one asymmetric algorithm.
    pub fn new(algorithm: Algorithm) -> Result<Self, UnsupportedAlgorithm> {
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(UnsupportedAlgorithm(algorithm));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = DEFAULT_CLOCK_SKEW.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Audience is only checked when explicitly configured
        validation.validate_aud = false;

        Ok(Self {
            algorithm,
            validation,
        })
    }

    /// Set the clock skew tolerance applied to `exp` and `nbf`.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway.as_secs();
        self
    }

    /// Require the `iss` claim to equal `issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require the `aud` claim to contain `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn decoding_key(&self, key: &SigningKey) -> Result<DecodingKey, VerificationError> {
        let pem = key.as_bytes();
        let decoded = match self.algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(VerificationError::UnusableKey(
                    "HMAC algorithms cannot use a public key".to_string(),
                ))
            }
        };

        decoded.map_err(|e| VerificationError::UnusableKey(e.to_string()))
    }
}

impl SignatureVerifier for JwtSignatureVerifier {
    fn verify(&self, token: &str, key: &SigningKey) -> Result<TokenClaims, VerificationError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "route_auth.verifier",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum"
            );
            return Err(VerificationError::TokenTooLarge);
        }

        let decoding_key = self.decoding_key(key)?;

        let token_data =
            decode::<TokenClaims>(token, &decoding_key, &self.validation).map_err(|e| {
                tracing::debug!(target: "route_auth.verifier", error = %e, "Token verification failed");
                VerificationError::from(e)
            })?;

        Ok(token_data.claims)
    }
}
