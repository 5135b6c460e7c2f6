//! Identity provider signing keys.
//!
//! A [`SigningKey`] can only be built from text that decodes as at least one
//! PEM block, so whatever sits in the authenticator's cache has already
//! passed validation. Only the envelope is checked here; whether the key
//! material suits the configured algorithm is up to the verifier.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The candidate key is not PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Signing key must be PEM encoded")]
pub struct KeyFormatError;

/// Check that `candidate` decodes as at least one PEM block.
///
/// Blocks that fail to decode are skipped; one good block is enough.
pub fn validate_pem(candidate: &str) -> Result<(), KeyFormatError> {
    for (start, _) in candidate.match_indices("-----BEGIN") {
        let Some(section) = candidate.get(start..) else {
            continue;
        };
        match pem::parse(section) {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::debug!(target: "route_auth.signing_key", error = %e, "Skipping undecodable PEM block");
            }
        }
    }

    Err(KeyFormatError)
}

/// A validated, PEM-encoded public signing key.
///
/// Cloning is cheap; the key text is shared and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Arc<str>);

impl SigningKey {
    /// Validate `pem_text` and wrap it.
    pub fn parse(pem_text: impl Into<String>) -> Result<Self, KeyFormatError> {
        let pem_text = pem_text.into();
        validate_pem(&pem_text)?;
        Ok(Self(Arc::from(pem_text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----\n\
MCowBQYDK2VwAyEAGb9ECWmEzf6FQbrBZ9w7lshQhqowtrbLDFw4rXAxZuE=\n\
-----END PUBLIC KEY-----\n";

    #[test]
    fn test_validate_pem_accepts_public_key() {
        assert!(validate_pem(PUBLIC_KEY_PEM).is_ok());
    }

    #[test]
    fn test_validate_pem_accepts_multiple_blocks() {
        let two = format!("{PUBLIC_KEY_PEM}{PUBLIC_KEY_PEM}");
        assert!(validate_pem(&two).is_ok());
    }

    #[test]
    fn test_validate_pem_accepts_valid_block_before_malformed_block() {
        let blob = format!("{PUBLIC_KEY_PEM}-----BEGIN X-----\n!!!!\n-----END X-----\n");
        assert!(validate_pem(&blob).is_ok());
    }

    #[test]
    fn test_validate_pem_accepts_valid_block_after_malformed_block() {
        let blob = format!("-----BEGIN X-----\n!!!!\n-----END X-----\n{PUBLIC_KEY_PEM}");
        assert!(validate_pem(&blob).is_ok());
    }

    #[test]
    fn test_validate_pem_accepts_surrounding_text() {
        let blob = format!("key follows\n{PUBLIC_KEY_PEM}trailer\n");
        assert!(validate_pem(&blob).is_ok());
    }

    #[test]
    fn test_validate_pem_rejects_only_malformed_blocks() {
        assert_eq!(
            validate_pem("-----BEGIN X-----\n!!!!\n-----END X-----\n"),
            Err(KeyFormatError)
        );
    }

    #[test]
    fn test_validate_pem_rejects_empty() {
        assert_eq!(validate_pem(""), Err(KeyFormatError));
    }

    #[test]
    fn test_validate_pem_rejects_raw_base64() {
        assert_eq!(
            validate_pem("MCowBQYDK2VwAyEAGb9ECWmEzf6FQbrBZ9w7lshQhqowtrbLDFw4rXAxZuE="),
            Err(KeyFormatError)
        );
    }

    #[test]
    fn test_validate_pem_rejects_mismatched_labels() {
        let pem = "-----BEGIN PUBLIC KEY-----\n\
MCowBQYDK2VwAyEAGb9ECWmEzf6FQbrBZ9w7lshQhqowtrbLDFw4rXAxZuE=\n\
-----END PRIVATE KEY-----\n";
        assert!(validate_pem(pem).is_err());
    }

    #[test]
    fn test_signing_key_parse_keeps_text() {
        let key = SigningKey::parse(PUBLIC_KEY_PEM).unwrap();
        assert_eq!(key.as_str(), PUBLIC_KEY_PEM);
        assert_eq!(key.as_bytes(), PUBLIC_KEY_PEM.as_bytes());
    }

    #[test]
    fn test_signing_key_parse_rejects_garbage() {
        assert!(SigningKey::parse("not a key").is_err());
    }

    #[test]
    fn test_signing_key_debug_omits_material() {
        let key = SigningKey::parse(PUBLIC_KEY_PEM).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("BEGIN PUBLIC KEY"));
        assert!(debug.contains("len"));
    }
}
