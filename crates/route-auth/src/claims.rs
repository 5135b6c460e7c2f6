//! Decoded token claims and scope matching.
//!
//! The identity provider issues the `scope` claim as a JSON array of
//! permission names. Tokens are attacker-controlled input, so a missing or
//! oddly typed claim is an ordinary rejection, never a crash.

use crate::errors::AuthError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Name of the claim holding the token's granted permissions.
pub const SCOPE_CLAIM: &str = "scope";

/// Why a token's scope claim could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeClaimError {
    Missing,
    NotAnArray,
    NonStringEntry,
}

/// Claims of a verified token.
///
/// Only claim names and the `scope` claim appear in Debug output; subject
/// and user identifiers stay out of logs.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TokenClaims {
    claims: HashMap<String, Value>,
}

impl TokenClaims {
    pub fn new(claims: HashMap<String, Value>) -> Self {
        Self { claims }
    }

    /// Look up a raw claim value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Scopes granted to the token, in claim order.
    pub fn scopes(&self) -> Result<Vec<&str>, ScopeClaimError> {
        let value = self.claims.get(SCOPE_CLAIM).ok_or(ScopeClaimError::Missing)?;
        let entries = value.as_array().ok_or(ScopeClaimError::NotAnArray)?;
        entries
            .iter()
            .map(|entry| entry.as_str().ok_or(ScopeClaimError::NonStringEntry))
            .collect()
    }

    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes()
            .map(|scopes| scopes.contains(&scope))
            .unwrap_or(false)
    }
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.claims.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TokenClaims")
            .field("claims", &names)
            .field("scope", &self.claims.get(SCOPE_CLAIM))
            .finish()
    }
}

/// Authorize `claims` against the scopes an operation requires.
///
/// An empty `required` set admits any verified token. Otherwise the token
/// must hold at least one of the required scopes.
pub fn check_scopes(claims: &TokenClaims, required: &[&str]) -> Result<(), AuthError> {
    let granted = claims.scopes().map_err(|e| {
        tracing::debug!(target: "route_auth.claims", reason = ?e, "Unusable scope claim");
        AuthError::MissingScopeClaim
    })?;

    if required.is_empty() || granted.iter().any(|scope| required.contains(scope)) {
        return Ok(());
    }

    tracing::debug!(
        target: "route_auth.claims",
        granted = ?granted,
        required = ?required,
        "Token lacks required scope"
    );
    Err(AuthError::InsufficientScope {
        required: required.iter().map(|s| (*s).to_string()).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims_from(value: Value) -> TokenClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_scopes_in_claim_order() {
        let claims = claims_from(json!({"scope": ["route.advertise", "route.admin"]}));
        assert_eq!(claims.scopes().unwrap(), vec!["route.advertise", "route.admin"]);
    }

    #[test]
    fn test_get_returns_raw_claim() {
        let claims = claims_from(json!({"sub": "router-1", "scope": ["route.advertise"]}));
        assert_eq!(claims.get("sub"), Some(&json!("router-1")));
        assert_eq!(claims.get("scope"), Some(&json!(["route.advertise"])));
        assert!(claims.get("client_id").is_none());
    }

    #[test]
    fn test_scopes_missing_claim() {
        let claims = claims_from(json!({"sub": "user"}));
        assert_eq!(claims.scopes(), Err(ScopeClaimError::Missing));
    }

    #[test]
    fn test_scopes_space_separated_string_is_not_an_array() {
        let claims = claims_from(json!({"scope": "route.advertise route.admin"}));
        assert_eq!(claims.scopes(), Err(ScopeClaimError::NotAnArray));
    }

    #[test]
    fn test_scopes_non_string_entry() {
        let claims = claims_from(json!({"scope": ["route.advertise", 7]}));
        assert_eq!(claims.scopes(), Err(ScopeClaimError::NonStringEntry));
    }

    #[test]
    fn test_has_scope_exact_match_only() {
        let claims = claims_from(json!({"scope": ["route.advertise"]}));
        assert!(claims.has_scope("route.advertise"));
        assert!(!claims.has_scope("route"));
        assert!(!claims.has_scope("route.admin"));
    }

    #[test]
    fn test_check_scopes_intersection() {
        let claims = claims_from(json!({"scope": ["a", "b"]}));

        assert!(check_scopes(&claims, &["b"]).is_ok());
        assert!(check_scopes(&claims, &["c", "a"]).is_ok());

        let err = check_scopes(&claims, &["c", "d"]).unwrap_err();
        match err {
            AuthError::InsufficientScope { required } => assert_eq!(required, vec!["c", "d"]),
            other => panic!("Expected InsufficientScope, got {other:?}"),
        }
    }

    #[test]
    fn test_check_scopes_nothing_required() {
        let claims = claims_from(json!({"scope": []}));
        assert!(check_scopes(&claims, &[]).is_ok());
    }

    #[test]
    fn test_check_scopes_empty_grant() {
        let claims = claims_from(json!({"scope": []}));
        assert!(matches!(
            check_scopes(&claims, &["a"]),
            Err(AuthError::InsufficientScope { .. })
        ));
    }

    #[test]
    fn test_check_scopes_unusable_claim() {
        for value in [json!({}), json!({"scope": {"a": true}}), json!({"scope": [null]})] {
            let claims = claims_from(value);
            assert!(matches!(
                check_scopes(&claims, &["a"]),
                Err(AuthError::MissingScopeClaim)
            ));
        }
    }

    #[test]
    fn test_check_scopes_unusable_claim_even_when_nothing_required() {
        let claims = claims_from(json!({"scope": 42}));
        assert!(matches!(
            check_scopes(&claims, &[]),
            Err(AuthError::MissingScopeClaim)
        ));
    }

    #[test]
    fn test_debug_hides_claim_values() {
        let claims = claims_from(json!({
            "sub": "secret-user-id",
            "user_name": "alice",
            "scope": ["route.advertise"]
        }));
        let debug = format!("{claims:?}");

        assert!(!debug.contains("secret-user-id"));
        assert!(!debug.contains("alice"));
        assert!(debug.contains("user_name"));
        assert!(debug.contains("route.advertise"));
    }
}
