//! Test token builders
//!
//! Provides fluent API for constructing test JWT claims.

use crate::crypto_fixtures::TestKeypair;
use chrono::Utc;
use serde_json::{json, Map, Value};

/// Builder for test token claims.
///
/// Produces an identity-provider-shaped payload: `sub`, `client_id`, a
/// `scope` array, `iat` and `exp`.
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    subject: String,
    client_id: String,
    scopes: Option<Vec<String>>,
    issued_at: i64,
    expires_at: i64,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new builder with default values.
    ///
    /// Defaults: subject "test-client", no scopes, valid for one hour.
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        Self {
            subject: "test-client".to_string(),
            client_id: "test-client".to_string(),
            scopes: Some(Vec::new()),
            issued_at: now,
            expires_at: now + 3600,
            extra: Map::new(),
        }
    }

    pub fn for_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self.client_id = subject.to_string();
        self
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = Some(scopes.iter().map(|s| (*s).to_string()).collect());
        self
    }

    /// Leave the `scope` claim out entirely.
    pub fn without_scope(mut self) -> Self {
        self.scopes = None;
        self
    }

    /// Set expiration relative to now. Negative values produce an expired token.
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.expires_at = Utc::now().timestamp() + seconds;
        self
    }

    /// Set or override an arbitrary claim. Applied after the standard claims.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims payload.
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.subject));
        claims.insert("client_id".to_string(), json!(self.client_id));
        claims.insert("iat".to_string(), json!(self.issued_at));
        claims.insert("exp".to_string(), json!(self.expires_at));
        if let Some(scopes) = self.scopes {
            claims.insert("scope".to_string(), json!(scopes));
        }
        claims.extend(self.extra);
        Value::Object(claims)
    }

    /// Build and sign with `keypair`, returning the compact JWT.
    pub fn sign(self, keypair: &TestKeypair) -> String {
        keypair.sign(&self.build())
    }

    /// Build, sign and wrap as an `Authorization` header value.
    pub fn bearer(self, keypair: &TestKeypair) -> String {
        format!("bearer {}", self.sign(keypair))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new().build();

        assert_eq!(claims["sub"], "test-client");
        assert_eq!(claims["scope"], json!([]));
        let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, 3600);
    }

    #[test]
    fn test_for_subject_sets_sub_and_client_id() {
        let claims = TestTokenBuilder::new().for_subject("tcp-router").build();

        assert_eq!(claims["sub"], "tcp-router");
        assert_eq!(claims["client_id"], "tcp-router");
    }

    #[test]
    fn test_builder_scopes_are_an_array() {
        let claims = TestTokenBuilder::new()
            .with_scopes(&["route.advertise", "route.admin"])
            .build();

        assert_eq!(claims["scope"], json!(["route.advertise", "route.admin"]));
    }

    #[test]
    fn test_builder_without_scope() {
        let claims = TestTokenBuilder::new().without_scope().build();
        assert!(claims.get("scope").is_none());
    }

    #[test]
    fn test_with_claim_overrides_standard_claims() {
        let claims = TestTokenBuilder::new()
            .with_claim("scope", json!("route.advertise"))
            .build();

        assert_eq!(claims["scope"], "route.advertise");
    }

    #[test]
    fn test_expired_token() {
        let claims = TestTokenBuilder::new().expires_in_seconds(-3600).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }

    #[test]
    fn test_bearer_prefix() {
        let header = TestTokenBuilder::new().bearer(&TestKeypair::from_seed(1));
        assert!(header.starts_with("bearer "));
        assert_eq!(header.split(' ').count(), 2);
    }
}
