//! Axum integration for the authentication gate.
//!
//! Routes that mutate the routing table are wrapped with [`require_scopes`],
//! each group with its own [`ScopeGuard`]. The readiness probe uses
//! [`signing_key_health`].
//!
//! ```rust,ignore
//! let guard = ScopeGuard::new(authenticator.clone(), &[ROUTE_ADVERTISE_SCOPE]);
//! let app = Router::new()
//!     .route("/v1/routes", post(upsert_routes).delete(delete_routes))
//!     .route_layer(middleware::from_fn_with_state(guard, require_scopes))
//!     .route("/health/signing-key", get(signing_key_health))
//!     .with_state(authenticator);
//! ```

use crate::authenticator::Authenticator;
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Scope required to register or remove routes.
pub const ROUTE_ADVERTISE_SCOPE: &str = "route.advertise";

/// Scope granting full administrative access to the routing table.
pub const ROUTE_ADMIN_SCOPE: &str = "route.admin";

/// State for [`require_scopes`]: the gate plus the scopes a route group needs.
#[derive(Clone)]
pub struct ScopeGuard {
    authenticator: Arc<Authenticator>,
    required_scopes: Arc<[String]>,
}

impl ScopeGuard {
    pub fn new(authenticator: Arc<Authenticator>, required_scopes: &[&str]) -> Self {
        Self {
            authenticator,
            required_scopes: required_scopes.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }
}

/// Middleware that admits a request only if its bearer token carries a required scope.
///
/// A missing `Authorization` header is authenticated as the empty string
/// and therefore rejected as malformed by the verifying gate.
///
/// # Response
///
/// - 401 Unauthorized with WWW-Authenticate header for authentication failures
/// - 403 Forbidden when the token lacks every required scope
/// - Continues to the next handler otherwise
#[instrument(skip_all, name = "route_auth.middleware.require_scopes")]
pub async fn require_scopes(
    State(guard): State<ScopeGuard>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    // Owned so the request is not borrowed across the await
    let header_value = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_default();

    let required: Vec<&str> = guard.required_scopes.iter().map(String::as_str).collect();
    guard.authenticator.authorize(&header_value, &required).await?;

    Ok(next.run(req).await)
}

/// Readiness body for [`signing_key_health`].
#[derive(Debug, Serialize)]
pub struct SigningKeyHealth {
    pub status: &'static str,
    pub authentication: &'static str,
}

/// Readiness handler reporting whether a usable signing key is cached.
///
/// Performs no network I/O.
#[instrument(skip_all, name = "route_auth.health.signing_key")]
pub async fn signing_key_health(
    State(authenticator): State<Arc<Authenticator>>,
) -> Result<Json<SigningKeyHealth>, AuthError> {
    authenticator.check_signing_key_health().await?;

    Ok(Json(SigningKeyHealth {
        status: "healthy",
        authentication: if authenticator.is_enabled() {
            "enabled"
        } else {
            "disabled"
        },
    }))
}
