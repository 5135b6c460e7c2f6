//! Metrics definitions for the authentication gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `route_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 8 values (success, malformed_header, unsupported_scheme,
//!   key_source_failure, invalid_key_format, invalid_token,
//!   missing_scope_claim, insufficient_scope)
//! - `status`: 3 values (success, error, invalid_format)

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome of one authorization call
///
/// Metric: `route_auth_authorizations_total`
/// Labels: `outcome`
pub fn record_authorization(outcome: &'static str) {
    counter!("route_auth_authorizations_total", "outcome" => outcome).increment(1);
}

/// Record a signing key fetch
///
/// Metric: `route_auth_key_fetches_total`
/// Labels: `status`
pub fn record_key_fetch(status: &'static str) {
    counter!("route_auth_key_fetches_total", "status" => status).increment(1);
}

/// Record how long a signing key fetch took
///
/// Metric: `route_auth_key_fetch_duration_seconds`
pub fn record_key_fetch_duration(duration: Duration) {
    histogram!("route_auth_key_fetch_duration_seconds").record(duration.as_secs_f64());
}
