//! Observability for the authentication gate.
//!
//! Provides metrics definitions. Logging goes through `tracing` with
//! `route_auth.*` targets at each call site.

pub mod metrics;
