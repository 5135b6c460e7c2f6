//! Bearer token authentication and authorization for the routing API.
//!
//! Every call that mutates the routing table presents an `Authorization`
//! header. This crate verifies that the token was signed by the identity
//! provider, survives signing-key rotation without a restart, and checks
//! that the token carries one of the scopes the operation requires.
//!
//! # Components
//!
//! - `authenticator` - the [`Authenticator`] gate and its retry-on-rotation protocol
//! - `signing_key` - PEM validation and the cached [`SigningKey`]
//! - `key_source` - where fresh signing keys come from
//! - `verifier` - JWT signature and claim verification
//! - `claims` - decoded claims and scope matching
//! - `middleware` - axum integration for protected routes and health probes
//! - `config` - environment-driven configuration

pub mod authenticator;
pub mod claims;
pub mod config;
pub mod errors;
pub mod key_source;
pub mod middleware;
pub mod observability;
pub mod signing_key;
pub mod verifier;

pub use authenticator::{parse_bearer, Authenticator, TokenAuthenticator};
pub use claims::TokenClaims;
pub use config::{AuthConfig, ConfigError};
pub use errors::AuthError;
pub use key_source::{HttpKeySource, KeySource, KeySourceError, StaticKeySource};
pub use signing_key::SigningKey;
pub use verifier::{JwtSignatureVerifier, SignatureVerifier, VerificationError};
