//! # route-auth test utilities
//!
//! Shared test utilities for the `route-auth` crate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys for reproducible tests)
//! - Test token builders (`TestTokenBuilder`)
//! - Scripted key sources that count fetches (`ScriptedKeySource`)
//! - Test log capture (`init_test_tracing`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use route_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::from_seed(1);
//!     let token = TestTokenBuilder::new()
//!         .with_scopes(&["route.advertise"])
//!         .sign(&keypair);
//!
//!     let source = ScriptedKeySource::new().then_key(keypair.public_key_pem());
//!     // hand `source` to a TokenAuthenticator...
//! }
//! ```

pub mod crypto_fixtures;
pub mod key_sources;
pub mod logging;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use key_sources::*;
pub use logging::*;
pub use token_builders::*;
