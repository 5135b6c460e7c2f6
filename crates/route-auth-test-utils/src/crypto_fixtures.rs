//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs with PEM-encoded public keys, in the
//! shape an identity provider's token key endpoint hands out. All fixtures are
//! deterministic based on seed values.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// DER prefix of an Ed25519 SubjectPublicKeyInfo (RFC 8410), followed by the 32-byte key.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Ed25519 keypair for signing test tokens.
#[derive(Clone)]
pub struct TestKeypair {
    public_key_pem: String,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Build a keypair from a seed.
    ///
    /// The same seed always produces the same keypair.
    pub fn try_from_seed(seed: u8) -> Result<Self, FixtureError> {
        let seed_bytes = expand_seed(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

        let mut spki = ED25519_SPKI_PREFIX.to_vec();
        spki.extend_from_slice(key_pair.public_key().as_ref());
        let public_key_pem = pem::encode(&pem::Pem::new("PUBLIC KEY", spki));

        Ok(Self {
            public_key_pem,
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        })
    }

    /// Like [`try_from_seed`](Self::try_from_seed), panicking on failure.
    pub fn from_seed(seed: u8) -> Self {
        Self::try_from_seed(seed).expect("Failed to create test keypair")
    }

    /// Public key as SPKI PEM text.
    pub fn public_key_pem(&self) -> String {
        self.public_key_pem.clone()
    }

    /// Sign `claims` as an EdDSA JWT.
    pub fn try_sign(&self, claims: &serde_json::Value) -> Result<String, FixtureError> {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &encoding_key).map_err(|e| FixtureError::Signing(e.to_string()))
    }

    /// Like [`try_sign`](Self::try_sign), panicking on failure.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.try_sign(claims).expect("Failed to sign token")
    }
}

/// Spread a one-byte seed into a 32-byte Ed25519 seed.
fn expand_seed(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production keys never live in this process.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // Outer SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // PrivateKey: OCTET STRING wrapping OCTET STRING with the 32-byte seed
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
