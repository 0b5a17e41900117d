//! Access gate
//!
//! A yes/no capability check in front of the API. When a hash is
//! configured, callers must present the secret whose SHA-256 hex digest
//! matches it.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    expected_hash: Option<String>,
}

impl AccessGate {
    /// Gate that admits everyone
    pub fn open() -> Self {
        Self::default()
    }

    /// Gate that admits callers whose secret hashes to `hex_digest`
    pub fn with_hash(hex_digest: &str) -> Self {
        Self {
            expected_hash: Some(hex_digest.trim().to_ascii_lowercase()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.expected_hash.is_none()
    }

    pub fn is_authenticated(&self, secret: Option<&str>) -> bool {
        match (&self.expected_hash, secret) {
            (None, _) => true,
            (Some(expected), Some(secret)) => digest_hex(secret)
                .as_bytes()
                .ct_eq(expected.as_bytes())
                .into(),
            (Some(_), None) => false,
        }
    }
}

pub fn digest_hex(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
