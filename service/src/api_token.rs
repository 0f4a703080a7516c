//! The shared secret API callers present as a bearer token.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Only the SHA-256 digest of the token is kept in memory.
#[derive(Clone)]
pub struct ApiToken {
    digest: [u8; 32],
}

impl ApiToken {
    pub fn new(token: &str) -> Self {
        Self {
            digest: Self::digest(token),
        }
    }

    /// A fresh random token. The plaintext is returned once so it can be shown to the operator.
    pub fn generate() -> (Self, String) {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        (Self::new(&token), token)
    }

    /// Uses the configured token, or generates one when none is configured.
    /// The second element is the plaintext of a generated token.
    pub fn resolve(configured: Option<&str>) -> (Self, Option<String>) {
        match configured.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => (Self::new(token), None),
            None => {
                let (api_token, plaintext) = Self::generate();
                (api_token, Some(plaintext))
            }
        }
    }

    /// Compares digests in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        Self::digest(candidate)
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }

    fn digest(token: &str) -> [u8; 32] {
        Sha256::digest(token.as_bytes()).into()
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(..)")
    }
}
