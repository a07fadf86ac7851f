//! Pluggable recipient digests.
//!
//! The cache never persists a plaintext local part, only a digest produced
//! by an injected hasher. The default implementation is salted SHA-256;
//! nothing in the cache assumes a specific algorithm.

use sha2::{Digest, Sha256};

/// Digest capability injected into the reputation cache at construction.
pub trait RecipientHasher: Send + Sync {
    /// Digest a local part into its stored form.
    fn digest(&self, local_part: &str) -> String;
}

/// Salted SHA-256 digest, hex-encoded.
pub struct SaltedSha256 {
    salt: Vec<u8>,
}

impl SaltedSha256 {
    /// Build a hasher with an explicit salt. Use this for digests that
    /// must stay consistent across restarts and instances.
    pub fn new(salt: Vec<u8>) -> Self {
        SaltedSha256 { salt }
    }

    /// Build a hasher with a random salt. Digests will differ between
    /// processes, which is fine for a purely in-memory cache.
    pub fn with_random_salt() -> Self {
        use rand::RngCore;
        let mut salt = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        SaltedSha256::new(salt)
    }
}

impl RecipientHasher for SaltedSha256 {
    fn digest(&self, local_part: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.salt);
        hasher.update(local_part.as_bytes());
        hex::encode(hasher.finalize())
    }
}
