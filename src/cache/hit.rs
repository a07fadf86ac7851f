//! A single reputation cache entry.

use std::time::Instant;

use crate::core::outcome::Outcome;

/// Everything the cache knows about one domain: the aggregated
/// domain-level outcome, an absolute expiry, and the salted digests of
/// recipients seen at that domain.
///
/// The outcome describes the domain, not any individual recipient;
/// recipient membership exists only to estimate usage volume for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Salted digests of the local parts seen at this domain. Plaintext
    /// local parts are never stored.
    pub recipients: Vec<String>,
    /// Absolute point past which readers treat the entry as stale. Stale
    /// entries are skipped, never purged.
    pub valid_until: Instant,
    /// The aggregated domain-level outcome.
    pub outcome: Outcome,
}

impl Hit {
    /// Whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.valid_until
    }

    /// Usage estimate for ranking: the number of distinct recipients seen.
    pub fn usage(&self) -> usize {
        self.recipients.len()
    }
}
