//! The bounded-lifetime reputation cache.
//!
//! A concurrency-safe table keyed by normalized domain, storing an
//! aggregated validation outcome, an absolute expiry, and the digests of
//! recipients seen at that domain. The cache seeds the pipeline with
//! prior results and learns from the pipeline's output; a ranking
//! consumer reads the usage-sorted listing continuously.
//!
//! One coarse reader/writer lock guards the whole table: lookups and the
//! ranked listing take a shared lock, mutations an exclusive one. Every
//! read observes a complete, non-torn set of entries; contention is the
//! accepted price. Shard by domain hash before reaching for per-entry
//! locks if this ever bottlenecks.

pub mod hasher;
pub mod hit;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::cache::hasher::{RecipientHasher, SaltedSha256};
use crate::cache::hit::Hit;
use crate::core::address::EmailAddressParts;
use crate::core::error::CacheError;
use crate::core::outcome::Outcome;
use crate::external::{LearnNotifier, ReputationStore};

/// Domain reputation table with TTL-bounded entries.
pub struct ReputationCache {
    domains: RwLock<HashMap<String, Hit>>,
    hasher: Box<dyn RecipientHasher>,
    ttl: Duration,
    store: Option<Arc<dyn ReputationStore>>,
    notifier: Option<Arc<dyn LearnNotifier>>,
}

impl ReputationCache {
    /// A cache with the given default entry lifetime and the default
    /// salted-SHA-256 recipient hasher.
    pub fn new(ttl: Duration) -> Self {
        ReputationCache::with_hasher(ttl, Box::new(SaltedSha256::with_random_salt()))
    }

    /// A cache with an explicit recipient hasher.
    pub fn with_hasher(ttl: Duration, hasher: Box<dyn RecipientHasher>) -> Self {
        ReputationCache {
            domains: RwLock::new(HashMap::new()),
            hasher,
            ttl,
            store: None,
            notifier: None,
        }
    }

    /// Attach a persistence write sink.
    pub fn with_store(mut self, store: Arc<dyn ReputationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach a learn-event fan-out.
    pub fn with_notifier(mut self, notifier: Arc<dyn LearnNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Learn or merge a domain-level outcome directly, with no recipient
    /// implied. Creates the entry with a fresh expiry when absent;
    /// otherwise merges the outcome into the existing one, expiry
    /// untouched.
    pub fn add_domain(&self, domain: &str, outcome: &Outcome) {
        let domain = domain.to_ascii_lowercase();
        let mut domains = self.domains.write();
        match domains.get_mut(&domain) {
            Some(hit) => hit.outcome.merge_with_next(outcome),
            None => {
                domains.insert(
                    domain,
                    Hit {
                        recipients: Vec::new(),
                        valid_until: Instant::now() + self.ttl,
                        outcome: outcome.clone(),
                    },
                );
            }
        }
    }

    /// Learn an address-level outcome with the cache's default TTL.
    pub fn add_email_address(&self, address: &str, outcome: &Outcome) -> Result<(), CacheError> {
        self.add_email_address_with_ttl(address, outcome, self.ttl)
    }

    /// Learn an address-level outcome.
    ///
    /// The address is decomposed and its local part digested before any
    /// lock is taken; the plaintext local part is never stored. On a
    /// known domain the outcome is merged, the digest appended when
    /// unseen, and the expiry refreshed to `now + ttl` — ongoing traffic
    /// keeps an entry alive and counted.
    pub fn add_email_address_with_ttl(
        &self,
        address: &str,
        outcome: &Outcome,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let parts = EmailAddressParts::parse(address)
            .map_err(|e| CacheError::InvalidAddress(e.to_string()))?;
        let digest = self.hasher.digest(&parts.local_part);

        {
            let mut domains = self.domains.write();
            match domains.get_mut(&parts.domain) {
                Some(hit) => {
                    hit.outcome.merge_with_next(outcome);
                    if !hit.recipients.contains(&digest) {
                        hit.recipients.push(digest.clone());
                    }
                    hit.valid_until = Instant::now() + ttl;
                }
                None => {
                    domains.insert(
                        parts.domain.clone(),
                        Hit {
                            recipients: vec![digest.clone()],
                            valid_until: Instant::now() + ttl,
                            outcome: outcome.clone(),
                        },
                    );
                }
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.store(&parts.domain, &digest, outcome) {
                tracing::warn!(target: "reputation",
                    "persisting learn for {} failed: {}", parts.domain, e);
            }
        }
        if let Some(notifier) = &self.notifier {
            notifier.learned(&parts, outcome);
        }
        Ok(())
    }

    /// Point lookup by domain. Fails with [`CacheError::Expired`] for an
    /// entry that exists but has outlived its TTL; use
    /// [`ReputationCache::peek_domain`] when stale history is still of
    /// interest.
    pub fn get_for_domain(&self, domain: &str) -> Result<Hit, CacheError> {
        let domain = domain.to_ascii_lowercase();
        let domains = self.domains.read();
        let hit = domains.get(&domain).ok_or(CacheError::Absent)?;
        if hit.is_expired() {
            return Err(CacheError::Expired);
        }
        Ok(hit.clone())
    }

    /// Point lookup by address; the address is decomposed first and
    /// rejected before any lock when malformed.
    pub fn get_for_email(&self, address: &str) -> Result<Hit, CacheError> {
        let parts = EmailAddressParts::parse(address)
            .map_err(|e| CacheError::InvalidAddress(e.to_string()))?;
        self.get_for_domain(&parts.domain)
    }

    /// Metadata read: the entry as stored, expired or not.
    pub fn peek_domain(&self, domain: &str) -> Option<Hit> {
        self.domains.read().get(&domain.to_ascii_lowercase()).cloned()
    }

    /// Currently-valid domains, most-used first.
    ///
    /// Only domains whose outcome satisfies the valid-domain criteria
    /// (MX records, resolved IPs, or an accepted connection — syntax
    /// validity alone does not qualify) and whose expiry has not passed.
    /// Ties are broken by domain name so one snapshot orders
    /// deterministically.
    pub fn valid_usage_sorted_domains(&self) -> Vec<String> {
        let domains = self.domains.read();
        let mut ranked: Vec<(&String, usize)> = domains
            .iter()
            .filter(|(_, hit)| !hit.is_expired() && hit.outcome.domain_is_valid())
            .map(|(domain, hit)| (domain, hit.usage()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().map(|(domain, _)| domain.clone()).collect()
    }

    /// Number of domains in the table, stale entries included.
    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }

    /// Rebuild the table from a persistence backend at startup. Replayed
    /// entries get a fresh expiry; digests are stored as persisted.
    pub fn replay_from(&self, store: &dyn ReputationStore) -> anyhow::Result<usize> {
        let mut replayed = 0usize;
        let mut domains = self.domains.write();
        store.range(&mut |domain, digest, outcome| {
            replayed += 1;
            let domain = domain.to_ascii_lowercase();
            match domains.get_mut(&domain) {
                Some(hit) => {
                    hit.outcome.merge_with_next(outcome);
                    if !hit.recipients.iter().any(|d| d == digest) {
                        hit.recipients.push(digest.to_string());
                    }
                }
                None => {
                    domains.insert(
                        domain,
                        Hit {
                            recipients: vec![digest.to_string()],
                            valid_until: Instant::now() + self.ttl,
                            outcome: outcome.clone(),
                        },
                    );
                }
            }
            true
        })?;
        tracing::info!(target: "reputation", "replayed {} persisted entries", replayed);
        Ok(replayed)
    }
}
