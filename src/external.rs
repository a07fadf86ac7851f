//! Collaborator interfaces consumed by the core but implemented elsewhere.
//!
//! The core treats persistence purely as a replay source at startup and a
//! write sink after learning, and hands learn events to a notifier without
//! waiting for acknowledgement. How a backend stores entries or how peers
//! converge is not the core's concern.

use crate::core::address::EmailAddressParts;
use crate::core::outcome::Outcome;

/// Durable persistence collaborator.
pub trait ReputationStore: Send + Sync {
    /// Persist one learned (domain, recipient digest, outcome) triple.
    fn store(&self, domain: &str, recipient_digest: &str, outcome: &Outcome) -> anyhow::Result<()>;

    /// Replay every persisted triple through `visit`; stop early when the
    /// callback returns `false`.
    fn range(
        &self,
        visit: &mut dyn FnMut(&str, &str, &Outcome) -> bool,
    ) -> anyhow::Result<()>;
}

/// Fan-out collaborator: receives learn events so other instances can
/// converge their caches. Fire-and-forget.
pub trait LearnNotifier: Send + Sync {
    /// Called after the cache learned an address-level outcome.
    fn learned(&self, parts: &EmailAddressParts, outcome: &Outcome);
}
