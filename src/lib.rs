//! mailprobe core: incremental email deliverability verification with a
//! bounded-lifetime domain reputation cache.
//!
//! The [`verification::Verifier`] runs an ordered sequence of
//! cheap-to-expensive checks (syntax → MX lookup → MX IP resolution → TCP
//! connect → SMTP recipient probe) under a caller-supplied deadline, and
//! can resume from flags seeded out of the [`cache::ReputationCache`] so
//! already-paid-for network probes are never repeated. The cache learns
//! from every run and exposes a usage-ranked listing of currently-valid
//! domains for suggestion/autocomplete consumers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mailprobe_core::{
//!     Config, EmailAddressParts, ReputationCache, RunContext, Verifier,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Arc::new(Config::default());
//! let verifier = Verifier::new(config.clone())?;
//! let cache = ReputationCache::new(config.cache_ttl);
//!
//! let parts = EmailAddressParts::parse("john@example.org")?;
//! let mut ctx = RunContext::new().deadline_in(Duration::from_secs(10));
//! if let Ok(hit) = cache.get_for_domain(&parts.domain) {
//!     ctx = ctx.seeded(hit.outcome);
//! }
//! let verdict = verifier.check_rcpt(&parts, ctx).await;
//! cache.add_email_address(&parts.full_address, &verdict.outcome)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod core;
pub mod external;
pub mod verification;

pub use crate::cache::hasher::{RecipientHasher, SaltedSha256};
pub use crate::cache::hit::Hit;
pub use crate::cache::ReputationCache;
pub use crate::core::address::{EmailAddressParts, MAX_ADDRESS_LENGTH};
pub use crate::core::config::{Config, ConfigFile};
pub use crate::core::error::{CacheError, ConfigError, VerifyError};
pub use crate::core::outcome::{Check, CheckSet, Outcome, Timing};
pub use crate::external::{LearnNotifier, ReputationStore};
pub use crate::verification::connect::{Dial, TokioDialer};
pub use crate::verification::dns::{DnsError, MxHost, Resolve, SystemResolver};
pub use crate::verification::{RunContext, Verdict, Verifier};
