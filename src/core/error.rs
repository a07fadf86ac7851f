//! Defines the custom error types for the mailprobe verification core.

use thiserror::Error;

use crate::core::outcome::Check;

/// Failure raised by one step of the verification pipeline.
///
/// Every variant carries the identity of the step that produced it (see
/// [`VerifyError::step`]) together with a human-readable cause, so callers
/// get a stable classification while logs keep the underlying detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The address is structurally invalid (missing or mispositioned `@`,
    /// over-long, or failing the configured address pattern).
    #[error("syntax check failed for '{address}': {reason}")]
    AddressSyntaxInvalid {
        /// The raw address that was rejected.
        address: String,
        /// Why the address was rejected.
        reason: String,
    },

    /// DNS discovery failed: either no usable MX records exist or none of
    /// the advertised MX hosts resolve to an IP address.
    #[error("{step} check failed for domain '{domain}': {reason}")]
    DomainLookupFailed {
        /// Which lookup step failed ([`Check::MxLookup`] or [`Check::DomainHasIp`]).
        step: Check,
        /// The domain being looked up.
        domain: String,
        /// Underlying resolver failure, as display text.
        reason: String,
    },

    /// Every candidate port on the mail host refused or errored.
    #[error("connect check failed for mail host '{host}': {reason}")]
    ConnectFailed {
        /// The MX host we attempted to reach.
        host: String,
        /// Accumulated dial errors across all attempted ports.
        reason: String,
    },

    /// The SMTP session did not accept the recipient.
    #[error("recipient probe failed for '{address}': {reason}")]
    RcptRejected {
        /// The address that was probed.
        address: String,
        /// SMTP reply code, when the server produced one.
        code: Option<u16>,
        /// Server reply text or session failure detail.
        reason: String,
    },

    /// The caller-supplied deadline expired before the requested sequence
    /// completed. Distinguished from step failures so callers can retry
    /// with a larger budget.
    #[error("deadline exceeded after {step} check")]
    DeadlineExceeded {
        /// The last step that ran (or was skipped) before expiry was noticed.
        step: Check,
    },
}

impl VerifyError {
    /// The pipeline step this failure is attributed to.
    pub fn step(&self) -> Check {
        match self {
            VerifyError::AddressSyntaxInvalid { .. } => Check::Syntax,
            VerifyError::DomainLookupFailed { step, .. } => *step,
            VerifyError::ConnectFailed { .. } => Check::HostConnect,
            VerifyError::RcptRejected { .. } => Check::ValidRcpt,
            VerifyError::DeadlineExceeded { step } => *step,
        }
    }

    /// True when the run stopped because the budget ran out rather than
    /// because a check genuinely failed.
    pub fn is_deadline(&self) -> bool {
        matches!(self, VerifyError::DeadlineExceeded { .. })
    }
}

/// Failure from a reputation cache lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The domain has never been learned.
    #[error("domain not present in cache")]
    Absent,

    /// The domain is known but its entry has outlived its TTL. Callers that
    /// want to treat stale-but-positive history as a weak signal can still
    /// read the entry through `ReputationCache::peek_domain`.
    #[error("cache entry present but expired")]
    Expired,

    /// The input address could not be decomposed; rejected before any lock
    /// is taken and distinct from "not present".
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Error occurring during configuration loading or validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing the TOML configuration file.
    #[error("TOML Parse Error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting was present but semantically invalid.
    #[error("Configuration Error: {0}")]
    Invalid(String),
}

pub type Result<T, E = VerifyError> = std::result::Result<T, E>;
