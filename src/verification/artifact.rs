//! The mutable working record threaded through one verification run.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use crate::core::address::EmailAddressParts;
use crate::core::outcome::Outcome;
use crate::verification::dns::MxHost;

/// Per-run state. Owned exclusively by one verification call, never shared
/// across concurrent runs, and discarded once the caller extracts the
/// public [`Verdict`](crate::verification::Verdict).
pub(crate) struct Artifact<'a> {
    /// The address under verification.
    pub parts: &'a EmailAddressParts,
    /// Viable MX candidates discovered by the lookup check.
    pub mx_hosts: Vec<MxHost>,
    /// Resolved addresses for `ip_host`.
    pub ips: Vec<IpAddr>,
    /// The MX host the addresses in `ips` belong to: the first candidate
    /// that resolved.
    pub ip_host: Option<String>,
    /// The MX host the connect check settled on.
    pub connected_host: Option<String>,
    /// Open connection established by the connect check, consumed by the
    /// RCPT probe.
    pub connection: Option<TcpStream>,
    /// The running outcome.
    pub outcome: Outcome,
    /// Absolute point past which the run must abort.
    pub deadline: Option<Instant>,
}

impl<'a> Artifact<'a> {
    pub fn new(parts: &'a EmailAddressParts, deadline: Option<Instant>) -> Self {
        Artifact {
            parts,
            mx_hosts: Vec::new(),
            ips: Vec::new(),
            ip_host: None,
            connected_host: None,
            connection: None,
            outcome: Outcome::new(),
            deadline,
        }
    }

    /// Whether the caller's budget has run out.
    pub fn deadline_expired(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Clamp a per-attempt timeout to whatever budget remains. Returns the
    /// unclamped value when no deadline was supplied.
    pub fn clamp_to_deadline(&self, timeout: Duration) -> Duration {
        match self.deadline {
            Some(d) => timeout.min(d.saturating_duration_since(Instant::now())),
            None => timeout,
        }
    }
}
