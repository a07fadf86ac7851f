//! The two-sided verification outcome: which checks were attempted and
//! which succeeded, plus a per-probe timing log.
//!
//! `Steps` and `Validations` are two same-shaped bit-sets over [`Check`].
//! A check's step bit is set the moment it is attempted, regardless of
//! result; its validation bit is set only on success. The intended
//! relationship is `Validations ⊆ Steps`; the type does not enforce it
//! mechanically, callers preserve it through [`Outcome::record_attempt`]
//! and [`Outcome::record_pass`].

use std::fmt;
use std::time::Duration;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// The closed set of known check identifiers, in pipeline order.
///
/// Adding a variant is a compile-time-checked change: `as_str` and `ALL`
/// both match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Check {
    /// Structural validity of the address itself.
    Syntax = 0,
    /// The domain advertises at least one plausible MX host.
    MxLookup = 1,
    /// At least one advertised MX host resolves to an IP address.
    DomainHasIp = 2,
    /// A TCP connection to a mail host was accepted.
    HostConnect = 3,
    /// The mail host accepted an SMTP RCPT command for the address.
    ValidRcpt = 4,
    /// The domain is a known disposable-address provider. Reserved for
    /// upstream classifiers; never probed by this pipeline.
    Disposable = 5,
}

impl Check {
    /// Every known check, in declaration order.
    pub const ALL: [Check; 6] = [
        Check::Syntax,
        Check::MxLookup,
        Check::DomainHasIp,
        Check::HostConnect,
        Check::ValidRcpt,
        Check::Disposable,
    ];

    pub(crate) fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Stable wire/log name for this check.
    pub fn as_str(self) -> &'static str {
        match self {
            Check::Syntax => "syntax",
            Check::MxLookup => "mx-lookup",
            Check::DomainHasIp => "domain-has-ip",
            Check::HostConnect => "host-connect",
            Check::ValidRcpt => "valid-rcpt",
            Check::Disposable => "disposable",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Check {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A small bit-set over [`Check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CheckSet(u8);

impl CheckSet {
    /// The empty set.
    pub const EMPTY: CheckSet = CheckSet(0);

    /// Build a set from a slice of checks.
    pub fn from_checks(checks: &[Check]) -> Self {
        let mut set = CheckSet::EMPTY;
        for &check in checks {
            set.insert(check);
        }
        set
    }

    /// Add a check to the set.
    pub fn insert(&mut self, check: Check) {
        self.0 |= check.bit();
    }

    /// Whether the set contains the given check.
    pub fn contains(self, check: Check) -> bool {
        self.0 & check.bit() != 0
    }

    /// Set union.
    pub fn union(self, other: CheckSet) -> CheckSet {
        CheckSet(self.0 | other.0)
    }

    /// Whether the two sets share any member.
    pub fn intersects(self, other: CheckSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Number of checks in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members in pipeline order.
    pub fn iter(self) -> impl Iterator<Item = Check> {
        Check::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl Serialize for CheckSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for check in self.iter() {
            seq.serialize_element(check.as_str())?;
        }
        seq.end()
    }
}

impl fmt::Display for CheckSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for check in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(check.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// One entry of the append-only timing log: how long a single check took,
/// recorded even when the check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timing {
    /// The check this measurement belongs to.
    pub check: Check,
    /// Wall-clock duration of the check.
    #[serde(serialize_with = "ser_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn ser_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// Aggregated result of one or more verification passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Checks that were attempted, independent of result.
    pub steps: CheckSet,
    /// Checks that succeeded.
    pub validations: CheckSet,
    /// Derived bit: set only when the full requested sequence completed
    /// without error and without deadline expiry.
    pub valid: bool,
    /// Per-check timing measurements, one per executed check.
    pub timings: Vec<Timing>,
}

impl Outcome {
    /// An outcome with nothing attempted.
    pub fn new() -> Self {
        Outcome::default()
    }

    /// Whether the check was ever attempted.
    pub fn attempted(&self, check: Check) -> bool {
        self.steps.contains(check)
    }

    /// Whether the check was attempted and succeeded.
    pub fn passed(&self, check: Check) -> bool {
        self.validations.contains(check)
    }

    /// Mark a check as attempted.
    pub fn record_attempt(&mut self, check: Check) {
        self.steps.insert(check);
    }

    /// Mark a check as succeeded. Also marks it attempted to preserve
    /// `Validations ⊆ Steps`.
    pub fn record_pass(&mut self, check: Check) {
        self.steps.insert(check);
        self.validations.insert(check);
    }

    /// Append a timing measurement for a check.
    pub fn record_timing(&mut self, check: Check, elapsed: Duration) {
        self.timings.push(Timing { check, elapsed });
    }

    /// Merge a newer outcome into this one.
    ///
    /// Validity must be re-earned by the most recent pass: `valid` is
    /// cleared first and then taken from `next` alone, while the step and
    /// validation flags are bitwise-OR'd in. Two partially-valid outcomes
    /// never combine into a valid one. The timing log is not aggregated
    /// across merges; it describes individual runs, not cache history.
    pub fn merge_with_next(&mut self, next: &Outcome) {
        self.valid = false;
        self.steps = self.steps.union(next.steps);
        self.validations = self.validations.union(next.validations);
        self.valid = next.valid;
    }

    /// The "valid-domain" criteria used by the reputation cache ranking:
    /// the domain advertised MX records, resolved to an IP, or accepted a
    /// connection. Syntax validity alone does not qualify.
    pub fn domain_is_valid(&self) -> bool {
        self.validations.intersects(CheckSet::from_checks(&[
            Check::MxLookup,
            Check::DomainHasIp,
            Check::HostConnect,
        ]))
    }
}
