//! The incremental verification pipeline.
//!
//! An ordered sequence of cheap-to-expensive checks (syntax → MX lookup →
//! MX IP resolution → TCP connect → SMTP recipient probe) driven by a
//! single loop over step identities carried as data. Four public entry
//! points of increasing thoroughness, each a strict prefix extension of
//! the previous, all resumable from a seeded [`Outcome`] and all bounded
//! by an optional caller-supplied deadline.

pub(crate) mod artifact;
pub mod connect;
pub mod dns;
pub(crate) mod smtp;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::core::address::{EmailAddressParts, MAX_ADDRESS_LENGTH};
use crate::core::config::Config;
use crate::core::error::{ConfigError, VerifyError};
use crate::core::outcome::{Check, Outcome};
use crate::verification::artifact::Artifact;
use crate::verification::connect::{Dial, TokioDialer};
use crate::verification::dns::{viable_mx_candidates, Resolve, SystemResolver};

const SYNTAX_SEQUENCE: &[Check] = &[Check::Syntax];
const LOOKUP_SEQUENCE: &[Check] = &[Check::Syntax, Check::MxLookup, Check::DomainHasIp];
const CONNECT_SEQUENCE: &[Check] = &[
    Check::Syntax,
    Check::MxLookup,
    Check::DomainHasIp,
    Check::HostConnect,
];
const RCPT_SEQUENCE: &[Check] = &[
    Check::Syntax,
    Check::MxLookup,
    Check::DomainHasIp,
    Check::HostConnect,
    Check::ValidRcpt,
];

/// Cancellable execution context for one verification run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Absolute point past which the run aborts, checked at every step
    /// boundary.
    pub deadline: Option<Instant>,
    /// Prior outcome whose step/validation flags pre-populate the working
    /// record, so already-paid-for checks are skipped. This is the
    /// cache-reuse hook.
    pub seed: Option<Outcome>,
}

impl RunContext {
    /// A context with no deadline and no seed.
    pub fn new() -> Self {
        RunContext::default()
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline a duration from now.
    pub fn deadline_in(self, budget: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Seed the run with a prior outcome's flags.
    pub fn seeded(mut self, seed: Outcome) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Public result of one verification run: the outcome is always present
/// for observability, even when a step failed partway.
#[derive(Debug)]
pub struct Verdict {
    /// Step/validation flags and timing log accumulated by the run.
    pub outcome: Outcome,
    /// The failure that terminated the run, if any.
    pub error: Option<VerifyError>,
}

impl Verdict {
    /// Whether the full requested sequence completed without error.
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.outcome.valid
    }

    /// Collapse into a standard `Result`, discarding the partial outcome
    /// on failure.
    pub fn into_result(self) -> Result<Outcome, VerifyError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.outcome),
        }
    }
}

/// The verification pipeline. Generic over its DNS and dialing seams;
/// production code uses [`SystemResolver`] and [`TokioDialer`].
pub struct Verifier<R = SystemResolver, D = TokioDialer> {
    config: Arc<Config>,
    resolver: R,
    dialer: D,
}

impl Verifier<SystemResolver, TokioDialer> {
    /// Build a production verifier from the runtime configuration.
    pub fn new(config: Arc<Config>) -> Result<Self, ConfigError> {
        let resolver = SystemResolver::from_config(&config)?;
        Ok(Verifier {
            config,
            resolver,
            dialer: TokioDialer,
        })
    }
}

impl<R: Resolve, D: Dial> Verifier<R, D> {
    /// Build a verifier with explicit resolver and dialer implementations.
    pub fn with_parts(config: Arc<Config>, resolver: R, dialer: D) -> Self {
        Verifier {
            config,
            resolver,
            dialer,
        }
    }

    /// Structural check only.
    pub async fn check_syntax(&self, parts: &EmailAddressParts, ctx: RunContext) -> Verdict {
        self.run(parts, SYNTAX_SEQUENCE, ctx).await
    }

    /// Syntax + MX existence + MX-host IP resolution.
    pub async fn check_lookup(&self, parts: &EmailAddressParts, ctx: RunContext) -> Verdict {
        self.run(parts, LOOKUP_SEQUENCE, ctx).await
    }

    /// Adds a TCP connect to a resolved MX host.
    pub async fn check_connect(&self, parts: &EmailAddressParts, ctx: RunContext) -> Verdict {
        self.run(parts, CONNECT_SEQUENCE, ctx).await
    }

    /// Adds an SMTP session probing recipient acceptance.
    pub async fn check_rcpt(&self, parts: &EmailAddressParts, ctx: RunContext) -> Verdict {
        self.run(parts, RCPT_SEQUENCE, ctx).await
    }

    async fn run(&self, parts: &EmailAddressParts, sequence: &[Check], ctx: RunContext) -> Verdict {
        let mut artifact = Artifact::new(parts, ctx.deadline);
        if let Some(seed) = &ctx.seed {
            // Validity is never inherited from a seed; it must be re-earned
            // by this pass.
            artifact.outcome.steps = seed.steps;
            artifact.outcome.validations = seed.validations;
        }

        for &check in sequence {
            if artifact.outcome.attempted(check) {
                if !artifact.outcome.passed(check) {
                    // Attempted before and failed: no retry within one call.
                    tracing::debug!(target: "pipeline",
                        "{} previously failed for <{}>, aborting", check, parts.full_address);
                    return Verdict {
                        error: Some(seeded_failure(check, parts)),
                        outcome: artifact.outcome,
                    };
                }
                tracing::trace!(target: "pipeline",
                    "{} already validated for <{}>, skipping", check, parts.full_address);
            } else {
                let started = Instant::now();
                let result = self.execute(check, &mut artifact).await;
                artifact.outcome.record_attempt(check);
                artifact.outcome.record_timing(check, started.elapsed());
                match result {
                    Ok(()) => artifact.outcome.record_pass(check),
                    Err(e) => {
                        tracing::debug!(target: "pipeline",
                            "{} failed for <{}>: {}", check, parts.full_address, e);
                        return Verdict {
                            error: Some(e),
                            outcome: artifact.outcome,
                        };
                    }
                }
            }

            // Checked after every step, not only at the start: each step can
            // consume the whole remaining budget on its own.
            if artifact.deadline_expired() {
                tracing::debug!(target: "pipeline",
                    "deadline expired after {} for <{}>", check, parts.full_address);
                return Verdict {
                    error: Some(VerifyError::DeadlineExceeded { step: check }),
                    outcome: artifact.outcome,
                };
            }
        }

        artifact.outcome.valid = true;
        Verdict {
            outcome: artifact.outcome,
            error: None,
        }
    }

    async fn execute(&self, check: Check, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        match check {
            Check::Syntax => self.syntax_check(artifact),
            Check::MxLookup => self.mx_lookup(artifact).await,
            Check::DomainHasIp => self.resolve_ips(artifact).await,
            Check::HostConnect => self.host_connect(artifact).await,
            Check::ValidRcpt => self.rcpt_probe(artifact).await,
            // Not probed by this pipeline; the flag position exists for
            // upstream classifiers that seed it.
            Check::Disposable => Ok(()),
        }
    }

    fn syntax_check(&self, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        let parts = artifact.parts;
        if parts.full_address.len() > MAX_ADDRESS_LENGTH {
            return Err(VerifyError::AddressSyntaxInvalid {
                address: parts.full_address.clone(),
                reason: format!("address exceeds {MAX_ADDRESS_LENGTH} characters"),
            });
        }
        if parts.local_part.is_empty() || parts.domain.is_empty() {
            return Err(VerifyError::AddressSyntaxInvalid {
                address: parts.full_address.clone(),
                reason: "empty local part or domain".to_string(),
            });
        }
        if !self.config.email_regex.is_match(&parts.full_address) {
            return Err(VerifyError::AddressSyntaxInvalid {
                address: parts.full_address.clone(),
                reason: "address does not match the configured pattern".to_string(),
            });
        }
        Ok(())
    }

    async fn mx_lookup(&self, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        let domain = &artifact.parts.domain;
        let records =
            self.resolver
                .mx_hosts(domain)
                .await
                .map_err(|e| VerifyError::DomainLookupFailed {
                    step: Check::MxLookup,
                    domain: domain.clone(),
                    reason: e.to_string(),
                })?;
        let candidates = viable_mx_candidates(records, self.config.max_mx_hosts);
        if candidates.is_empty() {
            return Err(VerifyError::DomainLookupFailed {
                step: Check::MxLookup,
                domain: domain.clone(),
                reason: "no viable MX hosts advertised".to_string(),
            });
        }
        tracing::debug!(target: "pipeline",
            "{} viable MX candidate(s) for {}", candidates.len(), domain);
        artifact.mx_hosts = candidates;
        Ok(())
    }

    async fn resolve_ips(&self, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        // A seed can mark MxLookup as paid for, but the candidate list is
        // per-run state; rebuild it when the lookup step was skipped.
        if artifact.mx_hosts.is_empty() {
            self.mx_lookup(artifact).await?;
        }
        let domain = &artifact.parts.domain;
        for mx in &artifact.mx_hosts {
            match self.resolver.host_ips(&mx.host).await {
                Ok(ips) if !ips.is_empty() => {
                    tracing::debug!(target: "pipeline",
                        "{} resolved to {} address(es)", mx.host, ips.len());
                    artifact.ips = ips;
                    artifact.ip_host = Some(mx.host.clone());
                    return Ok(());
                }
                Ok(_) => {
                    tracing::trace!(target: "pipeline", "{} has no addresses", mx.host);
                }
                Err(e) => {
                    tracing::trace!(target: "pipeline", "resolving {} failed: {}", mx.host, e);
                }
            }
        }
        Err(VerifyError::DomainLookupFailed {
            step: Check::DomainHasIp,
            domain: domain.clone(),
            reason: "none of the advertised MX hosts resolve to an IP".to_string(),
        })
    }

    async fn host_connect(&self, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        if artifact.ips.is_empty() {
            self.resolve_ips(artifact).await?;
        }
        let host = artifact
            .ip_host
            .clone()
            .unwrap_or_else(|| artifact.parts.domain.clone());
        let Some(&ip) = artifact.ips.first() else {
            return Err(VerifyError::ConnectFailed {
                host,
                reason: "no resolved addresses to dial".to_string(),
            });
        };

        let mut errors: Vec<String> = Vec::new();
        for &port in &self.config.connect_ports {
            let timeout = artifact.clamp_to_deadline(self.config.connect_timeout);
            match self.dialer.dial(SocketAddr::new(ip, port), timeout).await {
                Ok(stream) => {
                    tracing::debug!(target: "pipeline",
                        "connected to {} ({}) on port {}", host, ip, port);
                    artifact.connection = Some(stream);
                    artifact.connected_host = Some(host);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    // Refusals are expected on filtered submission ports;
                    // keep trying the remaining candidates.
                    tracing::trace!(target: "pipeline", "port {} refused on {}", port, host);
                }
                Err(e) => {
                    errors.push(format!("port {port}: {e}"));
                }
            }
        }

        Err(VerifyError::ConnectFailed {
            host,
            reason: if errors.is_empty() {
                "all candidate ports refused the connection".to_string()
            } else {
                errors.join("; ")
            },
        })
    }

    async fn rcpt_probe(&self, artifact: &mut Artifact<'_>) -> Result<(), VerifyError> {
        // The seed marks the connect result as paid for, but the socket
        // itself never outlives a run; a seeded run re-dials here.
        if artifact.connection.is_none() {
            self.host_connect(artifact).await?;
        }
        let stream = artifact
            .connection
            .take()
            .ok_or_else(|| VerifyError::RcptRejected {
                address: artifact.parts.full_address.clone(),
                code: None,
                reason: "no established connection to probe over".to_string(),
            })?;
        let host = artifact
            .connected_host
            .clone()
            .unwrap_or_else(|| artifact.parts.domain.clone());
        let command_timeout = artifact.clamp_to_deadline(self.config.smtp_timeout);
        smtp::rcpt_probe(&self.config, stream, &host, artifact.parts, command_timeout).await
    }
}

/// The error classification a seeded, previously-failed step re-raises.
fn seeded_failure(check: Check, parts: &EmailAddressParts) -> VerifyError {
    let reason = "previously attempted and failed".to_string();
    match check {
        Check::Syntax => VerifyError::AddressSyntaxInvalid {
            address: parts.full_address.clone(),
            reason,
        },
        Check::MxLookup | Check::DomainHasIp | Check::Disposable => {
            VerifyError::DomainLookupFailed {
                step: check,
                domain: parts.domain.clone(),
                reason,
            }
        }
        Check::HostConnect => VerifyError::ConnectFailed {
            host: parts.domain.clone(),
            reason,
        },
        Check::ValidRcpt => VerifyError::RcptRejected {
            address: parts.full_address.clone(),
            code: None,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    use crate::verification::dns::{DnsError, MxHost};

    struct StubResolver {
        mx_records: Vec<MxHost>,
        ips: Vec<IpAddr>,
        mx_calls: AtomicUsize,
        ip_calls: AtomicUsize,
    }

    impl StubResolver {
        fn new(mx_records: Vec<MxHost>, ips: Vec<IpAddr>) -> Self {
            StubResolver {
                mx_records,
                ips,
                mx_calls: AtomicUsize::new(0),
                ip_calls: AtomicUsize::new(0),
            }
        }

        fn healthy() -> Self {
            StubResolver::new(
                vec![MxHost {
                    host: "mx1.example.org.".to_string(),
                    preference: 10,
                }],
                vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            )
        }
    }

    impl Resolve for StubResolver {
        async fn mx_hosts(&self, _domain: &str) -> Result<Vec<MxHost>, DnsError> {
            self.mx_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.mx_records.clone())
        }

        async fn host_ips(&self, _host: &str) -> Result<Vec<IpAddr>, DnsError> {
            self.ip_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ips.clone())
        }
    }

    struct RefusingDialer {
        attempts: AtomicUsize,
    }

    impl RefusingDialer {
        fn new() -> Self {
            RefusingDialer {
                attempts: AtomicUsize::new(0),
            }
        }
    }

    impl Dial for RefusingDialer {
        async fn dial(&self, _addr: SocketAddr, _timeout: Duration) -> io::Result<TcpStream> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "refused",
            ))
        }
    }

    fn parts() -> EmailAddressParts {
        EmailAddressParts::parse("john@example.org").unwrap()
    }

    fn verifier_with<R: Resolve>(resolver: R) -> Verifier<R, TokioDialer> {
        Verifier::with_parts(Arc::new(Config::default()), resolver, TokioDialer)
    }

    #[tokio::test]
    async fn syntax_only_run_is_valid() {
        let verifier = verifier_with(StubResolver::healthy());
        let verdict = verifier.check_syntax(&parts(), RunContext::new()).await;
        assert!(verdict.is_valid());
        assert!(verdict.outcome.passed(Check::Syntax));
        assert!(!verdict.outcome.attempted(Check::MxLookup));
        assert_eq!(verdict.outcome.timings.len(), 1);
        assert_eq!(verdict.outcome.timings[0].check, Check::Syntax);
    }

    #[tokio::test]
    async fn syntax_rejects_pattern_mismatch() {
        let verifier = verifier_with(StubResolver::healthy());
        let bad = EmailAddressParts {
            full_address: "john@nodot".to_string(),
            local_part: "john".to_string(),
            domain: "nodot".to_string(),
        };
        let verdict = verifier.check_syntax(&bad, RunContext::new()).await;
        assert!(matches!(
            verdict.error,
            Some(VerifyError::AddressSyntaxInvalid { .. })
        ));
        // The attempt is still recorded for observability.
        assert!(verdict.outcome.attempted(Check::Syntax));
        assert!(!verdict.outcome.passed(Check::Syntax));
    }

    #[tokio::test]
    async fn lookup_extends_syntax_validations() {
        let verifier = verifier_with(StubResolver::healthy());
        let address = parts();

        let syntax = verifier.check_syntax(&address, RunContext::new()).await;
        let lookup = verifier.check_lookup(&address, RunContext::new()).await;

        assert!(lookup.is_valid());
        // Prefix property: lookup validations are a superset of syntax's.
        assert_eq!(
            lookup.outcome.validations.union(syntax.outcome.validations),
            lookup.outcome.validations
        );
        assert!(lookup.outcome.passed(Check::MxLookup));
        assert!(lookup.outcome.passed(Check::DomainHasIp));
    }

    #[tokio::test]
    async fn seeded_run_skips_paid_for_steps() {
        let resolver = StubResolver::healthy();
        let verifier = verifier_with(resolver);
        let address = parts();

        let unseeded = verifier.check_lookup(&address, RunContext::new()).await;
        assert!(unseeded.is_valid());
        assert_eq!(verifier.resolver.mx_calls.load(Ordering::SeqCst), 1);
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 1);

        let seeded = verifier
            .check_lookup(
                &address,
                RunContext::new().seeded(unseeded.outcome.clone()),
            )
            .await;
        // No further DNS traffic, same final flags.
        assert_eq!(verifier.resolver.mx_calls.load(Ordering::SeqCst), 1);
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 1);
        assert!(seeded.is_valid());
        assert_eq!(seeded.outcome.steps, unseeded.outcome.steps);
        assert_eq!(seeded.outcome.validations, unseeded.outcome.validations);
    }

    #[tokio::test]
    async fn seeded_failed_step_aborts_with_same_classification() {
        let verifier = verifier_with(StubResolver::healthy());
        let address = parts();

        let mut seed = Outcome::new();
        seed.record_pass(Check::Syntax);
        seed.record_attempt(Check::MxLookup); // attempted, not passed

        let verdict = verifier
            .check_lookup(&address, RunContext::new().seeded(seed))
            .await;
        assert!(matches!(
            verdict.error,
            Some(VerifyError::DomainLookupFailed {
                step: Check::MxLookup,
                ..
            })
        ));
        // The failed step is not retried.
        assert_eq!(verifier.resolver.mx_calls.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fail_fast_stops_the_sequence() {
        // No MX records at all: MxLookup fails, DomainHasIp never runs.
        let verifier = verifier_with(StubResolver::new(vec![], vec![]));
        let verdict = verifier.check_lookup(&parts(), RunContext::new()).await;

        assert!(matches!(
            verdict.error,
            Some(VerifyError::DomainLookupFailed {
                step: Check::MxLookup,
                ..
            })
        ));
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 0);
        // Timing log holds syntax and the failing step, nothing after.
        let timed: Vec<Check> = verdict.outcome.timings.iter().map(|t| t.check).collect();
        assert_eq!(timed, vec![Check::Syntax, Check::MxLookup]);
        assert!(!verdict.outcome.valid);
    }

    #[tokio::test]
    async fn expired_deadline_short_circuits_before_network_io() {
        let verifier = verifier_with(StubResolver::healthy());
        let ctx = RunContext::new().with_deadline(Instant::now());
        let verdict = verifier.check_rcpt(&parts(), ctx).await;

        let error = verdict.error.expect("run must fail");
        assert!(error.is_deadline());
        assert_eq!(verifier.resolver.mx_calls.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connect_exhausts_all_ports_before_failing() {
        let dialer = RefusingDialer::new();
        let verifier = Verifier::with_parts(
            Arc::new(Config::default()),
            StubResolver::healthy(),
            dialer,
        );
        let verdict = verifier.check_connect(&parts(), RunContext::new()).await;

        assert!(matches!(
            verdict.error,
            Some(VerifyError::ConnectFailed { .. })
        ));
        // Refusals are non-fatal per port; every candidate port was tried.
        assert_eq!(
            verifier.dialer.attempts.load(Ordering::SeqCst),
            Config::default().connect_ports.len()
        );
    }

    #[tokio::test]
    async fn connect_succeeds_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let mut config = Config::default();
        config.connect_ports = vec![port];
        let verifier = Verifier::with_parts(
            Arc::new(config),
            StubResolver::healthy(),
            TokioDialer,
        );
        let verdict = verifier.check_connect(&parts(), RunContext::new()).await;
        assert!(verdict.is_valid());
        assert!(verdict.outcome.passed(Check::HostConnect));
    }

    /// A scripted SMTP server handling exactly one session.
    async fn spawn_smtp_server(rcpt_reply: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            write_half.write_all(b"220 mx.test ESMTP ready\r\n").await.unwrap();
            while let Ok(Some(line)) = lines.next_line().await {
                let upper = line.to_ascii_uppercase();
                let reply: &[u8] = if upper.starts_with("EHLO") {
                    b"250-mx.test\r\n250 PIPELINING\r\n"
                } else if upper.starts_with("MAIL") {
                    b"250 sender ok\r\n"
                } else if upper.starts_with("RCPT") {
                    rcpt_reply.as_bytes()
                } else if upper.starts_with("QUIT") {
                    write_half.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                } else {
                    b"502 command not implemented\r\n"
                };
                write_half.write_all(reply).await.unwrap();
            }
        });
        port
    }

    #[tokio::test]
    async fn rcpt_probe_accepts_valid_recipient() {
        let port = spawn_smtp_server("250 recipient ok\r\n").await;
        let mut config = Config::default();
        config.connect_ports = vec![port];
        let verifier = Verifier::with_parts(
            Arc::new(config),
            StubResolver::healthy(),
            TokioDialer,
        );

        let verdict = verifier.check_rcpt(&parts(), RunContext::new()).await;
        assert!(verdict.is_valid(), "error: {:?}", verdict.error);
        assert!(verdict.outcome.passed(Check::ValidRcpt));
        // One timing entry per executed check.
        assert_eq!(verdict.outcome.timings.len(), RCPT_SEQUENCE.len());
    }

    #[tokio::test]
    async fn rcpt_probe_surfaces_rejection_code() {
        let port = spawn_smtp_server("550 5.1.1 no such user\r\n").await;
        let mut config = Config::default();
        config.connect_ports = vec![port];
        let verifier = Verifier::with_parts(
            Arc::new(config),
            StubResolver::healthy(),
            TokioDialer,
        );

        let verdict = verifier.check_rcpt(&parts(), RunContext::new()).await;
        match verdict.error {
            Some(VerifyError::RcptRejected { code, .. }) => assert_eq!(code, Some(550)),
            other => panic!("expected RcptRejected, got {other:?}"),
        }
        assert!(verdict.outcome.attempted(Check::ValidRcpt));
        assert!(!verdict.outcome.passed(Check::ValidRcpt));
        assert!(!verdict.outcome.valid);
    }

    #[tokio::test]
    async fn seeded_rcpt_run_redials_and_probes() {
        // The cache-resumption flow: everything up to the connect already
        // validated by an earlier run, only the RCPT probe left to pay
        // for. The socket from that run is gone; the probe must establish
        // its own.
        let port = spawn_smtp_server("250 recipient ok\r\n").await;
        let mut config = Config::default();
        config.connect_ports = vec![port];
        let verifier = Verifier::with_parts(
            Arc::new(config),
            StubResolver::healthy(),
            TokioDialer,
        );

        let mut seed = Outcome::new();
        for check in [
            Check::Syntax,
            Check::MxLookup,
            Check::DomainHasIp,
            Check::HostConnect,
        ] {
            seed.record_pass(check);
        }

        let verdict = verifier
            .check_rcpt(&parts(), RunContext::new().seeded(seed))
            .await;
        assert!(verdict.is_valid(), "error: {:?}", verdict.error);
        assert!(verdict.outcome.passed(Check::ValidRcpt));
        // Only the probe itself was re-executed and timed.
        let timed: Vec<Check> = verdict.outcome.timings.iter().map(|t| t.check).collect();
        assert_eq!(timed, vec![Check::ValidRcpt]);
        // Re-dialing rebuilt the candidate list and addresses on the way.
        assert_eq!(verifier.resolver.mx_calls.load(Ordering::SeqCst), 1);
        assert_eq!(verifier.resolver.ip_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seeded_connect_run_rebuilds_resolution_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let mut config = Config::default();
        config.connect_ports = vec![port];
        let verifier = Verifier::with_parts(
            Arc::new(config),
            StubResolver::healthy(),
            TokioDialer,
        );

        let mut seed = Outcome::new();
        for check in [Check::Syntax, Check::MxLookup, Check::DomainHasIp] {
            seed.record_pass(check);
        }

        let verdict = verifier
            .check_connect(&parts(), RunContext::new().seeded(seed))
            .await;
        assert!(verdict.is_valid(), "error: {:?}", verdict.error);
        assert!(verdict.outcome.passed(Check::HostConnect));
    }
}
