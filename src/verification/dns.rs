//! MX host discovery and IP resolution behind the `Resolve` seam.
//!
//! The pipeline never talks to `trust-dns-resolver` directly; the
//! [`Resolve`] trait is the injection point for a call-counting stub in
//! tests.

use std::future::Future;
use std::net::IpAddr;

use thiserror::Error;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

use crate::core::config::Config;
use crate::core::error::ConfigError;

/// One MX candidate as advertised by DNS, preference included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    /// The mail-exchange hostname, trailing root-dot stripped.
    pub host: String,
    /// MX preference value; lower is preferred.
    pub preference: u16,
}

/// Resolution failure surfaced by a [`Resolve`] implementation.
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("{0}")]
    Resolver(#[from] trust_dns_resolver::error::ResolveError),
    #[error("{0}")]
    Other(String),
}

/// DNS operations the pipeline depends on.
pub trait Resolve: Send + Sync {
    /// MX records for a domain, in preference order, unfiltered.
    fn mx_hosts(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<MxHost>, DnsError>> + Send;

    /// A/AAAA addresses for a hostname.
    fn host_ips(&self, host: &str) -> impl Future<Output = Result<Vec<IpAddr>, DnsError>> + Send;
}

/// The production resolver, backed by `trust-dns-resolver` and configured
/// from [`Config::dns_servers`] / [`Config::dns_timeout`].
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    /// Build a resolver from the runtime configuration. An empty
    /// `dns_servers` list falls back to the library default upstreams.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.dns_timeout;
        opts.attempts = 2;

        let resolver_config = if config.dns_servers.is_empty() {
            ResolverConfig::default()
        } else {
            let ips: Vec<IpAddr> = config
                .dns_servers
                .iter()
                .map(|s| {
                    s.parse().map_err(|e| {
                        ConfigError::Invalid(format!("invalid DNS server '{s}': {e}"))
                    })
                })
                .collect::<Result<_, _>>()?;
            ResolverConfig::from_parts(
                None,
                vec![],
                NameServerConfigGroup::from_ips_clear(&ips, 53, true),
            )
        };

        Ok(SystemResolver {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
        })
    }
}

impl Resolve for SystemResolver {
    async fn mx_hosts(&self, domain: &str) -> Result<Vec<MxHost>, DnsError> {
        let lookup = self.resolver.mx_lookup(domain).await?;
        let mut hosts: Vec<MxHost> = lookup
            .iter()
            .map(|mx| MxHost {
                host: mx.exchange().to_utf8(),
                preference: mx.preference(),
            })
            .collect();
        hosts.sort_by_key(|mx| mx.preference);
        tracing::debug!(target: "dns", "MX lookup for {} returned {} record(s)", domain, hosts.len());
        Ok(hosts)
    }

    async fn host_ips(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let lookup = self.resolver.lookup_ip(host).await?;
        Ok(lookup.iter().collect())
    }
}

/// Cheap plausibility filter applied to advertised MX hostnames before any
/// of them is dialed. ASCII letters/digits/hyphen/dot only, length strictly
/// between 5 and 252, and at least one interior dot.
pub(crate) fn plausible_mx_host(host: &str) -> bool {
    if host.len() <= 5 || host.len() >= 252 {
        return false;
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return false;
    }
    // The dot must be interior, not leading or trailing.
    match host.find('.') {
        Some(0) | None => false,
        Some(_) => !host.ends_with('.'),
    }
}

/// Collapse raw MX records into up-to-`max` viable candidates: strip the
/// trailing root-dot, drop implausible hosts, keep preference order.
pub(crate) fn viable_mx_candidates(records: Vec<MxHost>, max: usize) -> Vec<MxHost> {
    records
        .into_iter()
        .map(|mut mx| {
            if mx.host.ends_with('.') {
                mx.host.truncate(mx.host.len() - 1);
            }
            mx
        })
        .filter(|mx| plausible_mx_host(&mx.host))
        .take(max)
        .collect()
}
