//! Defines the core runtime `Config` struct, its defaults, and loading
//! from a TOML file.

pub(crate) mod file;

pub use file::ConfigFile;

use std::time::Duration;

use regex::Regex;

use crate::core::error::ConfigError;

/// Runtime configuration settings used by the mailprobe core logic.
#[derive(Clone)]
pub struct Config {
    /// Per-query DNS resolution timeout.
    pub dns_timeout: Duration,
    /// Upstream DNS server IPs; empty means the platform default resolver.
    pub dns_servers: Vec<String>,

    /// Per-command SMTP round-trip timeout during the RCPT probe.
    pub smtp_timeout: Duration,
    /// Fixed sender mailbox for MAIL FROM during probing. Kept stable so
    /// remote servers can distinguish probe traffic.
    pub probe_sender: String,
    /// Hostname announced in EHLO/HELO.
    pub helo_hostname: String,

    /// Per-port dial timeout during the connect check.
    pub connect_timeout: Duration,
    /// Candidate submission ports, tried in order.
    pub connect_ports: Vec<u16>,

    /// Maximum number of MX candidates collected per domain.
    pub max_mx_hosts: usize,

    /// Lifetime of a freshly-learned reputation cache entry.
    pub cache_ttl: Duration,

    /// Structural pattern the full address must match during the syntax check.
    pub email_regex: Regex,

    /// Path of the TOML file the configuration was loaded from, if any.
    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        let email_regex_pattern = r"^[^@\s]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";
        let email_regex = Regex::new(email_regex_pattern)
            .expect("Default email regex pattern failed to compile. This is a bug.");
        let dns_servers = vec![
            "8.8.8.8".to_string(),
            "8.8.4.4".to_string(),
            "1.1.1.1".to_string(),
            "1.0.0.1".to_string(),
        ];

        Config {
            dns_timeout: Duration::from_secs(5),
            dns_servers,
            smtp_timeout: Duration::from_secs(5),
            probe_sender: "verify-probe@mailprobe.dev".to_string(),
            helo_hostname: "localhost".to_string(),
            connect_timeout: Duration::from_millis(100),
            connect_ports: vec![25, 587, 2525, 465],
            max_mx_hosts: 10,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            email_regex,
            loaded_config_path: None,
        }
    }

    /// Load settings from a TOML file, overlaying them onto the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(path)?;
        let mut config = Config::default();
        config.apply_file(file)?;
        config.loaded_config_path = Some(path.to_string());
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(secs) = file.dns.dns_timeout {
            self.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(servers) = file.dns.dns_servers {
            self.dns_servers = servers;
        }
        if let Some(secs) = file.smtp.smtp_timeout {
            self.smtp_timeout = Duration::from_secs(secs);
        }
        if let Some(sender) = file.smtp.probe_sender {
            self.probe_sender = sender;
        }
        if let Some(helo) = file.smtp.helo_hostname {
            self.helo_hostname = helo;
        }
        if let Some(millis) = file.connect.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(millis);
        }
        if let Some(ports) = file.connect.connect_ports {
            self.connect_ports = ports;
        }
        if let Some(max) = file.verification.max_mx_hosts {
            self.max_mx_hosts = max;
        }
        if let Some(pattern) = file.verification.email_regex {
            self.email_regex = Regex::new(&pattern)
                .map_err(|e| ConfigError::Invalid(format!("invalid email_regex: {e}")))?;
        }
        if let Some(secs) = file.cache.ttl {
            self.cache_ttl = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_ports.is_empty() {
            return Err(ConfigError::Invalid(
                "connect_ports must name at least one port".to_string(),
            ));
        }
        if self.max_mx_hosts == 0 {
            return Err(ConfigError::Invalid(
                "max_mx_hosts must be at least 1".to_string(),
            ));
        }
        if !self.probe_sender.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "probe_sender '{}' is not an address",
                self.probe_sender
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("dns_timeout", &self.dns_timeout)
            .field("dns_servers_count", &self.dns_servers.len())
            .field("smtp_timeout", &self.smtp_timeout)
            .field("probe_sender", &self.probe_sender)
            .field("helo_hostname", &self.helo_hostname)
            .field("connect_timeout", &self.connect_timeout)
            .field("connect_ports", &self.connect_ports)
            .field("max_mx_hosts", &self.max_mx_hosts)
            .field("cache_ttl", &self.cache_ttl)
            .field("email_regex", &self.email_regex.as_str())
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.connect_ports, vec![25, 587, 2525, 465]);
        assert_eq!(config.max_mx_hosts, 10);
        assert!(config.email_regex.is_match("john@example.org"));
        assert!(!config.email_regex.is_match("johnexample.org"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overlays_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [smtp]
            probe_sender = "probe@verifier.test"
            smtp_timeout = 2

            [connect]
            connect_timeout_ms = 250
            connect_ports = [25]

            [cache]
            ttl = 60
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(file).unwrap();
        assert_eq!(config.probe_sender, "probe@verifier.test");
        assert_eq!(config.smtp_timeout, Duration::from_secs(2));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_ports, vec![25]);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        // Untouched settings keep their defaults.
        assert_eq!(config.max_mx_hosts, 10);
    }

    #[test]
    fn rejects_empty_port_list() {
        let mut config = Config::default();
        config.connect_ports.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_regex() {
        let file: ConfigFile = toml::from_str(
            r#"
            [verification]
            email_regex = "["
            "#,
        )
        .unwrap();
        let mut config = Config::default();
        assert!(config.apply_file(file).is_err());
    }
}
