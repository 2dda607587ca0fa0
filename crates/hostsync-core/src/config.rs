//! Configuration types for the hostsync system
//!
//! Configuration is an explicit value handed to the engine at
//! construction; nothing in the library reads process-global state.

use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::entry::canonical_hostname;

/// Operating mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Run forever, re-syncing on a timer and on file-change events
    #[default]
    Daemon,
    /// Run one reconciliation pass and exit
    Oneshot,
}

/// Main hostsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Operating mode
    #[serde(default)]
    pub mode: Mode,

    /// Input file in `/etc/hosts` format
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    /// CIDR ranges an entry's address must fall into to be managed.
    /// At least one is required.
    pub networks: Vec<IpNet>,

    /// Domain whose zone is updated. Canonical (lower-cased, no trailing
    /// dot); also the suffix used for hostname qualification.
    pub domain: String,

    /// Seconds between scheduled resyncs in daemon mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// TTL for records written to the zone
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Whether unqualified hostnames get the domain appended
    #[serde(default = "default_qualify_hosts")]
    pub qualify_hosts: bool,

    /// Hostnames excluded from syncing, matched exactly against both the
    /// local and the remote entry set
    #[serde(default)]
    pub exclude_hosts: Vec<String>,

    /// Whether `apply` should block until the change batch has fully
    /// landed remotely
    #[serde(default = "default_wait_for_apply")]
    pub wait_for_apply: bool,
}

impl SyncConfig {
    /// Create a configuration for `domain` with defaults for everything
    /// else. Accepts a trailing dot on the domain and strips it.
    pub fn new(domain: impl AsRef<str>) -> Self {
        Self {
            mode: Mode::default(),
            hosts_file: default_hosts_file(),
            networks: Vec::new(),
            domain: canonical_hostname(domain.as_ref()),
            interval_secs: default_interval_secs(),
            ttl: default_ttl(),
            qualify_hosts: default_qualify_hosts(),
            exclude_hosts: Vec::new(),
            wait_for_apply: default_wait_for_apply(),
        }
    }

    /// Set the host source file
    pub fn with_hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = path.into();
        self
    }

    /// Set the network inclusion filters
    pub fn with_networks(mut self, networks: Vec<IpNet>) -> Self {
        self.networks = networks;
        self
    }

    /// Validate the configuration.
    ///
    /// Called before any reconciliation attempt; a failure here means the
    /// process should report the problem and exit.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::config("domain name must be specified"));
        }
        if self.networks.is_empty() {
            return Err(crate::Error::config(
                "one or more networks must be provided",
            ));
        }
        if self.interval_secs == 0 {
            return Err(crate::Error::config("resync interval must be > 0"));
        }
        Ok(())
    }

    /// The resync interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

fn default_interval_secs() -> u64 {
    900
}

fn default_ttl() -> u32 {
    3600
}

fn default_qualify_hosts() -> bool {
    true
}

fn default_wait_for_apply() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SyncConfig {
        SyncConfig::new("test.com").with_networks(vec!["1.2.3.0/24".parse().unwrap()])
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn trailing_dot_on_domain_is_stripped() {
        assert_eq!(SyncConfig::new("test.com.").domain, "test.com");
        assert_eq!(SyncConfig::new("Test.COM").domain, "test.com");
    }

    #[test]
    fn missing_domain_is_rejected() {
        let config = SyncConfig::new("").with_networks(vec!["1.2.3.0/24".parse().unwrap()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_networks_are_rejected() {
        assert!(SyncConfig::new("test.com").validate().is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = valid_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::new("test.com");
        assert_eq!(config.mode, Mode::Daemon);
        assert_eq!(config.hosts_file, PathBuf::from("/etc/hosts"));
        assert_eq!(config.interval_secs, 900);
        assert_eq!(config.ttl, 3600);
        assert!(config.qualify_hosts);
        assert!(config.wait_for_apply);
    }
}
