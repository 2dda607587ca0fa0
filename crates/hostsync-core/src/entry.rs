//! The managed name-to-address mapping and its canonical forms
//!
//! All comparisons in the reconciliation engine happen on canonical values:
//! hostnames are lower-cased with a single trailing dot stripped, addresses
//! are normalized so equivalent forms of the same address compare equal.
//! Both normalizations are applied once, at ingestion.

use std::cmp::Ordering;
use std::net::IpAddr;

/// A single managed hostname-to-address mapping.
///
/// Entries are built fresh on every reconciliation cycle, from the host
/// source file on one side and the remote record store on the other, and
/// are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Canonical hostname: lower-cased, trailing dot stripped, optionally
    /// domain-qualified.
    pub hostname: String,

    /// The record's address (v4 or v6).
    pub addr: IpAddr,

    /// Auxiliary names from the source file. Never synchronized remotely,
    /// carried only for completeness.
    pub aliases: Vec<String>,
}

impl HostEntry {
    /// Create an entry, canonicalizing both hostname and address.
    pub fn new(hostname: &str, addr: IpAddr) -> Self {
        Self {
            hostname: canonical_hostname(hostname),
            addr: canonical_addr(addr),
            aliases: Vec::new(),
        }
    }

    /// Attach the aliases read from the source line.
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

// Sorted by hostname first, then by address. This ordering is the basis
// for stable duplicate suppression: whichever entry sorts first for a
// given hostname survives, regardless of source file order.
impl Ord for HostEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hostname
            .cmp(&other.hostname)
            .then_with(|| self.addr.cmp(&other.addr))
            .then_with(|| self.aliases.cmp(&other.aliases))
    }
}

impl PartialOrd for HostEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonicalize a hostname: lower-case it and strip a single trailing dot,
/// so `"A.B.Com."` and `"a.b.com"` compare equal.
pub fn canonical_hostname(hostname: &str) -> String {
    let lowered = hostname.to_ascii_lowercase();
    match lowered.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Normalize an address to its canonical form.
///
/// IPv4-mapped IPv6 addresses collapse to plain IPv4, so `::ffff:1.2.3.4`
/// and `1.2.3.4` refer to the same record.
pub fn canonical_addr(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hostname: &str, addr: &str) -> HostEntry {
        HostEntry::new(hostname, addr.parse().unwrap())
    }

    #[test]
    fn sort_already_sorted() {
        let mut hosts = vec![entry("test1.com", "1.2.3.4"), entry("test2.com", "1.2.3.4")];
        hosts.sort();
        assert_eq!(
            hosts,
            vec![entry("test1.com", "1.2.3.4"), entry("test2.com", "1.2.3.4")]
        );
    }

    #[test]
    fn sort_reverse_sorted() {
        let mut hosts = vec![entry("test2.com", "1.2.3.4"), entry("test1.com", "1.2.3.4")];
        hosts.sort();
        assert_eq!(
            hosts,
            vec![entry("test1.com", "1.2.3.4"), entry("test2.com", "1.2.3.4")]
        );
    }

    #[test]
    fn sort_same_name_different_address() {
        let mut hosts = vec![entry("test.com", "1.2.3.5"), entry("test.com", "1.2.3.4")];
        hosts.sort();
        assert_eq!(
            hosts,
            vec![entry("test.com", "1.2.3.4"), entry("test.com", "1.2.3.5")]
        );
    }

    #[test]
    fn hostname_canonicalization() {
        assert_eq!(canonical_hostname("Host.Example.COM"), "host.example.com");
        assert_eq!(canonical_hostname("a.b.com."), "a.b.com");
        assert_eq!(canonical_hostname("a.b.com"), "a.b.com");
        // Only a single trailing dot is stripped
        assert_eq!(canonical_hostname("a.b.com.."), "a.b.com.");
    }

    #[test]
    fn mapped_v6_collapses_to_v4() {
        let mapped: IpAddr = "::ffff:1.2.3.4".parse().unwrap();
        let plain: IpAddr = "1.2.3.4".parse().unwrap();
        assert_eq!(canonical_addr(mapped), plain);
        assert_eq!(entry("a.com", "::ffff:1.2.3.4"), entry("a.com", "1.2.3.4"));
    }

    #[test]
    fn plain_v6_unchanged() {
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(canonical_addr(v6), v6);
    }
}
