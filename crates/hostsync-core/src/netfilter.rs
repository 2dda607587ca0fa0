//! CIDR inclusion filter
//!
//! Membership is "contained in at least one listed range". An address of
//! a different family than a range simply doesn't match; it is never an
//! error.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::entry::HostEntry;

/// True iff `addr` falls inside at least one of `ranges`.
pub fn matches(addr: IpAddr, ranges: &[IpNet]) -> bool {
    ranges.iter().any(|net| net.contains(&addr))
}

/// Keep only entries whose address matches one of `ranges`, preserving
/// the order of survivors.
pub fn filter_by_network(hosts: Vec<HostEntry>, ranges: &[IpNet]) -> Vec<HostEntry> {
    hosts
        .into_iter()
        .filter(|h| matches(h.addr, ranges))
        .collect()
}
