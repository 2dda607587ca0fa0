//! Host source pipeline
//!
//! Turns a raw `/etc/hosts`-style file into the canonical entry list the
//! reconciliation engine compares against the remote zone:
//! parse → canonicalize → qualify → de-duplicate → exclude.
//!
//! Malformed lines are recoverable: they are skipped with a warning that
//! names the line number, and parsing continues. Only a file that cannot
//! be read at all fails the cycle.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::entry::HostEntry;
use crate::error::Result;

/// Why a single source line was rejected.
#[derive(Debug, PartialEq, Eq)]
enum LineError {
    TooFewFields,
    BadAddress(String),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::TooFewFields => write!(f, "should contain at least two fields"),
            LineError::BadAddress(field) => write!(f, "{field} is not a valid IP"),
        }
    }
}

/// Parse one source line into an entry.
///
/// Returns `Ok(None)` for blank lines and pure comments. The first field
/// must parse as an IP address, the second is the primary hostname, and
/// any remaining fields are aliases.
fn parse_line(line: &str) -> std::result::Result<Option<HostEntry>, LineError> {
    let line = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };

    let mut fields = line.split_whitespace();
    let Some(first) = fields.next() else {
        return Ok(None);
    };
    let Some(hostname) = fields.next() else {
        return Err(LineError::TooFewFields);
    };

    let addr = first
        .parse()
        .map_err(|_| LineError::BadAddress(first.to_string()))?;

    let aliases = fields.map(str::to_string).collect();
    Ok(Some(HostEntry::new(hostname, addr).with_aliases(aliases)))
}

/// Read and parse the host source file.
///
/// Per-line failures are skipped with a warning; an unreadable file is a
/// fatal error for the triggering cycle.
pub fn read_hosts(path: impl AsRef<Path>) -> Result<Vec<HostEntry>> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut hosts = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(entry)) => hosts.push(entry),
            Ok(None) => {}
            Err(err) => warn!("{} on line {}, skipping", err, idx + 1),
        }
    }

    Ok(hosts)
}

/// Append `"." + domain` to every hostname that is not already qualified
/// with the domain suffix.
pub fn qualify_hosts(hosts: Vec<HostEntry>, domain: &str) -> Vec<HostEntry> {
    hosts
        .into_iter()
        .map(|mut h| {
            if !h.hostname.ends_with(domain) {
                h.hostname = format!("{}.{}", h.hostname, domain);
            }
            h
        })
        .collect()
}

/// Drop later duplicates of a hostname.
///
/// The list is sorted first so suppression is stable: the surviving entry
/// for a hostname is the same whatever order the source file listed them
/// in. We don't want to ping-pong between choices because of parse order.
pub fn dedupe_hosts(mut hosts: Vec<HostEntry>) -> Vec<HostEntry> {
    hosts.sort();

    let mut seen = HashSet::with_capacity(hosts.len());
    let mut result = Vec::with_capacity(hosts.len());
    for h in hosts {
        if seen.contains(&h.hostname) {
            warn!(
                "duplicate hostname found in hosts, ignoring ({}/{})",
                h.hostname, h.addr
            );
        } else {
            seen.insert(h.hostname.clone());
            result.push(h);
        }
    }

    result
}

/// Drop entries whose hostname exactly matches a configured exclusion.
pub fn remove_excluded(hosts: Vec<HostEntry>, excludes: &[String]) -> Vec<HostEntry> {
    hosts
        .into_iter()
        .filter(|h| !excludes.iter().any(|e| e == &h.hostname))
        .collect()
}
