//! Reconciliation diff
//!
//! `diff` is a pure function of its two input lists; it performs no I/O,
//! which keeps it independently testable without any remote dependency.

use std::collections::HashMap;

use crate::entry::HostEntry;

/// The engine's output: what to write remotely and what to remove.
///
/// Consumed immediately by the record store and discarded; never
/// persisted. The two lists are disjoint by construction: an entry can
/// appear in at most one of them per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Entries to create or overwrite remotely.
    pub to_upsert: Vec<HostEntry>,
    /// Remote entries with no local counterpart, to be removed.
    pub to_delete: Vec<HostEntry>,
}

impl ChangeSet {
    /// True when the zone is already in sync.
    pub fn is_empty(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff the local canonical entries against the remote entry set.
///
/// Matching is by exact canonical hostname. Remote entries are indexed in
/// a working map and consumed as local entries match them; whatever
/// remains afterwards is present remotely but absent locally and goes to
/// `to_delete`. The caller's `remote` list is never mutated.
///
/// - no remote match → upsert (new record)
/// - match, addresses differ → upsert (update), remote entry consumed
/// - match, addresses equal → no action, remote entry consumed
///
/// `to_delete` is emitted in sorted order so the output is deterministic
/// for a given pair of inputs.
pub fn diff(local: &[HostEntry], remote: &[HostEntry]) -> ChangeSet {
    let mut remote_by_name: HashMap<&str, &HostEntry> = remote
        .iter()
        .map(|r| (r.hostname.as_str(), r))
        .collect();

    let mut to_upsert = Vec::new();
    for h in local {
        match remote_by_name.remove(h.hostname.as_str()) {
            Some(r) if r.addr == h.addr => {}
            Some(_) | None => to_upsert.push(h.clone()),
        }
    }

    let mut to_delete: Vec<HostEntry> = remote_by_name.into_values().cloned().collect();
    to_delete.sort();

    ChangeSet {
        to_upsert,
        to_delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hostname: &str, addr: &str) -> HostEntry {
        HostEntry::new(hostname, addr.parse().unwrap())
    }

    #[test]
    fn noop_when_in_sync() {
        let local = vec![entry("test1.test.com", "1.2.3.4")];
        let remote = vec![entry("test1.test.com", "1.2.3.4")];
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn changed_address_is_upserted() {
        let local = vec![entry("test1.test.com", "1.2.3.4")];
        let remote = vec![entry("test1.test.com", "1.2.3.5")];
        let changes = diff(&local, &remote);
        assert_eq!(changes.to_upsert, vec![entry("test1.test.com", "1.2.3.4")]);
        assert_eq!(changes.to_delete, vec![]);
    }

    #[test]
    fn new_local_entry_is_upserted() {
        let local = vec![entry("test1.test.com", "1.2.3.4")];
        let remote = vec![];
        let changes = diff(&local, &remote);
        assert_eq!(changes.to_upsert, vec![entry("test1.test.com", "1.2.3.4")]);
        assert_eq!(changes.to_delete, vec![]);
    }

    #[test]
    fn stale_remote_entry_is_deleted() {
        let local = vec![entry("test1.test.com", "1.2.3.4")];
        let remote = vec![
            entry("test1.test.com", "1.2.3.4"),
            entry("test2.test.com", "1.2.3.5"),
        ];
        let changes = diff(&local, &remote);
        assert_eq!(changes.to_upsert, vec![]);
        assert_eq!(changes.to_delete, vec![entry("test2.test.com", "1.2.3.5")]);
    }

    #[test]
    fn deletes_are_sorted() {
        let local = vec![];
        let remote = vec![
            entry("zz.test.com", "1.2.3.9"),
            entry("aa.test.com", "1.2.3.1"),
            entry("mm.test.com", "1.2.3.5"),
        ];
        let changes = diff(&local, &remote);
        assert_eq!(
            changes.to_delete,
            vec![
                entry("aa.test.com", "1.2.3.1"),
                entry("mm.test.com", "1.2.3.5"),
                entry("zz.test.com", "1.2.3.9"),
            ]
        );
    }

    #[test]
    fn equivalent_address_forms_compare_equal() {
        // The remote side often serves a different textual form of the
        // same address; ingestion canonicalizes, so the diff sees equality.
        let local = vec![entry("v6.test.com", "2001:db8:0:0:0:0:0:1")];
        let remote = vec![entry("v6.test.com", "2001:db8::1")];
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn outputs_are_disjoint() {
        let local = vec![
            entry("a.test.com", "1.2.3.4"),
            entry("b.test.com", "1.2.3.5"),
        ];
        let remote = vec![
            entry("b.test.com", "1.2.3.6"),
            entry("c.test.com", "1.2.3.7"),
        ];
        let changes = diff(&local, &remote);
        for upserted in &changes.to_upsert {
            assert!(!changes.to_delete.iter().any(|d| d.hostname == upserted.hostname));
        }
    }

    #[test]
    fn diff_is_idempotent() {
        let local = vec![
            entry("a.test.com", "1.2.3.4"),
            entry("b.test.com", "1.2.3.5"),
            entry("c.test.com", "1.2.3.6"),
        ];
        let remote = vec![
            entry("b.test.com", "9.9.9.9"),
            entry("c.test.com", "1.2.3.6"),
            entry("d.test.com", "1.2.3.7"),
        ];

        let changes = diff(&local, &remote);
        assert!(!changes.is_empty());

        // Apply the change set to the remote view: upserts replace or add,
        // deletes remove.
        let mut applied: Vec<HostEntry> = remote
            .into_iter()
            .filter(|r| {
                !changes.to_delete.iter().any(|d| d.hostname == r.hostname)
                    && !changes.to_upsert.iter().any(|u| u.hostname == r.hostname)
            })
            .collect();
        applied.extend(changes.to_upsert.iter().cloned());

        assert!(diff(&local, &applied).is_empty());
    }
}
