//! Test doubles and helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hostsync_core::error::Result;
use hostsync_core::{ChangeSet, Error, HostEntry, RecordStore, SyncConfig};

/// A scripted RecordStore that tracks calls and mirrors applied changes
/// back into its remote view, so consecutive cycles behave like a real
/// zone.
///
/// Clones share state, letting a test keep a handle while the engine
/// owns the boxed store.
#[derive(Clone)]
pub struct MockRecordStore {
    remote: Arc<std::sync::Mutex<Vec<HostEntry>>>,
    fetch_calls: Arc<AtomicUsize>,
    apply_calls: Arc<AtomicUsize>,
    applied: Arc<std::sync::Mutex<Vec<ChangeSet>>>,
    fail_fetch: Arc<AtomicBool>,
}

impl MockRecordStore {
    pub fn new(remote: Vec<HostEntry>) -> Self {
        Self {
            remote: Arc::new(std::sync::Mutex::new(remote)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            apply_calls: Arc::new(AtomicUsize::new(0)),
            applied: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_fetch: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of times fetch() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of times apply() was called
    pub fn apply_call_count(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Every change set submitted so far, in order
    pub fn applied_changes(&self) -> Vec<ChangeSet> {
        self.applied.lock().unwrap().clone()
    }

    /// The store's current view of the zone
    pub fn remote_entries(&self) -> Vec<HostEntry> {
        self.remote.lock().unwrap().clone()
    }

    /// Make subsequent fetch() calls fail (or succeed again)
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn fetch(&self, _domain: &str) -> Result<Vec<HostEntry>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::store("mock", "scripted fetch failure"));
        }
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn apply(
        &self,
        _domain: &str,
        _ttl: u32,
        changes: &ChangeSet,
        _wait: bool,
    ) -> Result<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.applied.lock().unwrap().push(changes.clone());

        // Mirror the batch into the remote view
        let mut remote = self.remote.lock().unwrap();
        remote.retain(|r| {
            !changes.to_delete.iter().any(|d| d.hostname == r.hostname)
                && !changes.to_upsert.iter().any(|u| u.hostname == r.hostname)
        });
        remote.extend(changes.to_upsert.iter().cloned());

        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}

/// Entry constructor shorthand
pub fn entry(hostname: &str, addr: &str) -> HostEntry {
    HostEntry::new(hostname, addr.parse().unwrap())
}

/// A config for `test.com` covering 1.2.3.0/24, pointed at `hosts_file`
pub fn test_config(hosts_file: impl Into<std::path::PathBuf>) -> SyncConfig {
    SyncConfig::new("test.com")
        .with_hosts_file(hosts_file)
        .with_networks(vec!["1.2.3.0/24".parse().unwrap()])
}
