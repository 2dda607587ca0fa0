// # Record Store Trait
//
// Defines the interface to the remote zone: a key-value store of address
// records keyed by name and type. Only the input/output contract lives
// here; everything behind it (zone resolution, wire format, pagination)
// is the implementation's business.
//
// ## Implementations
//
// - Cloudflare: `hostsync-provider-cloudflare` crate
//
// ## Constraints on implementations
//
// Stores are isolated, stateless, single-shot collaborators:
//
// - No retry or backoff logic inside the store. A failed fetch or apply
//   fails the cycle; the scheduler's next trigger is the retry.
// - No spawned tasks, and no caching across calls: every cycle rebuilds
//   its view of the zone from scratch.
// - Network calls must carry a transport-level timeout so a stalled
//   request cannot starve the timer-driven trigger indefinitely.
// - Credentials must never appear in logs or Debug output.

use async_trait::async_trait;

use crate::diff::ChangeSet;
use crate::entry::HostEntry;
use crate::error::Result;

/// Interface to the remote zone's address records.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the zone's current address records as canonical entries.
    ///
    /// Resolves the managed zone for `domain` and lists its address
    /// records. Records with exactly one associated address value map
    /// one-to-one onto entries; a name with zero or multiple values is a
    /// recoverable per-record error (skipped, logged), keeping the
    /// returned set unique per hostname. Non-address record types are
    /// ignored. A zone that cannot be resolved is a fatal error for the
    /// cycle.
    async fn fetch(&self, domain: &str) -> Result<Vec<HostEntry>>;

    /// Submit one batched change request covering the whole change set.
    ///
    /// All upserts and deletes go into a single request; the batch is
    /// all-or-nothing at the API boundary, so partial application is
    /// never reported. When `wait` is set the store blocks until the
    /// change has fully landed; a store whose batch call is already
    /// synchronous may treat it as a no-op.
    async fn apply(&self, domain: &str, ttl: u32, changes: &ChangeSet, wait: bool) -> Result<()>;

    /// The store name, for logging.
    fn store_name(&self) -> &'static str;
}
