// # hostsync-core
//
// Core library for the hostsync zone reconciliation system.
//
// ## Architecture Overview
//
// This library keeps a managed DNS zone's address records synchronized
// with a local `/etc/hosts`-style source file, filtered to chosen CIDR
// ranges:
//
// - **hosts**: source pipeline (parse, canonicalize, qualify, dedupe,
//   exclude)
// - **netfilter**: CIDR inclusion filter
// - **diff**: pure reconciliation diff producing a ChangeSet
// - **RecordStore**: trait boundary to the remote zone (fetch/apply)
// - **SyncEngine**: cycle orchestration plus the daemon scheduling loop
//
// ## Design Principles
//
// 1. **No state between cycles**: every cycle rebuilds both entry sets
//    from scratch, so re-running is always safe
// 2. **Pure core**: the diff performs no I/O and is testable in isolation
// 3. **One worker**: a single blocking-select loop multiplexes the resync
//    timer and the file watch; two passes never run concurrently
// 4. **Explicit configuration**: no process-global state; the engine gets
//    a validated SyncConfig at construction

pub mod config;
pub mod diff;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hosts;
pub mod netfilter;
pub mod traits;

// Re-export core types for convenience
pub use config::{Mode, SyncConfig};
pub use diff::{ChangeSet, diff};
pub use engine::{EngineEvent, SyncEngine};
pub use entry::HostEntry;
pub use error::{Error, Result};
pub use traits::RecordStore;
