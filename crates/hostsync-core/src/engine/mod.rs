//! Core reconciliation engine
//!
//! The SyncEngine is responsible for:
//! - Building the canonical local entry list from the host source file
//! - Fetching the remote entry set via the RecordStore
//! - Diffing the two and applying the resulting change set
//! - Scheduling cycles in daemon mode (timer + file-change triggers)
//!
//! ## Data flow
//!
//! ```text
//! source file ──► hosts pipeline ──► canonical entries ─┐
//!                                                       ▼
//!                                                     diff ──► ChangeSet ──► RecordStore::apply
//!                                                       ▲
//! RecordStore::fetch ──► remote entries ────────────────┘
//! ```
//!
//! ## Scheduling
//!
//! Exactly one reconciliation pass executes at a time: the daemon loop is
//! a single blocking select over a periodic timer and the filesystem
//! watch, so no locking is needed anywhere in the pipeline. Each observed
//! trigger leads to one cycle; a burst of file events may schedule one
//! cycle per event, which is harmless because cycles are idempotent.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::diff::diff;
use crate::entry::HostEntry;
use crate::error::Result;
use crate::traits::RecordStore;
use crate::{hosts, netfilter};

mod watch;

/// Capacity of the engine event channel. When full, new events are
/// dropped with a warning rather than blocking the cycle.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the SyncEngine for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Daemon loop started
    Started {
        /// Seconds between scheduled resyncs
        interval_secs: u64,
    },

    /// A reconciliation cycle began
    CycleStarted,

    /// The zone already matched the source; nothing was applied
    InSync,

    /// A change batch was submitted
    ChangesApplied {
        /// Records created or updated
        upserts: usize,
        /// Records removed
        deletes: usize,
    },

    /// A cycle aborted with an error
    CycleFailed {
        /// Rendered error
        error: String,
    },

    /// Daemon loop stopped
    Stopped {
        /// Why the loop exited
        reason: String,
    },
}

/// Drives reconciliation of a managed zone against a host source file.
///
/// Construct with [`SyncEngine::new`], then either call
/// [`SyncEngine::sync_once`] for a single pass or [`SyncEngine::run`]
/// for the daemon loop. All state is rebuilt from the two sources on
/// every cycle; nothing survives between cycles.
pub struct SyncEngine {
    /// Remote zone boundary
    store: Box<dyn RecordStore>,

    /// Validated configuration
    config: SyncConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine.
    ///
    /// Validates the configuration up front; a configuration problem is
    /// reported here, before any cycle runs.
    ///
    /// Returns the engine together with the receiving end of its event
    /// channel.
    pub fn new(
        store: Box<dyn RecordStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            store,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one complete reconciliation cycle.
    ///
    /// Fatal errors (unreadable source, failed fetch or apply) abort the
    /// cycle and are returned to the caller; per-record problems have
    /// already been logged and skipped by the pipeline.
    pub async fn sync_once(&self) -> Result<()> {
        self.emit_event(EngineEvent::CycleStarted);

        let local = self.load_local()?;
        let remote = self.load_remote().await?;

        let changes = diff(&local, &remote);
        if changes.is_empty() {
            info!("no changes needed, everything in sync");
            self.emit_event(EngineEvent::InSync);
            return Ok(());
        }

        info!(
            "adding/updating {} records, deleting {} out of date records",
            changes.to_upsert.len(),
            changes.to_delete.len()
        );

        self.store
            .apply(
                &self.config.domain,
                self.config.ttl,
                &changes,
                self.config.wait_for_apply,
            )
            .await?;

        self.emit_event(EngineEvent::ChangesApplied {
            upserts: changes.to_upsert.len(),
            deletes: changes.to_delete.len(),
        });

        Ok(())
    }

    /// Run the daemon loop until the process is terminated.
    ///
    /// Blocks on whichever fires first: the periodic resync timer or a
    /// change notification for the source file. Cycle failures are
    /// logged; the next trigger retries from scratch.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the daemon loop with a controlled shutdown signal.
    ///
    /// This is `pub` so integration tests can stop the loop without
    /// delivering OS signals. Production code should use [`run`], which
    /// terminates on SIGINT.
    ///
    /// [`run`]: SyncEngine::run
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let (watcher, mut events, source) = watch::setup(&self.config.hosts_file)?;

        self.emit_event(EngineEvent::Started {
            interval_secs: self.config.interval_secs,
        });

        info!("running initial sync");
        self.sync_if_source_exists(&source).await;

        let period = self.config.interval();
        info!("sync scheduled every {:?}", period);

        // First tick one full period from now; the initial sync above is
        // explicit, not a timer tick. A cycle outrunning the interval
        // must not cause catch-up ticks.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("resync timer fired");
                        self.sync_if_source_exists(&source).await;
                    }

                    Some(event) = events.recv() => {
                        if watch::event_matches(&event, &source) {
                            info!("file change event detected: {:?}", event.kind);
                            self.sync_if_source_exists(&source).await;
                        }
                    }

                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("resync timer fired");
                        self.sync_if_source_exists(&source).await;
                    }

                    Some(event) = events.recv() => {
                        if watch::event_matches(&event, &source) {
                            info!("file change event detected: {:?}", event.kind);
                            self.sync_if_source_exists(&source).await;
                        }
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        drop(watcher);
        info!("released file watch, engine stopped");

        Ok(())
    }

    /// Run one cycle unless the source file is currently missing.
    ///
    /// A missing file is a logged skip, not an error: the watch stays up
    /// and the file reappearing (or the next tick) re-triggers. Cycle
    /// failures are logged here so the daemon loop keeps running.
    async fn sync_if_source_exists(&self, source: &std::path::Path) {
        if let Err(e) = std::fs::metadata(source) {
            error!("cannot stat hosts file, skipping sync: {}", e);
            return;
        }

        if let Err(e) = self.sync_once().await {
            error!("sync cycle failed: {}", e);
            self.emit_event(EngineEvent::CycleFailed {
                error: e.to_string(),
            });
        }
    }

    /// Build the canonical local entry list:
    /// parse → network-filter → qualify → dedupe → exclude.
    fn load_local(&self) -> Result<Vec<HostEntry>> {
        let entries = hosts::read_hosts(&self.config.hosts_file)?;
        let entries = netfilter::filter_by_network(entries, &self.config.networks);
        let entries = if self.config.qualify_hosts {
            hosts::qualify_hosts(entries, &self.config.domain)
        } else {
            entries
        };
        let entries = hosts::dedupe_hosts(entries);
        Ok(hosts::remove_excluded(entries, &self.config.exclude_hosts))
    }

    /// Fetch the remote entry set and narrow it the same way as the local
    /// one. Exclusion applies to both sides, and remote records outside
    /// the managed networks are left alone rather than deleted.
    async fn load_remote(&self) -> Result<Vec<HostEntry>> {
        let entries = self.store.fetch(&self.config.domain).await?;
        let entries = netfilter::filter_by_network(entries, &self.config.networks);
        Ok(hosts::remove_excluded(entries, &self.config.exclude_hosts))
    }

    /// Emit an engine event, dropping it if the channel is full.
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping engine event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_events_compare_and_clone() {
        let event = EngineEvent::ChangesApplied {
            upserts: 2,
            deletes: 1,
        };
        assert_eq!(event.clone(), event);
        assert_ne!(event, EngineEvent::InSync);
    }
}
