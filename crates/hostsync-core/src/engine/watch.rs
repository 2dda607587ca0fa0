//! Filesystem watch on the host source file
//!
//! The watch is scoped to the directory containing the source file, not
//! the file itself (watching a file directly is unreliable across
//! editors that replace it on save). Events are bridged from notify's
//! callback into a tokio channel so the daemon loop can select on them;
//! the loop filters them down to the exact absolute source path.

use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Set up a directory watch for changes to `source`.
///
/// Returns the watcher (which must stay alive for the watch to persist —
/// dropping it releases the watch), the event channel, and the absolute
/// path of the source file for event filtering. The parent directory
/// must exist; the file itself may not, yet.
pub(crate) fn setup(
    source: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<Event>, PathBuf)> {
    let abs = std::path::absolute(source)?;
    let dir = match abs.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // Resolve symlinks in the directory so event paths compare equal to
    // what the watcher reports.
    let dir = dir.canonicalize()?;
    let abs = match abs.file_name() {
        Some(name) => dir.join(name),
        None => return Err(Error::watch(format!("not a file path: {}", abs.display()))),
    };

    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher: RecommendedWatcher = Watcher::new(
        move |result: std::result::Result<Event, notify::Error>| match result {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => error!("file watch error: {}", e),
        },
        notify::Config::default(),
    )
    .map_err(|e| Error::watch(format!("cannot create watcher: {e}")))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| Error::watch(format!("cannot watch {}: {e}", dir.display())))?;

    info!(
        "watching {} for changes to {}",
        dir.display(),
        abs.display()
    );

    Ok((watcher, rx, abs))
}

/// True iff the event names exactly the watched file.
pub(crate) fn event_matches(event: &Event, source: &Path) -> bool {
    event.paths.iter().any(|p| p == source)
}
