//! Notification file watching
//!
//! Other programs mark fields dirty by writing a field set into a well-known
//! file. The watcher turns every completed write of that file into a wake-up
//! for the runner's control loop.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sbar_types::FieldSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Watches the notification file for close-after-write events
pub struct NotificationWatcher {
    path: PathBuf,
    events: UnboundedReceiver<()>,
    /// Dropping the watcher removes the inotify watch
    _watcher: RecommendedWatcher,
}

impl NotificationWatcher {
    /// Create the file if it does not exist yet and start watching it
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create notification file {}", path.display()))?;

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) if is_completed_write(&event.kind) => {
                    // The receiver is gone only while shutting down
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Notification watch error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        info!("Watching {} for notifications", path.display());

        Ok(Self {
            path,
            events,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for a write.
    ///
    /// Returns `true` when at least one arrived; any further queued writes are
    /// drained so a burst of notifications costs a single cycle.
    pub async fn wait(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.events.recv()).await {
            Ok(Some(())) => {
                let mut drained = 0;
                while self.events.try_recv().is_ok() {
                    drained += 1;
                }
                if drained > 0 {
                    debug!("Coalesced {} extra notifications", drained);
                }
                true
            }
            Ok(None) => {
                // Watcher thread is gone; keep the loop's pacing
                tokio::time::sleep(timeout).await;
                false
            }
            Err(_) => false,
        }
    }

    /// Current contents of the notification file
    pub fn read_payload(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read notification file {}", self.path.display()))
    }
}

fn is_completed_write(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Access(AccessKind::Close(AccessMode::Write)))
}

/// Mark `set` dirty for a running status bar watching `path`
pub fn send_notification(path: &Path, set: FieldSet) -> Result<()> {
    fs::write(path, set.to_binary_string())
        .with_context(|| format!("Failed to write notification to {}", path.display()))
}
