//! OS notification backend.
//!
//! The notify backend delivers events on its own thread. They are bridged
//! into one unbounded tokio channel that only the event loop consumes. The
//! backend thread never waits on the loop, so registering a watch from the
//! loop cannot stall behind a full queue.

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;

/// One notification as delivered by the OS backend.
pub type RawEvent = notify::Result<notify::Event>;

/// Subscribes and unsubscribes single directories (non-recursive).
pub trait Notifier {
    /// Start receiving events for entries directly inside `dir`.
    fn watch(&mut self, dir: &Path) -> Result<()>;

    /// Stop receiving events for `dir`.
    fn unwatch(&mut self, dir: &Path) -> Result<()>;
}

/// Production notifier backed by the platform's recommended watcher.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl NotifyBackend {
    /// Create the backend and the receiver its events arrive on.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<RawEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: RawEvent| {
            if event_tx.send(res).is_err() {
                debug!("event loop has stopped, dropping notification");
            }
        })?;

        Ok((Self { watcher }, event_rx))
    }
}

impl Notifier for NotifyBackend {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<()> {
        self.watcher.unwatch(dir)?;
        Ok(())
    }
}
