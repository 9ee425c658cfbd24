//! The single control loop.
//!
//! The loop owns the watch set, the pending change set and the debounce
//! timer. Its only suspension point is one `select!` over the notification
//! channel, the timer deadline and the peer shutdown future.

use std::future::Future;

use filesync_protocol::write_frame;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use crate::aggregator::ChangeAggregator;
use crate::error::{Result, WatcherError};
use crate::event::{FsEvent, FsEventKind, classify};
use crate::indexer::DirectoryIndexer;
use crate::notifier::{Notifier, RawEvent};

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The peer closed its end or asked us to stop.
    PeerShutdown,
}

/// Dispatches notifications and flushes change batches to the peer.
pub struct EventLoop<N, W> {
    indexer: DirectoryIndexer<N>,
    aggregator: ChangeAggregator,
    sink: W,
    batches_sent: u64,
}

impl<N, W> EventLoop<N, W>
where
    N: Notifier,
    W: AsyncWrite + Unpin,
{
    /// Create a loop over an initialised indexer.
    pub fn new(indexer: DirectoryIndexer<N>, aggregator: ChangeAggregator, sink: W) -> Self {
        Self {
            indexer,
            aggregator,
            sink,
            batches_sent: 0,
        }
    }

    /// Run until the peer shuts down or something fatal happens.
    ///
    /// A notifier error, a closed notification channel and a failed frame
    /// write are all fatal.
    pub async fn run<S>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<RawEvent>,
        shutdown: S,
    ) -> Result<ExitReason>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Event loop started with {} watched directories", self.indexer.len());

        loop {
            let deadline = self.aggregator.deadline();

            tokio::select! {
                raw = events.recv() => match raw {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        error!("Notifier error: {e}");
                        return Err(WatcherError::NotifierFailed(e));
                    }
                    None => {
                        error!("Notifier channel closed");
                        return Err(WatcherError::NotifierClosed);
                    }
                },
                () = sleep_until(deadline) => self.flush().await?,
                () = &mut shutdown => {
                    info!(
                        "Peer requested shutdown after {} batches ({} changes unsent)",
                        self.batches_sent,
                        self.aggregator.len()
                    );
                    return Ok(ExitReason::PeerShutdown);
                }
            }
        }
    }

    /// Classify a raw notification and apply it.
    pub fn handle_event(&mut self, event: notify::Event) {
        let now = Instant::now();
        for fs_event in classify(event) {
            self.dispatch(fs_event, now);
        }
    }

    /// Apply one classified event to the watch set or the pending set.
    pub fn dispatch(&mut self, event: FsEvent, now: Instant) {
        let path = event.path.as_path();
        match event.kind {
            FsEventKind::Create => {
                if path.is_dir() {
                    self.indexer.on_directory_created(path);
                } else {
                    self.aggregator.record_change(path, now);
                }
            }
            FsEventKind::Write => {
                if !path.is_dir() {
                    self.aggregator.record_change(path, now);
                }
            }
            FsEventKind::Remove => {
                // The path is already gone, so the watch set and the
                // backend's hint are the only ways to know it was a directory.
                if event.folder || self.indexer.is_watched(path) {
                    self.indexer.on_directory_removed(path);
                }
            }
            FsEventKind::Rename => {
                self.indexer.on_renamed(path);
            }
            FsEventKind::PermissionChange | FsEventKind::Ignored => {
                debug!("Ignoring {:?} on {}", event.kind, path.display());
            }
        }
    }

    /// Timer expiry: send whatever is pending as one frame.
    pub async fn flush(&mut self) -> Result<()> {
        let Some(batch) = self.aggregator.on_timer_fired(Instant::now()) else {
            return Ok(());
        };

        write_frame(&mut self.sink, &batch.encode()).await?;
        self.batches_sent += 1;
        info!("Sent batch of {} changed files", batch.len());
        Ok(())
    }

    /// The directory indexer.
    pub fn indexer(&self) -> &DirectoryIndexer<N> {
        &self.indexer
    }

    /// The change aggregator.
    pub fn aggregator(&self) -> &ChangeAggregator {
        &self.aggregator
    }

    /// Number of batches written so far.
    pub fn batches_sent(&self) -> u64 {
        self.batches_sent
    }
}
