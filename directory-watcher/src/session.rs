//! One watch session against a connected peer.

use std::path::Path;

use filesync_protocol::{Carrier, handshake, wait_for_shutdown};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::info;

use crate::aggregator::ChangeAggregator;
use crate::error::Result;
use crate::event_loop::{EventLoop, ExitReason};
use crate::filter::DirectoryRules;
use crate::indexer::DirectoryIndexer;
use crate::notifier::NotifyBackend;
use crate::settings::WatcherSettings;

/// Run a full session: handshake, initial index, then the event loop.
///
/// Returns [`ExitReason::PeerShutdown`] when the peer ends the session.
/// Notifications that arrive while the initial index is still being built
/// queue in the channel and are handled once the loop starts.
pub async fn run_session<R, W>(
    root: &Path,
    carrier: Carrier,
    mut reader: R,
    mut writer: W,
    settings: &WatcherSettings,
) -> Result<ExitReason>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let config = handshake(carrier, &mut reader, &mut writer).await?;

    let (backend, mut events) = NotifyBackend::new()?;
    let mut indexer = DirectoryIndexer::new(backend, DirectoryRules::from(&config));
    indexer.initialize(root, &config.include_roots)?;

    let aggregator = ChangeAggregator::new(
        settings.extensions.clone(),
        settings.debounce(),
        settings.idle(),
        Instant::now(),
    );

    let mut event_loop = EventLoop::new(indexer, aggregator, writer);
    let reason = event_loop
        .run(&mut events, wait_for_shutdown(&mut reader, carrier))
        .await?;

    info!(
        "Session for {} ended ({reason:?}) after {} batches",
        root.display(),
        event_loop.batches_sent()
    );
    Ok(reason)
}
