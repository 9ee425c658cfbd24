//! Full sessions against the real OS notifier, with the peer on the other
//! end of an in-memory duplex stream.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filesync_directory_watcher::{ExitReason, WatcherError, WatcherSettings, run_session};
use filesync_protocol::{
    Carrier, ChangeBatch, INIT_MARKER, ProtocolError, WatchConfiguration, read_frame, write_frame,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const DEBOUNCE: Duration = Duration::from_millis(200);
const PATIENCE: Duration = Duration::from_secs(10);

struct Peer {
    batches: mpsc::UnboundedReceiver<ChangeBatch>,
    writer: WriteHalf<DuplexStream>,
    session: JoinHandle<filesync_directory_watcher::Result<ExitReason>>,
}

fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new()
        .prefix("filesync-session")
        .tempdir()
        .unwrap();
    let root = dir.path().canonicalize().unwrap();
    for sub in ["a", "b", ".git"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    (dir, root)
}

fn spawn_session(
    root: &Path,
    carrier: Carrier,
) -> (
    ReadHalf<DuplexStream>,
    WriteHalf<DuplexStream>,
    JoinHandle<filesync_directory_watcher::Result<ExitReason>>,
) {
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(ours);
    let (peer_read, peer_write) = tokio::io::split(theirs);

    let root = root.to_path_buf();
    let settings = WatcherSettings::default().with_debounce(DEBOUNCE);
    let session = tokio::spawn(async move {
        run_session(&root, carrier, server_read, server_write, &settings).await
    });
    (peer_read, peer_write, session)
}

fn forward_batches(mut reader: ReadHalf<DuplexStream>) -> mpsc::UnboundedReceiver<ChangeBatch> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok(payload) = read_frame(&mut reader).await {
            let Ok(batch) = ChangeBatch::decode(&payload) else {
                break;
            };
            if tx.send(batch).is_err() {
                break;
            }
        }
    });
    rx
}

async fn connect(root: &Path, config: &WatchConfiguration) -> Peer {
    let (reader, mut writer, session) = spawn_session(root, Carrier::Socket);
    write_frame(&mut writer, &config.to_payload()).await.unwrap();
    Peer {
        batches: forward_batches(reader),
        writer,
        session,
    }
}

/// Keep rewriting `file` until a batch reports it. Watches are registered
/// after the handshake, so early writes can go unseen.
async fn write_until_reported(peer: &mut Peer, file: &Path) -> ChangeBatch {
    let attempt = async {
        loop {
            fs::write(file, b"%% touched").unwrap();
            if let Ok(Some(batch)) = timeout(DEBOUNCE * 5, peer.batches.recv()).await {
                if batch.contains(file) {
                    return batch;
                }
            }
        }
    };
    timeout(PATIENCE, attempt).await.unwrap()
}

/// Wait out any batch still in flight from earlier writes.
async fn settle(peer: &mut Peer) {
    tokio::time::sleep(DEBOUNCE * 4).await;
    while peer.batches.try_recv().is_ok() {}
}

async fn shut_down(mut peer: Peer) {
    peer.writer.write_all(b"x").await.unwrap();
    peer.writer.flush().await.unwrap();
    let reason = timeout(PATIENCE, peer.session).await.unwrap().unwrap().unwrap();
    assert_eq!(reason, ExitReason::PeerShutdown);
}

#[tokio::test]
async fn test_reports_only_qualifying_files() {
    let (_dir, root) = project();
    let config = WatchConfiguration::new()
        .with_include_root(root.join("a").display().to_string())
        .with_include_root(root.join("b").display().to_string())
        .with_exclude_dir(root.join("a/tmp").display().to_string());
    let mut peer = connect(&root, &config).await;

    write_until_reported(&mut peer, &root.join("b/marker.erl")).await;
    settle(&mut peer).await;

    // Created after startup, so the exclude list applies to it.
    fs::create_dir(root.join("a/tmp")).unwrap();
    fs::write(root.join("a/tmp/y.erl"), b"").unwrap();
    fs::write(root.join(".git/z.erl"), b"").unwrap();
    fs::write(root.join("b/notes.txt"), b"").unwrap();
    fs::write(root.join("b/x.erl"), b"-module(x).").unwrap();
    fs::write(root.join("b/x.erl"), b"-module(x).\n").unwrap();

    let batch = timeout(PATIENCE, peer.batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.paths(), &[root.join("b/x.erl")]);

    // Nothing else trickles in afterwards.
    assert!(timeout(DEBOUNCE * 5, peer.batches.recv()).await.is_err());

    shut_down(peer).await;
}

#[tokio::test]
async fn test_new_directories_are_watched() {
    let (_dir, root) = project();
    let mut peer = connect(&root, &WatchConfiguration::new()).await;
    write_until_reported(&mut peer, &root.join("b/marker.erl")).await;

    let nested = root.join("b/new/deeper");
    fs::create_dir_all(&nested).unwrap();
    let batch = write_until_reported(&mut peer, &nested.join("m.erl")).await;
    assert!(batch.contains(&nested.join("m.erl")));

    shut_down(peer).await;
}

#[tokio::test]
async fn test_include_roots_are_watched() {
    let (_dir, root) = project();
    let extra = tempfile::Builder::new()
        .prefix("filesync-extra")
        .tempdir()
        .unwrap();
    let extra_root = extra.path().canonicalize().unwrap();
    fs::create_dir_all(extra_root.join("deps/lager")).unwrap();

    let config = WatchConfiguration::new()
        .with_include_root(extra_root.display().to_string())
        .with_only_dir(root.join("b").display().to_string());
    let mut peer = connect(&root, &config).await;

    write_until_reported(&mut peer, &extra_root.join("deps/lager/lager.erl")).await;

    shut_down(peer).await;
}

#[tokio::test]
async fn test_pipe_announces_and_stops_on_eof() {
    let (_dir, root) = project();
    let (mut reader, mut writer, session) = spawn_session(&root, Carrier::Pipe);

    let init = timeout(PATIENCE, read_frame(&mut reader)).await.unwrap().unwrap();
    assert_eq!(init, INIT_MARKER);

    write_frame(&mut writer, &WatchConfiguration::new().to_payload())
        .await
        .unwrap();
    // Stray bytes from the parent are not a shutdown request.
    writer.write_all(b"noise").await.unwrap();
    writer.flush().await.unwrap();
    tokio::time::sleep(DEBOUNCE).await;
    assert!(!session.is_finished());

    writer.shutdown().await.unwrap();
    timeout(PATIENCE, session).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_peer_gone_before_configuration() {
    let (_dir, root) = project();
    let (_reader, mut writer, session) = spawn_session(&root, Carrier::Socket);
    writer.shutdown().await.unwrap();

    let err = timeout(PATIENCE, session).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(
        err,
        WatcherError::Protocol(ProtocolError::HandshakeClosed)
    ));
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let (_dir, root) = project();
    let missing = root.join("not-there");
    let (_reader, mut writer, session) = spawn_session(&missing, Carrier::Socket);
    write_frame(&mut writer, &WatchConfiguration::new().to_payload())
        .await
        .unwrap();

    let err = timeout(PATIENCE, session).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(err, WatcherError::DirectoryNotFound(path) if path == missing));
}
