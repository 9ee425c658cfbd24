//! Session handshake and shutdown detection for both carriers.

use std::fmt;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info};

use crate::config::WatchConfiguration;
use crate::error::{ProtocolError, Result};
use crate::frame::{read_frame, write_frame};

/// Payload of the readiness frame the pipe carrier sends first.
pub const INIT_MARKER: &[u8] = b"init";

/// The byte stream frames travel over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    /// TCP client connection; the peer speaks first.
    Socket,

    /// Parent process stdin/stdout; we announce readiness first.
    Pipe,
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => f.write_str("socket"),
            Self::Pipe => f.write_str("pipe"),
        }
    }
}

/// Run the carrier's handshake and return the peer's watch configuration.
pub async fn handshake<R, W>(
    carrier: Carrier,
    reader: &mut R,
    writer: &mut W,
) -> Result<WatchConfiguration>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if carrier == Carrier::Pipe {
        write_frame(writer, INIT_MARKER).await?;
        debug!("Sent init marker");
    }

    let payload = match read_frame(reader).await {
        Err(ProtocolError::ShortHeader(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::HandshakeClosed);
        }
        other => other?,
    };

    let config = WatchConfiguration::from_payload(payload)?;
    info!(
        "Received watch configuration over {carrier}: {} include roots, {} only dirs, {} exclude dirs",
        config.include_roots.len(),
        config.only_dirs.len(),
        config.exclude_dirs.len()
    );
    Ok(config)
}

/// Resolve once the peer asks us to stop.
///
/// On a socket any read outcome counts: bytes, EOF or an error. On a pipe
/// incoming bytes are discarded until the parent closes its end.
pub async fn wait_for_shutdown<R>(reader: &mut R, carrier: Carrier)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Peer closed the {carrier} stream");
                return;
            }
            Ok(n) if carrier == Carrier::Socket => {
                debug!("Peer sent {n} shutdown bytes");
                return;
            }
            Ok(n) => debug!("Discarding {n} bytes from parent"),
            Err(e) => {
                debug!("Read on {carrier} stream failed: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn config_frame(payload: &str) -> Vec<u8> {
        encode_frame(payload.as_bytes()).unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_socket_handshake_reads_config_only() {
        let wire = config_frame("/a|/b\r\n\r\n/a/tmp");
        let mut reader = wire.as_slice();
        let mut writer = Vec::new();

        let config = handshake(Carrier::Socket, &mut reader, &mut writer)
            .await
            .unwrap();

        assert!(writer.is_empty());
        assert_eq!(config.include_roots, vec!["/a", "/b"]);
        assert_eq!(config.exclude_dirs, vec!["/a/tmp"]);
    }

    #[tokio::test]
    async fn test_pipe_handshake_announces_first() {
        let wire = config_frame("\r\n/src\r\n");
        let mut reader = wire.as_slice();
        let mut writer = Vec::new();

        let config = handshake(Carrier::Pipe, &mut reader, &mut writer)
            .await
            .unwrap();

        assert_eq!(writer, b"\x00\x00\x00\x04init");
        assert_eq!(config.only_dirs, vec!["/src"]);
    }

    #[tokio::test]
    async fn test_handshake_on_closed_stream() {
        let mut reader: &[u8] = &[];
        let mut writer = Vec::new();
        let err = handshake(Carrier::Socket, &mut reader, &mut writer)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::HandshakeClosed));
    }

    #[tokio::test]
    async fn test_handshake_rejects_partial_config() {
        let wire = config_frame("/only-one-group");
        let mut reader = wire.as_slice();
        let mut writer = Vec::new();
        let err = handshake(Carrier::Socket, &mut reader, &mut writer)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedConfig(1)));
    }

    #[tokio::test]
    async fn test_socket_shutdown_on_any_bytes() {
        let (mut peer, mut ours) = tokio::io::duplex(64);
        peer.write_all(b"x").await.unwrap();

        tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_shutdown(&mut ours, Carrier::Socket),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_pipe_shutdown_waits_for_eof() {
        let (mut parent, mut ours) = tokio::io::duplex(64);
        parent.write_all(b"noise").await.unwrap();

        let still_waiting = tokio::time::timeout(
            Duration::from_millis(50),
            wait_for_shutdown(&mut ours, Carrier::Pipe),
        )
        .await;
        assert!(still_waiting.is_err());

        drop(parent);
        tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_shutdown(&mut ours, Carrier::Pipe),
        )
        .await
        .unwrap();
    }
}
