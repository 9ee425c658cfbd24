//! Length-prefixed frame codec.
//!
//! A frame is a 4-byte big-endian unsigned length followed by exactly that
//! many payload bytes. There is no checksum and no compression.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{ProtocolError, Result};

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Assemble a complete frame (header + payload) in one buffer.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let len =
        u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge(payload.len()))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Write one frame as a single logical write, then flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    trace!("Wrote frame with {} payload bytes", payload.len());
    Ok(())
}

/// Read exactly one frame and return its payload.
///
/// A short read on either the header or the payload is an error; nothing is
/// buffered across calls beyond what the reader itself holds.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ProtocolError::ShortHeader)?;

    // The buffer grows with the bytes that actually arrive, never with the
    // length the header claims.
    let expected = u32::from_be_bytes(header) as usize;
    let mut payload = Vec::new();
    (&mut *reader)
        .take(expected as u64)
        .read_to_end(&mut payload)
        .await
        .map_err(|source| ProtocolError::ShortPayload { expected, source })?;
    if payload.len() < expected {
        return Err(ProtocolError::ShortPayload {
            expected,
            source: io::ErrorKind::UnexpectedEof.into(),
        });
    }

    trace!("Read frame with {expected} payload bytes");
    Ok(payload)
}
