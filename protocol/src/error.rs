//! Error types for the peer protocol.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while framing or parsing peer messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The stream ended before a full length header arrived.
    #[error("short read on frame header")]
    ShortHeader(#[source] std::io::Error),

    /// The stream ended before the announced payload arrived.
    #[error("short read on frame payload: expected {expected} bytes")]
    ShortPayload {
        expected: usize,
        #[source]
        source: std::io::Error,
    },

    /// Payload does not fit in a 32-bit length header.
    #[error("frame payload too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Configuration payload is missing one of its three groups.
    #[error("malformed configuration payload: expected 3 groups, got {0}")]
    MalformedConfig(usize),

    /// The pipe handshake expected the peer to answer but it hung up.
    #[error("peer closed the stream during handshake")]
    HandshakeClosed,

    /// Payload is not valid UTF-8.
    #[error("payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
