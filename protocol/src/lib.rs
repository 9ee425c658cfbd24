//! # filesync protocol
//!
//! Wire format shared by the `filesync` companion process and its peer.
//!
//! Every message is a [frame](frame): a 4-byte big-endian length followed by
//! exactly that many payload bytes. Three payloads travel inside frames:
//!
//! - the `init` marker the pipe carrier announces readiness with,
//! - the [`WatchConfiguration`] the peer sends during the handshake,
//! - [`ChangeBatch`]es the watcher emits after each debounce window.
//!
//! ## Session
//!
//! ```text
//!  filesync                              peer
//!     │ ── Frame("init") ───────────────► │   (pipe carrier only)
//!     │ ◄─────────── Frame(config) ────── │
//!     │ ── Frame(batch) ────────────────► │
//!     │ ── Frame(batch) ────────────────► │
//!     │ ◄──────── bytes / EOF ─────────── │   shutdown
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;

pub use batch::ChangeBatch;
pub use config::WatchConfiguration;
pub use error::{ProtocolError, Result};
pub use frame::{encode_frame, read_frame, write_frame};
pub use handshake::{Carrier, INIT_MARKER, handshake, wait_for_shutdown};
