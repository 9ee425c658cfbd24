//! # Directory Watcher
//!
//! Keeps a set of per-directory OS watches in step with a project tree and
//! turns the notifications into debounced batches of changed source files.
//!
//! ## Features
//!
//! - **Watch-set maintenance**: one non-recursive watch per qualifying directory,
//!   extended and pruned as directories appear, move and vanish
//! - **Directory rules**: hidden paths, an allowlist and a denylist of substrings
//! - **Extension filtering**: only source-like files are ever reported
//! - **Debounced batching**: changes are flushed once the tree has been quiet
//!   for a full window
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        run_session                             │
//! ├────────────────────────────────────────────────────────────────┤
//! │  handshake ──► DirectoryIndexer::initialize ──► EventLoop::run │
//! │                      │                              │          │
//! │                      ▼                              ▼          │
//! │  NotifyBackend ──► RawEvent ──► classify ──► ChangeAggregator  │
//! │                                                     │          │
//! │                                                     ▼          │
//! │                                          Frame(ChangeBatch)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod filter;
pub mod indexer;
pub mod notifier;
pub mod session;
pub mod settings;

pub use aggregator::{ChangeAggregator, DebounceTimer, TimerMode};
pub use error::{Result, WatcherError};
pub use event::{FsEvent, FsEventKind, classify};
pub use event_loop::{EventLoop, ExitReason};
pub use filter::{DirectoryRules, ExtensionFilter, Rejection};
pub use indexer::{DirectoryIndexer, IndexReport};
pub use notifier::{Notifier, NotifyBackend, RawEvent};
pub use session::run_session;
pub use settings::WatcherSettings;
