//! Classification of raw notify events.

use std::path::PathBuf;

use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::EventKind;

/// What the event loop does with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// A path appeared (including the destination of a move).
    Create,

    /// File contents changed.
    Write,

    /// A path was deleted.
    Remove,

    /// A path moved away (the source of a move).
    Rename,

    /// Permissions or other metadata changed.
    PermissionChange,

    /// Access and unknown notifications.
    Ignored,
}

/// A single classified path event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// The kind of event.
    pub kind: FsEventKind,

    /// Path to the affected file or directory.
    pub path: PathBuf,

    /// The backend reported the path as a directory.
    pub folder: bool,
}

impl FsEvent {
    /// Create a new event.
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            folder: false,
        }
    }

    fn folder(mut self, folder: bool) -> Self {
        self.folder = folder;
        self
    }
}

/// Split a notify event into per-path events.
///
/// A move is split into its two ends: the destination is a create and the
/// source is a rename.
pub fn classify(event: notify::Event) -> Vec<FsEvent> {
    let notify::Event { kind, paths, .. } = event;

    match kind {
        EventKind::Create(_) => with_kind(paths, FsEventKind::Create),
        EventKind::Modify(ModifyKind::Name(mode)) => classify_rename(mode, paths),
        EventKind::Modify(ModifyKind::Metadata(_)) => with_kind(paths, FsEventKind::PermissionChange),
        EventKind::Modify(_) => with_kind(paths, FsEventKind::Write),
        EventKind::Remove(remove) => {
            let folder = remove == RemoveKind::Folder;
            paths
                .into_iter()
                .map(|p| FsEvent::new(FsEventKind::Remove, p).folder(folder))
                .collect()
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            with_kind(paths, FsEventKind::Ignored)
        }
    }
}

fn classify_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<FsEvent> {
    match mode {
        RenameMode::To => with_kind(paths, FsEventKind::Create),
        RenameMode::From => with_kind(paths, FsEventKind::Rename),
        RenameMode::Both => paths
            .into_iter()
            .enumerate()
            .map(|(i, p)| match i {
                0 => FsEvent::new(FsEventKind::Rename, p),
                1 => FsEvent::new(FsEventKind::Create, p),
                _ => FsEvent::new(FsEventKind::Ignored, p),
            })
            .collect(),
        // Backends that cannot tell the two ends apart: whichever end still
        // exists is the destination.
        RenameMode::Any | RenameMode::Other => paths
            .into_iter()
            .map(|p| {
                let kind = if p.exists() {
                    FsEventKind::Create
                } else {
                    FsEventKind::Rename
                };
                FsEvent::new(kind, p)
            })
            .collect(),
    }
}

fn with_kind(paths: Vec<PathBuf>, kind: FsEventKind) -> Vec<FsEvent> {
    paths.into_iter().map(|p| FsEvent::new(kind, p)).collect()
}
