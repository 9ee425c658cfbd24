//! Watch-set maintenance.
//!
//! The indexer walks the tree at startup and keeps the set of subscribed
//! directories in step with directory creation, removal and rename events.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WatcherError};
use crate::filter::{DirectoryRules, is_excluded, is_hidden};
use crate::notifier::Notifier;

/// Counters from one indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Directories newly subscribed.
    pub registered: usize,

    /// Directories refused by the include/exclude/hidden rules.
    pub skipped: usize,

    /// Entries that could not be read or subscribed.
    pub failed: usize,
}

impl IndexReport {
    fn absorb(&mut self, other: IndexReport) {
        self.registered += other.registered;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkRules {
    /// Hidden, include and exclude rules all apply.
    Filtered,
    /// Only the hidden rule applies (explicit include roots).
    HiddenOnly,
}

/// Owns the watch set and the notifier subscriptions behind it.
pub struct DirectoryIndexer<N> {
    notifier: N,
    rules: DirectoryRules,
    watch_set: BTreeSet<PathBuf>,
}

impl<N: Notifier> DirectoryIndexer<N> {
    /// Create an indexer with an empty watch set.
    pub fn new(notifier: N, rules: DirectoryRules) -> Self {
        Self {
            notifier,
            rules,
            watch_set: BTreeSet::new(),
        }
    }

    /// Bring the watch set to a consistent state for `primary_root` and the
    /// peer's extra roots.
    ///
    /// Unreadable subtrees and failed subscriptions are logged and skipped.
    pub fn initialize(&mut self, primary_root: &Path, include_roots: &[String]) -> Result<IndexReport> {
        let root = normalize(&std::path::absolute(primary_root)?);
        if !root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(root));
        }

        let mut report = self.walk(&root, WalkRules::Filtered);

        for extra in include_roots.iter().filter(|r| !r.is_empty()) {
            let extra = match std::path::absolute(extra) {
                Ok(path) => normalize(&path),
                Err(e) => {
                    warn!("Skipping include root {extra}: {e}");
                    continue;
                }
            };
            if !extra.exists() {
                warn!("Skipping missing include root: {}", extra.display());
                continue;
            }
            report.absorb(self.walk(&extra, WalkRules::HiddenOnly));
        }

        info!(
            "Indexed {} (registered: {}, skipped: {}, failed: {})",
            root.display(),
            report.registered,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Subscribe a newly created directory, and any qualifying directories
    /// already inside it. Returns whether `path` itself is now watched.
    pub fn on_directory_created(&mut self, path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        if let Some(reason) = self.rules.rejection(path) {
            debug!("Not watching new directory {} ({reason:?})", path.display());
            return false;
        }

        let report = self.walk(path, WalkRules::Filtered);
        debug!(
            "New directory {} registered {} watches",
            path.display(),
            report.registered
        );
        self.is_watched(path)
    }

    /// Drop `path` and every watched directory beneath it.
    ///
    /// Paths that were never watched are a no-op. Returns how many entries
    /// left the watch set.
    pub fn on_directory_removed(&mut self, path: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .watch_set
            .range(path.to_path_buf()..)
            .take_while(|watched| watched.starts_with(path))
            .cloned()
            .collect();

        for dir in &doomed {
            self.watch_set.remove(dir);
            if let Err(e) = self.notifier.unwatch(dir) {
                // The OS usually drops the watch itself once the directory is gone.
                debug!("Unwatch {} failed: {e}", dir.display());
            }
        }

        if !doomed.is_empty() {
            debug!("Stopped watching {} ({} entries)", path.display(), doomed.len());
        }
        doomed.len()
    }

    /// A renamed path cannot be stat'd any more, so it is always dropped.
    pub fn on_renamed(&mut self, path: &Path) -> usize {
        self.on_directory_removed(path)
    }

    /// The directories currently subscribed.
    pub fn watch_set(&self) -> &BTreeSet<PathBuf> {
        &self.watch_set
    }

    /// Whether `path` is subscribed.
    pub fn is_watched(&self, path: &Path) -> bool {
        self.watch_set.contains(path)
    }

    /// Number of subscribed directories.
    pub fn len(&self) -> usize {
        self.watch_set.len()
    }

    /// Check if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.watch_set.is_empty()
    }

    fn walk(&mut self, root: &Path, rules: WalkRules) -> IndexReport {
        let mut report = IndexReport::default();
        let mut candidates = Vec::new();

        // Hidden and excluded directories are pruned: every descendant
        // fails the same check.
        let exclude_dirs = &self.rules.exclude_dirs;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                let path = entry.path();
                let pruned = is_hidden(path)
                    || (rules == WalkRules::Filtered && is_excluded(exclude_dirs, path));
                if pruned {
                    debug!("Pruning {}", path.display());
                }
                !pruned
            });

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => candidates.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    report.failed += 1;
                }
            }
        }

        for dir in candidates {
            if rules == WalkRules::Filtered && !self.rules.qualifies(&dir) {
                report.skipped += 1;
                continue;
            }
            match self.register(dir) {
                Ok(true) => report.registered += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to watch directory: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn register(&mut self, dir: PathBuf) -> Result<bool> {
        if self.watch_set.contains(&dir) {
            return Ok(false);
        }
        self.notifier.watch(&dir)?;
        debug!("Watching {}", dir.display());
        self.watch_set.insert(dir);
        Ok(true)
    }
}

/// Fold `.` and `..` out of an absolute path without touching the disk.
///
/// Watched paths are compared as strings against the directory rules and
/// against event paths, so they must be in canonical lexical form.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
