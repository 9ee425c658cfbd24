//! Path predicates deciding what gets watched and what gets reported.
//!
//! Directory rules use plain substring matching with the first character of
//! both strings skipped, so `/proj/src` also admits `/proj/srcgen`.

use std::path::{Path, is_separator};

use filesync_protocol::WatchConfiguration;
use serde::{Deserialize, Serialize};

/// Extensions reported by default. Elixir and LFE sources must be opted in
/// through the settings file.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["erl", "hrl", "beam", "dtl"];

/// Tool-metadata extensions that are never reported.
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] = &["idea", "git", "svn", "lock", "bea"];

/// True if the path, or any segment after a separator, starts with `.`.
pub fn is_hidden(path: &Path) -> bool {
    let text = path.to_string_lossy();
    let bytes = text.as_bytes();

    if bytes.first() == Some(&b'.') {
        return true;
    }
    bytes
        .windows(2)
        .any(|pair| pair[1] == b'.' && is_separator(char::from(pair[0])))
}

/// True if the default [`ExtensionFilter`] reports files at `path`.
pub fn has_eligible_extension(path: &Path) -> bool {
    ExtensionFilter::default().is_eligible(path)
}

/// True if `candidate` matches any non-blank `only_dirs` entry, or if there is
/// no such entry at all.
pub fn is_included(only_dirs: &[String], candidate: &Path) -> bool {
    let candidate = candidate.to_string_lossy();
    let mut entries = non_blank(only_dirs).peekable();
    if entries.peek().is_none() {
        return true;
    }
    entries.any(|entry| contains_skipping_first(&candidate, entry))
}

/// True if `candidate` matches any non-blank `exclude_dirs` entry.
pub fn is_excluded(exclude_dirs: &[String], candidate: &Path) -> bool {
    let candidate = candidate.to_string_lossy();
    non_blank(exclude_dirs).any(|entry| contains_skipping_first(&candidate, entry))
}

fn non_blank(entries: &[String]) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .map(String::as_str)
        .filter(|entry| !entry.is_empty())
}

fn contains_skipping_first(candidate: &str, entry: &str) -> bool {
    skip_first_char(candidate).contains(skip_first_char(entry))
}

fn skip_first_char(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.as_str()
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

/// Why a directory was refused a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Hidden,
    NotIncluded,
    Excluded,
}

/// Include/exclude rules applied when registering directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRules {
    /// Allowlist of directory substrings.
    pub only_dirs: Vec<String>,

    /// Denylist of directory substrings.
    pub exclude_dirs: Vec<String>,
}

impl DirectoryRules {
    /// Create rules from raw lists.
    pub fn new(only_dirs: Vec<String>, exclude_dirs: Vec<String>) -> Self {
        Self {
            only_dirs,
            exclude_dirs,
        }
    }

    /// The first rule that refuses `path`, if any.
    pub fn rejection(&self, path: &Path) -> Option<Rejection> {
        if is_hidden(path) {
            Some(Rejection::Hidden)
        } else if !is_included(&self.only_dirs, path) {
            Some(Rejection::NotIncluded)
        } else if is_excluded(&self.exclude_dirs, path) {
            Some(Rejection::Excluded)
        } else {
            None
        }
    }

    /// Whether a directory should be watched.
    pub fn qualifies(&self, path: &Path) -> bool {
        self.rejection(path).is_none()
    }
}

impl From<&WatchConfiguration> for DirectoryRules {
    fn from(config: &WatchConfiguration) -> Self {
        Self::new(config.only_dirs.clone(), config.exclude_dirs.clone())
    }
}

/// Extension allow/deny lists used when aggregating file changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionFilter {
    /// Extensions (without the dot) that are reported.
    pub allow: Vec<String>,

    /// Extensions that are never reported, even if allowed.
    pub deny: Vec<String>,
}

impl ExtensionFilter {
    /// Whether a file at `path` should enter the pending set.
    pub fn is_eligible(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| {
            self.allow.iter().any(|a| a == ext) && !self.deny.iter().any(|d| d == ext)
        })
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self {
            allow: DEFAULT_ALLOWED_EXTENSIONS.iter().copied().map(String::from).collect(),
            deny: DEFAULT_DENIED_EXTENSIONS.iter().copied().map(String::from).collect(),
        }
    }
}
