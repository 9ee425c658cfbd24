//! Change batch payload.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Terminator written after every path in a batch, including the last.
pub const PATH_TERMINATOR: &str = "\r\n";

/// A coalesced set of changed file paths, ready for transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    paths: Vec<PathBuf>,
}

impl ChangeBatch {
    /// Build a batch; paths are sorted and deduplicated.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    /// Paths in the batch, in sorted order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Get the number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check whether a path is part of the batch.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.binary_search_by(|p| p.as_path().cmp(path)).is_ok()
    }

    /// Render as `path1\r\npath2\r\n...`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        for path in &self.paths {
            out.push_str(&path.to_string_lossy());
            out.push_str(PATH_TERMINATOR);
        }
        out.into_bytes()
    }

    /// Parse a batch payload received from the wire.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = String::from_utf8(payload.to_vec())?;
        Ok(Self::new(
            text.split(PATH_TERMINATOR)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from),
        ))
    }
}
