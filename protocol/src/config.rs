//! Watch configuration exchanged during the handshake.
//!
//! The payload carries three groups separated by `\r\n`, in the order
//! include roots, only dirs, exclude dirs. Each group is a `|`-separated list
//! of directory strings; an empty list is an empty string, never omitted.

use tracing::warn;

use crate::error::{ProtocolError, Result};

/// Separator between the three groups of the payload.
pub const GROUP_SEPARATOR: &str = "\r\n";

/// Separator between entries inside a group.
pub const ENTRY_SEPARATOR: char = '|';

const GROUP_COUNT: usize = 3;

/// Directory rules sent by the peer. Immutable once the handshake is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchConfiguration {
    /// Extra directories to watch beyond the primary root.
    pub include_roots: Vec<String>,

    /// Allowlist of directory substrings (empty means unrestricted).
    pub only_dirs: Vec<String>,

    /// Denylist of directory substrings.
    pub exclude_dirs: Vec<String>,
}

impl WatchConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extra root to watch.
    pub fn with_include_root(mut self, root: impl Into<String>) -> Self {
        self.include_roots.push(root.into());
        self
    }

    /// Add an allowlist entry.
    pub fn with_only_dir(mut self, dir: impl Into<String>) -> Self {
        self.only_dirs.push(dir.into());
        self
    }

    /// Add a denylist entry.
    pub fn with_exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    /// Render the configuration into its wire representation.
    pub fn encode(&self) -> String {
        [&self.include_roots, &self.only_dirs, &self.exclude_dirs]
            .map(|group| group.join("|"))
            .join(GROUP_SEPARATOR)
    }

    /// Parse a configuration payload.
    ///
    /// Groups are split on `\n` with one trailing `\r` stripped, so peers that
    /// send bare newlines are understood too. Blank entries are dropped.
    pub fn decode(payload: &str) -> Result<Self> {
        let groups: Vec<&str> = payload
            .split('\n')
            .map(|group| group.strip_suffix('\r').unwrap_or(group))
            .collect();

        if groups.len() < GROUP_COUNT {
            return Err(ProtocolError::MalformedConfig(groups.len()));
        }
        if groups[GROUP_COUNT..].iter().any(|extra| !extra.is_empty()) {
            warn!(
                "Configuration payload has {} groups, ignoring everything after the third",
                groups.len()
            );
        }

        Ok(Self {
            include_roots: split_entries(groups[0]),
            only_dirs: split_entries(groups[1]),
            exclude_dirs: split_entries(groups[2]),
        })
    }

    /// Parse a raw frame payload.
    pub fn from_payload(payload: Vec<u8>) -> Result<Self> {
        let text = String::from_utf8(payload)?;
        Self::decode(&text)
    }

    /// Encode into raw frame payload bytes.
    pub fn to_payload(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}

fn split_entries(group: &str) -> Vec<String> {
    group
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_keeps_empty_group() {
        let config = WatchConfiguration::new()
            .with_include_root("/proj/lib")
            .with_include_root("/proj/deps")
            .with_exclude_dir("/proj/lib/tmp");

        let wire = config.encode();
        assert_eq!(wire, "/proj/lib|/proj/deps\r\n\r\n/proj/lib/tmp");
        assert_eq!(WatchConfiguration::decode(&wire).unwrap(), config);
    }

    #[test]
    fn test_all_groups_empty() {
        let config = WatchConfiguration::decode("\r\n\r\n").unwrap();
        assert_eq!(config, WatchConfiguration::default());
        assert_eq!(config.encode(), "\r\n\r\n");
    }

    #[test]
    fn test_bare_newline_separators() {
        let config = WatchConfiguration::decode("/a|/b\n\n/a/tmp").unwrap();
        assert_eq!(config.include_roots, vec!["/a", "/b"]);
        assert!(config.only_dirs.is_empty());
        assert_eq!(config.exclude_dirs, vec!["/a/tmp"]);
    }

    #[test]
    fn test_blank_entries_dropped() {
        let config = WatchConfiguration::decode("|/a||\r\n/src|\r\n").unwrap();
        assert_eq!(config.include_roots, vec!["/a"]);
        assert_eq!(config.only_dirs, vec!["/src"]);
        assert!(config.exclude_dirs.is_empty());
    }

    #[test]
    fn test_too_few_groups_is_error() {
        let err = WatchConfiguration::decode("/a\r\n/b").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedConfig(2)));

        let err = WatchConfiguration::decode("").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedConfig(1)));
    }

    #[test]
    fn test_extra_groups_ignored() {
        let config = WatchConfiguration::decode("/a\r\n\r\n/c\r\nsurplus").unwrap();
        assert_eq!(config.exclude_dirs, vec!["/c"]);
    }

    #[test]
    fn test_invalid_utf8_payload() {
        let err = WatchConfiguration::from_payload(vec![0xc3, 0x28]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8(_)));
    }
}
