// SPDX-License-Identifier: PMPL-1.0-or-later
//! Engine configuration.
//!
//! Defaults match the stock driver setup: data under `./data`, persisted to
//! disk, unknown query operators ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default storage root when none is configured.
pub const DEFAULT_ROOT: &str = "./data";

/// Configuration for one [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JdbConfig {
    /// Directory holding one `<name>.jdb` file per collection.
    pub root: PathBuf,
    /// Keep everything in memory and never touch the filesystem.
    /// Data is lost when the process exits; intended for tests.
    pub in_memory: bool,
    /// Reject unknown `$` operators in filters and updates instead of
    /// ignoring them.
    pub strict_operators: bool,
}

impl JdbConfig {
    /// Disk-backed configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// In-memory configuration; the root is kept only for naming.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    /// Enable or disable strict operator parsing.
    pub fn with_strict_operators(mut self, strict: bool) -> Self {
        self.strict_operators = strict;
        self
    }

    /// Build a configuration from the defaults overlaid with environment
    /// variables:
    ///
    /// - `JDB_ROOT` - storage root directory
    /// - `JDB_IN_MEMORY` - `1`/`true`/`yes` to disable persistence
    /// - `JDB_STRICT_OPERATORS` - `1`/`true`/`yes` to reject unknown operators
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup("JDB_ROOT").filter(|root| !root.is_empty()) {
            config.root = PathBuf::from(root);
        }
        if let Some(flag) = lookup("JDB_IN_MEMORY") {
            config.in_memory = parse_flag(&flag);
        }
        if let Some(flag) = lookup("JDB_STRICT_OPERATORS") {
            config.strict_operators = parse_flag(&flag);
        }
        config
    }
}

impl Default for JdbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            in_memory: false,
            strict_operators: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = JdbConfig::default();
        assert_eq!(config.root, PathBuf::from("./data"));
        assert!(!config.in_memory);
        assert!(!config.strict_operators);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: JdbConfig =
            serde_json::from_str(r#"{"root": "/var/lib/jdb", "inMemory": true}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("/var/lib/jdb"));
        assert!(config.in_memory);
        assert!(!config.strict_operators);
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("JDB_ROOT", "/tmp/store"),
            ("JDB_IN_MEMORY", "TRUE"),
            ("JDB_STRICT_OPERATORS", "0"),
        ]
        .into_iter()
        .collect();
        let config = JdbConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.root, PathBuf::from("/tmp/store"));
        assert!(config.in_memory);
        assert!(!config.strict_operators);
    }

    #[test]
    fn test_empty_root_env_keeps_default() {
        let config = JdbConfig::from_lookup(|key| (key == "JDB_ROOT").then(String::new));
        assert_eq!(config.root, PathBuf::from(DEFAULT_ROOT));
    }
}
