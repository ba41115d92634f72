// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExecutionContextKind, SinceWhen};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// paths = ["~/Desktop"]
/// context = "background"
/// latency_ms = 0
/// since = "now"
/// recursive = true
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: RawWatchSection,
}

/// `[watch]` section, as written.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWatchSection {
    /// Paths to watch. May be empty when paths come from the command line.
    #[serde(default)]
    pub paths: Vec<String>,

    /// `"background"` (default) or `"affiliated"`.
    #[serde(default)]
    pub context: ExecutionContextKind,

    /// Advisory batching window in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,

    /// `"now"` or a native event id to replay from.
    #[serde(default = "default_since")]
    pub since: String,

    /// Also report changes below the roots' direct children.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_since() -> String {
    "now".to_string()
}

fn default_recursive() -> bool {
    true
}

impl Default for RawWatchSection {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            context: ExecutionContextKind::default(),
            latency_ms: 0,
            since: default_since(),
            recursive: default_recursive(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub watch: WatchSection,
}

#[derive(Debug, Clone)]
pub struct WatchSection {
    pub paths: Vec<PathBuf>,
    pub context: ExecutionContextKind,
    pub latency: Duration,
    pub since: SinceWhen,
    pub recursive: bool,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            context: ExecutionContextKind::default(),
            latency: Duration::ZERO,
            since: SinceWhen::default(),
            recursive: default_recursive(),
        }
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchSection) -> Self {
        Self { watch }
    }
}
