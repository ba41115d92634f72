// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, RawWatchSection, WatchSection};
use crate::errors::{FileWatchError, Result};
use crate::types::SinceWhen;

/// Upper bound for `latency_ms`; anything longer is almost certainly a typo.
const MAX_LATENCY_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FileWatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let watch = validate_watch_section(raw.watch)?;
        Ok(ConfigFile::new_unchecked(watch))
    }
}

/// Validate an already-parsed config without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg.watch.clone()).map(|_| ())
}

fn validate_watch_section(raw: RawWatchSection) -> Result<WatchSection> {
    let paths = validate_paths(raw.paths)?;
    let since = parse_since(&raw.since)?;

    if raw.latency_ms > MAX_LATENCY_MS {
        return Err(FileWatchError::ConfigError(format!(
            "[watch].latency_ms must be <= {MAX_LATENCY_MS} (got {})",
            raw.latency_ms
        )));
    }

    Ok(WatchSection {
        paths,
        context: raw.context,
        latency: Duration::from_millis(raw.latency_ms),
        since,
        recursive: raw.recursive,
    })
}

fn validate_paths(paths: Vec<String>) -> Result<Vec<PathBuf>> {
    paths
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            if p.trim().is_empty() {
                Err(FileWatchError::ConfigError(format!(
                    "[watch].paths[{i}] must not be empty"
                )))
            } else {
                Ok(PathBuf::from(p))
            }
        })
        .collect()
}

fn parse_since(raw: &str) -> Result<SinceWhen> {
    raw.parse::<SinceWhen>()
        .map_err(|e| FileWatchError::ConfigError(format!("[watch].since: {e}")))
}
