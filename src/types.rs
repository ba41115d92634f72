use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Where event callbacks run, as named in config files and on the CLI.
///
/// - `Background`: directly on the thread the native facility delivers on
///   (default; for the `notify` backend this is its internal watcher thread).
/// - `Affiliated`: marshalled onto a context owned by the caller, which runs
///   the queued callbacks when it drains its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContextKind {
    Background,
    Affiliated,
}

impl Default for ExecutionContextKind {
    fn default() -> Self {
        ExecutionContextKind::Background
    }
}

impl FromStr for ExecutionContextKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "background" => Ok(ExecutionContextKind::Background),
            "affiliated" => Ok(ExecutionContextKind::Affiliated),
            other => Err(format!(
                "invalid execution context: {other} (expected \"background\" or \"affiliated\")"
            )),
        }
    }
}

impl fmt::Display for ExecutionContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContextKind::Background => f.write_str("background"),
            ExecutionContextKind::Affiliated => f.write_str("affiliated"),
        }
    }
}

/// The "since" marker passed to the native facility when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinceWhen {
    /// Only report changes that happen after the subscription starts.
    Now,
    /// Replay history starting after the given native event id.
    Historical(u64),
}

impl Default for SinceWhen {
    fn default() -> Self {
        SinceWhen::Now
    }
}

impl FromStr for SinceWhen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("now") {
            return Ok(SinceWhen::Now);
        }
        s.parse::<u64>().map(SinceWhen::Historical).map_err(|_| {
            format!("invalid since marker: {s} (expected \"now\" or an event id)")
        })
    }
}
