// src/lib.rs

//! Filesystem change watching with decoded, human-readable events.
//!
//! A [`WatchSession`] subscribes to the OS change-notification facility for a
//! fixed set of paths and hands every change to a single callback as an
//! [`EventRecord`]. Records decode the raw native flags into file/directory
//! granularity, the CRUD kind and attribute changes, and can describe
//! themselves in plain English.
//!
//! ```no_run
//! use filewatch::WatchSession;
//!
//! let session = WatchSession::new(["/tmp/watch"], |event| {
//!     println!("{}", event.description());
//! })?;
//! session.start()?;
//! // ...
//! session.stop();
//! # Ok::<(), filewatch::errors::FileWatchError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub use crate::event::{EventKind, EventRecord, RawFlags};
pub use crate::types::{ExecutionContextKind, SinceWhen};
pub use crate::watch::{
    AffiliatedContext, ExecutionContext, NotifyFacility, SessionOptions, SessionState,
    WatchSession, WatchTarget,
};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, load_or_default};

/// High-level entry point used by `main.rs`.
///
/// Loads config, resolves the paths, starts a session that prints every event
/// and runs until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = match args.config.as_deref() {
        Some(path) => load_and_validate(path).with_context(|| format!("loading config {path}"))?,
        None => load_or_default(default_config_path())?,
    };

    let raw_paths: Vec<PathBuf> = if args.paths.is_empty() {
        cfg.watch.paths.clone()
    } else {
        args.paths.iter().map(PathBuf::from).collect()
    };
    let paths: Vec<PathBuf> = raw_paths.iter().map(|p| resolve_path(p)).collect();

    let kind = args.context.unwrap_or(cfg.watch.context);
    let latency = args
        .latency_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or(cfg.watch.latency);

    let (context, receiver) = match kind {
        ExecutionContextKind::Background => (ExecutionContext::Background, None),
        ExecutionContextKind::Affiliated => {
            let (ctx, rx) = AffiliatedContext::new();
            (ExecutionContext::Affiliated(ctx), Some(rx))
        }
    };

    let recursive = cfg.watch.recursive && !args.non_recursive;
    let facility = NotifyFacility::new().with_recursive(recursive);

    let options = SessionOptions {
        context,
        latency,
        since: cfg.watch.since,
    };

    let print_flags = args.print_flags;
    let session = WatchSession::with_options(
        paths,
        options,
        Arc::new(facility),
        move |event: &EventRecord| print_event(event, print_flags),
    )?;

    session.start()?;
    info!(paths = ?session.target().paths(), %kind, recursive, "watching; press Ctrl-C to stop");

    match receiver {
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("listening for Ctrl-C")?;
        }
        Some(mut rx) => loop {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res.context("listening for Ctrl-C")?;
                    break;
                }
                alive = rx.recv_one() => {
                    if !alive {
                        break;
                    }
                }
            }
        },
    }

    session.stop();
    debug!("session stopped; exiting");
    Ok(())
}

fn print_event(event: &EventRecord, print_flags: bool) {
    println!("{}", event.description());
    // Checked for every kind: a modify may be read after a later delete.
    if !event.path().exists() {
        println!("  (no longer exists)");
    }
    if print_flags {
        println!("  flags: {:#010x} {:?}", event.flags().bits(), event.flags());
    }
}

/// Expand a leading `~` and make the path absolute.
///
/// Canonicalizes when the path exists so that event paths reported by the OS
/// (which are canonical on most platforms) line up with the roots.
pub fn resolve_path(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if let Ok(canonical) = expanded.canonicalize() {
        return canonical;
    }
    std::path::absolute(&expanded).unwrap_or(expanded)
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded_from_home() {
        let Some(home) = std::env::var_os("HOME") else {
            return;
        };
        assert_eq!(
            expand_tilde(Path::new("~/Desktop")),
            PathBuf::from(home).join("Desktop")
        );
        assert_eq!(expand_tilde(Path::new("/abs/~x")), PathBuf::from("/abs/~x"));
    }

    #[test]
    fn resolved_paths_are_absolute() {
        assert!(resolve_path(Path::new("some/relative/dir")).is_absolute());

        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_path(dir.path());
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }
}
