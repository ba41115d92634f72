// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ExecutionContextKind;

/// Command-line arguments for `filewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "filewatch",
    version,
    about = "Watch files and directories and print every change.",
    long_about = None
)]
pub struct CliArgs {
    /// Paths to watch. `~` is expanded. Overrides `[watch].paths`.
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Filewatch.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Where callbacks run: `background` or `affiliated`.
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<ExecutionContextKind>,

    /// Advisory batching window for the native facility, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Only report changes to the roots and their direct children.
    ///
    /// Overrides `[watch].recursive`.
    #[arg(long)]
    pub non_recursive: bool,

    /// Also print the raw flag bits of every event.
    #[arg(long)]
    pub print_flags: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FILEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_overrides() {
        let args = CliArgs::try_parse_from([
            "filewatch",
            "~/Desktop",
            "/tmp",
            "--context",
            "affiliated",
            "--latency-ms",
            "50",
            "--print-flags",
            "--non-recursive",
        ])
        .unwrap();

        assert_eq!(args.paths, vec!["~/Desktop", "/tmp"]);
        assert_eq!(args.context, Some(ExecutionContextKind::Affiliated));
        assert_eq!(args.latency_ms, Some(50));
        assert!(args.print_flags);
        assert!(args.non_recursive);
        assert!(args.config.is_none());
    }

    #[test]
    fn rejects_unknown_context() {
        assert!(CliArgs::try_parse_from(["filewatch", "--context", "main"]).is_err());
    }
}
