// src/main.rs

use std::process::ExitCode;

use filewatch::errors::FileWatchError;
use filewatch::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("filewatch error: {err:?}");
            exit_code_for(&err)
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}

/// 2 for bad input (paths or config), 1 for everything else.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let usage = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<FileWatchError>(),
            Some(
                FileWatchError::InvalidTarget(_)
                    | FileWatchError::ConfigError(_)
                    | FileWatchError::TomlError(_)
            )
        )
    });
    if usage { ExitCode::from(2) } else { ExitCode::FAILURE }
}
