// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileWatchError {
    /// The set of paths handed to a session was empty or unusable.
    #[error("Invalid watch target: {0}")]
    InvalidTarget(String),

    /// The native facility could not create or start a subscription.
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The event callback cannot be replaced while a session is running.
    #[error("Callback cannot be replaced while the session is running")]
    CallbackLocked,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FileWatchError {
    /// Wrap any error raised while talking to the native facility as a
    /// `SubscriptionFailed`, keeping an existing `SubscriptionFailed` as is.
    pub fn subscription(stage: &str, err: FileWatchError) -> Self {
        match err {
            FileWatchError::SubscriptionFailed(msg) => {
                FileWatchError::SubscriptionFailed(format!("{stage}: {msg}"))
            }
            other => FileWatchError::SubscriptionFailed(format!("{stage}: {other}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, FileWatchError>;
