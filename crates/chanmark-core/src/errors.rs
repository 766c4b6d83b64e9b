use std::path::PathBuf;

/// Core error type for the marker bot.
///
/// Adapter crates map their platform errors into this type so the dispatch
/// layer can decide between a user-facing message and an unexpected failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid env file: {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
