use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("unsupported store backend: {0}")]
    UnsupportedBackend(String),

    #[error("store backend '{backend}' failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("invalid value '{value}' for {name}")]
    InvalidSetting { name: String, value: String },

    #[error("required seed file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read seed file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse seed file '{path}': {reason}")]
    ParseError { path: PathBuf, reason: String },
}
