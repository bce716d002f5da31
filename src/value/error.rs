use thiserror::Error;

use super::Kind;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValueError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("type mismatch for '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: Kind,
        found: Kind,
    },

    #[error("index {index} out of range for array of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
}
