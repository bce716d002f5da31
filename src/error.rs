use thiserror::Error;

use crate::interface::Category;
use crate::store::StoreError;
use crate::value::ValueError;

/// Top-level error type for the edgecfg library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("environment variable AppName is not set")]
    MissingAppName,

    #[error("key not found in store: {0}")]
    NotFound(String),

    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("security material missing: {0}")]
    SecurityMaterialMissing(String),

    #[error("no interface named '{name}' in {category}")]
    InterfaceNotFound { category: Category, name: String },

    #[error("at least one element required in {0}")]
    EmptyCategory(Category),

    #[error("invalid value: {0}")]
    Value(#[from] ValueError),

    #[error("store error: {0}")]
    Store(#[source] StoreError),

    #[error("failed to spawn watch thread: {0}")]
    WatchSpawn(#[source] std::io::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A store key, descriptor or array element is absent.
    NotFound,
    /// A document failed to parse or a field has the wrong shape.
    Malformed,
    /// A transport type or store backend outside the supported set.
    Unsupported,
    /// Prod mode is missing a required key.
    SecurityMaterialMissing,
    /// The store itself failed, or a watch could not start.
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::InterfaceNotFound { .. } => ErrorKind::NotFound,
            Error::MissingAppName | Error::Malformed { .. } | Error::EmptyCategory(_) => {
                ErrorKind::Malformed
            }
            Error::Value(ValueError::OutOfRange { .. }) => ErrorKind::NotFound,
            Error::Value(_) => ErrorKind::Malformed,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::SecurityMaterialMissing(_) => ErrorKind::SecurityMaterialMissing,
            Error::Store(_) | Error::WatchSpawn(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn malformed(what: impl Into<String>, reason: impl ToString) -> Self {
        Error::Malformed {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnsupportedBackend(backend) => {
                Error::Unsupported(format!("store backend '{backend}'"))
            }
            StoreError::InvalidSetting { name, value } => {
                Error::malformed(name, format!("invalid value '{value}'"))
            }
            other => Error::Store(other),
        }
    }
}
