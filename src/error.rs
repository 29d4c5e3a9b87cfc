//! Error types shared by the codec, the segment and the query layers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading postings or evaluating structural queries.
#[derive(Error, Debug)]
pub enum Error {
    /// A block header or payload disagrees with the bytes actually present.
    #[error("Corrupt data in {context}: {reason}")]
    CorruptData { context: String, reason: String },

    /// Invalid query or index configuration, detected before iteration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A cursor capability was used outside of its precondition.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corrupt(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptData {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error marks the segment as unreadable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptData { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
