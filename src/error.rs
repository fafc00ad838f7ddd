use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the index API.
///
/// Recoverable conditions (unreadable persisted index, unparseable source
/// file) are handled internally by rebuild/skip and never appear here.
#[derive(Debug, Error)]
pub enum Error {
    /// The source object cannot be turned into an index document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A structured query is malformed or references no recognized clause.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Underlying storage write/commit failed. Not recoverable locally.
    #[error("index storage failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a persisted index cannot be opened.
///
/// Every variant is recovered transparently by a full rebuild; callers of the
/// public API never observe these.
#[derive(Debug, Error)]
pub(crate) enum OpenError {
    #[error("missing index file {0}")]
    Missing(PathBuf),

    #[error("unreadable index file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("index format version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("index schema does not match the current schema")]
    SchemaMismatch,
}
