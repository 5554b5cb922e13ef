/*
    errors.rs - Error types for the list registry

    Covers:
    - namespace configuration errors (unknown, duplicate, wrong visibility)
    - storage I/O on private list files
    - remote list transport and document errors
*/

use std::path::PathBuf;
use std::sync::PoisonError;
use thiserror::Error;

use crate::http::FetchError;

/// Errors that can occur in the list registry
#[derive(Debug, Error)]
pub enum RadarError {
    /// Namespace does not satisfy the naming rules
    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// Namespace already registered
    #[error("Namespace already registered: {0}")]
    DuplicateNamespace(String),

    /// Namespace not registered
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// Mutation attempted on a remotely synchronized list
    #[error("List is not private: {0}")]
    NotPrivate(String),

    /// Mutation or sync attempted on a list without a remote source
    #[error("List is not public: {0}")]
    NotPublic(String),

    /// Identity is not an entry of the list
    #[error("Identity {identity} is not listed in {namespace}")]
    NotListed { namespace: String, identity: uuid::Uuid },

    /// Storage I/O error
    #[error("Storage error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted list could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote list document is not usable
    #[error("Malformed list document from {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    /// Remote fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Lock poisoned: a thread panicked while holding the lock")]
    LockPoisoned,
}

/// Result type for registry operations
pub type RadarResult<T> = Result<T, RadarError>;

impl RadarError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RadarError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for caller mistakes (names, visibility), false for I/O and network failures
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RadarError::InvalidNamespace(_)
                | RadarError::DuplicateNamespace(_)
                | RadarError::UnknownNamespace(_)
                | RadarError::NotPrivate(_)
                | RadarError::NotPublic(_)
                | RadarError::NotListed { .. }
        )
    }
}

impl<T> From<PoisonError<T>> for RadarError {
    fn from(_: PoisonError<T>) -> Self {
        RadarError::LockPoisoned
    }
}

impl From<serde_json::Error> for RadarError {
    fn from(err: serde_json::Error) -> Self {
        RadarError::Serialization(err.to_string())
    }
}
