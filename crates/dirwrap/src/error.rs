//! Directory provider error types.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Capability, DirHandle};

/// Directory provider error type.
#[derive(Debug, Error)]
pub enum DirError {
    /// Path does not exist in the provider's namespace.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Permission denied (includes paths that escape a backend root).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Directory already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Directory not empty and recursive removal was not requested.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Handle was never opened by this provider, or has been closed.
    #[error("invalid directory handle: {0}")]
    InvalidHandle(DirHandle),

    /// Optional capability invoked on a provider that does not declare it.
    #[error("operation not supported: {0}")]
    Unsupported(Capability),

    /// Backend I/O did not complete in time.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Opaque underlying failure.
    #[error("backend failure: {0}")]
    Backend(#[source] io::Error),
}

/// Stable, host-facing classification of a [`DirError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DirErrorKind {
    NotFound,
    NotADirectory,
    PermissionDenied,
    AlreadyExists,
    NotEmpty,
    InvalidHandle,
    Unsupported,
    Timeout,
    Backend,
}

impl DirError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotEmpty error.
    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    /// Create a Backend error from a message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(io::Error::other(msg.into()))
    }

    /// The kind of this error.
    pub fn kind(&self) -> DirErrorKind {
        match self {
            Self::NotFound(_) => DirErrorKind::NotFound,
            Self::NotADirectory(_) => DirErrorKind::NotADirectory,
            Self::PermissionDenied(_) => DirErrorKind::PermissionDenied,
            Self::AlreadyExists(_) => DirErrorKind::AlreadyExists,
            Self::NotEmpty(_) => DirErrorKind::NotEmpty,
            Self::InvalidHandle(_) => DirErrorKind::InvalidHandle,
            Self::Unsupported(_) => DirErrorKind::Unsupported,
            Self::Timeout { .. } => DirErrorKind::Timeout,
            Self::Backend(_) => DirErrorKind::Backend,
        }
    }

    /// Returns true if the operation does not exist on the provider, as opposed
    /// to having been attempted and failed.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Attach a path to an I/O error while classifying it.
    pub(crate) fn from_io(err: io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied(path)
            }
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty(path),
            _ => Self::Backend(err),
        }
    }
}

/// Classify an I/O error. Use [`DirError::from_io`] when the path is known.
impl From<io::Error> for DirError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::ReadOnlyFilesystem
            | io::ErrorKind::AlreadyExists
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::DirectoryNotEmpty => {
                let msg = e.to_string();
                Self::from_io(e, &msg)
            }
            _ => Self::Backend(e),
        }
    }
}

/// Convert DirError to std::io::Error for hosts that speak std I/O.
impl From<DirError> for io::Error {
    fn from(e: DirError) -> Self {
        let kind = e.kind();
        match e {
            DirError::Backend(inner) => inner,
            other => {
                let io_kind = match kind {
                    DirErrorKind::NotFound => io::ErrorKind::NotFound,
                    DirErrorKind::NotADirectory => io::ErrorKind::NotADirectory,
                    DirErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
                    DirErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
                    DirErrorKind::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
                    DirErrorKind::InvalidHandle => io::ErrorKind::InvalidInput,
                    DirErrorKind::Unsupported => io::ErrorKind::Unsupported,
                    DirErrorKind::Timeout => io::ErrorKind::TimedOut,
                    DirErrorKind::Backend => io::ErrorKind::Other,
                };
                io::Error::new(io_kind, other.to_string())
            }
        }
    }
}

/// Directory provider result type.
pub type DirResult<T> = Result<T, DirError>;
