//! Error kinds per crate boundary, composed into one `MemoryError` at the
//! façade boundary. The HTTP layer maps `MemoryError::kind()` to a status
//! code; nothing below this crate knows about HTTP.

use thiserror::Error;

/// The closed set of error kinds every boundary maps into, independent of
/// which component raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced session, turn, or node does not exist.
    NotFound,
    /// The caller's request was malformed or violated a precondition.
    InvalidInput,
    /// A retryable failure (timeout, provider hiccup, lock contention).
    Transient,
    /// On-disk or in-memory state could not be trusted; started fresh.
    Corrupt,
    /// A conflict-resolver record fell outside the current window.
    OutOfWindow,
}

/// Errors from [`crate::facade`] operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FacadeError {
    /// Persistence write failed.
    #[error("persist failed: {0}")]
    PersistFailed(#[from] memory_graph::StoreError),
    /// The on-disk graph dump could not be parsed; treated as corrupt.
    #[error("graph state corrupt: {0}")]
    Corrupt(String),
}

impl FacadeError {
    /// Map to the closed error-kind set.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FacadeError::PersistFailed(_) => ErrorKind::Transient,
            FacadeError::Corrupt(_) => ErrorKind::Corrupt,
        }
    }
}

/// Errors from [`crate::registry::SessionRegistry`] operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No session exists with the given id.
    #[error("session not found: {0}")]
    NotFound(String),
    /// A session already exists with the given id (on explicit create).
    #[error("session already exists: {0}")]
    AlreadyExists(String),
}

impl RegistryError {
    /// Map to the closed error-kind set.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::AlreadyExists(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Aggregated error surfaced at the façade/HTTP boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Propagated from [`FacadeError`].
    #[error(transparent)]
    Facade(#[from] FacadeError),
    /// Propagated from [`RegistryError`].
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A conflict-resolver record referenced a turn outside the window.
    #[error("record out of window")]
    OutOfWindow,
    /// Caller input failed validation before reaching a component.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MemoryError {
    /// Map to the closed error-kind set, for the HTTP layer to translate
    /// into a status code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::Facade(e) => e.kind(),
            MemoryError::Registry(e) => e.kind(),
            MemoryError::OutOfWindow => ErrorKind::OutOfWindow,
            MemoryError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}
