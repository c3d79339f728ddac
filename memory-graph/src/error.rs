//! Errors raised by the knowledge graph and its entity-store mirror.

use thiserror::Error;

/// Errors from [`crate::graph::KnowledgeGraph`] operations.
///
/// Most graph operations report failure as part of their return value
/// (`ok | missing_endpoint`, `ok | not_found`, a count) rather than through
/// this enum — it exists for the handful of calls that are genuinely
/// programmer errors (an all-wildcard deletion) or I/O failures
/// (serialization).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GraphError {
    /// `DeleteEdgesMatching` was called with every field wildcarded.
    #[error("edge deletion query must pin at least one of source/target/label")]
    AllWildcardDeletion,

    /// Serialization to the lossless graph format failed.
    #[error("graph serialization failed: {0}")]
    Serialization(String),
}

/// Errors from [`crate::entity_store::EntityStore`] load/sync.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The on-disk mirror could not be parsed. Callers treat this as
    /// `Corrupt`: start from an empty graph and surface a warning.
    #[error("entity store corrupt: {0}")]
    Corrupt(String),

    /// A filesystem operation failed.
    #[error("entity store io error: {0}")]
    Io(#[from] std::io::Error),
}
