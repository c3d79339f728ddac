//! Result types for graph mutations that are reported, not raised.

/// Outcome of `AddEdge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEdgeOutcome {
    /// Both endpoints existed; the edge was added or refreshed.
    Ok,
    /// At least one endpoint was missing; no side effect occurred.
    MissingEndpoint,
}

/// Outcome of a single-target delete (`DeleteNode`, `MarkDeleted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The target existed and was deleted/marked.
    Ok,
    /// The target did not exist.
    NotFound,
}
