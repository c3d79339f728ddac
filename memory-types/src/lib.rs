#![deny(missing_docs)]
//! Core data model for the session-scoped graph memory service.
//!
//! Every other crate in this workspace depends on this one and only this
//! one for its shared vocabulary: [`Node`], [`Edge`], [`ConversationTurn`],
//! [`StateEntry`], [`UpdatePlan`], and the pure attribute-merge rule in
//! [`merge`]. Nothing here does I/O.

mod counts;
mod edge;
mod entity;
pub mod merge;
mod plan;
mod state;
mod turn;

pub use counts::{ApplyCounts, Warning};
pub use edge::Edge;
pub use entity::{AttrMap, AttrValue, EntityKind, Node};
pub use plan::{DeleteMode, EdgeAdd, EdgeDeleteMatch, NodeDelete, NodeUpsert, UpdatePlan};
pub use state::StateEntry;
pub use turn::ConversationTurn;
