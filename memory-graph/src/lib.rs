#![deny(missing_docs)]
//! The typed knowledge graph and its durable flat-mirror projection.
//!
//! [`KnowledgeGraph`] is the sole mutator of graph state. [`EntityStore`]
//! is a secondary, forgiving projection used for external inspection and
//! as a fallback reconstruction path; the authoritative, lossless round
//! trip goes through [`graph::GraphDump`].

pub mod entity_store;
pub mod error;
pub mod graph;
pub mod outcomes;

pub use entity_store::{EntityRecord, EntityStore, EntityStoreDocument, RelationshipRecord};
pub use error::{GraphError, StoreError};
pub use graph::{GraphDump, KnowledgeGraph};
pub use outcomes::{AddEdgeOutcome, DeleteOutcome};
