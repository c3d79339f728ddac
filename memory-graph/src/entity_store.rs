//! Flat JSON mirror of a [`KnowledgeGraph`], kept for human/tool inspection.
//!
//! `EntityStore` is deliberately simpler than the graph's own lossless dump:
//! it drops soft-delete bookkeeping and re-derives it from the `deleted`
//! flag alone. `Sync` is a full overwrite, never an incremental patch.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use memory_types::{AttrMap, Edge, EntityKind, Node};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::KnowledgeGraph;

/// One row of the `entities` array in the flat mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Session-unique id, preserved across the mirror round trip even
    /// though the original format keys primarily on `name`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Entity kind, serialized as its display string (`"character"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    aliases: Vec<String>,
    /// Creation time.
    pub created_time: DateTime<Utc>,
    /// Last attribute-merge time.
    pub last_modified: DateTime<Utc>,
    /// Open attribute map.
    #[serde(default)]
    pub attributes: AttrMap,
    /// Soft-delete marker, carried so a reload does not resurrect a node a
    /// prior session deliberately retired.
    #[serde(default)]
    pub deleted: bool,
}

/// One row of the `relationships` array in the flat mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship label.
    #[serde(rename = "type")]
    pub relationship: String,
    /// Open attribute map.
    #[serde(default)]
    pub attributes: AttrMap,
}

/// The on-disk shape written by [`EntityStore::sync`] / read by
/// [`EntityStore::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStoreDocument {
    /// Flat entity rows.
    pub entities: Vec<EntityRecord>,
    /// Flat relationship rows.
    pub relationships: Vec<RelationshipRecord>,
    /// Wall-clock time this document was produced.
    pub last_modified: DateTime<Utc>,
}

/// Durable flat mirror of a [`KnowledgeGraph`].
#[derive(Debug, Default)]
pub struct EntityStore;

impl EntityStore {
    /// Project a graph into the flat mirror shape.
    pub fn project(graph: &KnowledgeGraph, now: DateTime<Utc>) -> EntityStoreDocument {
        let entities = graph
            .nodes()
            .map(|n| EntityRecord {
                id: n.id.clone(),
                name: n.name.clone(),
                kind: n.kind.to_string(),
                description: n.description.clone(),
                aliases: n.aliases.clone(),
                created_time: n.created_at,
                last_modified: n.last_modified,
                attributes: n.attributes.clone(),
                deleted: n.deleted,
            })
            .collect();
        let relationships = graph
            .edges()
            .map(|e| RelationshipRecord {
                source: e.source.clone(),
                target: e.target.clone(),
                relationship: e.relationship.clone(),
                attributes: e.attributes.clone(),
            })
            .collect();
        EntityStoreDocument { entities, relationships, last_modified: now }
    }

    /// Overwrite `path` with the projection of `graph`, atomically (write to
    /// a sibling temp file, then rename over the target).
    pub fn sync(graph: &KnowledgeGraph, path: &Path, now: DateTime<Utc>) -> Result<(), StoreError> {
        let doc = Self::project(graph, now);
        let body = serde_json::to_vec_pretty(&doc).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read `path` back into a fresh [`KnowledgeGraph`].
    ///
    /// A relationship naming an endpoint absent from `entities` is dropped
    /// silently — the mirror is a forgiving, best-effort reconstruction, not
    /// the authoritative round trip (that's `graph.json`, see
    /// [`KnowledgeGraph::serialize`](crate::graph::KnowledgeGraph::serialize)).
    pub fn load(path: &Path) -> Result<KnowledgeGraph, StoreError> {
        let body = fs::read(path)?;
        let doc: EntityStoreDocument = serde_json::from_slice(&body).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut graph = KnowledgeGraph::new();
        for record in doc.entities {
            let kind: EntityKind = record.kind.parse().unwrap_or_default();
            let mut node = Node::new(&record.id, kind, record.created_time);
            node.name = record.name;
            node.description = record.description;
            node.aliases = record.aliases;
            node.attributes = record.attributes;
            node.last_modified = record.last_modified;
            if record.deleted {
                node.mark_deleted("restored from mirror as deleted", record.last_modified);
            }
            graph.insert_loaded_node(node);
        }
        for rel in doc.relationships {
            if !graph.has_node(&rel.source) || !graph.has_node(&rel.target) {
                tracing::warn!(source = %rel.source, target = %rel.target, "dropping mirrored relationship with missing endpoint");
                continue;
            }
            graph.insert_loaded_edge(Edge { source: rel.source, target: rel.target, relationship: rel.relationship, attributes: rel.attributes });
        }
        Ok(graph)
    }
}
