//! Node and entity-kind types shared across the memory pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The closed set of entity kinds the rest of the pipeline discriminates on.
///
/// Used to pick attribute defaults during extraction and to label nodes in
/// the text serialization consumed by [`ContextBuilder`](memory_core::context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A character: player, NPC, or creature.
    Character,
    /// A place the story can reference.
    Location,
    /// A carryable or usable object.
    Item,
    /// A discrete occurrence worth remembering (a battle, a wedding).
    Event,
    /// An abstract idea, lore entry, or rule of the world.
    Concept,
    /// A learned ability or spell.
    Skill,
    /// A faction, guild, or other group.
    Organization,
    /// Fallback when the extractor could not classify the entity.
    Unknown,
}

impl Default for EntityKind {
    fn default() -> Self {
        EntityKind::Unknown
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Character => "character",
            EntityKind::Location => "location",
            EntityKind::Item => "item",
            EntityKind::Event => "event",
            EntityKind::Concept => "concept",
            EntityKind::Skill => "skill",
            EntityKind::Organization => "organization",
            EntityKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EntityKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "character" | "char" | "npc" | "player" => EntityKind::Character,
            "location" | "place" => EntityKind::Location,
            "item" | "object" | "weapon" | "armor" | "consumable" => EntityKind::Item,
            "event" => EntityKind::Event,
            "concept" | "lore" => EntityKind::Concept,
            "skill" | "spell" | "ability" => EntityKind::Skill,
            "organization" | "org" | "faction" | "guild" => EntityKind::Organization,
            _ => EntityKind::Unknown,
        })
    }
}

/// A scalar attribute value attached to a node or edge.
///
/// `List` values participate in set-union merges during conflict resolution;
/// every other variant is replaced wholesale according to the rule for its
/// attribute class (see [`crate::merge::resolve_attribute`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// A numeric stat (health, level, a +N enhancement, ...).
    Number(f64),
    /// A free-form string (status, location name, description snippet).
    Text(String),
    /// A flag.
    Bool(bool),
    /// An ordered, deduplicated list of strings (tags, inventory, aliases).
    List(Vec<String>),
}

impl AttrValue {
    /// Best-effort numeric view, used by the clamp/max resolution rules.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Best-effort string view, used by list/status merge rules.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// An ordered attribute map. Iteration follows insertion order, which is
/// what the text serialization relies on to match the order attributes were
/// set by the extractor rather than a sorted re-ordering.
pub type AttrMap = IndexMap<String, AttrValue>;

/// A session-unique entity in the knowledge graph.
///
/// Soft-deleted nodes (`deleted = true`) are retained — by design they stay
/// out of extraction targets and default context retrieval, but compaction
/// (not modeled here) is the only thing that removes them for good.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Session-unique opaque identifier.
    pub id: String,
    /// Discriminates default attributes and text-serialization labels.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Human-facing label. Defaults to `id` when not given.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Alternate names this node should also match against in entity scans.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Open map of domain attributes (stats, status, inventory, ...).
    #[serde(default)]
    pub attributes: AttrMap,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last attribute merge.
    pub last_modified: DateTime<Utc>,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted: bool,
    /// Reason given at soft-delete time.
    #[serde(default)]
    pub deleted_reason: Option<String>,
    /// Soft-delete timestamp.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Construct a brand-new node, stamping both timestamps to `now`.
    pub fn new(id: impl Into<String>, kind: EntityKind, now: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            description: String::new(),
            aliases: Vec::new(),
            attributes: AttrMap::new(),
            created_at: now,
            last_modified: now,
            deleted: false,
            deleted_reason: None,
            deleted_at: None,
        }
    }

    /// True when this node should be excluded from extraction targets and
    /// default context retrieval.
    pub fn is_excluded(&self) -> bool {
        self.deleted
    }

    /// Mark this node soft-deleted.
    pub fn mark_deleted(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_reason = Some(reason.into());
        self.deleted_at = Some(now);
        self.last_modified = now;
    }

    /// Every name this node should be matched against during entity scans:
    /// its id, its display name, and its aliases.
    pub fn match_candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str())
            .chain(std::iter::once(self.name.as_str()))
            .chain(self.aliases.iter().map(String::as_str))
    }
}
