//! Closed pattern-taxonomy extractor: no network calls, always available.

use memory_graph::KnowledgeGraph;
use memory_types::{AttrMap, AttrValue, DeleteMode, EdgeAdd, EdgeDeleteMatch, EntityKind, NodeDelete, NodeUpsert, UpdatePlan};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::extractor::Extractor;

struct EntityPattern {
    regex: Regex,
    kind: EntityKind,
}

struct RelationPattern {
    regex: Regex,
    label: &'static str,
}

struct DeltaPattern {
    regex: Regex,
    attribute: &'static str,
}

struct DeletionPattern {
    regex: Regex,
    kind: DeletionKind,
}

#[derive(Clone, Copy)]
enum DeletionKind {
    CharacterDeath,
    ItemLost,
    ItemStolen,
    RelationshipBroken,
    LeftOrganization,
    LeftLocation,
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().expect("static pattern is valid regex")
}

static ENTITY_PATTERNS: LazyLock<Vec<EntityPattern>> = LazyLock::new(|| {
    vec![
        EntityPattern { regex: ci(r"\b(\w+)\s+(?:the|a|an)\s+(?:warrior|mage|rogue|cleric|knight|archer|assassin|druid)\b"), kind: EntityKind::Character },
        EntityPattern { regex: ci(r"\b(?:npc|player|enemy)\s+(\w+)\b"), kind: EntityKind::Character },
        EntityPattern {
            regex: ci(r"(?:equips?|wields?|draws?)\s+(?:a\s+)?([+\-]?\d+\s+)?([\w' ]+?)\s+(sword|axe|hammer|bow|crossbow|staff|wand|dagger|spear)\b"),
            kind: EntityKind::Item,
        },
        EntityPattern {
            regex: ci(r"(?:wears?|dons?)\s+(?:a\s+)?([+\-]?\d+\s+)?([\w' ]+?)\s+(armor|helmet|shield|boots|gloves|ring|amulet)\b"),
            kind: EntityKind::Item,
        },
        EntityPattern {
            regex: ci(r"(?:drinks?|consumes?|eats?)\s+(?:a\s+)?([\w' ]+?)\s+(potion|elixir|scroll|food|poison)\b"),
            kind: EntityKind::Item,
        },
        EntityPattern {
            regex: ci(r"(?:travels? to|arrives? at|enters?|leaves?)\s+(?:the\s+)?([\w' ]+?)\s+(town|village|dungeon|maze|forest|mountains?|desert|cave|temple|ruins|fortress|castle|tavern|shop|smithy|tower)\b"),
            kind: EntityKind::Location,
        },
        EntityPattern {
            regex: ci(r"(?:joins?|leaves?|founds?)\s+(?:the\s+)?([\w' ]+?)\s+(guild|union|order|team|legion|alliance|faction|church|company)\b"),
            kind: EntityKind::Organization,
        },
        EntityPattern { regex: ci(r"\blearns?\s+(?:the\s+)?([\w' ]+?)\s+(?:skill|spell|ability)\b"), kind: EntityKind::Skill },
    ]
});

static RELATION_PATTERNS: LazyLock<Vec<RelationPattern>> = LazyLock::new(|| {
    vec![
        RelationPattern { regex: ci(r"\b(\w+)\s+joins\s+(?:the\s+)?(\w+)\s+(?:guild|union|order|team|legion|alliance|faction)\b"), label: "member_of" },
        RelationPattern { regex: ci(r"\b(\w+)\s+leads\s+(?:the\s+)?(\w+)\s+(?:guild|union|order|team|legion|alliance|faction)\b"), label: "leader_of" },
        RelationPattern { regex: ci(r"\b(\w+)\s+(?:is hostile to|hates|is at war with)\s+(\w+)\b"), label: "hostile_to" },
        RelationPattern { regex: ci(r"\b(\w+)\s+(?:is allied with|befriends|allies with)\s+(\w+)\b"), label: "allied_with" },
        RelationPattern { regex: ci(r"\b(\w+)\s+equips\s+(?:the\s+)?(\w+)\b"), label: "equipped_with" },
        RelationPattern { regex: ci(r"\b(\w+)\s+(?:travels? to|arrives? at|is (?:now )?in)\s+(?:the\s+)?(\w+)\b"), label: "located_in" },
        RelationPattern { regex: ci(r"\b(\w+)\s+guards\s+(?:the\s+)?(\w+)\b"), label: "guards" },
    ]
});

static DELTA_PATTERNS: LazyLock<Vec<DeltaPattern>> = LazyLock::new(|| {
    vec![
        DeltaPattern { regex: ci(r"(?:attack|atk)\s*(?:is|:)?\s*\+?(\d+)"), attribute: "attack" },
        DeltaPattern { regex: ci(r"(?:defense|def|armor)\s*(?:is|:)?\s*\+?(\d+)"), attribute: "defense" },
        DeltaPattern { regex: ci(r"(?:health|hp)\s*(?:is|:)?\s*(\d+)(?:/\d+)?"), attribute: "health" },
        DeltaPattern { regex: ci(r"(?:mana|mp)\s*(?:is|:)?\s*(\d+)(?:/\d+)?"), attribute: "mana" },
        DeltaPattern { regex: ci(r"(?:level|lv\.?)\s*(?:is|:)?\s*(\d+)"), attribute: "level" },
        DeltaPattern { regex: ci(r"(?:exp|experience)\s*(?:is|:)?\s*\+?(\d+)"), attribute: "experience" },
    ]
});

static DELETION_PATTERNS: LazyLock<Vec<DeletionPattern>> = LazyLock::new(|| {
    vec![
        DeletionPattern { regex: ci(r"\b(\w+)\s+(?:died|dies|was slain|fell in battle)\b"), kind: DeletionKind::CharacterDeath },
        DeletionPattern { regex: ci(r"\b(\w+)(?:'s)?\s+(?:health|hp)\s+(?:drops? to|reaches)\s+0\b"), kind: DeletionKind::CharacterDeath },
        DeletionPattern { regex: ci(r"\b(?:lost|destroyed|broke)\s+(?:the\s+)?(\w+)\b"), kind: DeletionKind::ItemLost },
        DeletionPattern { regex: ci(r"\b(\w+)\s+(?:was stolen|was taken|got confiscated)\b"), kind: DeletionKind::ItemStolen },
        DeletionPattern { regex: ci(r"\b(\w+)\s+and\s+(\w+)\s+(?:broke off their relationship|became enemies|had a falling out)\b"), kind: DeletionKind::RelationshipBroken },
        DeletionPattern { regex: ci(r"\b(\w+)\s+left\s+(?:the\s+)?(\w+)\s+(?:guild|union|order|team|legion|alliance|faction)\b"), kind: DeletionKind::LeftOrganization },
        DeletionPattern { regex: ci(r"\b(\w+)\s+left\s+(?:the\s+)?(\w+)\b"), kind: DeletionKind::LeftLocation },
    ]
});

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Deterministic id for a matched entity name: `{type}_{slug}` when the
/// type is known, bare `{slug}` otherwise, so the same phrase always maps
/// to the same node across turns.
fn entity_id(name: &str, kind: Option<EntityKind>) -> String {
    let slug = slugify(name);
    match kind {
        Some(EntityKind::Unknown) | None => slug,
        Some(k) => format!("{k}_{slug}"),
    }
}

fn capture_name<'a>(caps: &regex::Captures<'a>) -> Option<&'a str> {
    for i in (1..caps.len()).rev() {
        if let Some(m) = caps.get(i) {
            let text = m.as_str().trim();
            if !text.is_empty() && text.chars().next().is_some_and(|c| !c.is_ascii_digit()) {
                return Some(text);
            }
        }
    }
    None
}

/// A closed taxonomy of regex patterns over entity shapes, numeric deltas,
/// relations, and deletion events. Stateless and infallible.
#[derive(Debug, Default)]
pub struct RuleExtractor;

impl RuleExtractor {
    /// Construct a rule extractor.
    pub fn new() -> Self {
        Self
    }

    fn extract_entities(&self, text: &str, plan: &mut UpdatePlan) {
        for pattern in ENTITY_PATTERNS.iter() {
            for caps in pattern.regex.captures_iter(text) {
                let Some(name) = capture_name(&caps) else { continue };
                if name.len() < 2 {
                    continue;
                }
                let id = entity_id(name, Some(pattern.kind));
                plan.nodes_to_upsert.push(NodeUpsert { id, kind: pattern.kind, name: Some(name.to_string()), attributes: AttrMap::new() });
            }
        }
    }

    fn extract_deltas(&self, text: &str, plan: &mut UpdatePlan) {
        for pattern in DELTA_PATTERNS.iter() {
            if let Some(caps) = pattern.regex.captures(text) {
                if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                    let mut attrs = AttrMap::new();
                    attrs.insert(pattern.attribute.to_string(), AttrValue::Number(value));
                    plan.nodes_to_upsert.push(NodeUpsert { id: "player".to_string(), kind: EntityKind::Character, name: None, attributes: attrs });
                }
            }
        }
    }

    fn extract_relations(&self, text: &str, plan: &mut UpdatePlan) {
        for pattern in RELATION_PATTERNS.iter() {
            for caps in pattern.regex.captures_iter(text) {
                let (Some(src), Some(dst)) = (caps.get(1), caps.get(2)) else { continue };
                let source = entity_id(src.as_str(), None);
                let target = entity_id(dst.as_str(), None);
                if source == target {
                    continue;
                }
                plan.edges_to_add.push(EdgeAdd { source, target, label: pattern.label.to_string(), attributes: AttrMap::new() });
            }
        }
    }

    fn extract_deletions(&self, text: &str, plan: &mut UpdatePlan) {
        for pattern in DELETION_PATTERNS.iter() {
            for caps in pattern.regex.captures_iter(text) {
                match pattern.kind {
                    DeletionKind::CharacterDeath => {
                        let Some(name) = caps.get(1) else { continue };
                        let id = entity_id(name.as_str(), Some(EntityKind::Character));
                        plan.nodes_to_delete.push(NodeDelete { id, mode: DeleteMode::Soft, reason: format!("{} died", name.as_str()) });
                    }
                    DeletionKind::ItemLost => {
                        let Some(name) = caps.get(1) else { continue };
                        let id = entity_id(name.as_str(), Some(EntityKind::Item));
                        plan.nodes_to_delete.push(NodeDelete { id, mode: DeleteMode::Hard, reason: format!("{} was lost", name.as_str()) });
                    }
                    DeletionKind::ItemStolen => {
                        let Some(name) = caps.get(1) else { continue };
                        let id = entity_id(name.as_str(), Some(EntityKind::Item));
                        plan.edges_to_delete.push(EdgeDeleteMatch {
                            source: None,
                            target: Some(id),
                            label: Some("equipped_with".to_string()),
                            reason: format!("{} was stolen", name.as_str()),
                        });
                    }
                    DeletionKind::RelationshipBroken => {
                        let (Some(a), Some(b)) = (caps.get(1), caps.get(2)) else { continue };
                        let a_id = entity_id(a.as_str(), Some(EntityKind::Character));
                        let b_id = entity_id(b.as_str(), Some(EntityKind::Character));
                        let reason = format!("{} and {} broke their relationship", a.as_str(), b.as_str());
                        plan.edges_to_delete.push(EdgeDeleteMatch { source: Some(a_id.clone()), target: Some(b_id.clone()), label: None, reason: reason.clone() });
                        plan.edges_to_delete.push(EdgeDeleteMatch { source: Some(b_id), target: Some(a_id), label: None, reason });
                    }
                    DeletionKind::LeftOrganization => {
                        let (Some(who), Some(org)) = (caps.get(1), caps.get(2)) else { continue };
                        let who_id = entity_id(who.as_str(), Some(EntityKind::Character));
                        let org_id = entity_id(org.as_str(), Some(EntityKind::Organization));
                        plan.edges_to_delete.push(EdgeDeleteMatch {
                            source: Some(who_id),
                            target: Some(org_id),
                            label: Some("member_of".to_string()),
                            reason: format!("{} left {}", who.as_str(), org.as_str()),
                        });
                    }
                    DeletionKind::LeftLocation => {
                        let (Some(who), Some(place)) = (caps.get(1), caps.get(2)) else { continue };
                        let who_id = entity_id(who.as_str(), Some(EntityKind::Character));
                        let place_id = entity_id(place.as_str(), Some(EntityKind::Location));
                        plan.edges_to_delete.push(EdgeDeleteMatch {
                            source: Some(who_id),
                            target: Some(place_id),
                            label: Some("located_in".to_string()),
                            reason: format!("{} left {}", who.as_str(), place.as_str()),
                        });
                    }
                }
            }
        }
    }
}

impl Extractor for RuleExtractor {
    async fn analyze(&self, user_text: &str, assistant_text: &str, _graph_view: &KnowledgeGraph, _recent_context: &str) -> UpdatePlan {
        let combined = format!("{user_text} {assistant_text}");
        let mut plan = UpdatePlan::empty();
        self.extract_entities(&combined, &mut plan);
        self.extract_deltas(&combined, &mut plan);
        self.extract_relations(&combined, &mut plan);
        self.extract_deletions(&combined, &mut plan);
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::new()
    }

    #[tokio::test]
    async fn detects_weapon_with_stats() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("I equip a +2 flaming sword.", "", &graph(), "").await;
        assert!(plan.nodes_to_upsert.iter().any(|n| n.kind == EntityKind::Item));
    }

    #[tokio::test]
    async fn detects_health_delta_on_player() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("My health is 45/100 now.", "", &graph(), "").await;
        let node = plan.nodes_to_upsert.iter().find(|n| n.id == "player").unwrap();
        assert_eq!(node.attributes.get("health"), Some(&AttrValue::Number(45.0)));
    }

    #[tokio::test]
    async fn detects_death_as_soft_delete() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("", "Grog died in the collapse.", &graph(), "").await;
        let del = &plan.nodes_to_delete[0];
        assert_eq!(del.mode, DeleteMode::Soft);
        assert!(del.reason.contains("died"));
    }

    #[tokio::test]
    async fn detects_item_lost_as_hard_delete() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("", "I lost the lantern in the flood.", &graph(), "").await;
        assert!(plan.nodes_to_delete.iter().any(|d| d.mode == DeleteMode::Hard));
    }

    #[tokio::test]
    async fn detects_membership_edge() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("Finn joins the ironclad guild.", "", &graph(), "").await;
        assert!(plan.edges_to_add.iter().any(|e| e.label == "member_of"));
    }

    #[tokio::test]
    async fn same_phrase_yields_stable_id() {
        let extractor = RuleExtractor::new();
        let plan1 = extractor.analyze("Finn joins the ironclad guild.", "", &graph(), "").await;
        let plan2 = extractor.analyze("Finn joins the ironclad guild.", "", &graph(), "").await;
        assert_eq!(plan1.edges_to_add[0].source, plan2.edges_to_add[0].source);
    }

    #[tokio::test]
    async fn empty_text_yields_empty_plan() {
        let extractor = RuleExtractor::new();
        let plan = extractor.analyze("", "", &graph(), "").await;
        assert!(plan.is_empty());
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slugify("Elara's Shop!"), "elara_s_shop");
    }
}
