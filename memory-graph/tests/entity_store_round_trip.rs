use chrono::{DateTime, Utc};
use memory_graph::{EntityStore, KnowledgeGraph};
use memory_types::{AttrMap, AttrValue, EntityKind};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
}

#[test]
fn sync_then_load_reconstructs_nodes_and_edges() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");

    let mut graph = KnowledgeGraph::new();
    let mut attrs = AttrMap::new();
    attrs.insert("health".into(), AttrValue::Number(80.0));
    graph.upsert_node("hero", EntityKind::Character, attrs, now());
    graph.upsert_node("tavern", EntityKind::Location, AttrMap::new(), now());
    graph.add_edge("hero", "tavern", "located_in", AttrMap::new());

    EntityStore::sync(&graph, &path, now()).unwrap();
    assert!(path.exists());

    let restored = EntityStore::load(&path).unwrap();
    assert_eq!(restored.node_count(), 2);
    assert_eq!(restored.edge_count(), 1);
    assert_eq!(restored.get_node("hero").unwrap().attributes.get("health"), Some(&AttrValue::Number(80.0)));
}

#[test]
fn load_drops_relationship_with_missing_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");

    let doc = r#"{
        "entities": [
            {"id": "hero", "name": "Hero", "type": "character", "created_time": "2026-01-01T00:00:00Z", "last_modified": "2026-01-01T00:00:00Z"}
        ],
        "relationships": [
            {"source": "hero", "target": "ghost", "type": "knows"}
        ],
        "last_modified": "2026-01-01T00:00:00Z"
    }"#;
    std::fs::write(&path, doc).unwrap();

    let restored = EntityStore::load(&path).unwrap();
    assert_eq!(restored.node_count(), 1);
    assert_eq!(restored.edge_count(), 0);
}

#[test]
fn soft_deleted_node_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");

    let mut graph = KnowledgeGraph::new();
    graph.upsert_node("villain", EntityKind::Character, AttrMap::new(), now());
    graph.mark_deleted("villain", "defeated", now());

    EntityStore::sync(&graph, &path, now()).unwrap();
    let restored = EntityStore::load(&path).unwrap();
    assert!(restored.get_node("villain").unwrap().deleted);
}
