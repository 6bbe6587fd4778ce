//! `G == from_serializable(to_serializable(G))`, the round-trip invariant.

use graphling::{property_map, GraphStore, NodeId};
use pretty_assertions::assert_eq;

#[test]
fn test_round_trip_preserves_structure_and_order() {
    let mut g = GraphStore::new();
    g.add_node("alice", "Person", property_map([("name", "Alice"), ("age", 30i64)])).unwrap();
    g.add_node("bob", "Person", property_map([("name", "Bob"), ("age", 25i64)])).unwrap();
    g.add_node("acme", "Company", property_map([("name", "Acme")])).unwrap();
    g.add_edge("alice", "bob", "KNOWS", property_map([("since", 2019i64)])).unwrap();
    g.add_edge("alice", "acme", "WORKS_AT", property_map([] as [(&str, &str); 0])).unwrap();

    let serialized = serde_json::to_value(g.to_serializable()).unwrap();
    let restored = GraphStore::from_serializable(g.to_serializable()).unwrap();
    let round_tripped = serde_json::to_value(restored.to_serializable()).unwrap();

    assert_eq!(serialized, round_tripped);
}

#[test]
fn test_round_trip_preserves_node_and_edge_data() {
    let mut g = GraphStore::new();
    g.add_node("a", "Person", property_map([("name", "Ada")])).unwrap();
    g.add_node("b", "Person", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("a", "b", "KNOWS", property_map([("weight", 0.5f64)])).unwrap();

    let restored = GraphStore::from_serializable(g.to_serializable()).unwrap();

    assert_eq!(restored.node_count(), g.node_count());
    assert_eq!(restored.edge_count(), g.edge_count());
    assert_eq!(restored.get_node(&NodeId::from("a")).unwrap(), g.get_node(&NodeId::from("a")).unwrap());
    let edge = restored.get_edge(&NodeId::from("a"), &NodeId::from("b"), "KNOWS").unwrap();
    assert_eq!(edge.properties.get("weight"), Some(&graphling::Value::Float(0.5)));
}

#[test]
fn test_load_serializable_into_nonempty_store_matches_fresh_load() {
    let mut stale = GraphStore::new();
    stale.add_node("leftover", "Junk", property_map([] as [(&str, &str); 0])).unwrap();

    let mut fresh = GraphStore::new();
    fresh.add_node("a", "Person", property_map([("name", "Ada")])).unwrap();
    fresh.add_node("b", "Person", property_map([] as [(&str, &str); 0])).unwrap();
    fresh.add_edge("a", "b", "KNOWS", property_map([] as [(&str, &str); 0])).unwrap();
    let serialized = fresh.to_serializable();

    stale.load_serializable(serialized.clone()).unwrap();
    let from_fresh = GraphStore::from_serializable(serialized).unwrap();

    assert_eq!(serde_json::to_value(stale.to_serializable()).unwrap(), serde_json::to_value(from_fresh.to_serializable()).unwrap());
}
