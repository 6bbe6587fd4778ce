//! Statement-level coverage for the scenario tests named in the design docs —
//! the ones not already exercised by `engine`'s inline `#[cfg(test)]` suite.

use graphling::{execute, property_map, Direction, GraphStore, NodeId};

#[test]
fn test_variable_length_path_two_to_three_hops() {
    let mut g = GraphStore::new();
    for id in ["a", "b", "c", "d"] {
        g.add_node(id, "Node", property_map([] as [(&str, &str); 0])).unwrap();
    }
    g.add_edge("a", "b", "R", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("b", "c", "R", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("c", "d", "R", property_map([] as [(&str, &str); 0])).unwrap();

    let result = execute(&mut g, "MATCH (x)-[:R*2..3]->(y) RETURN x, y");
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.match_count, 3, "expected (a,c) (a,d) (b,d)");

    let query = result.query.unwrap();
    let pairs: Vec<(NodeId, NodeId)> = query
        .rows
        .iter()
        .map(|row| {
            let x = match &row[0] {
                graphling::engine::Cell::Node(n) => n.id.clone(),
                other => panic!("expected node cell, got {other:?}"),
            };
            let y = match &row[1] {
                graphling::engine::Cell::Node(n) => n.id.clone(),
                other => panic!("expected node cell, got {other:?}"),
            };
            (x, y)
        })
        .collect();

    for expected in [("a", "c"), ("a", "d"), ("b", "d")] {
        assert!(
            pairs.contains(&(NodeId::from(expected.0), NodeId::from(expected.1))),
            "missing pair {expected:?} in {pairs:?}"
        );
    }
}

#[test]
fn test_delete_without_detach_fails_statement_level_and_leaves_graph_intact() {
    let mut g = GraphStore::new();
    g.add_node("n", "Person", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_node("m", "Task", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("n", "m", "R", property_map([] as [(&str, &str); 0])).unwrap();

    let result = execute(&mut g, "MATCH (n:Person) DELETE n");
    assert!(!result.success);
    assert!(g.has_node(&NodeId::from("n")));
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn test_detach_delete_statement_level_removes_node_and_edge() {
    let mut g = GraphStore::new();
    g.add_node("n", "Person", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_node("m", "Task", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("n", "m", "R", property_map([] as [(&str, &str); 0])).unwrap();

    let result = execute(&mut g, "MATCH (n:Person) DETACH DELETE n");
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.match_count, 1);
    assert!(!g.has_node(&NodeId::from("n")));
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn test_parsing_blank_statement_has_no_clauses_or_diagnostics() {
    let (stmt, diagnostics) = graphling::cypher::parse("   \n\t  ");
    assert!(diagnostics.is_empty());
    assert!(stmt.match_clause.is_none());
    assert!(stmt.where_clause.is_none());
    assert!(stmt.writes.is_empty());
    assert!(stmt.return_clause.is_none());
}

#[test]
fn test_return_only_literals_one_row_no_writes() {
    let mut g = GraphStore::new();
    let result = execute(&mut g, "RETURN 1, 'a', true");
    assert!(result.success);
    assert_eq!(result.match_count, 1);
    assert!(!result.stats.writes);
    let query = result.query.unwrap();
    assert_eq!(query.rows.len(), 1);
    assert_eq!(query.rows[0].len(), 3);
}

#[test]
fn test_not_exists_created_edge_carries_property() {
    let mut g = GraphStore::new();
    g.add_node("parent", "Item", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_node("list", "List", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_node("child", "Item", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("parent", "list", "renders", property_map([] as [(&str, &str); 0])).unwrap();
    g.add_edge("list", "child", "renders", property_map([] as [(&str, &str); 0])).unwrap();

    let query = "MATCH (parent:Item)-[:renders]->(:List)-[:renders]->(child:Item) \
                 WHERE NOT EXISTS ((parent)-[:dependsOn]->(child)) \
                 CREATE (parent)-[:dependsOn {auto: true}]->(child)";
    let result = execute(&mut g, query);
    assert!(result.success, "{:?}", result.error);

    let edge = g.get_edge(&NodeId::from("parent"), &NodeId::from("child"), "dependsOn").unwrap();
    assert_eq!(edge.properties.get("auto"), Some(&graphling::Value::Bool(true)));
    assert_eq!(g.edges_for(&NodeId::from("parent"), Direction::Outgoing).len(), 2);
}
