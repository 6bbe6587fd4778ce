//! Pattern matcher: AST pattern + graph -> bindings.
//!
//! Caches node-by-label and edge-by-type lookups (label/type comparisons are
//! case-insensitive by default); DFS is used to walk fixed-length
//! relationship segments, BFS to walk variable-length ones, both bounded by
//! [`MatcherOptions`].

use std::cell::RefCell;

use indexmap::{IndexMap, IndexSet};

use crate::cypher::ast::{Expr, NodePattern, PathPattern, RelationshipPattern};
use crate::model::{Edge, Node, NodeId, Path, Value};
use crate::storage::GraphStore;

/// Tunable matcher behavior (§A.3 of the design notes).
#[derive(Debug, Clone)]
pub struct MatcherOptions {
    pub case_insensitive_labels: bool,
    pub null_aware_comparisons: bool,
    pub type_coercion: bool,
    pub max_path_depth: usize,
    pub max_path_results: usize,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            case_insensitive_labels: true,
            null_aware_comparisons: false,
            type_coercion: false,
            max_path_depth: 10,
            max_path_results: 100,
        }
    }
}

/// A single value a pattern variable can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Node(Node),
    Edge(Edge),
    Scalar(Value),
}

impl BoundValue {
    pub fn as_node(&self) -> Option<&Node> {
        match self { BoundValue::Node(n) => Some(n), _ => None }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self { BoundValue::Edge(e) => Some(e), _ => None }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BoundValue::Node(_) => "node",
            BoundValue::Edge(_) => "edge",
            BoundValue::Scalar(_) => "scalar",
        }
    }
}

/// A variable -> value mapping produced by matching. Cloning a binding to
/// extend it down a new segment or pattern is the whole extension model.
pub type Binding = IndexMap<String, BoundValue>;

fn bound_values_agree(a: &BoundValue, b: &BoundValue) -> bool {
    match (a, b) {
        (BoundValue::Node(n1), BoundValue::Node(n2)) => n1.id == n2.id,
        (BoundValue::Edge(e1), BoundValue::Edge(e2)) => e1.key() == e2.key(),
        (BoundValue::Scalar(v1), BoundValue::Scalar(v2)) => v1 == v2,
        _ => false,
    }
}

fn merge_bindings(a: &Binding, b: &Binding) -> Option<Binding> {
    let mut merged = a.clone();
    for (k, v) in b {
        match merged.get(k) {
            Some(existing) if !bound_values_agree(existing, v) => return None,
            Some(_) => {}
            None => { merged.insert(k.clone(), v.clone()); }
        }
    }
    Some(merged)
}

pub(crate) fn pattern_variables(pattern: &PathPattern) -> IndexSet<String> {
    let mut vars = IndexSet::new();
    if let Some(v) = &pattern.start.variable { vars.insert(v.clone()); }
    for (rel, node) in &pattern.segments {
        if let Some(v) = &rel.variable { vars.insert(v.clone()); }
        if let Some(v) = &node.variable { vars.insert(v.clone()); }
    }
    vars
}

/// Caching pattern matcher over a [`GraphStore`]. Read-only: matching never
/// mutates the graph.
pub struct Matcher<'g> {
    graph: &'g GraphStore,
    options: MatcherOptions,
    label_cache: RefCell<IndexMap<String, IndexSet<NodeId>>>,
    type_cache: RefCell<IndexMap<String, IndexSet<(NodeId, NodeId, String)>>>,
}

impl<'g> Matcher<'g> {
    pub fn new(graph: &'g GraphStore) -> Self {
        Self::with_options(graph, MatcherOptions::default())
    }

    pub fn with_options(graph: &'g GraphStore, options: MatcherOptions) -> Self {
        Self {
            graph,
            options,
            label_cache: RefCell::new(IndexMap::new()),
            type_cache: RefCell::new(IndexMap::new()),
        }
    }

    /// Drop cached label/type lookups. Call after the graph has been
    /// mutated (e.g. between statements) — the matcher never invalidates
    /// the cache on its own, since it never sees graph writes.
    pub fn clear_cache(&self) {
        self.label_cache.borrow_mut().clear();
        self.type_cache.borrow_mut().clear();
    }

    fn cache_key(&self, label: &str) -> String {
        if self.options.case_insensitive_labels { label.to_uppercase() } else { label.to_string() }
    }

    fn label_matches(&self, actual: &str, expected: &str) -> bool {
        if self.options.case_insensitive_labels { actual.eq_ignore_ascii_case(expected) } else { actual == expected }
    }

    fn value_matches(&self, actual: &Value, expected: &Value) -> bool {
        if self.options.type_coercion { actual.coerced_eq(expected) } else { actual.strict_eq(expected) }
    }

    /// Node ids whose label matches, cached by normalized label.
    pub fn nodes_by_label(&self, label: &str) -> IndexSet<NodeId> {
        let key = self.cache_key(label);
        if let Some(cached) = self.label_cache.borrow().get(&key) {
            return cached.clone();
        }
        let ids: IndexSet<NodeId> = self.graph.all_nodes().filter(|n| self.label_matches(&n.label, label)).map(|n| n.id.clone()).collect();
        self.label_cache.borrow_mut().insert(key, ids.clone());
        ids
    }

    /// Edge identities whose type matches, cached by normalized type.
    pub fn edges_by_type(&self, rel_type: &str) -> IndexSet<(NodeId, NodeId, String)> {
        let key = self.cache_key(rel_type);
        if let Some(cached) = self.type_cache.borrow().get(&key) {
            return cached.clone();
        }
        let keys: IndexSet<_> = self.graph.all_edges().filter(|e| self.label_matches(&e.label, rel_type)).map(|e| e.key()).collect();
        self.type_cache.borrow_mut().insert(key, keys.clone());
        keys
    }

    fn node_satisfies_properties(&self, node: &Node, pattern: &NodePattern) -> bool {
        pattern.properties.iter().all(|(key, expr)| {
            let Expr::Literal(expected) = expr else { return false };
            if key == "id" {
                return matches!(expected, Value::String(s) if *s == node.id.0);
            }
            match node.get(key) {
                Some(actual) => self.value_matches(actual, expected),
                None => false,
            }
        })
    }

    fn node_satisfies_pattern(&self, node: &Node, pattern: &NodePattern) -> bool {
        pattern.labels.iter().all(|l| self.label_matches(&node.label, l)) && self.node_satisfies_properties(node, pattern)
    }

    fn edge_satisfies_properties(&self, edge: &Edge, pattern: &RelationshipPattern) -> bool {
        pattern.properties.iter().all(|(key, expr)| {
            let Expr::Literal(expected) = expr else { return false };
            match edge.properties.get(key) {
                Some(actual) => self.value_matches(actual, expected),
                None => false,
            }
        })
    }

    /// Nodes satisfying every label and every property constraint of the
    /// pattern. An empty label list matches any label.
    pub fn find_matching_nodes(&self, pattern: &NodePattern) -> Vec<Node> {
        let candidate_ids: Vec<NodeId> = if pattern.labels.is_empty() {
            self.graph.all_nodes().map(|n| n.id.clone()).collect()
        } else {
            let mut ids: Option<IndexSet<NodeId>> = None;
            for label in &pattern.labels {
                let set = self.nodes_by_label(label);
                ids = Some(match ids {
                    None => set,
                    Some(existing) => existing.intersection(&set).cloned().collect(),
                });
            }
            ids.unwrap_or_default().into_iter().collect()
        };

        candidate_ids
            .into_iter()
            .filter_map(|id| self.graph.get_node(&id).cloned())
            .filter(|node| self.node_satisfies_properties(node, pattern))
            .collect()
    }

    /// Edges satisfying type and property constraints. When `source_id` is
    /// given, direction is honored relative to that node.
    pub fn find_matching_relationships(&self, pattern: &RelationshipPattern, source_id: Option<&NodeId>) -> Vec<Edge> {
        let candidates: Vec<Edge> = match (&pattern.rel_type, source_id) {
            (Some(rel_type), Some(src)) => self
                .graph
                .edges_for(src, pattern.direction)
                .into_iter()
                .filter(|e| self.label_matches(&e.label, rel_type))
                .collect(),
            (Some(rel_type), None) => self
                .edges_by_type(rel_type)
                .into_iter()
                .filter_map(|(s, t, l)| self.graph.get_edge(&s, &t, &l).cloned())
                .collect(),
            (None, Some(src)) => self.graph.edges_for(src, pattern.direction),
            (None, None) => self.graph.all_edges().cloned().collect(),
        };
        candidates.into_iter().filter(|e| self.edge_satisfies_properties(e, pattern)).collect()
    }

    /// Rewrite a pattern's already-bound variables into a synthetic `id`
    /// property constraint so re-matching them is pinned to the exact bound
    /// node, rather than re-discovering any node that happens to match the
    /// pattern's labels/properties.
    pub fn enrich_pattern_with_bindings(&self, pattern: &PathPattern, bindings: &Binding) -> PathPattern {
        let mut enriched = pattern.clone();
        Self::enrich_node(&mut enriched.start, bindings);
        for (_, node) in enriched.segments.iter_mut() {
            Self::enrich_node(node, bindings);
        }
        enriched
    }

    fn enrich_node(node: &mut NodePattern, bindings: &Binding) {
        let Some(var) = &node.variable else { return };
        if let Some(BoundValue::Node(bound)) = bindings.get(var) {
            node.properties.retain(|(k, _)| k != "id");
            node.properties.push(("id".to_string(), Expr::Literal(Value::String(bound.id.0.clone()))));
        }
    }

    /// Every path satisfying the pattern, bounded by `max_path_results`.
    pub fn find_matching_paths(&self, pattern: &PathPattern) -> Vec<Path> {
        self.find_matching_paths_with_bindings(pattern).into_iter().map(|(p, _)| p).collect()
    }

    fn find_matching_paths_with_bindings(&self, pattern: &PathPattern) -> Vec<(Path, Binding)> {
        let mut results = Vec::new();
        for start in self.find_matching_nodes(&pattern.start) {
            if results.len() >= self.options.max_path_results { break; }
            let mut binding = Binding::new();
            if let Some(var) = &pattern.start.variable {
                binding.insert(var.clone(), BoundValue::Node(start.clone()));
            }
            let path = Path::single(start);
            self.extend_path(&path, binding, &pattern.segments, 0, &mut results);
        }
        results.truncate(self.options.max_path_results);
        results
    }

    fn extend_path(&self, path: &Path, binding: Binding, segments: &[(RelationshipPattern, NodePattern)], idx: usize, out: &mut Vec<(Path, Binding)>) {
        if out.len() >= self.options.max_path_results { return; }
        if idx == segments.len() {
            out.push((path.clone(), binding));
            return;
        }
        let (rel_pattern, node_pattern) = &segments[idx];
        if rel_pattern.is_variable_length() {
            self.extend_variable_segment(path, binding, rel_pattern, node_pattern, segments, idx, out);
        } else {
            self.extend_fixed_segment(path, binding, rel_pattern, node_pattern, segments, idx, out);
        }
    }

    fn extend_fixed_segment(
        &self,
        path: &Path,
        binding: Binding,
        rel_pattern: &RelationshipPattern,
        node_pattern: &NodePattern,
        segments: &[(RelationshipPattern, NodePattern)],
        idx: usize,
        out: &mut Vec<(Path, Binding)>,
    ) {
        let tip = path.end();
        for edge in self.find_matching_relationships(rel_pattern, Some(&tip.id)) {
            if out.len() >= self.options.max_path_results { return; }
            let Some(next_id) = edge.other_node(&tip.id) else { continue };
            if next_id == tip.id || path.contains_node(&next_id) { continue; }
            let Some(next_node) = self.graph.get_node(&next_id) else { continue };
            if !self.node_satisfies_pattern(next_node, node_pattern) { continue; }

            let mut new_binding = binding.clone();
            if let Some(var) = &rel_pattern.variable {
                new_binding.insert(var.clone(), BoundValue::Edge(edge.clone()));
            }
            if let Some(var) = &node_pattern.variable {
                new_binding.insert(var.clone(), BoundValue::Node(next_node.clone()));
            }

            let mut new_path = path.clone();
            new_path.append(edge, next_node.clone());
            self.extend_path(&new_path, new_binding, segments, idx + 1, out);
        }
    }

    /// Treat the segment as BFS with a depth counter: expand only edges
    /// matching type/properties/direction, skip already-visited nodes. At
    /// every depth within `[min_hops, max_hops]`, a frontier node
    /// satisfying the segment's target node pattern yields a continuation;
    /// the frontier keeps growing until `max_hops` (capped at
    /// `max_path_depth` when the pattern left it unbounded).
    fn extend_variable_segment(
        &self,
        path: &Path,
        binding: Binding,
        rel_pattern: &RelationshipPattern,
        node_pattern: &NodePattern,
        segments: &[(RelationshipPattern, NodePattern)],
        idx: usize,
        out: &mut Vec<(Path, Binding)>,
    ) {
        let max_hops = rel_pattern.max_hops.unwrap_or(self.options.max_path_depth).min(self.options.max_path_depth);
        let min_hops = rel_pattern.min_hops.max(1);

        let mut frontier = vec![(path.clone(), binding)];
        for depth in 1..=max_hops {
            if out.len() >= self.options.max_path_results { return; }
            let mut next_frontier = Vec::new();
            for (p, b) in &frontier {
                let tip = p.end();
                for edge in self.find_matching_relationships(rel_pattern, Some(&tip.id)) {
                    if out.len() >= self.options.max_path_results { return; }
                    let Some(next_id) = edge.other_node(&tip.id) else { continue };
                    if next_id == tip.id || p.contains_node(&next_id) { continue; }
                    let Some(next_node) = self.graph.get_node(&next_id) else { continue };

                    let mut new_path = p.clone();
                    new_path.append(edge, next_node.clone());

                    if depth >= min_hops && self.node_satisfies_pattern(next_node, node_pattern) {
                        let mut matched_binding = b.clone();
                        if let Some(var) = &node_pattern.variable {
                            matched_binding.insert(var.clone(), BoundValue::Node(next_node.clone()));
                        }
                        self.extend_path(&new_path, matched_binding, segments, idx + 1, out);
                    }
                    if depth < max_hops {
                        next_frontier.push((new_path, b.clone()));
                    }
                }
            }
            frontier = next_frontier;
            if frontier.is_empty() { break; }
        }
    }

    /// Cross product of every comma-separated pattern, with WHERE conjuncts
    /// pushed down as soon as their free variables are all bound, and any
    /// residual conjuncts applied once the full binding is assembled.
    pub fn execute_match_query(&self, patterns: &[PathPattern], where_clause: Option<&Expr>) -> Vec<Binding> {
        let conjuncts = where_clause.map(crate::eval::flatten_and).unwrap_or_default();

        let mut combined: Vec<Binding> = vec![Binding::new()];
        let mut known_vars: IndexSet<String> = IndexSet::new();

        for pattern in patterns {
            known_vars.extend(pattern_variables(pattern));
            let mut next = Vec::new();
            for existing in &combined {
                let enriched = self.enrich_pattern_with_bindings(pattern, existing);
                for (_, matched) in self.find_matching_paths_with_bindings(&enriched) {
                    if let Some(merged) = merge_bindings(existing, &matched) {
                        next.push(merged);
                    }
                }
            }
            combined = next;

            combined.retain(|binding| {
                conjuncts
                    .iter()
                    .filter(|c| crate::eval::free_variables(c).iter().all(|v| known_vars.contains(v)))
                    .all(|c| crate::eval::eval_bool(c, binding, self.graph, &self.options))
            });
        }

        combined
            .into_iter()
            .filter(|binding| conjuncts.iter().all(|c| crate::eval::eval_bool(c, binding, self.graph, &self.options)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ast::{NodePattern, RelationshipPattern};
    use crate::model::{property_map, Direction};

    fn sample_graph() -> GraphStore {
        let mut g = GraphStore::new();
        g.add_node("alice", "Person", property_map([("name", "Alice"), ("age", 30i64)])).unwrap();
        g.add_node("bob", "Person", property_map([("name", "Bob"), ("age", 25i64)])).unwrap();
        g.add_node("acme", "Company", property_map([("name", "Acme")])).unwrap();
        g.add_edge("alice", "acme", "WORKS_AT", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_edge("bob", "alice", "KNOWS", property_map([] as [(&str, &str); 0])).unwrap();
        g
    }

    #[test]
    fn test_find_matching_nodes_by_label_and_property() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let pattern = NodePattern {
            variable: Some("p".into()),
            labels: vec!["Person".into()],
            properties: vec![("age".into(), Expr::Literal(Value::Int(30)))],
        };
        let found = matcher.find_matching_nodes(&pattern);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, NodeId::from("alice"));
    }

    #[test]
    fn test_find_matching_nodes_case_insensitive_label() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let pattern = NodePattern { variable: None, labels: vec!["person".into()], properties: vec![] };
        assert_eq!(matcher.find_matching_nodes(&pattern).len(), 2);
    }

    #[test]
    fn test_fixed_length_path_match() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let pattern = PathPattern {
            start: NodePattern { variable: Some("p".into()), labels: vec!["Person".into()], properties: vec![] },
            segments: vec![(
                RelationshipPattern::fixed(Some("r".into()), Some("WORKS_AT".into()), Direction::Outgoing, vec![]),
                NodePattern { variable: Some("c".into()), labels: vec!["Company".into()], properties: vec![] },
            )],
        };
        let paths = matcher.find_matching_paths(&pattern);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].end().id, NodeId::from("acme"));
    }

    #[test]
    fn test_variable_length_path_bounded() {
        let mut g = GraphStore::new();
        for id in ["a", "b", "c", "d"] {
            g.add_node(id, "Node", property_map([] as [(&str, &str); 0])).unwrap();
        }
        g.add_edge("a", "b", "R", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_edge("b", "c", "R", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_edge("c", "d", "R", property_map([] as [(&str, &str); 0])).unwrap();

        let matcher = Matcher::new(&g);
        let pattern = PathPattern {
            start: NodePattern { variable: Some("s".into()), properties: vec![("id".into(), Expr::Literal(Value::String("a".into())))], ..Default::default() },
            segments: vec![(
                RelationshipPattern { variable: None, rel_type: Some("R".into()), direction: Direction::Outgoing, properties: vec![], min_hops: 1, max_hops: Some(2) },
                NodePattern::default(),
            )],
        };
        let paths = matcher.find_matching_paths(&pattern);
        // reaches b (1 hop) and c (2 hops), not d.
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().any(|p| p.end().id == NodeId::from("b")));
        assert!(paths.iter().any(|p| p.end().id == NodeId::from("c")));
    }

    #[test]
    fn test_enrich_pattern_pins_bound_node() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let mut binding = Binding::new();
        binding.insert("p".into(), BoundValue::Node(g.get_node(&"alice".into()).unwrap().clone()));

        let pattern = PathPattern::single_node(NodePattern { variable: Some("p".into()), labels: vec!["Person".into()], properties: vec![] });
        let enriched = matcher.enrich_pattern_with_bindings(&pattern, &binding);
        let found = matcher.find_matching_nodes(&enriched.start);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, NodeId::from("alice"));
    }

    #[test]
    fn test_cross_product_from_two_patterns() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let pattern_a = PathPattern::single_node(NodePattern { variable: Some("p".into()), labels: vec!["Person".into()], properties: vec![] });
        let pattern_b = PathPattern::single_node(NodePattern { variable: Some("c".into()), labels: vec!["Company".into()], properties: vec![] });
        let bindings = matcher.execute_match_query(&[pattern_a, pattern_b], None);
        assert_eq!(bindings.len(), 2); // 2 people x 1 company
    }

    #[test]
    fn test_where_pushdown_matches_post_filter() {
        let g = sample_graph();
        let matcher = Matcher::new(&g);
        let pattern = PathPattern::single_node(NodePattern { variable: Some("p".into()), labels: vec!["Person".into()], properties: vec![] });
        let where_expr = Expr::Comparison {
            op: crate::cypher::ast::CompareOp::Gt,
            left: Box::new(Expr::Property { object: "p".into(), property: "age".into() }),
            right: Some(Box::new(Expr::Literal(Value::Int(28)))),
        };
        let bindings = matcher.execute_match_query(&[pattern], Some(&where_expr));
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].get("p").unwrap().as_node().unwrap().id, NodeId::from("alice"));
    }

    #[test]
    fn test_not_exists_pushdown_waits_for_all_pattern_vars_across_comma_patterns() {
        let mut g = GraphStore::new();
        g.add_node("alice", "Person", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_node("t1", "Task", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_node("t2", "Task", property_map([] as [(&str, &str); 0])).unwrap();
        g.add_edge("alice", "t1", "ASSIGNED_TO", property_map([] as [(&str, &str); 0])).unwrap();

        let matcher = Matcher::new(&g);
        let p_pattern = PathPattern::single_node(NodePattern { variable: Some("p".into()), labels: vec!["Person".into()], properties: vec![] });
        let t_pattern = PathPattern::single_node(NodePattern { variable: Some("t".into()), labels: vec!["Task".into()], properties: vec![] });

        let exists_pattern = PathPattern {
            start: NodePattern { variable: Some("p".into()), ..Default::default() },
            segments: vec![(
                RelationshipPattern::fixed(None, Some("ASSIGNED_TO".into()), Direction::Outgoing, vec![]),
                NodePattern { variable: Some("t".into()), ..Default::default() },
            )],
        };
        let where_expr = Expr::Exists { positive: false, pattern: exists_pattern };

        let bindings = matcher.execute_match_query(&[p_pattern, t_pattern], Some(&where_expr));

        assert_eq!(bindings.len(), 1, "expected only (alice, t2): {bindings:?}");
        assert_eq!(bindings[0].get("p").unwrap().as_node().unwrap().id, NodeId::from("alice"));
        assert_eq!(bindings[0].get("t").unwrap().as_node().unwrap().id, NodeId::from("t2"));
    }
}
