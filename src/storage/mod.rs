//! The in-memory graph store: a dual-indexed labeled property graph.
//!
//! Nodes and edges live in order-preserving maps; a forward adjacency index
//! (source -> target -> label -> edge) and a reverse adjacency index
//! (target -> source -> label -> edge) are kept mutually consistent on every
//! mutation. The store is the only place edge uniqueness (at most one edge
//! per label between an ordered pair of nodes) is enforced.
//!
//! Exclusively owned for the duration of one statement (see crate docs on
//! the concurrency model) — there is no internal locking.

use indexmap::IndexMap;

use crate::model::{Direction, Edge, Node, NodeId, Path, PropertyMap};
use crate::{Error, Result};

mod serialize;
mod traverse;

pub use serialize::SerializableGraph;
pub use traverse::{TraversalOptions, Visitor};

type EdgesByLabel = IndexMap<String, Edge>;

/// The graph store.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    /// source -> target -> label -> edge.
    forward: IndexMap<NodeId, IndexMap<NodeId, EdgesByLabel>>,
    /// target -> source -> label -> edge.
    reverse: IndexMap<NodeId, IndexMap<NodeId, EdgesByLabel>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Node operations
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, id: impl Into<NodeId>, label: impl Into<String>, data: PropertyMap) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateNode { id: id.0 });
        }
        let mut node = Node::new(id.clone(), label);
        node.properties = data;
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn update_node_data(&mut self, id: &NodeId, data: PropertyMap) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| Error::NodeNotFound { id: id.0.clone() })?;
        node.properties = data;
        Ok(())
    }

    pub fn update_node_label(&mut self, id: &NodeId, label: impl Into<String>) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| Error::NodeNotFound { id: id.0.clone() })?;
        node.label = label.into();
        Ok(())
    }

    /// Removes the node and every incident edge atomically.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node> {
        let node = self.nodes.shift_remove(id).ok_or_else(|| Error::NodeNotFound { id: id.0.clone() })?;

        let outgoing_targets: Vec<NodeId> = self
            .forward
            .get(id)
            .map(|by_target| by_target.keys().cloned().collect())
            .unwrap_or_default();
        for target in &outgoing_targets {
            if let Some(by_target) = self.forward.get_mut(id) {
                by_target.shift_remove(target);
            }
            if let Some(by_source) = self.reverse.get_mut(target) {
                by_source.shift_remove(id);
            }
        }
        self.forward.shift_remove(id);

        let incoming_sources: Vec<NodeId> = self
            .reverse
            .get(id)
            .map(|by_source| by_source.keys().cloned().collect())
            .unwrap_or_default();
        for source in &incoming_sources {
            if let Some(by_source) = self.reverse.get_mut(id) {
                by_source.shift_remove(source);
            }
            if let Some(by_target) = self.forward.get_mut(source) {
                by_target.shift_remove(id);
            }
        }
        self.reverse.shift_remove(id);

        self.check_index_consistency();
        Ok(node)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn find_nodes(&self, pred: impl Fn(&Node) -> bool) -> Vec<&Node> {
        self.nodes.values().filter(|n| pred(n)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Edge operations
    // ------------------------------------------------------------------

    pub fn add_edge(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        label: impl Into<String>,
        data: PropertyMap,
    ) -> Result<()> {
        let source = source.into();
        let target = target.into();
        let label = label.into();

        if !self.nodes.contains_key(&source) {
            return Err(Error::NodeNotFound { id: source.0 });
        }
        if !self.nodes.contains_key(&target) {
            return Err(Error::NodeNotFound { id: target.0 });
        }
        if self.has_edge(&source, &target, &label) {
            return Err(Error::DuplicateEdge { source: source.0, target: target.0, label });
        }

        let mut edge = Edge::new(source.clone(), target.clone(), label.clone());
        edge.properties = data;

        self.forward
            .entry(source.clone())
            .or_default()
            .entry(target.clone())
            .or_default()
            .insert(label.clone(), edge.clone());
        self.reverse
            .entry(target)
            .or_default()
            .entry(source)
            .or_default()
            .insert(label, edge);

        Ok(())
    }

    pub fn get_edge(&self, source: &NodeId, target: &NodeId, label: &str) -> Option<&Edge> {
        self.forward.get(source)?.get(target)?.get(label)
    }

    pub fn has_edge(&self, source: &NodeId, target: &NodeId, label: &str) -> bool {
        self.get_edge(source, target, label).is_some()
    }

    pub fn update_edge(&mut self, source: &NodeId, target: &NodeId, label: &str, data: PropertyMap) -> Result<()> {
        if !self.has_edge(source, target, label) {
            return Err(Error::EdgeNotFound {
                source: source.0.clone(),
                target: target.0.clone(),
                label: label.to_string(),
            });
        }
        if let Some(edge) = self.forward.get_mut(source).and_then(|m| m.get_mut(target)).and_then(|m| m.get_mut(label)) {
            edge.properties = data.clone();
        }
        if let Some(edge) = self.reverse.get_mut(target).and_then(|m| m.get_mut(source)).and_then(|m| m.get_mut(label)) {
            edge.properties = data;
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, source: &NodeId, target: &NodeId, label: &str) -> Result<Edge> {
        let removed = self
            .forward
            .get_mut(source)
            .and_then(|m| m.get_mut(target))
            .and_then(|m| m.shift_remove(label))
            .ok_or_else(|| Error::EdgeNotFound {
                source: source.0.clone(),
                target: target.0.clone(),
                label: label.to_string(),
            })?;
        self.reverse
            .get_mut(target)
            .and_then(|m| m.get_mut(source))
            .and_then(|m| m.shift_remove(label));
        Ok(removed)
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.forward.values().flat_map(|by_target| by_target.values()).flat_map(|by_label| by_label.values())
    }

    pub fn find_edges(&self, pred: impl Fn(&Edge) -> bool) -> Vec<&Edge> {
        self.all_edges().filter(|e| pred(e)).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.all_edges().count()
    }

    // ------------------------------------------------------------------
    // Adjacency queries
    // ------------------------------------------------------------------

    /// Node ids reachable by a single edge in the given direction.
    pub fn neighbors(&self, id: &NodeId, dir: Direction) -> Vec<NodeId> {
        self.edges_for(id, dir).into_iter().filter_map(|e| e.other_node(id)).collect()
    }

    /// Edges incident to `id` in the given direction, deduplicated by edge
    /// identity for `Direction::Both` so a pair of nodes contributes each
    /// underlying edge exactly once regardless of which endpoint is current.
    pub fn edges_for(&self, id: &NodeId, dir: Direction) -> Vec<Edge> {
        let mut out = Vec::new();
        if matches!(dir, Direction::Outgoing | Direction::Both) {
            if let Some(by_target) = self.forward.get(id) {
                out.extend(by_target.values().flat_map(|m| m.values()).cloned());
            }
        }
        if matches!(dir, Direction::Incoming | Direction::Both) {
            if let Some(by_source) = self.reverse.get(id) {
                for edge in by_source.values().flat_map(|m| m.values()) {
                    if dir == Direction::Both && edge.source == edge.target {
                        continue;
                    }
                    out.push(edge.clone());
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // find_paths: BFS between two explicit nodes
    // ------------------------------------------------------------------

    /// BFS from `src` to `dst`, returning every path up to `max_depth` hops
    /// whose edges all have a label in `allowed_labels` (empty = any label).
    pub fn find_paths(
        &self,
        src: &NodeId,
        dst: &NodeId,
        max_depth: usize,
        allowed_labels: &[&str],
        direction: Direction,
    ) -> Vec<Path> {
        let Some(start) = self.get_node(src) else { return Vec::new() };
        let mut results = Vec::new();
        let mut queue: Vec<Path> = vec![Path::single(start.clone())];

        for _ in 0..max_depth {
            let mut next_queue = Vec::new();
            for path in &queue {
                let tip = path.end();
                for edge in self.edges_for(&tip.id, direction) {
                    if !allowed_labels.is_empty() && !allowed_labels.iter().any(|l| edge.has_label(l)) {
                        continue;
                    }
                    let Some(next_id) = edge.other_node(&tip.id) else { continue };
                    if path.contains_node(&next_id) {
                        continue;
                    }
                    let Some(next_node) = self.get_node(&next_id) else { continue };
                    let mut new_path = path.clone();
                    new_path.append(edge, next_node.clone());
                    if next_id == *dst {
                        results.push(new_path.clone());
                    }
                    next_queue.push(new_path);
                }
            }
            queue = next_queue;
            if queue.is_empty() {
                break;
            }
        }
        results
    }

    // ------------------------------------------------------------------
    // Whole-graph operations
    // ------------------------------------------------------------------

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.forward.clear();
        self.reverse.clear();
    }

    fn check_index_consistency(&self) {
        debug_assert!(
            self.forward.values().map(|m| m.values().map(|l| l.len()).sum::<usize>()).sum::<usize>()
                == self.reverse.values().map(|m| m.values().map(|l| l.len()).sum::<usize>()).sum::<usize>(),
            "forward and reverse adjacency indexes disagree in edge count"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g() -> GraphStore {
        let mut g = GraphStore::new();
        g.add_node("a", "Person", PropertyMap::new()).unwrap();
        g.add_node("b", "Person", PropertyMap::new()).unwrap();
        g.add_node("c", "Person", PropertyMap::new()).unwrap();
        g
    }

    #[test]
    fn test_duplicate_node_fails() {
        let mut g = g();
        let err = g.add_node("a", "Person", PropertyMap::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { .. }));
    }

    #[test]
    fn test_add_edge_and_lookup_both_directions() {
        let mut g = g();
        g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap();
        assert!(g.has_edge(&NodeId::from("a"), &NodeId::from("b"), "KNOWS"));
        let neighbors = g.neighbors(&NodeId::from("b"), Direction::Incoming);
        assert_eq!(neighbors, vec![NodeId::from("a")]);
    }

    #[test]
    fn test_duplicate_edge_same_label_fails() {
        let mut g = g();
        g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap();
        let err = g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateEdge { .. }));
    }

    #[test]
    fn test_different_labels_coexist() {
        let mut g = g();
        g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap();
        g.add_edge("a", "b", "WORKS_WITH", PropertyMap::new()).unwrap();
        assert_eq!(g.edges_for(&NodeId::from("a"), Direction::Outgoing).len(), 2);
    }

    #[test]
    fn test_remove_node_removes_incident_edges() {
        let mut g = g();
        g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap();
        g.add_edge("b", "c", "KNOWS", PropertyMap::new()).unwrap();
        g.remove_node(&NodeId::from("b")).unwrap();
        assert!(g.all_edges().next().is_none());
        assert!(!g.has_node(&NodeId::from("b")));
    }

    #[test]
    fn test_find_paths_bfs() {
        let mut g = g();
        g.add_edge("a", "b", "R", PropertyMap::new()).unwrap();
        g.add_edge("b", "c", "R", PropertyMap::new()).unwrap();
        let paths = g.find_paths(&NodeId::from("a"), &NodeId::from("c"), 5, &[], Direction::Outgoing);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2);
    }

    #[test]
    fn test_both_direction_dedupes_edge_once() {
        let mut g = g();
        g.add_edge("a", "b", "R", PropertyMap::new()).unwrap();
        let edges = g.edges_for(&NodeId::from("a"), Direction::Both);
        assert_eq!(edges.len(), 1);
    }
}
