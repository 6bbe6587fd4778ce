//! The visitor-driven BFS traversal primitive the matcher builds on.
//!
//! The queue of `(node, depth, path)` records is explicit rather than a
//! pull-based iterator — the visitor hooks are the public contract; an
//! implementation that inlines the visitor into a caller is equally valid
//! as long as the call order (start -> per-level discover/examine/finish)
//! is preserved.

use crate::model::{Direction, Edge, Node, NodeId, Path};

use super::GraphStore;

/// Options bounding a traversal.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub max_depth: usize,
    pub direction: Direction,
    pub track_paths: bool,
    pub max_results: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self { max_depth: 10, direction: Direction::Outgoing, track_paths: true, max_results: 100 }
    }
}

/// Hooks observed during a BFS traversal, in call order:
/// `start` once, then per level `discover_node`/`examine_edge` (returning
/// `false` prunes further expansion from/through that node or edge),
/// `path_complete` for every path that reached a new depth, and
/// `finish_node` once a node has no more edges to examine at that depth.
pub trait Visitor {
    fn start(&mut self, _start: &Node) {}
    fn discover_node(&mut self, _node: &Node, _depth: usize, _path: Option<&Path>) -> bool { true }
    fn examine_edge(&mut self, _edge: &Edge, _source: &Node, _target: &Node, _depth: usize) -> bool { true }
    fn path_complete(&mut self, _path: &Path, _depth: usize) {}
    fn finish_node(&mut self, _node: &Node, _depth: usize) {}
}

impl GraphStore {
    /// Run a visitor-driven BFS from `start`, honoring `opts`.
    pub fn traverse(&self, start: &NodeId, opts: &TraversalOptions, visitor: &mut dyn Visitor) {
        let Some(start_node) = self.get_node(start) else { return };
        visitor.start(start_node);

        let mut queue: Vec<Path> = vec![Path::single(start_node.clone())];
        let mut emitted = 0usize;

        for depth in 0..opts.max_depth {
            let mut next_queue = Vec::new();
            for path in &queue {
                let tip = path.end();
                if !visitor.discover_node(tip, depth, opts.track_paths.then_some(path)) {
                    continue;
                }
                for edge in self.edges_for(&tip.id, opts.direction) {
                    let Some(next_id) = edge.other_node(&tip.id) else { continue };
                    if path.contains_node(&next_id) {
                        continue;
                    }
                    let Some(next_node) = self.get_node(&next_id) else { continue };
                    if !visitor.examine_edge(&edge, tip, next_node, depth) {
                        continue;
                    }
                    let mut new_path = path.clone();
                    new_path.append(edge, next_node.clone());
                    visitor.path_complete(&new_path, depth + 1);
                    emitted += 1;
                    if emitted >= opts.max_results {
                        visitor.finish_node(tip, depth);
                        return;
                    }
                    next_queue.push(new_path);
                }
                visitor.finish_node(tip, depth);
            }
            queue = next_queue;
            if queue.is_empty() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyMap;

    #[derive(Default)]
    struct CountingVisitor {
        discovered: usize,
        paths: usize,
    }

    impl Visitor for CountingVisitor {
        fn discover_node(&mut self, _node: &Node, _depth: usize, _path: Option<&Path>) -> bool {
            self.discovered += 1;
            true
        }
        fn path_complete(&mut self, _path: &Path, _depth: usize) {
            self.paths += 1;
        }
    }

    fn chain() -> GraphStore {
        let mut g = GraphStore::new();
        for id in ["a", "b", "c", "d"] {
            g.add_node(id, "N", PropertyMap::new()).unwrap();
        }
        g.add_edge("a", "b", "R", PropertyMap::new()).unwrap();
        g.add_edge("b", "c", "R", PropertyMap::new()).unwrap();
        g.add_edge("c", "d", "R", PropertyMap::new()).unwrap();
        g
    }

    #[test]
    fn test_traverse_visits_all_within_depth() {
        let g = chain();
        let mut v = CountingVisitor::default();
        g.traverse(
            &NodeId::from("a"),
            &TraversalOptions { max_depth: 2, ..Default::default() },
            &mut v,
        );
        assert_eq!(v.paths, 2);
    }

    #[test]
    fn test_traverse_respects_max_results() {
        let g = chain();
        let mut v = CountingVisitor::default();
        g.traverse(
            &NodeId::from("a"),
            &TraversalOptions { max_depth: 10, max_results: 1, ..Default::default() },
            &mut v,
        );
        assert_eq!(v.paths, 1);
    }
}
