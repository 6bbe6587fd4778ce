//! Edge (relationship) in the property graph.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap, Value};

/// Traversal direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A directed edge in the property graph.
///
/// An edge's identity is the tuple (source, target, label) — there is no
/// separate synthetic identifier. At most one edge per label may exist
/// between a given ordered pair of nodes (enforced by the graph store, not
/// by this type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub label: String,
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The "other" end of the edge from the given node, if it is incident.
    pub fn other_node(&self, from: &NodeId) -> Option<NodeId> {
        if *from == self.source {
            Some(self.target.clone())
        } else if *from == self.target {
            Some(self.source.clone())
        } else {
            None
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }

    /// The key under which this edge is stored in both the forward and
    /// reverse adjacency indexes.
    pub fn key(&self) -> (NodeId, NodeId, String) {
        (self.source.clone(), self.target.clone(), self.label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_node() {
        let e = Edge::new("a", "b", "R");
        assert_eq!(e.other_node(&NodeId::from("a")), Some(NodeId::from("b")));
        assert_eq!(e.other_node(&NodeId::from("b")), Some(NodeId::from("a")));
        assert_eq!(e.other_node(&NodeId::from("c")), None);
    }

    #[test]
    fn test_has_label_case_insensitive() {
        let e = Edge::new("a", "b", "WORKS_ON");
        assert!(e.has_label("works_on"));
        assert!(!e.has_label("OTHER"));
    }
}
