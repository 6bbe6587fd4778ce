//! Round-trippable JSON-shaped graph serialization.

use serde::{Deserialize, Serialize};

use crate::model::{NodeId, PropertyMap};
use crate::Result;

use super::GraphStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableNode {
    pub id: String,
    pub label: String,
    pub data: PropertyMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub data: PropertyMap,
}

/// `{ "nodes": [...], "edges": [...] }`, matching the embedding surface's
/// serialization contract exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<SerializableNode>,
    pub edges: Vec<SerializableEdge>,
}

impl GraphStore {
    pub fn to_serializable(&self) -> SerializableGraph {
        let nodes = self
            .all_nodes()
            .map(|n| SerializableNode { id: n.id.0.clone(), label: n.label.clone(), data: n.properties.clone() })
            .collect();
        let edges = self
            .all_edges()
            .map(|e| SerializableEdge {
                source: e.source.0.clone(),
                target: e.target.0.clone(),
                label: e.label.clone(),
                data: e.properties.clone(),
            })
            .collect();
        SerializableGraph { nodes, edges }
    }

    /// Loads a serialized graph. If this store is non-empty it is cleared
    /// first.
    pub fn from_serializable(graph: SerializableGraph) -> Result<Self> {
        let mut store = Self::new();
        for node in graph.nodes {
            store.add_node(NodeId(node.id), node.label, node.data)?;
        }
        for edge in graph.edges {
            store.add_edge(NodeId(edge.source), NodeId(edge.target), edge.label, edge.data)?;
        }
        Ok(store)
    }

    /// Replaces the contents of this store with a serialized graph,
    /// clearing any existing data first.
    pub fn load_serializable(&mut self, graph: SerializableGraph) -> Result<()> {
        self.clear();
        *self = Self::from_serializable(graph)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut g = GraphStore::new();
        g.add_node("a", "Person", crate::model::property_map([("name", "Ada")])).unwrap();
        g.add_node("b", "Person", PropertyMap::new()).unwrap();
        g.add_edge("a", "b", "KNOWS", PropertyMap::new()).unwrap();

        let serialized = g.to_serializable();
        let restored = GraphStore::from_serializable(serialized).unwrap();

        assert_eq!(restored.node_count(), 2);
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.get_node(&NodeId::from("a")).unwrap().label, "Person");
    }

    #[test]
    fn test_load_clears_existing_graph() {
        let mut g = GraphStore::new();
        g.add_node("x", "Old", PropertyMap::new()).unwrap();

        let mut fresh = GraphStore::new();
        fresh.add_node("a", "Person", PropertyMap::new()).unwrap();
        let serialized = fresh.to_serializable();

        g.load_serializable(serialized).unwrap();
        assert!(!g.has_node(&NodeId::from("x")));
        assert!(g.has_node(&NodeId::from("a")));
    }
}
