//! Node in the property graph.

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value};

/// Opaque node identifier supplied by the caller (not auto-generated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { NodeId(s.to_owned()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { NodeId(s) }
}

/// A node in the property graph. Carries exactly one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_has_label_case_insensitive() {
        let n = Node::new("1", "Person");
        assert!(n.has_label("person"));
        assert!(n.has_label("Person"));
        assert!(!n.has_label("Task"));
    }

    #[test]
    fn test_node_with_property() {
        let n = Node::new("1", "Person").with_property("name", "Ada");
        assert_eq!(n.get("name"), Some(&Value::String("Ada".into())));
        assert_eq!(n.get("missing"), None);
    }
}
