//! Property graph data model.
//!
//! Pure data — no I/O, no state, no storage dependency. These types cross
//! every layer: graph store, matcher, evaluator, executor, embedder.

pub mod node;
pub mod relationship;
pub mod path;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Direction, Edge};
pub use path::Path;
pub use value::Value;
pub use property_map::{property_map, PropertyMap};
