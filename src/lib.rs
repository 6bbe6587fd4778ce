//! # graphling — embeddable in-memory property graph database
//!
//! A labeled property graph store with a declarative, Cypher-inspired query
//! language: a lexer, a recursive-descent parser with error recovery, a
//! pattern matcher, a condition evaluator, and a transactional action
//! executor, wired together by a single-threaded statement engine.
//!
//! ## Quick start
//!
//! ```
//! use graphling::{GraphStore, execute};
//!
//! let mut graph = GraphStore::new();
//! graph.add_node("alice", "Person", graphling::property_map([("name", "Alice"), ("age", 30i64)])).unwrap();
//! graph.add_node("bob", "Person", graphling::property_map([("name", "Bob"), ("age", 25i64)])).unwrap();
//!
//! let result = execute(&mut graph, "MATCH (p:Person) WHERE p.age > 28 RETURN p");
//! assert!(result.success);
//! assert_eq!(result.match_count, 1);
//! ```
//!
//! ## Layout
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`model`] | Node, Edge, Path, Value, PropertyMap — the shared data model |
//! | [`storage`] | `GraphStore`: dual-indexed adjacency + BFS traversal primitive |
//! | [`cypher`] | Lexer, AST, recursive-descent parser with diagnostics |
//! | [`matcher`] | Pattern matching: patterns + graph -> bindings |
//! | [`eval`] | Condition evaluator: expression + bindings + graph -> value |
//! | [`exec`] | Action executor: CREATE/SET/DELETE with validation and rollback |
//! | [`engine`] | Statement engine: wires the above, returns a uniform result |

pub mod model;
pub mod storage;
pub mod cypher;
pub mod matcher;
pub mod eval;
pub mod exec;
pub mod engine;

pub use model::{Direction, Edge, Node, NodeId, Path, PropertyMap, Value, property_map};
pub use storage::{GraphStore, SerializableGraph, TraversalOptions, Visitor};
pub use matcher::{Binding, MatcherOptions};
pub use engine::{execute, execute_with_options, EngineOptions, ExecutionResult};

/// Errors reported before or outside execution proper: graph store invariant
/// violations, semantic errors caught before a statement runs, and
/// serialization failures.
///
/// Lex and parse errors are *not* represented here — they travel as
/// [`cypher::parser::Diagnostic`] values alongside a best-effort AST, never
/// through `Result::Err` (see §4.3/§7 of the design notes).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node '{id}' already exists")]
    DuplicateNode { id: String },

    #[error("relationship ({source})-[{label}]->({target}) already exists")]
    DuplicateEdge { source: String, target: String, label: String },

    #[error("node '{id}' not found")]
    NodeNotFound { id: String },

    #[error("relationship ({source})-[{label}]->({target}) not found")]
    EdgeNotFound { source: String, target: String, label: String },

    #[error("node '{id}' has incident relationships; use DETACH DELETE")]
    NodeHasIncidentEdges { id: String },

    #[error("variable '{name}' is already bound")]
    AlreadyBound { name: String },

    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("variable '{name}' is not bound to a {expected}")]
    WrongBindingKind { name: String, expected: &'static str },

    #[error("graph store invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
