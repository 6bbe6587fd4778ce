//! Action executor: CREATE/SET/DELETE actions against a [`GraphStore`],
//! with pre-flight validation and rollback on failure.
//!
//! Actions are a tagged sum dispatched by `match`, not a trait-object
//! hierarchy (see the AST module docs for the same call). Execution is
//! sequential: bindings grow as each action runs, so a `CREATE` pattern
//! that creates a node and then a relationship to it sees that node bound
//! by the time the relationship action runs.

use serde::Serialize;

use crate::cypher::ast::Expr;
use crate::matcher::{Binding, BoundValue, MatcherOptions};
use crate::model::{Direction, Edge, Node, NodeId, PropertyMap};
use crate::storage::GraphStore;
use crate::{Error, Result};

/// One mutating step. Property-map values on `CreateNode`/`CreateRelationship`
/// are always literals by construction (the grammar forbids anything else in
/// pattern property maps).
#[derive(Debug)]
pub enum Action {
    CreateNode {
        variable: Option<String>,
        labels: Vec<String>,
        properties: PropertyMap,
    },
    CreateRelationship {
        from_var: String,
        to_var: String,
        rel_variable: Option<String>,
        rel_type: String,
        properties: PropertyMap,
        direction: Direction,
    },
    SetProperty {
        target_var: String,
        property: String,
        value_expr: Expr,
    },
    Delete {
        variables: Vec<String>,
        detach: bool,
    },
}

/// What an executed action did, so the executor can build an undo log and
/// report affected entities without re-deriving them.
struct ActionOutcome {
    undo: Vec<Undo>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Inverse of one already-applied action, replayed in reverse order to roll
/// a batch back.
#[derive(Debug, Clone)]
enum Undo {
    RemoveNode(NodeId),
    RemoveEdge(NodeId, NodeId, String),
    RestoreNode(Node),
    RestoreEdge(Edge),
    RestoreNodeData { id: NodeId, prior: PropertyMap },
    RestoreEdgeData { source: NodeId, target: NodeId, label: String, prior: PropertyMap },
}

fn require_node<'a>(bindings: &'a Binding, var: &str) -> Result<&'a Node> {
    match bindings.get(var) {
        Some(BoundValue::Node(n)) => Ok(n),
        Some(_) => Err(Error::WrongBindingKind { name: var.to_string(), expected: "node" }),
        None => Err(Error::UndefinedVariable { name: var.to_string() }),
    }
}

fn generate_node_id(graph: &GraphStore) -> NodeId {
    let mut n = graph.node_count();
    loop {
        let candidate = NodeId::from(format!("_n{n}"));
        if !graph.has_node(&candidate) { return candidate; }
        n += 1;
    }
}

impl Action {
    /// Checked before the action runs (when `validate_before_execute` is
    /// on): the invariant each action assumes of its bindings.
    pub fn validate(&self, graph: &GraphStore, bindings: &Binding) -> Result<()> {
        match self {
            Action::CreateNode { variable, .. } => {
                if let Some(var) = variable {
                    if bindings.contains_key(var) {
                        return Err(Error::AlreadyBound { name: var.clone() });
                    }
                }
                Ok(())
            }
            Action::CreateRelationship { from_var, to_var, .. } => {
                require_node(bindings, from_var)?;
                require_node(bindings, to_var)?;
                Ok(())
            }
            Action::SetProperty { target_var, .. } => match bindings.get(target_var) {
                Some(BoundValue::Node(_)) | Some(BoundValue::Edge(_)) => Ok(()),
                Some(BoundValue::Scalar(_)) => Err(Error::WrongBindingKind { name: target_var.clone(), expected: "node or edge" }),
                None => Err(Error::UndefinedVariable { name: target_var.clone() }),
            },
            Action::Delete { variables, detach } => {
                for var in variables {
                    match bindings.get(var) {
                        Some(BoundValue::Node(node)) => {
                            if !*detach && !graph.edges_for(&node.id, Direction::Both).is_empty() {
                                return Err(Error::NodeHasIncidentEdges { id: node.id.0.clone() });
                            }
                        }
                        Some(BoundValue::Edge(_)) => {}
                        Some(BoundValue::Scalar(_)) => return Err(Error::WrongBindingKind { name: var.clone(), expected: "node or edge" }),
                        None => return Err(Error::UndefinedVariable { name: var.clone() }),
                    }
                }
                Ok(())
            }
        }
    }

    fn execute(&self, graph: &mut GraphStore, bindings: &mut Binding) -> Result<ActionOutcome> {
        match self {
            Action::CreateNode { variable, labels, properties } => {
                let id = generate_node_id(graph);
                let label = labels.first().cloned().unwrap_or_default();
                graph.add_node(id.clone(), label, properties.clone())?;
                let node = graph.get_node(&id).cloned().expect("just inserted");
                if let Some(var) = variable {
                    bindings.insert(var.clone(), BoundValue::Node(node.clone()));
                }
                Ok(ActionOutcome { undo: vec![Undo::RemoveNode(id)], nodes: vec![node], edges: vec![] })
            }
            Action::CreateRelationship { from_var, to_var, rel_variable, rel_type, properties, direction } => {
                let from_node = require_node(bindings, from_var)?.clone();
                let to_node = require_node(bindings, to_var)?.clone();
                let (source, target) = match direction {
                    Direction::Incoming => (to_node.id.clone(), from_node.id.clone()),
                    _ => (from_node.id.clone(), to_node.id.clone()),
                };
                graph.add_edge(source.clone(), target.clone(), rel_type.clone(), properties.clone())?;
                let edge = graph.get_edge(&source, &target, rel_type).cloned().expect("just inserted");
                if let Some(var) = rel_variable {
                    bindings.insert(var.clone(), BoundValue::Edge(edge.clone()));
                }
                Ok(ActionOutcome { undo: vec![Undo::RemoveEdge(source, target, rel_type.clone())], nodes: vec![], edges: vec![edge] })
            }
            Action::SetProperty { target_var, property, value_expr } => {
                let value = crate::eval::eval_expr(value_expr, bindings, graph, &MatcherOptions::default());
                match bindings.get(target_var).cloned() {
                    Some(BoundValue::Node(node)) => {
                        let prior = node.properties.clone();
                        let mut data = node.properties.clone();
                        data.insert(property.clone(), value);
                        graph.update_node_data(&node.id, data)?;
                        let updated = graph.get_node(&node.id).cloned().expect("just updated");
                        bindings.insert(target_var.clone(), BoundValue::Node(updated.clone()));
                        Ok(ActionOutcome { undo: vec![Undo::RestoreNodeData { id: node.id, prior }], nodes: vec![updated], edges: vec![] })
                    }
                    Some(BoundValue::Edge(edge)) => {
                        let prior = edge.properties.clone();
                        let mut data = edge.properties.clone();
                        data.insert(property.clone(), value);
                        graph.update_edge(&edge.source, &edge.target, &edge.label, data)?;
                        let updated = graph.get_edge(&edge.source, &edge.target, &edge.label).cloned().expect("just updated");
                        bindings.insert(target_var.clone(), BoundValue::Edge(updated.clone()));
                        Ok(ActionOutcome {
                            undo: vec![Undo::RestoreEdgeData { source: edge.source, target: edge.target, label: edge.label, prior }],
                            nodes: vec![],
                            edges: vec![updated],
                        })
                    }
                    _ => Err(Error::UndefinedVariable { name: target_var.clone() }),
                }
            }
            Action::Delete { variables, detach } => {
                let mut undo = Vec::new();
                let mut nodes = Vec::new();
                let mut edges = Vec::new();
                for var in variables {
                    match bindings.get(var).cloned() {
                        Some(BoundValue::Node(node)) => {
                            if *detach {
                                for edge in graph.edges_for(&node.id, Direction::Both) {
                                    let removed = graph.remove_edge(&edge.source, &edge.target, &edge.label)?;
                                    undo.push(Undo::RestoreEdge(removed.clone()));
                                    edges.push(removed);
                                }
                            }
                            let removed = graph.remove_node(&node.id)?;
                            undo.push(Undo::RestoreNode(removed.clone()));
                            nodes.push(removed);
                        }
                        Some(BoundValue::Edge(edge)) => {
                            let removed = graph.remove_edge(&edge.source, &edge.target, &edge.label)?;
                            undo.push(Undo::RestoreEdge(removed.clone()));
                            edges.push(removed);
                        }
                        _ => return Err(Error::UndefinedVariable { name: var.clone() }),
                    }
                }
                Ok(ActionOutcome { undo, nodes, edges })
            }
        }
    }
}

fn rollback(graph: &mut GraphStore, undo_log: &[Undo]) -> Result<()> {
    let mut errors = Vec::new();
    for undo in undo_log.iter().rev() {
        let res = match undo {
            Undo::RestoreEdgeData { source, target, label, prior } => graph.update_edge(source, target, label, prior.clone()),
            Undo::RestoreNodeData { id, prior } => graph.update_node_data(id, prior.clone()),
            Undo::RestoreEdge(edge) => graph.add_edge(edge.source.clone(), edge.target.clone(), edge.label.clone(), edge.properties.clone()),
            Undo::RestoreNode(node) => graph.add_node(node.id.clone(), node.label.clone(), node.properties.clone()),
            Undo::RemoveEdge(src, tgt, label) => graph.remove_edge(src, tgt, label).map(|_| ()),
            Undo::RemoveNode(id) => {
                for edge in graph.edges_for(id, Direction::Both) {
                    let _ = graph.remove_edge(&edge.source, &edge.target, &edge.label);
                }
                graph.remove_node(id).map(|_| ())
            }
        };
        if let Err(e) = res {
            errors.push(e.to_string());
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(Error::InvariantViolation { message: errors.join("; ") }) }
}

/// Batch execution policy.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub validate_before_execute: bool,
    pub continue_on_failure: bool,
    pub rollback_on_failure: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self { validate_before_execute: true, continue_on_failure: false, rollback_on_failure: true }
    }
}

/// Outcome of one action within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Outcome of a whole batch, across every binding it ran against.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub success: bool,
    pub affected_nodes: Vec<Node>,
    pub affected_edges: Vec<Edge>,
    pub action_results: Vec<ActionResult>,
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn empty() -> Self {
        Self { success: true, affected_nodes: Vec::new(), affected_edges: Vec::new(), action_results: Vec::new(), error: None }
    }

    pub fn merge(&mut self, other: ExecutionReport) {
        self.affected_nodes.extend(other.affected_nodes);
        self.affected_edges.extend(other.affected_edges);
        self.action_results.extend(other.action_results);
        if !other.success {
            self.success = false;
            self.error = match (self.error.take(), other.error) {
                (Some(existing), Some(new)) => Some(format!("{existing}; {new}")),
                (None, Some(new)) => Some(new),
                (existing, None) => existing,
            };
        }
    }
}

/// Run a batch of actions against one binding, sequentially, honoring
/// `options`. On failure with `rollback_on_failure`, every already-applied
/// action in this batch is undone in reverse order before returning.
pub fn execute_actions(graph: &mut GraphStore, actions: &[Action], bindings: &Binding, options: &ExecutorOptions) -> ExecutionReport {
    let mut working = bindings.clone();
    let mut undo_log: Vec<Undo> = Vec::new();
    let mut affected_nodes = Vec::new();
    let mut affected_edges = Vec::new();
    let mut action_results = Vec::new();
    let mut batch_error: Option<String> = None;

    for action in actions {
        if options.validate_before_execute {
            if let Err(e) = action.validate(graph, &working) {
                let msg = e.to_string();
                action_results.push(ActionResult { success: false, error: Some(msg.clone()) });
                batch_error = Some(msg);
                if options.rollback_on_failure {
                    return abort(graph, &undo_log, action_results, batch_error.unwrap());
                }
                if !options.continue_on_failure {
                    break;
                }
                continue;
            }
        }

        match action.execute(graph, &mut working) {
            Ok(outcome) => {
                undo_log.extend(outcome.undo);
                affected_nodes.extend(outcome.nodes);
                affected_edges.extend(outcome.edges);
                action_results.push(ActionResult { success: true, error: None });
            }
            Err(e) => {
                let msg = e.to_string();
                action_results.push(ActionResult { success: false, error: Some(msg.clone()) });
                batch_error = Some(msg);
                if options.rollback_on_failure {
                    return abort(graph, &undo_log, action_results, batch_error.unwrap());
                }
                if !options.continue_on_failure {
                    break;
                }
            }
        }
    }

    ExecutionReport { success: batch_error.is_none(), affected_nodes, affected_edges, action_results, error: batch_error }
}

fn abort(graph: &mut GraphStore, undo_log: &[Undo], action_results: Vec<ActionResult>, error: String) -> ExecutionReport {
    let message = match rollback(graph, undo_log) {
        Ok(()) => error,
        Err(re) => format!("{error}; rollback also failed: {re}"),
    };
    ExecutionReport { success: false, affected_nodes: Vec::new(), affected_edges: Vec::new(), action_results, error: Some(message) }
}
