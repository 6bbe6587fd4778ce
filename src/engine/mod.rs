//! Statement engine: parse -> match+filter -> act -> project, returning a
//! single uniform result regardless of which clauses the statement used.

use indexmap::IndexSet;
use serde::Serialize;

use crate::cypher::ast::{CreateClause, DeleteClause, Expr, NodePattern, PathPattern, SetItem, Statement, WriteClause};
use crate::exec::{self, Action, ExecutionReport, ExecutorOptions};
use crate::matcher::{BoundValue, Matcher, MatcherOptions};
use crate::model::{Edge, Node, PropertyMap, Value};
use crate::storage::GraphStore;
use crate::Error;

/// Matcher + executor tuning, bundled for a single `execute_with_options` call.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub matcher: MatcherOptions,
    pub executor: ExecutorOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub reads: bool,
    pub writes: bool,
    pub elapsed_ms: f64,
}

/// One projected cell: a bound node/edge, or a scalar value.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Node(Node),
    Edge(Edge),
    Scalar(Value),
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionsResult {
    pub success: bool,
    pub affected_nodes: Vec<Node>,
    pub affected_edges: Vec<Edge>,
    pub action_results: Vec<exec::ActionResult>,
    pub error: Option<String>,
}

/// The uniform result of running one statement, regardless of which
/// clauses it contained.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub match_count: usize,
    pub statement: String,
    pub stats: Stats,
    pub query: Option<QueryResult>,
    pub actions: Option<ActionsResult>,
    pub error: Option<String>,
}

/// Parse and run a statement with default matcher/executor behavior.
pub fn execute(graph: &mut GraphStore, statement_text: &str) -> ExecutionResult {
    execute_with_options(graph, statement_text, &EngineOptions::default())
}

/// Parse and run a statement with explicit matcher/executor behavior.
pub fn execute_with_options(graph: &mut GraphStore, statement_text: &str, options: &EngineOptions) -> ExecutionResult {
    let start = std::time::Instant::now();
    let (stmt, diagnostics) = crate::cypher::parse(statement_text);

    if !diagnostics.is_empty() {
        let message = diagnostics.iter().map(|d| format!("{}:{}: {}", d.line, d.column, d.message)).collect::<Vec<_>>().join("; ");
        tracing::warn!(count = diagnostics.len(), message = %message, "statement has parse diagnostics, not executed");
        return failure(statement_text, start, message);
    }

    if let Err(e) = check_variables(&stmt) {
        tracing::warn!(error = %e, "statement rejected by static variable check");
        return failure(statement_text, start, e.to_string());
    }

    let has_match = stmt.match_clause.is_some();
    let has_writes = !stmt.writes.is_empty();
    let match_vars: IndexSet<String> = stmt.match_clause.as_ref().map(|m| m.patterns.iter().flat_map(crate::matcher::pattern_variables).collect()).unwrap_or_default();

    let bindings = {
        let matcher = Matcher::with_options(graph, options.matcher.clone());
        let bindings = match &stmt.match_clause {
            Some(m) => matcher.execute_match_query(&m.patterns, stmt.where_clause.as_ref()),
            None => vec![crate::matcher::Binding::new()],
        };
        matcher.clear_cache();
        bindings
    };
    let match_count = bindings.len();

    let actions = lower_writes(&stmt.writes, &match_vars);

    let action_report: Option<ExecutionReport> = if actions.is_empty() {
        None
    } else {
        let mut combined = ExecutionReport::empty();
        for binding in &bindings {
            let report = exec::execute_actions(graph, &actions, binding, &options.executor);
            combined.merge(report);
        }
        Some(combined)
    };

    let query = stmt.return_clause.as_ref().map(|rc| project(rc, &bindings, graph));

    let success = action_report.as_ref().map(|r| r.success).unwrap_or(true);
    let error = action_report.as_ref().and_then(|r| r.error.clone());

    tracing::debug!(match_count, has_writes, success, "statement executed");

    ExecutionResult {
        success,
        match_count,
        statement: statement_text.to_string(),
        stats: Stats { reads: has_match, writes: has_writes, elapsed_ms: elapsed_ms(start) },
        query,
        actions: action_report.map(|r| ActionsResult {
            success: r.success,
            affected_nodes: r.affected_nodes,
            affected_edges: r.affected_edges,
            action_results: r.action_results,
            error: r.error,
        }),
        error,
    }
}

fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn failure(statement_text: &str, start: std::time::Instant, message: String) -> ExecutionResult {
    ExecutionResult {
        success: false,
        match_count: 0,
        statement: statement_text.to_string(),
        stats: Stats { reads: false, writes: false, elapsed_ms: elapsed_ms(start) },
        query: None,
        actions: None,
        error: Some(message),
    }
}

// -------------------------------------------------------------------------
// Static variable check
// -------------------------------------------------------------------------

/// Every variable read by WHERE/SET/DELETE/RETURN must be bound by MATCH or
/// a CREATE earlier in the same statement. Checked once, statically, before
/// the matcher or executor ever run.
fn check_variables(stmt: &Statement) -> crate::Result<()> {
    let mut known: IndexSet<String> = IndexSet::new();
    if let Some(m) = &stmt.match_clause {
        for p in &m.patterns {
            known.extend(crate::matcher::pattern_variables(p));
        }
    }
    if let Some(where_expr) = &stmt.where_clause {
        require_known(where_expr, &known)?;
    }
    for write in &stmt.writes {
        match write {
            WriteClause::Create(c) => {
                for pattern in &c.patterns {
                    known.extend(crate::matcher::pattern_variables(pattern));
                }
            }
            WriteClause::Set(s) => {
                for item in &s.items {
                    if !known.contains(&item.variable) {
                        return Err(Error::UndefinedVariable { name: item.variable.clone() });
                    }
                    require_known(&item.value, &known)?;
                }
            }
            WriteClause::Delete(d) => {
                for var in &d.variables {
                    if !known.contains(var) {
                        return Err(Error::UndefinedVariable { name: var.clone() });
                    }
                }
            }
        }
    }
    if let Some(rc) = &stmt.return_clause {
        for item in &rc.items {
            require_known(&item.expr, &known)?;
        }
    }
    Ok(())
}

fn require_known(expr: &Expr, known: &IndexSet<String>) -> crate::Result<()> {
    for var in crate::eval::free_variables(expr) {
        if !known.contains(&var) {
            return Err(Error::UndefinedVariable { name: var });
        }
    }
    Ok(())
}

// -------------------------------------------------------------------------
// Lowering CREATE/SET/DELETE clauses into executor actions
// -------------------------------------------------------------------------

fn literal_props(props: &[(String, Expr)]) -> PropertyMap {
    props.iter().filter_map(|(k, e)| match e { Expr::Literal(v) => Some((k.clone(), v.clone())), _ => None }).collect()
}

fn node_slot(node: &NodePattern, match_vars: &IndexSet<String>, anon_counter: &mut usize, actions: &mut Vec<Action>) -> String {
    if let Some(var) = &node.variable {
        if match_vars.contains(var) {
            return var.clone();
        }
        actions.push(Action::CreateNode { variable: Some(var.clone()), labels: node.labels.clone(), properties: literal_props(&node.properties) });
        return var.clone();
    }
    let slot = format!("__anon{}", *anon_counter);
    *anon_counter += 1;
    actions.push(Action::CreateNode { variable: Some(slot.clone()), labels: node.labels.clone(), properties: literal_props(&node.properties) });
    slot
}

fn lower_create(patterns: &[PathPattern], match_vars: &IndexSet<String>, anon_counter: &mut usize, actions: &mut Vec<Action>) {
    for pattern in patterns {
        let mut prev_slot = node_slot(&pattern.start, match_vars, anon_counter, actions);
        for (rel, node) in &pattern.segments {
            let next_slot = node_slot(node, match_vars, anon_counter, actions);
            actions.push(Action::CreateRelationship {
                from_var: prev_slot.clone(),
                to_var: next_slot.clone(),
                rel_variable: rel.variable.clone(),
                rel_type: rel.rel_type.clone().unwrap_or_default(),
                properties: literal_props(&rel.properties),
                direction: rel.direction,
            });
            prev_slot = next_slot;
        }
    }
}

fn lower_set(items: &[SetItem], actions: &mut Vec<Action>) {
    for item in items {
        actions.push(Action::SetProperty { target_var: item.variable.clone(), property: item.property.clone(), value_expr: item.value.clone() });
    }
}

fn lower_delete(clause: &DeleteClause, actions: &mut Vec<Action>) {
    actions.push(Action::Delete { variables: clause.variables.clone(), detach: clause.detach });
}

fn lower_writes(writes: &[WriteClause], match_vars: &IndexSet<String>) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut anon_counter = 0usize;
    for write in writes {
        match write {
            WriteClause::Create(CreateClause { patterns }) => lower_create(patterns, match_vars, &mut anon_counter, &mut actions),
            WriteClause::Set(s) => lower_set(&s.items, &mut actions),
            WriteClause::Delete(d) => lower_delete(d, &mut actions),
        }
    }
    actions
}

// -------------------------------------------------------------------------
// RETURN projection
// -------------------------------------------------------------------------

fn project(rc: &crate::cypher::ast::ReturnClause, bindings: &[crate::matcher::Binding], graph: &GraphStore) -> QueryResult {
    let columns = rc.items.iter().map(|item| column_name(&item.expr, item.alias.as_deref())).collect();
    let rows = bindings.iter().map(|b| rc.items.iter().map(|item| project_cell(&item.expr, b, graph)).collect()).collect();
    QueryResult { columns, rows }
}

fn column_name(expr: &Expr, alias: Option<&str>) -> String {
    if let Some(a) = alias {
        return a.to_string();
    }
    match expr {
        Expr::Variable { name } => name.clone(),
        Expr::Property { object, property } => format!("{object}.{property}"),
        Expr::Literal(v) => v.to_string(),
        _ => "expr".to_string(),
    }
}

fn project_cell(expr: &Expr, binding: &crate::matcher::Binding, graph: &GraphStore) -> Cell {
    if let Expr::Variable { name } = expr {
        match binding.get(name) {
            Some(BoundValue::Node(n)) => return Cell::Node(n.clone()),
            Some(BoundValue::Edge(e)) => return Cell::Edge(e.clone()),
            Some(BoundValue::Scalar(v)) => return Cell::Scalar(v.clone()),
            None => return Cell::Scalar(Value::Null),
        }
    }
    Cell::Scalar(crate::eval::eval_expr(expr, binding, graph, &MatcherOptions::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property_map;

    fn seeded_graph() -> GraphStore {
        let mut g = GraphStore::new();
        g.add_node("alice", "Person", property_map([("name", "Alice"), ("age", 30i64)])).unwrap();
        g.add_node("bob", "Person", property_map([("name", "Bob"), ("age", 25i64)])).unwrap();
        g
    }

    #[test]
    fn test_return_literal_only() {
        let mut g = GraphStore::new();
        let result = execute(&mut g, "RETURN 1");
        assert!(result.success);
        assert_eq!(result.match_count, 1);
        let query = result.query.unwrap();
        assert_eq!(query.rows.len(), 1);
    }

    #[test]
    fn test_property_constrained_match() {
        let mut g = seeded_graph();
        let result = execute(&mut g, "MATCH (p:Person) WHERE p.age > 28 RETURN p");
        assert!(result.success);
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_not_exists_guards_create_idempotently() {
        let mut g = seeded_graph();
        g.add_node("t", "Task", property_map([("title", "Write report")])).unwrap();

        let query = "MATCH (p:Person), (t:Task) WHERE NOT EXISTS ((p)-[:ASSIGNED_TO]->(t)) CREATE (p)-[:ASSIGNED_TO]->(t) RETURN p";
        let first = execute(&mut g, query);
        assert!(first.success, "{:?}", first.error);
        assert_eq!(g.edge_count(), 2, "one ASSIGNED_TO edge per person on first run");

        let second = execute(&mut g, query);
        assert!(second.success, "{:?}", second.error);
        assert_eq!(second.match_count, 0, "NOT EXISTS should now exclude both pairs");
        assert_eq!(g.edge_count(), 2, "second run must not duplicate edges");
    }

    #[test]
    fn test_comma_separated_create_cross_product() {
        let mut g = GraphStore::new();
        let result = execute(&mut g, "CREATE (p:Person {name: 'Ada'}), (t:Task {title: 'Ship it'})");
        assert!(result.success, "{:?}", result.error);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_detach_delete_statement() {
        let mut g = seeded_graph();
        g.add_edge("alice", "bob", "KNOWS", property_map([] as [(&str, &str); 0])).unwrap();
        let result = execute(&mut g, "MATCH (p:Person {name: 'Alice'}) DETACH DELETE p");
        assert!(result.success, "{:?}", result.error);
        assert!(!g.has_node(&"alice".into()));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_rollback_on_failed_batch() {
        let mut g = GraphStore::new();
        let result = execute(&mut g, "CREATE (p:Person), (p:Task)");
        assert!(!result.success);
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn test_undefined_variable_rejected_statically() {
        let mut g = seeded_graph();
        let result = execute(&mut g, "MATCH (p:Person) RETURN q");
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_parse_diagnostics_prevent_execution() {
        let mut g = seeded_graph();
        let result = execute(&mut g, "MATCH (p:Person RETURN p");
        assert!(!result.success);
        assert_eq!(g.node_count(), 2);
    }
}
