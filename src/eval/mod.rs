//! Condition evaluator: expression + bindings + graph -> value.
//!
//! Pure with respect to the graph (read-only) and deterministic: the same
//! expression and bindings always produce the same value. `EXISTS`/`NOT
//! EXISTS` are the one place this module calls back into the matcher, to
//! check a sub-pattern against the current bindings without leaking any of
//! the sub-pattern's own variables into the outer scope.

use indexmap::IndexSet;

use crate::cypher::ast::{CompareOp, Expr, LogicalOp};
use crate::matcher::{Binding, BoundValue, Matcher, MatcherOptions};
use crate::model::Value;
use crate::storage::GraphStore;

/// Evaluate an expression to a [`Value`] against a binding.
///
/// `Node`/`Edge`-bound variables evaluate to `Null` when used bare (as
/// opposed to through a `.property` access) — they aren't part of the
/// `Value` domain. Callers that need the node/edge itself (projection)
/// should read the binding directly rather than going through `eval_expr`.
pub fn eval_expr(expr: &Expr, binding: &Binding, graph: &GraphStore, options: &MatcherOptions) -> Value {
    match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Variable { name } => match binding.get(name) {
            Some(BoundValue::Scalar(v)) => v.clone(),
            _ => Value::Null,
        },
        Expr::Property { object, property } => match binding.get(object) {
            Some(BoundValue::Node(n)) => n.get(property).cloned().unwrap_or(Value::Null),
            Some(BoundValue::Edge(e)) => e.properties.get(property).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Expr::Comparison { .. } => eval_comparison(expr, binding, graph, options),
        Expr::Logical { .. } => eval_logical(expr, binding, graph, options),
        Expr::Exists { positive, pattern } => Value::Bool(eval_exists(*positive, pattern, binding, graph, options)),
    }
}

/// Evaluate an expression's truthiness (`is_truthy` of its `Value`).
pub fn eval_bool(expr: &Expr, binding: &Binding, graph: &GraphStore, options: &MatcherOptions) -> bool {
    eval_expr(expr, binding, graph, options).is_truthy()
}

fn is_absent_or_null(v: &Value) -> bool {
    matches!(v, Value::Null)
}

fn values_equal(a: &Value, b: &Value, options: &MatcherOptions) -> bool {
    if options.type_coercion { a.coerced_eq(b) } else { a.strict_eq(b) }
}

fn eval_comparison(expr: &Expr, binding: &Binding, graph: &GraphStore, options: &MatcherOptions) -> Value {
    let Expr::Comparison { op, left, right } = expr else { unreachable!("eval_comparison called on non-Comparison expr") };

    if *op == CompareOp::IsNull {
        let v = eval_expr(left, binding, graph, options);
        return Value::Bool(is_absent_or_null(&v));
    }
    if *op == CompareOp::IsNotNull {
        let v = eval_expr(left, binding, graph, options);
        return Value::Bool(!is_absent_or_null(&v));
    }

    let lv = eval_expr(left, binding, graph, options);
    let rv_expr = right.as_ref().expect("binary comparison operators always carry a right operand");
    let rv = eval_expr(rv_expr, binding, graph, options);

    if is_absent_or_null(&lv) || is_absent_or_null(&rv) {
        if *op == CompareOp::Eq && is_absent_or_null(&lv) && is_absent_or_null(&rv) {
            return Value::Bool(true);
        }
        return if options.null_aware_comparisons { Value::Null } else { Value::Bool(false) };
    }

    use std::cmp::Ordering;
    Value::Bool(match op {
        CompareOp::Eq => values_equal(&lv, &rv, options),
        CompareOp::Ne => !values_equal(&lv, &rv, options),
        CompareOp::Lt => lv.ordering_cmp(&rv) == Some(Ordering::Less),
        CompareOp::Le => matches!(lv.ordering_cmp(&rv), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => lv.ordering_cmp(&rv) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(lv.ordering_cmp(&rv), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::In => eval_in(&lv, &rv, options),
        CompareOp::Contains => match (lv.as_str(), rv.as_str()) {
            (Some(a), Some(b)) => a.contains(b),
            _ => false,
        },
        CompareOp::StartsWith => match (lv.as_str(), rv.as_str()) {
            (Some(a), Some(b)) => a.starts_with(b),
            _ => false,
        },
        CompareOp::EndsWith => match (lv.as_str(), rv.as_str()) {
            (Some(a), Some(b)) => a.ends_with(b),
            _ => false,
        },
        CompareOp::IsNull | CompareOp::IsNotNull => unreachable!(),
    })
}

/// `IN` accepts a list on the right (plain membership) or a string on the
/// right, treating the left side as a substring needle for symmetry with
/// `CONTAINS` (open question #2) — non-standard, kept for compatibility.
fn eval_in(lv: &Value, rv: &Value, options: &MatcherOptions) -> bool {
    match rv {
        Value::List(items) => items.iter().any(|item| values_equal(item, lv, options)),
        Value::String(haystack) => lv.as_str().map(|needle| haystack.contains(needle)).unwrap_or(false),
        _ => false,
    }
}

fn tri(v: &Value) -> Option<bool> {
    match v {
        Value::Null => None,
        other => Some(other.is_truthy()),
    }
}

fn eval_logical(expr: &Expr, binding: &Binding, graph: &GraphStore, options: &MatcherOptions) -> Value {
    let Expr::Logical { op, operands } = expr else { unreachable!("eval_logical called on non-Logical expr") };
    match op {
        LogicalOp::Not => {
            let v = eval_expr(&operands[0], binding, graph, options);
            match tri(&v) {
                Some(b) => Value::Bool(!b),
                None if options.null_aware_comparisons => Value::Null,
                None => Value::Bool(false),
            }
        }
        LogicalOp::And => {
            let mut saw_null = false;
            for operand in operands {
                match tri(&eval_expr(operand, binding, graph, options)) {
                    Some(false) => return Value::Bool(false),
                    Some(true) => {}
                    None => saw_null = true,
                }
            }
            if !saw_null {
                Value::Bool(true)
            } else if options.null_aware_comparisons {
                Value::Null
            } else {
                Value::Bool(false)
            }
        }
        LogicalOp::Or => {
            let mut saw_null = false;
            for operand in operands {
                match tri(&eval_expr(operand, binding, graph, options)) {
                    Some(true) => return Value::Bool(true),
                    Some(false) => {}
                    None => saw_null = true,
                }
            }
            if !saw_null {
                Value::Bool(false)
            } else if options.null_aware_comparisons {
                Value::Null
            } else {
                Value::Bool(false)
            }
        }
        LogicalOp::Xor => {
            let trues = operands.iter().filter(|o| eval_expr(o, binding, graph, options).is_truthy()).count();
            Value::Bool(trues == 1)
        }
    }
}

/// `EXISTS (pattern)` / `NOT EXISTS (pattern)`. The sub-pattern is enriched
/// with the outer binding (so already-bound variables constrain it) and
/// checked for at least one match; any variables the sub-pattern itself
/// introduces are discarded, never merged back into `binding`.
fn eval_exists(positive: bool, pattern: &crate::cypher::ast::PathPattern, binding: &Binding, graph: &GraphStore, options: &MatcherOptions) -> bool {
    let matcher = Matcher::with_options(graph, options.clone());
    let enriched = matcher.enrich_pattern_with_bindings(pattern, binding);
    let found = !matcher.find_matching_paths(&enriched).is_empty();
    if positive { found } else { !found }
}

/// Split a (possibly nested) `AND` expression into its top-level conjuncts.
/// `OR`/`XOR` are left intact — only `AND` distributes for pushdown.
pub fn flatten_and(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Logical { op: LogicalOp::And, operands } => operands.iter().flat_map(flatten_and).collect(),
        other => vec![other.clone()],
    }
}

/// Every variable name an expression reads, for WHERE-pushdown gating.
///
/// `Exists` contributes every variable named in its sub-pattern, not just
/// the ones it reads from the outer binding: a name the sub-pattern
/// introduces may equally be an outer variable referenced again (`(p)-[:R]->(t)`
/// pins `t` to whatever `t` is already bound to, see `enrich_pattern_with_bindings`),
/// and pushdown can't tell the two cases apart without waiting for every
/// name in the sub-pattern to be bound first. Pushing an `EXISTS` conjunct
/// down before that point would enrich the sub-pattern with only a partial
/// binding, matching it against any node for the not-yet-bound names and
/// silently discarding bindings the full cross-product would have kept.
pub fn free_variables(expr: &Expr) -> IndexSet<String> {
    let mut vars = IndexSet::new();
    collect_free_variables(expr, &mut vars);
    vars
}

fn collect_free_variables(expr: &Expr, out: &mut IndexSet<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Variable { name } => { out.insert(name.clone()); }
        Expr::Property { object, .. } => { out.insert(object.clone()); }
        Expr::Comparison { left, right, .. } => {
            collect_free_variables(left, out);
            if let Some(r) = right { collect_free_variables(r, out); }
        }
        Expr::Logical { operands, .. } => {
            for o in operands { collect_free_variables(o, out); }
        }
        Expr::Exists { pattern, .. } => {
            out.extend(crate::matcher::pattern_variables(pattern));
        }
    }
}
