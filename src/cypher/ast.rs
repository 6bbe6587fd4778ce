//! Abstract syntax tree for the query language.
//!
//! Pure data — no behavior, no storage references, no execution logic.
//! Every variant here is a tagged sum (never a trait-object hierarchy), so
//! the matcher/evaluator/executor dispatch by exhaustive `match` rather than
//! downcasting.

use crate::model::{Direction, Value};

/// A parsed statement. Every field is optional/empty-able because the three
/// productions the grammar allows — `match (where)? writes* return?`,
/// `create writes* return?`, and a bare `return` — all collapse to "some
/// subset of these parts is present."
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub match_clause: Option<MatchClause>,
    pub where_clause: Option<Expr>,
    pub writes: Vec<WriteClause>,
    pub return_clause: Option<ReturnClause>,
}

/// `MATCH pathPattern (',' pathPattern)*`
#[derive(Debug, Clone)]
pub struct MatchClause {
    pub patterns: Vec<PathPattern>,
}

/// One of the repeated `(create | set | delete)*` clauses.
#[derive(Debug, Clone)]
pub enum WriteClause {
    Create(CreateClause),
    Set(SetClause),
    Delete(DeleteClause),
}

/// `CREATE pathPattern (',' pathPattern)*`
///
/// The distilled grammar sketch reads `(nodePat | relPat)`, but a bare
/// relationship pattern has no meaning without its endpoints (see scenario
/// test 4's `CREATE (p)-[:WORKS_ON]->(t)`) — CREATE reuses the same
/// `pathPattern` production as MATCH.
#[derive(Debug, Clone)]
pub struct CreateClause {
    pub patterns: Vec<PathPattern>,
}

/// `SET propAssign (',' propAssign)*`
#[derive(Debug, Clone)]
pub struct SetClause {
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone)]
pub struct SetItem {
    pub variable: String,
    pub property: String,
    pub value: Expr,
}

/// `('DETACH')? 'DELETE' ident (',' ident)*`
#[derive(Debug, Clone)]
pub struct DeleteClause {
    pub detach: bool,
    pub variables: Vec<String>,
}

/// `RETURN retItem (',' retItem)*`
#[derive(Debug, Clone)]
pub struct ReturnClause {
    pub items: Vec<ReturnItem>,
}

#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

// ---------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expr)>,
}

#[derive(Debug, Clone)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: Option<String>,
    pub direction: Direction,
    pub properties: Vec<(String, Expr)>,
    pub min_hops: usize,
    /// `None` means syntactically unbounded (`*n..` or bare `*`); the
    /// matcher applies its `max_path_depth` cap (default 10) in that case.
    pub max_hops: Option<usize>,
}

impl RelationshipPattern {
    /// A relationship pattern with no `*` suffix at all is fixed-length,
    /// normalized to `1..1` (open question #3).
    pub fn fixed(variable: Option<String>, rel_type: Option<String>, direction: Direction, properties: Vec<(String, Expr)>) -> Self {
        Self { variable, rel_type, direction, properties, min_hops: 1, max_hops: Some(1) }
    }

    pub fn is_variable_length(&self) -> bool {
        !(self.min_hops == 1 && self.max_hops == Some(1))
    }
}

/// `pathPattern := nodePat (relPat nodePat)*`
#[derive(Debug, Clone)]
pub struct PathPattern {
    pub start: NodePattern,
    pub segments: Vec<(RelationshipPattern, NodePattern)>,
}

impl PathPattern {
    pub fn single_node(node: NodePattern) -> Self {
        Self { start: node, segments: Vec::new() }
    }
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, Ne, Lt, Le, Gt, Ge,
    In, Contains, StartsWith, EndsWith,
    IsNull, IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And, Or, Not, Xor,
}

/// Expression AST. The value domain a `Literal` can hold mirrors
/// `model::Value`: string/number/boolean/null/homogeneous list.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable { name: String },
    Property { object: String, property: String },
    /// `right` is `None` for the postfix `IS NULL` / `IS NOT NULL` forms.
    Comparison { op: CompareOp, left: Box<Expr>, right: Option<Box<Expr>> },
    Logical { op: LogicalOp, operands: Vec<Expr> },
    Exists { positive: bool, pattern: PathPattern },
}

impl Expr {
    pub fn and(operands: Vec<Expr>) -> Expr {
        Expr::Logical { op: LogicalOp::And, operands }
    }
}
