//! Recursive-descent parser: token stream -> best-effort statement AST.
//!
//! Never raises for a syntactic error. On an unexpected token the parser
//! records a [`Diagnostic`] and skips to the next top-level keyword (or EOF),
//! then continues — the returned statement always contains every clause that
//! parsed successfully, and the diagnostics (if any) travel alongside it,
//! never through `Result::Err`.

use crate::model::Direction;
use super::ast::*;
use super::lexer::{Token, TokenKind};

/// A recorded parse problem: message plus source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0, diagnostics: Vec::new() }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            let tok = self.peek().clone();
            self.diagnostics.push(Diagnostic {
                message: format!("expected {:?}, found {:?} '{}'", kind, tok.kind, tok.lexeme),
                line: tok.line,
                column: tok.column,
            });
            None
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let tok = self.peek();
        self.diagnostics.push(Diagnostic { message: message.into(), line: tok.line, column: tok.column });
    }

    fn is_top_level_keyword(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Match
                | TokenKind::Where
                | TokenKind::Create
                | TokenKind::Set
                | TokenKind::Delete
                | TokenKind::Detach
                | TokenKind::Return
                | TokenKind::Eof
        )
    }

    /// Skip tokens until the next top-level keyword or EOF (§4.3 recovery).
    fn recover(&mut self) {
        while !self.is_top_level_keyword() {
            self.advance();
        }
    }
}

/// Parse a complete statement, never failing: returns a best-effort AST plus
/// whatever diagnostics were collected along the way. An empty or
/// all-whitespace input yields `Statement::default()` and no diagnostics.
pub fn parse_statement(tokens: &[Token]) -> (Statement, Vec<Diagnostic>) {
    let mut p = Parser::new(tokens);
    let mut stmt = Statement::default();

    if p.at(TokenKind::Eof) {
        return (stmt, p.diagnostics);
    }

    loop {
        match p.peek_kind() {
            TokenKind::Match => {
                p.advance();
                match p.parse_pattern_list() {
                    Some(patterns) => stmt.match_clause = Some(MatchClause { patterns }),
                    None => p.recover(),
                }
            }
            TokenKind::Where => {
                p.advance();
                match p.parse_or_expr() {
                    Some(expr) => stmt.where_clause = Some(expr),
                    None => p.recover(),
                }
            }
            TokenKind::Create => {
                p.advance();
                match p.parse_pattern_list() {
                    Some(patterns) => stmt.writes.push(WriteClause::Create(CreateClause { patterns })),
                    None => p.recover(),
                }
            }
            TokenKind::Set => {
                p.advance();
                match p.parse_set_items() {
                    Some(items) => stmt.writes.push(WriteClause::Set(SetClause { items })),
                    None => p.recover(),
                }
            }
            TokenKind::Delete => {
                p.advance();
                match p.parse_ident_list() {
                    Some(variables) => stmt.writes.push(WriteClause::Delete(DeleteClause { detach: false, variables })),
                    None => p.recover(),
                }
            }
            TokenKind::Detach => {
                p.advance();
                if !p.eat(TokenKind::Delete) {
                    p.error("expected DELETE after DETACH");
                    p.recover();
                    continue;
                }
                match p.parse_ident_list() {
                    Some(variables) => stmt.writes.push(WriteClause::Delete(DeleteClause { detach: true, variables })),
                    None => p.recover(),
                }
            }
            TokenKind::Return => {
                p.advance();
                match p.parse_return_items() {
                    Some(items) => stmt.return_clause = Some(ReturnClause { items }),
                    None => p.recover(),
                }
            }
            TokenKind::Eof | TokenKind::Semicolon => break,
            other => {
                p.error(format!("unexpected token {other:?} at start of clause"));
                p.recover();
                if p.at(TokenKind::Eof) {
                    break;
                }
            }
        }
    }

    p.eat(TokenKind::Semicolon);
    if !p.at(TokenKind::Eof) {
        p.error(format!("unexpected trailing token {:?}", p.peek_kind()));
    }

    (stmt, p.diagnostics)
}

// ============================================================================
// Patterns
// ============================================================================

impl<'t> Parser<'t> {
    fn parse_pattern_list(&mut self) -> Option<Vec<PathPattern>> {
        let mut patterns = vec![self.parse_path_pattern()?];
        while self.eat(TokenKind::Comma) {
            patterns.push(self.parse_path_pattern()?);
        }
        Some(patterns)
    }

    fn parse_path_pattern(&mut self) -> Option<PathPattern> {
        let start = self.parse_node_pattern()?;
        let mut segments = Vec::new();
        while self.at(TokenKind::Dash) || self.at(TokenKind::LeftArrow) {
            let rel = self.parse_relationship_pattern()?;
            let node = self.parse_node_pattern()?;
            segments.push((rel, node));
        }
        Some(PathPattern { start, segments })
    }

    fn parse_node_pattern(&mut self) -> Option<NodePattern> {
        self.expect(TokenKind::LParen)?;
        let mut node = NodePattern::default();
        if self.at(TokenKind::Identifier) {
            node.variable = Some(self.advance().lexeme);
        }
        while self.eat(TokenKind::Colon) {
            node.labels.push(self.expect(TokenKind::Identifier)?.lexeme.clone());
        }
        if self.at(TokenKind::LBrace) {
            node.properties = self.parse_prop_map()?;
        }
        self.expect(TokenKind::RParen)?;
        Some(node)
    }

    /// `-[var:TYPE*min..max {props}]->`, `<-[...]-`, or `-[...]-`.
    fn parse_relationship_pattern(&mut self) -> Option<RelationshipPattern> {
        let points_left = self.eat(TokenKind::LeftArrow);
        if !points_left {
            self.expect(TokenKind::Dash)?;
        }
        self.expect(TokenKind::LBracket)?;

        let mut variable = None;
        if self.at(TokenKind::Identifier) {
            variable = Some(self.advance().lexeme);
        }
        let mut rel_type = None;
        if self.eat(TokenKind::Colon) {
            rel_type = Some(self.expect(TokenKind::Identifier)?.lexeme.clone());
        }

        // Fixed-length (no '*') normalizes to 1..1 (open question #3).
        let mut min_hops = 1usize;
        let mut max_hops = Some(1usize);
        if self.eat(TokenKind::Star) {
            let (lo, hi) = self.parse_hop_range();
            min_hops = lo;
            max_hops = hi;
        }

        let properties = if self.at(TokenKind::LBrace) { self.parse_prop_map()? } else { Vec::new() };
        self.expect(TokenKind::RBracket)?;

        let direction = if points_left {
            self.expect(TokenKind::Dash)?;
            Direction::Incoming
        } else if self.eat(TokenKind::Arrow) {
            Direction::Outgoing
        } else if self.eat(TokenKind::Dash) {
            Direction::Both
        } else {
            self.error("expected '->' or '-' to close relationship pattern");
            return None;
        };

        Some(RelationshipPattern { variable, rel_type, direction, properties, min_hops, max_hops })
    }

    /// The portion of `range := INT ('..' INT?)? | '..' INT` following `*`.
    /// A bare `*` (no range at all) means `1..unbounded`.
    fn parse_hop_range(&mut self) -> (usize, Option<usize>) {
        if self.eat(TokenKind::DotDot) {
            return (1, self.parse_uint());
        }
        match self.parse_uint() {
            Some(n) => {
                if self.eat(TokenKind::DotDot) {
                    (n, self.parse_uint())
                } else {
                    (n, Some(n))
                }
            }
            None => (1, None),
        }
    }

    fn parse_uint(&mut self) -> Option<usize> {
        if self.at(TokenKind::Integer) {
            let lexeme = self.advance().lexeme;
            lexeme.parse::<usize>().ok()
        } else {
            None
        }
    }

    /// Property maps accept literals only — `{name: otherVar.name}` is
    /// rejected here; property-to-property comparison belongs in WHERE.
    fn parse_prop_map(&mut self) -> Option<Vec<(String, Expr)>> {
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let key = self.expect(TokenKind::Identifier)?.lexeme.clone();
                self.expect(TokenKind::Colon)?;
                let value = self.parse_literal()?;
                props.push((key, Expr::Literal(value)));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(props)
    }

    fn parse_literal(&mut self) -> Option<crate::model::Value> {
        use crate::model::Value;
        match self.peek_kind() {
            TokenKind::StringLiteral => Some(Value::String(self.advance().lexeme)),
            TokenKind::Integer => self.advance().lexeme.parse::<i64>().ok().map(Value::Int),
            TokenKind::Float => self.advance().lexeme.parse::<f64>().ok().map(Value::Float),
            TokenKind::True => {
                self.advance();
                Some(Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Some(Value::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Some(Value::Null)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            other => {
                self.error(format!("expected a literal, found {other:?}"));
                None
            }
        }
    }

    fn parse_list_literal(&mut self) -> Option<crate::model::Value> {
        use crate::model::Value;
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        if !self.at(TokenKind::RBracket) {
            loop {
                items.push(self.parse_literal()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Some(Value::List(items))
    }
}

// ============================================================================
// Writes: CREATE reuses pattern_list above. SET / DELETE below.
// ============================================================================

impl<'t> Parser<'t> {
    fn parse_set_items(&mut self) -> Option<Vec<SetItem>> {
        let mut items = vec![self.parse_set_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_set_item()?);
        }
        Some(items)
    }

    fn parse_set_item(&mut self) -> Option<SetItem> {
        let variable = self.expect(TokenKind::Identifier)?.lexeme.clone();
        self.expect(TokenKind::Dot)?;
        let property = self.expect(TokenKind::Identifier)?.lexeme.clone();
        self.expect(TokenKind::Eq)?;
        let value = self.parse_or_expr()?;
        Some(SetItem { variable, property, value })
    }

    fn parse_ident_list(&mut self) -> Option<Vec<String>> {
        let mut idents = vec![self.expect(TokenKind::Identifier)?.lexeme.clone()];
        while self.eat(TokenKind::Comma) {
            idents.push(self.expect(TokenKind::Identifier)?.lexeme.clone());
        }
        Some(idents)
    }

    fn parse_return_items(&mut self) -> Option<Vec<ReturnItem>> {
        let mut items = vec![self.parse_return_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_return_item()?);
        }
        Some(items)
    }

    fn parse_return_item(&mut self) -> Option<ReturnItem> {
        let expr = self.parse_or_expr()?;
        Some(ReturnItem { expr, alias: None })
    }
}

// ============================================================================
// Expressions: orExpr -> xorExpr -> andExpr -> notExpr -> cmpExpr -> atom
// ============================================================================

impl<'t> Parser<'t> {
    fn parse_or_expr(&mut self) -> Option<Expr> {
        let mut operands = vec![self.parse_xor_expr()?];
        while self.eat(TokenKind::Or) {
            operands.push(self.parse_xor_expr()?);
        }
        Some(if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            Expr::Logical { op: LogicalOp::Or, operands }
        })
    }

    fn parse_xor_expr(&mut self) -> Option<Expr> {
        let mut operands = vec![self.parse_and_expr()?];
        while self.eat(TokenKind::Xor) {
            operands.push(self.parse_and_expr()?);
        }
        Some(if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            Expr::Logical { op: LogicalOp::Xor, operands }
        })
    }

    fn parse_and_expr(&mut self) -> Option<Expr> {
        let mut operands = vec![self.parse_not_expr()?];
        while self.eat(TokenKind::And) {
            operands.push(self.parse_not_expr()?);
        }
        Some(if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            Expr::Logical { op: LogicalOp::And, operands }
        })
    }

    fn parse_not_expr(&mut self) -> Option<Expr> {
        if self.at(TokenKind::Not) {
            if self.peek_kind_at(1) == TokenKind::Exists {
                self.advance(); // NOT
                self.advance(); // EXISTS
                return self.parse_exists_tail(false);
            }
            self.advance();
            let operand = self.parse_not_expr()?;
            return Some(Expr::Logical { op: LogicalOp::Not, operands: vec![operand] });
        }
        self.parse_cmp_expr()
    }

    fn parse_cmp_expr(&mut self) -> Option<Expr> {
        let left = self.parse_atom()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Neq => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Lte => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Gte => CompareOp::Ge,
            TokenKind::In => CompareOp::In,
            TokenKind::Contains => CompareOp::Contains,
            TokenKind::Starts => {
                self.advance();
                if !self.eat(TokenKind::With) {
                    self.error("expected WITH after STARTS");
                    return None;
                }
                let right = self.parse_atom()?;
                return Some(Expr::Comparison { op: CompareOp::StartsWith, left: Box::new(left), right: Some(Box::new(right)) });
            }
            TokenKind::Ends => {
                self.advance();
                if !self.eat(TokenKind::With) {
                    self.error("expected WITH after ENDS");
                    return None;
                }
                let right = self.parse_atom()?;
                return Some(Expr::Comparison { op: CompareOp::EndsWith, left: Box::new(left), right: Some(Box::new(right)) });
            }
            TokenKind::Is => {
                self.advance();
                let negate = self.eat(TokenKind::Not);
                if !self.eat(TokenKind::Null) {
                    self.error("expected NULL after IS [NOT]");
                    return None;
                }
                let op = if negate { CompareOp::IsNotNull } else { CompareOp::IsNull };
                return Some(Expr::Comparison { op, left: Box::new(left), right: None });
            }
            _ => return Some(left),
        };
        self.advance();
        let right = self.parse_atom()?;
        Some(Expr::Comparison { op, left: Box::new(left), right: Some(Box::new(right)) })
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_or_expr()?;
                self.expect(TokenKind::RParen)?;
                Some(expr)
            }
            TokenKind::Exists => {
                self.advance();
                self.parse_exists_tail(true)
            }
            TokenKind::Not if self.peek_kind_at(1) == TokenKind::Exists => {
                self.advance();
                self.advance();
                self.parse_exists_tail(false)
            }
            TokenKind::Identifier => {
                let name = self.advance().lexeme;
                if self.eat(TokenKind::Dot) {
                    let property = self.expect(TokenKind::Identifier)?.lexeme.clone();
                    Some(Expr::Property { object: name, property })
                } else {
                    Some(Expr::Variable { name })
                }
            }
            TokenKind::StringLiteral
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::LBracket => self.parse_literal().map(Expr::Literal),
            other => {
                self.error(format!("unexpected token {other:?} in expression"));
                None
            }
        }
    }

    fn parse_exists_tail(&mut self, positive: bool) -> Option<Expr> {
        self.expect(TokenKind::LParen)?;
        let pattern = self.parse_path_pattern()?;
        self.expect(TokenKind::RParen)?;
        Some(Expr::Exists { positive, pattern })
    }
}
