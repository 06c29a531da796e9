use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{ErrorCode, SyntaxError};
use crate::geometry::GeometryKind;
use crate::stack::ensure_sufficient_stack;
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Positions where a coordinate pair was already tried and rejected.
    failed_pairs: HashSet<usize>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, failed_pairs: HashSet::new() }
    }

    /// `program := sequence EOF`
    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        let program = self.parse_sequence()?;
        if !self.is_at_end() {
            return Err(self.unexpected("`;` or end of input"));
        }
        Ok(program)
    }

    // ─── Sequences ───────────────────────────────────────────────────────────

    /// Semicolon-separated items up to `)`, `}` or end of input.
    fn parse_sequence(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        let mut items = Vec::new();

        loop {
            if self.at_sequence_end() { break; }
            if self.matches(TokenKind::Semicolon) { continue; }

            items.push(self.parse_item()?);

            if !self.matches(TokenKind::Semicolon) { break; }
        }

        Ok(Expr::Sequence(items, span))
    }

    fn at_sequence_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof)
    }

    /// `IDENT '=' expr | expr`
    fn parse_item(&mut self) -> Result<Expr, SyntaxError> {
        if let TokenKind::Ident(name) = self.peek_kind() {
            if self.peek_next_is(TokenKind::Eq) {
                let span = self.span();
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Expr::Declaration { name, value: Box::new(value), span });
            }
        }
        self.parse_expr()
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        ensure_sufficient_stack(|| self.parse_or())
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::Or) {
            let span = *left.span();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::And) {
            let span = *left.span();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_comparison()?;
        loop {
            let negated = match self.peek_kind() {
                TokenKind::EqEq   => false,
                TokenKind::BangEq => true,
                _ => break,
            };
            let span = *left.span();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Equality { negated, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_pipeline()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt   => CompareOp::Lt,
                TokenKind::LtEq => CompareOp::LtEq,
                TokenKind::Gt   => CompareOp::Gt,
                TokenKind::GtEq => CompareOp::GtEq,
                _ => break,
            };
            let span = *left.span();
            self.advance();
            let right = self.parse_pipeline()?;
            left = Expr::Comparison { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    /// Pipes and `++` share one left-associative level.
    fn parse_pipeline(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;
        loop {
            let kind = match self.peek_kind() {
                TokenKind::Pipe     => Some(PipeKind::Apply),
                TokenKind::PipePipe => Some(PipeKind::Map),
                TokenKind::PipeGt   => Some(PipeKind::Filter),
                TokenKind::PipeStar => Some(PipeKind::DeepMap),
                TokenKind::PlusPlus => None,
                _ => break,
            };
            let span = *left.span();
            self.advance();
            let right = self.parse_additive()?;
            left = match kind {
                Some(kind) => Expr::Pipe { kind, source: Box::new(left), callable: Box::new(right), span },
                None => Expr::Concat { left: Box::new(left), right: Box::new(right), span },
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            let span = *left.span();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star    => ArithOp::Mul,
                TokenKind::Slash   => ArithOp::Div,
                TokenKind::Percent => ArithOp::Mod,
                _ => break,
            };
            let span = *left.span();
            self.advance();
            let right = self.parse_power()?;
            left = Expr::Arithmetic { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    /// Right-associative: `2 ^ 3 ^ 2` is `2 ^ 9`.
    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_unary()?;
        if self.check(TokenKind::Caret) {
            let span = *base.span();
            self.advance();
            let exponent = ensure_sufficient_stack(|| self.parse_power())?;
            return Ok(Expr::Arithmetic {
                op: ArithOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
                span,
            });
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        if self.matches(TokenKind::Minus) {
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            return Ok(Expr::Neg(Box::new(operand), span));
        }
        if self.matches(TokenKind::Bang) {
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            return Ok(Expr::Not(Box::new(operand), span));
        }
        self.parse_postfix()
    }

    /// Accessor chain `target:name(args):name(args)`.
    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        while self.check(TokenKind::Colon) {
            let span = *expr.span();
            self.advance();
            let property = self.expect_ident()?;
            let args = self.parse_args()?;
            expr = Expr::Accessor { target: Box::new(expr), property, args, span };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();

        match self.peek_kind() {
            TokenKind::Number(n) => { self.advance(); Ok(Expr::Number(n, span)) }
            TokenKind::Bool(b)   => { self.advance(); Ok(Expr::Bool(b, span)) }
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_call_tail(Expr::Ident(name, span))
            }
            TokenKind::Geometry(kind) => self.parse_geometry(kind),
            TokenKind::Function => {
                let function = self.parse_function()?;
                self.parse_call_tail(function)
            }
            TokenKind::Generate => self.parse_generate(),
            TokenKind::If => self.parse_if(),
            TokenKind::LParen => {
                if let Some((x, y)) = self.try_parenthesized_pair() {
                    return Ok(point_literal(x, y, span));
                }
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// A single invocation directly after an identifier or function literal.
    fn parse_call_tail(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        if !self.check(TokenKind::LParen) {
            return Ok(callee);
        }
        let span = *callee.span();
        let args = self.parse_args()?;
        Ok(Expr::Call { callee: Box::new(callee), args, span })
    }

    /// `'(' [expr (',' expr)*] ')'`
    fn parse_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.parse_list(true, |p| p.parse_expr())
    }

    // ─── Functions, Generate, conditionals ───────────────────────────────────

    /// `Function ( params => body )`
    fn parse_function(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        self.expect(TokenKind::Function)?;
        self.expect(TokenKind::LParen)?;

        let params = if self.check(TokenKind::LParen) {
            self.parse_list(true, |p| p.expect_ident())?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect(TokenKind::FatArrow)?;

        let body = if self.matches(TokenKind::LBrace) {
            let body = self.parse_sequence()?;
            self.expect(TokenKind::RBrace)?;
            body
        } else {
            self.parse_sequence()?
        };
        self.expect(TokenKind::RParen)?;

        Ok(Expr::Function { params, body: Rc::new(body), span })
    }

    /// `Generate count value`
    fn parse_generate(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        self.expect(TokenKind::Generate)?;
        let count = self.parse_additive()?;
        let body = self.parse_additive()?;
        Ok(Expr::Generate { count: Box::new(count), body: Box::new(body), span })
    }

    /// `if cond then ( seq ) else ( seq )`
    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_branch()?;
        self.expect(TokenKind::Else)?;
        let else_branch = self.parse_branch()?;
        Ok(Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span,
        })
    }

    fn parse_branch(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        if let Some((x, y)) = self.try_parenthesized_pair() {
            return Ok(point_literal(x, y, span));
        }
        self.expect(TokenKind::LParen)?;
        let body = self.parse_sequence()?;
        self.expect(TokenKind::RParen)?;
        Ok(body)
    }

    // ─── Geometry literals ───────────────────────────────────────────────────

    /// `KEYWORD EMPTY`, `KEYWORD ( ... )`, or a bare keyword used as a type tag.
    fn parse_geometry(&mut self, kind: GeometryKind) -> Result<Expr, SyntaxError> {
        let span = self.span();
        self.advance();

        if let TokenKind::Ident(word) = self.peek_kind() {
            if word.eq_ignore_ascii_case("EMPTY") {
                self.advance();
                return Ok(Expr::Geometry { kind, body: GeometryBody::Empty, span });
            }
        }
        if !self.check(TokenKind::LParen) {
            return Ok(Expr::TypeTag(kind, span));
        }

        let body = match kind {
            GeometryKind::Point => {
                self.expect(TokenKind::LParen)?;
                let (x, y) = self.parse_pair()?;
                self.expect(TokenKind::RParen)?;
                GeometryBody::Point(Box::new(x), Box::new(y))
            }
            GeometryKind::LineString | GeometryKind::MultiPoint => {
                GeometryBody::Elements(self.parse_list(false, |p| p.parse_element())?)
            }
            GeometryKind::GeometryCollection => {
                GeometryBody::Elements(self.parse_list(true, |p| p.parse_element())?)
            }
            GeometryKind::Polygon | GeometryKind::MultiLineString => {
                GeometryBody::Rings(self.parse_list(false, |p| p.parse_ring())?)
            }
            GeometryKind::MultiPolygon => GeometryBody::Polygons(
                self.parse_list(false, |p| p.parse_list(false, |p| p.parse_ring()))?,
            ),
        };

        Ok(Expr::Geometry { kind, body, span })
    }

    fn parse_ring(&mut self) -> Result<Vec<Element>, SyntaxError> {
        self.parse_list(false, |p| p.parse_element())
    }

    /// A bare coordinate pair if one fits, otherwise any expression.
    fn parse_element(&mut self) -> Result<Element, SyntaxError> {
        if let Some((x, y)) = self.try_pair() {
            return Ok(Element::Pair(x, y));
        }
        Ok(Element::Value(self.parse_expr()?))
    }

    /// `coord coord [coord [coord]]`, keeping X and Y.
    fn parse_pair(&mut self) -> Result<(Expr, Expr), SyntaxError> {
        let x = self.parse_coord()?;
        let y = self.parse_coord()?;
        for _ in 0..2 {
            if !self.starts_coord() { break; }
            self.parse_coord()?;
        }
        Ok((x, y))
    }

    /// Tries a pair that ends at `,` or `)`. Restores the position on failure.
    fn try_pair(&mut self) -> Option<(Expr, Expr)> {
        let start = self.pos;
        if self.failed_pairs.contains(&start) {
            return None;
        }
        match self.parse_pair() {
            Ok(pair) if matches!(self.peek_kind(), TokenKind::Comma | TokenKind::RParen) => Some(pair),
            _ => {
                self.pos = start;
                self.failed_pairs.insert(start);
                None
            }
        }
    }

    /// `( x y )` as a whole, or nothing consumed.
    fn try_parenthesized_pair(&mut self) -> Option<(Expr, Expr)> {
        let start = self.pos;
        if !self.matches(TokenKind::LParen) {
            return None;
        }
        match self.try_pair() {
            Some(pair) if self.matches(TokenKind::RParen) => Some(pair),
            _ => {
                self.pos = start;
                None
            }
        }
    }

    /// A signed number, an identifier with an optional call, or `( expr )`.
    fn parse_coord(&mut self) -> Result<Expr, SyntaxError> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Number(n) => { self.advance(); Ok(Expr::Number(n, span)) }
            TokenKind::Plus | TokenKind::Minus if self.at_coordinate_sign() => {
                let negative = self.check(TokenKind::Minus);
                self.advance();
                let tok = self.advance();
                match tok.kind {
                    TokenKind::Number(n) => Ok(Expr::Number(if negative { -n } else { n }, span)),
                    _ => Err(self.error_at(&tok, "expected number after sign")),
                }
            }
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_call_tail(Expr::Ident(name, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("coordinate")),
        }
    }

    fn starts_coord(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::LParen => true,
            TokenKind::Plus | TokenKind::Minus => self.at_coordinate_sign(),
            _ => false,
        }
    }

    /// `4 -18` is two coordinates; `a - 1` and `a-1` are subtraction. The sign
    /// must touch the number and be separated from whatever precedes it.
    fn at_coordinate_sign(&self) -> bool {
        let sign = self.peek();
        let Some(number) = self.tokens.get(self.pos + 1) else { return false };
        if !matches!(number.kind, TokenKind::Number(_)) || !sign.touches(number) {
            return false;
        }
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(prev) => !prev.touches(sign) || matches!(prev.kind, TokenKind::LParen | TokenKind::Comma),
            None => true,
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    /// `'(' item (',' item)* ')'`, optionally allowing `()`.
    fn parse_list<T>(
        &mut self,
        allow_empty: bool,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let mut items = Vec::new();
        if allow_empty && self.matches(TokenKind::RParen) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RParen)?;
        Ok(items)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_is(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(SyntaxError::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {}, found {}", kind.describe(), tok.kind.describe()),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Ident(s) => { self.advance(); Ok(s) }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let tok = self.peek();
        SyntaxError::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {}", expected, tok.kind.describe()),
        )
    }

    fn error_at(&self, tok: &Token, msg: &str) -> SyntaxError {
        SyntaxError::new(ErrorCode::P001, tok.line, tok.column, msg)
    }
}

fn point_literal(x: Expr, y: Expr, span: Span) -> Expr {
    Expr::Geometry {
        kind: GeometryKind::Point,
        body: GeometryBody::Point(Box::new(x), Box::new(y)),
        span,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
