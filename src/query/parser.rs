//! Recursive-descent parser: tokens → [`Expr`]. Precedence is encoded
//! directly in the call graph (one method per precedence level) the way the
//! teacher crate's SQL parser layers `parse_or` over `parse_and` over
//! `parse_comparison` rather than building a table-driven Pratt parser.

use super::lexer::{Lexer, Token, TokenKind};
use super::{BinaryOp, Expr, Position, RangeEndpoint, UnaryOp};
use crate::error::{ParseErrorKind, TranslateError, TranslateResult};

/// Parse `query` into an [`Expr`]. `max_depth` bounds group/unary nesting;
/// `max_query_length` bounds the raw input length (checked before lexing).
pub fn parse(query: &str, max_depth: usize, max_query_length: usize) -> TranslateResult<Expr> {
    let tokens = Lexer::new(query, max_query_length)?.tokenize()?;
    let mut parser = Parser { tokens, pos: 0, depth: 0, max_depth };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, delta: usize) -> &TokenKind {
        self.tokens.get(self.pos + delta).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> TranslateResult<Token> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            let pos = self.position();
            Err(TranslateError::parse(
                ParseErrorKind::ExpectedToken {
                    expected: format!("{:?}", kind),
                    found: format!("{:?}", self.peek_kind()),
                },
                pos.offset,
                pos.line,
                pos.column,
            ))
        }
    }

    fn expect_eof(&mut self) -> TranslateResult<()> {
        if matches!(self.peek_kind(), TokenKind::Eof) {
            Ok(())
        } else {
            let pos = self.position();
            Err(TranslateError::parse(
                ParseErrorKind::UnexpectedToken { found: format!("{:?}", self.peek_kind()) },
                pos.offset,
                pos.line,
                pos.column,
            ))
        }
    }

    fn enter_depth(&mut self, pos: Position) -> TranslateResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(TranslateError::parse(
                ParseErrorKind::DepthExceeded,
                pos.offset,
                pos.line,
                pos.column,
            ));
        }
        Ok(())
    }

    fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    /// True if the current token can open a new unary-expr, used to detect an
    /// implicit OR join between two juxtaposed clauses.
    fn starts_unary_expr(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ident(_)
                | TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Regex(_)
                | TokenKind::LParen
                | TokenKind::LBrack
                | TokenKind::LBrace
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::Star
        )
    }

    fn parse_or(&mut self) -> TranslateResult<Expr> {
        let mut left = self.parse_and()?;
        loop {
            if matches!(self.peek_kind(), TokenKind::Or) {
                let pos = self.position();
                self.advance();
                let right = self.parse_and()?;
                left = Expr::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right), position: pos };
            } else if self.starts_unary_expr() {
                let pos = self.position();
                let right = self.parse_and()?;
                left = Expr::Binary { op: BinaryOp::ImplicitOr, left: Box::new(left), right: Box::new(right), position: pos };
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> TranslateResult<Expr> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek_kind(), TokenKind::And) {
            let pos = self.position();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right), position: pos };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> TranslateResult<Expr> {
        let pos = self.position();
        let op = match self.peek_kind() {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Plus => Some(UnaryOp::Required),
            TokenKind::Minus => Some(UnaryOp::Prohibited),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            self.enter_depth(pos)?;
            let inner = self.parse_unary()?;
            self.exit_depth();
            return Ok(Expr::Unary { op, inner: Box::new(inner), position: pos });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> TranslateResult<Expr> {
        let pos = self.position();
        let expr = match self.peek_kind().clone() {
            TokenKind::LParen => {
                self.advance();
                self.enter_depth(pos)?;
                let inner = self.parse_or()?;
                self.exit_depth();
                self.expect(&TokenKind::RParen)?;
                Expr::Group { inner: Box::new(inner), position: pos }
            }
            TokenKind::Ident(name) if name == "_exists_" && matches!(self.peek_at(1), TokenKind::Colon) => {
                self.advance();
                self.advance();
                let field = self.expect_ident()?;
                Expr::Exists { field, position: pos }
            }
            TokenKind::Ident(name) => {
                self.advance();
                if matches!(self.peek_kind(), TokenKind::Colon) {
                    self.advance();
                    let value = self.parse_value()?;
                    if let Expr::Wildcard { pattern, .. } = &value {
                        if pattern == "*" {
                            return self.finish_boost(Expr::Exists { field: name, position: pos });
                        }
                    }
                    Expr::Field { field: name, value: Box::new(value), position: pos }
                } else {
                    let bare = self.classify_bare_ident(name, pos);
                    self.finish_fuzzy(bare, pos)?
                }
            }
            _ => self.parse_value()?,
        };
        self.finish_boost(expr)
    }

    /// A field name always resolves via an `IDENT` token; `_exists_:field`
    /// requires the same.
    fn expect_ident(&mut self) -> TranslateResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => {
                let pos = self.position();
                Err(TranslateError::parse(
                    ParseErrorKind::ExpectedToken { expected: "field name".into(), found: format!("{:?}", other) },
                    pos.offset,
                    pos.line,
                    pos.column,
                ))
            }
        }
    }

    /// Parse a bare value — the right-hand side of `field:` or a top-level
    /// literal — including its `~N` fuzzy/proximity suffix.
    fn parse_value(&mut self) -> TranslateResult<Expr> {
        let pos = self.position();
        let value = match self.peek_kind().clone() {
            TokenKind::Number(text) => {
                self.advance();
                Expr::Number { text, position: pos }
            }
            TokenKind::String(text) => {
                self.advance();
                Expr::Phrase { text, position: pos }
            }
            TokenKind::Regex(pattern) => {
                self.advance();
                Expr::Regex { pattern, position: pos }
            }
            TokenKind::Star => {
                self.advance();
                Expr::Wildcard { pattern: "*".to_string(), position: pos }
            }
            TokenKind::LBrack | TokenKind::LBrace => return self.parse_range(),
            TokenKind::Ident(name) => {
                self.advance();
                self.classify_bare_ident(name, pos)
            }
            other => {
                return Err(TranslateError::parse(
                    ParseErrorKind::UnexpectedToken { found: format!("{:?}", other) },
                    pos.offset,
                    pos.line,
                    pos.column,
                ));
            }
        };
        self.finish_fuzzy(value, pos)
    }

    fn classify_bare_ident(&self, name: String, position: Position) -> Expr {
        if name.contains('*') || name.contains('?') {
            Expr::Wildcard { pattern: name, position }
        } else {
            Expr::Term { text: name, position }
        }
    }

    /// Attach an optional `~N` suffix: `Fuzzy` over a term-like value,
    /// `Proximity` over a phrase.
    fn finish_fuzzy(&mut self, inner: Expr, position: Position) -> TranslateResult<Expr> {
        if let TokenKind::Tilde(n) = self.peek_kind().clone() {
            self.advance();
            return Ok(match inner {
                Expr::Phrase { .. } => {
                    Expr::Proximity { inner: Box::new(inner), slop: n.unwrap_or(0), position }
                }
                _ => Expr::Fuzzy { inner: Box::new(inner), edit_distance: n.unwrap_or(2), position },
            });
        }
        Ok(inner)
    }

    /// Attach an optional `^N` boost, the highest-precedence postfix and the
    /// outermost wrapping around a (possibly field-qualified) primary.
    fn finish_boost(&mut self, inner: Expr) -> TranslateResult<Expr> {
        if let TokenKind::Caret(n) = self.peek_kind().clone() {
            let position = self.position();
            self.advance();
            return Ok(Expr::Boost { inner: Box::new(inner), boost: n, position });
        }
        Ok(inner)
    }

    fn parse_range(&mut self) -> TranslateResult<Expr> {
        let position = self.position();
        let inclusive_start = matches!(self.peek_kind(), TokenKind::LBrack);
        self.advance();
        let start = self.parse_range_endpoint()?;
        self.expect(&TokenKind::To)?;
        let end = self.parse_range_endpoint()?;
        let inclusive_end = match self.peek_kind() {
            TokenKind::RBrack => true,
            TokenKind::RBrace => false,
            other => {
                let pos = self.position();
                return Err(TranslateError::parse(
                    ParseErrorKind::ExpectedToken { expected: "] or }".into(), found: format!("{:?}", other) },
                    pos.offset,
                    pos.line,
                    pos.column,
                ));
            }
        };
        self.advance();
        self.finish_fuzzy(
            Expr::Range { start, end, inclusive_start, inclusive_end, position },
            position,
        )
    }

    fn parse_range_endpoint(&mut self) -> TranslateResult<RangeEndpoint> {
        match self.peek_kind().clone() {
            TokenKind::Star => {
                self.advance();
                Ok(RangeEndpoint::Unbounded)
            }
            TokenKind::Number(text) => {
                self.advance();
                Ok(RangeEndpoint::Value(text))
            }
            TokenKind::Ident(text) => {
                self.advance();
                Ok(RangeEndpoint::Value(text))
            }
            other => {
                let pos = self.position();
                Err(TranslateError::parse(
                    ParseErrorKind::ExpectedToken { expected: "range endpoint".into(), found: format!("{:?}", other) },
                    pos.offset,
                    pos.line,
                    pos.column,
                ))
            }
        }
    }
}
