//! The query abstract syntax tree shared by the parser, the parse cache, and
//! the translator. A tagged-variant type with exhaustive matching, the way
//! the teacher crate's `query_common.rs` models `WhereExpr`/`ArithExpr`.

pub mod cache;
pub mod lexer;
pub mod parser;

pub use parser::parse;

use serde::{Deserialize, Serialize};

/// Source position of an AST node: byte offset plus 1-based line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Self { offset: 0, line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Required,
    Prohibited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    /// Juxtaposition with no explicit `OR`/`AND` keyword between the two
    /// operands (spec.md §4.3: "Juxtaposition ... is parsed as an implicit
    /// OR"). Kept distinct from `Or` so `strictOperators` can promote it to
    /// a translation error (spec.md §4.3: "An explicit strictOperators
    /// schema option may promote this to an error at translation time").
    ImplicitOr,
}

impl BinaryOp {
    pub fn is_or(&self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::ImplicitOr)
    }
}

/// A range endpoint: either a literal value or `*` (unbounded).
#[derive(Debug, Clone, PartialEq)]
pub enum RangeEndpoint {
    Unbounded,
    Value(String),
}

/// The query abstract syntax tree. Every variant carries a [`Position`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Term { text: String, position: Position },
    Phrase { text: String, position: Position },
    Number { text: String, position: Position },
    Field { field: String, value: Box<Expr>, position: Position },
    Range {
        start: RangeEndpoint,
        end: RangeEndpoint,
        inclusive_start: bool,
        inclusive_end: bool,
        position: Position,
    },
    Wildcard { pattern: String, position: Position },
    Regex { pattern: String, position: Position },
    Fuzzy { inner: Box<Expr>, edit_distance: u32, position: Position },
    Proximity { inner: Box<Expr>, slop: u32, position: Position },
    Exists { field: String, position: Position },
    Boost { inner: Box<Expr>, boost: f64, position: Position },
    Unary { op: UnaryOp, inner: Box<Expr>, position: Position },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, position: Position },
    Group { inner: Box<Expr>, position: Position },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Term { position, .. }
            | Expr::Phrase { position, .. }
            | Expr::Number { position, .. }
            | Expr::Field { position, .. }
            | Expr::Range { position, .. }
            | Expr::Wildcard { position, .. }
            | Expr::Regex { position, .. }
            | Expr::Fuzzy { position, .. }
            | Expr::Proximity { position, .. }
            | Expr::Exists { position, .. }
            | Expr::Boost { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Group { position, .. } => *position,
        }
    }

    /// Strip `Group` wrappers and zero-cost metadata so structurally
    /// equivalent ASTs compare equal regardless of redundant parenthesization
    /// (spec.md P4: parse(pretty_print(ast)) == ast modulo redundant groups).
    pub fn unwrap_groups(&self) -> &Expr {
        match self {
            Expr::Group { inner, .. } => inner.unwrap_groups(),
            other => other,
        }
    }

    /// Structural equality that ignores `Group` wrapping (at any depth) and
    /// source [`Position`] — the comparison spec.md P4 calls for.
    pub fn semantic_eq(&self, other: &Expr) -> bool {
        match (self.unwrap_groups(), other.unwrap_groups()) {
            (Expr::Term { text: a, .. }, Expr::Term { text: b, .. }) => a == b,
            (Expr::Phrase { text: a, .. }, Expr::Phrase { text: b, .. }) => a == b,
            (Expr::Number { text: a, .. }, Expr::Number { text: b, .. }) => a == b,
            (
                Expr::Field { field: fa, value: va, .. },
                Expr::Field { field: fb, value: vb, .. },
            ) => fa == fb && va.semantic_eq(vb),
            (
                Expr::Range { start: sa, end: ea, inclusive_start: isa, inclusive_end: iea, .. },
                Expr::Range { start: sb, end: eb, inclusive_start: isb, inclusive_end: ieb, .. },
            ) => sa == sb && ea == eb && isa == isb && iea == ieb,
            (Expr::Wildcard { pattern: a, .. }, Expr::Wildcard { pattern: b, .. }) => a == b,
            (Expr::Regex { pattern: a, .. }, Expr::Regex { pattern: b, .. }) => a == b,
            (
                Expr::Fuzzy { inner: ia, edit_distance: da, .. },
                Expr::Fuzzy { inner: ib, edit_distance: db, .. },
            ) => da == db && ia.semantic_eq(ib),
            (
                Expr::Proximity { inner: ia, slop: sa, .. },
                Expr::Proximity { inner: ib, slop: sb, .. },
            ) => sa == sb && ia.semantic_eq(ib),
            (Expr::Exists { field: a, .. }, Expr::Exists { field: b, .. }) => a == b,
            (
                Expr::Boost { inner: ia, boost: ba, .. },
                Expr::Boost { inner: ib, boost: bb, .. },
            ) => (ba - bb).abs() < f64::EPSILON && ia.semantic_eq(ib),
            (
                Expr::Unary { op: oa, inner: ia, .. },
                Expr::Unary { op: ob, inner: ib, .. },
            ) => oa == ob && ia.semantic_eq(ib),
            (
                Expr::Binary { op: oa, left: la, right: ra, .. },
                Expr::Binary { op: ob, left: lb, right: rb, .. },
            ) => oa == ob && la.semantic_eq(lb) && ra.semantic_eq(rb),
            _ => false,
        }
    }

    /// Render the AST back to Lucene-style query text. Used by property
    /// tests (P4) and surfaced as `metadata.normalizedQuery` by the
    /// translator.
    pub fn pretty_print(&self) -> String {
        match self {
            Expr::Term { text, .. } => text.clone(),
            Expr::Phrase { text, .. } => format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"")),
            Expr::Number { text, .. } => text.clone(),
            Expr::Field { field, value, .. } => format!("{}:{}", field, value.pretty_print()),
            Expr::Range { start, end, inclusive_start, inclusive_end, .. } => {
                let open = if *inclusive_start { '[' } else { '{' };
                let close = if *inclusive_end { ']' } else { '}' };
                format!("{}{} TO {}{}", open, render_endpoint(start), render_endpoint(end), close)
            }
            Expr::Wildcard { pattern, .. } => pattern.clone(),
            Expr::Regex { pattern, .. } => format!("/{}/", pattern),
            Expr::Fuzzy { inner, edit_distance, .. } => format!("{}~{}", inner.pretty_print(), edit_distance),
            Expr::Proximity { inner, slop, .. } => format!("{}~{}", inner.pretty_print(), slop),
            Expr::Exists { field, .. } => format!("_exists_:{}", field),
            Expr::Boost { inner, boost, .. } => format!("{}^{}", inner.pretty_print(), boost),
            Expr::Unary { op, inner, .. } => {
                let prefix = match op {
                    UnaryOp::Not => "NOT ",
                    UnaryOp::Required => "+",
                    UnaryOp::Prohibited => "-",
                };
                format!("{}{}", prefix, inner.pretty_print())
            }
            Expr::Binary { op, left, right, .. } => match op {
                BinaryOp::And => format!("{} AND {}", left.pretty_print(), right.pretty_print()),
                BinaryOp::Or => format!("{} OR {}", left.pretty_print(), right.pretty_print()),
                BinaryOp::ImplicitOr => format!("{} {}", left.pretty_print(), right.pretty_print()),
            },
            Expr::Group { inner, .. } => format!("({})", inner.pretty_print()),
        }
    }
}

fn render_endpoint(e: &RangeEndpoint) -> String {
    match e {
        RangeEndpoint::Unbounded => "*".to_string(),
        RangeEndpoint::Value(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_round_trips_binary() {
        let ast = parser::parse("productCode:13w42 AND region:ca", 50, 10_000).expect("parses");
        let printed = ast.pretty_print();
        let reparsed = parser::parse(&printed, 50, 10_000).expect("reparses");
        assert!(ast.semantic_eq(&reparsed), "{:?} != {:?}", ast, reparsed);
    }

    #[test]
    fn position_accessor_reports_leaf_position() {
        let ast = parser::parse("hello", 50, 10_000).unwrap();
        assert_eq!(ast.position().offset, 0);
    }
}
