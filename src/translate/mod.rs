//! Translator: the generic (dialect-independent) contract of spec.md §4.5.
//!
//! A `Translation` is the tuple (WHERE fragment, ordered parameters, ordered
//! parameter types, metadata) spec.md calls for. Concrete dialects (just
//! `postgres` for now, spec.md §4.6) implement [`Dialect`]; the recursive
//! walk over [`Expr`] lives in [`Translator`], shared by every dialect that
//! wants "one parameter per placeholder, left to right" semantics — which,
//! per spec.md §4.5, is every dialect this crate ships.

pub mod postgres;

use crate::error::{TranslateError, TranslateResult, TranslationErrorKind};
use crate::ident;
use crate::query::{BinaryOp, Expr, RangeEndpoint, UnaryOp};
use crate::schema::{Field, FieldType, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The result of translating an AST against a schema (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub kind: String,
    #[serde(rename = "whereClause")]
    pub where_clause: String,
    pub parameters: Vec<Value>,
    #[serde(rename = "parameterTypes")]
    pub parameter_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// A concrete output dialect: PostgreSQL today, a seam for more later.
pub trait Dialect {
    fn name(&self) -> &'static str;
    fn translate(&self, ast: &Expr, schema: &Schema) -> TranslateResult<Translation>;
}

/// Quoting and LIKE-escaping rules a dialect supplies to the shared walker.
/// Kept minimal: every dialect this crate implements speaks `$N` positional
/// placeholders and ANSI double-quoted identifiers, so only the bits that
/// plausibly vary (identifier quote char, LIKE escape convention) are here.
pub trait DialectRules {
    /// Quote `column` for inclusion in the WHERE fragment. Called only when
    /// [`ident::is_bare_identifier`] says the raw name needs quoting.
    fn quote_ident(&self, column: &str) -> String;
}

pub struct Translator<'a, R: DialectRules> {
    schema: &'a Schema,
    rules: &'a R,
    parameters: Vec<Value>,
    parameter_types: Vec<String>,
    ignored_features: Vec<String>,
    boosts: Vec<f64>,
}

impl<'a, R: DialectRules> Translator<'a, R> {
    pub fn new(schema: &'a Schema, rules: &'a R) -> Self {
        Self {
            schema,
            rules,
            parameters: Vec::new(),
            parameter_types: Vec::new(),
            ignored_features: Vec::new(),
            boosts: Vec::new(),
        }
    }

    /// Entry point: translate the whole AST and assemble the `Translation`.
    pub fn run(mut self, ast: &Expr) -> TranslateResult<Translation> {
        let where_clause = self.translate(ast)?;
        let mut metadata = Map::new();
        if !self.ignored_features.is_empty() {
            self.ignored_features.sort();
            self.ignored_features.dedup();
            metadata.insert(
                "ignoredFeatures".to_string(),
                Value::Array(self.ignored_features.iter().map(|s| Value::String(s.clone())).collect()),
            );
        }
        if !self.boosts.is_empty() {
            metadata.insert(
                "boosts".to_string(),
                Value::Array(self.boosts.iter().map(|b| Value::from(*b)).collect()),
            );
        }
        metadata.insert("normalizedQuery".to_string(), Value::String(ast.pretty_print()));
        Ok(Translation {
            kind: "sql".to_string(),
            where_clause,
            parameters: self.parameters,
            parameter_types: self.parameter_types,
            metadata,
        })
    }

    fn push_param(&mut self, value: Value, param_type: &str) -> usize {
        self.parameters.push(value);
        self.parameter_types.push(param_type.to_string());
        self.parameters.len() // 1-based, spec.md P2
    }

    fn quote_column(&self, column: &str) -> String {
        if ident::is_bare_identifier(column) {
            column.to_string()
        } else {
            self.rules.quote_ident(column)
        }
    }

    fn resolve(&self, friendly_name: &str) -> TranslateResult<(String, Field)> {
        self.schema.resolve(friendly_name).map_err(|e| match e {
            crate::error::SchemaErrorKind::FieldNotFound(name) => {
                TranslateError::translation(TranslationErrorKind::FieldNotFound(name))
            }
            other => TranslateError::internal(other.to_string()),
        })
    }

    fn default_field_name(&self) -> TranslateResult<String> {
        self.schema.default_field.clone().ok_or_else(|| {
            TranslateError::translation(TranslationErrorKind::FieldNotFound(
                "<no default field configured>".to_string(),
            ))
        })
    }

    /// Recursive walk: spec.md §4.6's emission table, one arm per node kind.
    fn translate(&mut self, expr: &Expr) -> TranslateResult<String> {
        match expr {
            Expr::Field { field, value, .. } => self.translate_field(field, value),
            Expr::Exists { field, .. } => {
                let (col, _) = self.resolve(field)?;
                Ok(format!("{} IS NOT NULL", self.quote_column(&col)))
            }
            Expr::Unary { op, inner, .. } => {
                let frag = self.translate(inner)?;
                Ok(match op {
                    UnaryOp::Not => format!("NOT ({})", frag),
                    UnaryOp::Prohibited => format!("NOT ({})", frag),
                    UnaryOp::Required => frag,
                })
            }
            Expr::Binary { op, .. } if op.is_or() => self.translate_or_level(expr),
            Expr::Binary { left, right, .. } => {
                let l = self.translate(left)?;
                let r = self.translate(right)?;
                Ok(format!("({} AND {})", l, r))
            }
            Expr::Group { inner, .. } => {
                let frag = self.translate(inner)?;
                if frag.starts_with('(') && frag.ends_with(')') {
                    Ok(frag)
                } else {
                    Ok(format!("({})", frag))
                }
            }
            Expr::Boost { inner, boost, .. } => {
                self.boosts.push(*boost);
                self.translate(inner)
            }
            // Bare value at the top level: binds to the schema's default field.
            Expr::Term { .. }
            | Expr::Phrase { .. }
            | Expr::Number { .. }
            | Expr::Range { .. }
            | Expr::Wildcard { .. }
            | Expr::Regex { .. }
            | Expr::Fuzzy { .. }
            | Expr::Proximity { .. } => {
                let field = self.default_field_name()?;
                self.translate_field(&field, expr)
            }
        }
    }

    /// A maximal run of sibling `OR`/implicit-OR clauses (spec.md §4.3's "a
    /// level"). `+`/`-` prefixed clauses among the siblings combine as
    /// `(required AND required AND … AND NOT prohibited …)` rather than the
    /// level's default OR join (spec.md §4.3's special form for `+`/`-`);
    /// a level with no required/prohibited clauses joins with OR as usual.
    fn translate_or_level(&mut self, root: &Expr) -> TranslateResult<String> {
        let mut leaves = Vec::new();
        let mut saw_implicit = false;
        flatten_or_level(root, &mut leaves, &mut saw_implicit);
        if saw_implicit && self.schema.strict_operators {
            return Err(TranslateError::translation(TranslationErrorKind::FeatureDisabled(
                "implicit OR (juxtaposition without an explicit operator)".to_string(),
            )));
        }
        // Bucket leaves by role first (no translation yet), then translate in
        // the fixed emission order (required, prohibited, optional) so that
        // placeholder indices are assigned in the same left-to-right order
        // they're emitted in (spec.md P2 / §4.5) rather than in source order.
        let mut required = Vec::new();
        let mut prohibited = Vec::new();
        let mut optional = Vec::new();
        for leaf in leaves {
            match leaf {
                Expr::Unary { op: UnaryOp::Required, inner, .. } => required.push(inner.as_ref()),
                Expr::Unary { op: UnaryOp::Prohibited, inner, .. } => prohibited.push(inner.as_ref()),
                other => optional.push(other),
            }
        }
        if required.is_empty() && prohibited.is_empty() {
            let rendered: Vec<String> = optional.into_iter().map(|e| self.translate(e)).collect::<TranslateResult<_>>()?;
            return Ok(format!("({})", rendered.join(" OR ")));
        }
        let mut parts: Vec<String> = required.into_iter().map(|e| self.translate(e)).collect::<TranslateResult<_>>()?;
        for p in prohibited {
            parts.push(format!("NOT ({})", self.translate(p)?));
        }
        if !optional.is_empty() {
            let rendered: Vec<String> = optional.into_iter().map(|e| self.translate(e)).collect::<TranslateResult<_>>()?;
            parts.push(format!("({})", rendered.join(" OR ")));
        }
        Ok(format!("({})", parts.join(" AND ")))
    }

    fn translate_field(&mut self, field_name: &str, value: &Expr) -> TranslateResult<String> {
        let (column, field) = self.resolve(field_name)?;
        let quoted = self.quote_column(&column);
        match value {
            Expr::Term { text, .. } | Expr::Number { text, .. } | Expr::Phrase { text, .. } => {
                let idx = self.push_typed_param(text, &field)?;
                Ok(format!("{} = ${}", quoted, idx))
            }
            Expr::Range { start, end, inclusive_start, inclusive_end, .. } => {
                self.translate_range(&quoted, &field, start, end, *inclusive_start, *inclusive_end)
            }
            Expr::Wildcard { pattern, .. } => self.translate_wildcard(&quoted, &field, pattern),
            Expr::Regex { pattern, .. } => self.translate_regex(&quoted, &field, pattern),
            Expr::Fuzzy { inner, .. } => self.translate_fuzzy(&quoted, &field, inner),
            Expr::Proximity { inner, .. } => self.translate_proximity(&quoted, &field, inner),
            other => Err(TranslateError::translation(TranslationErrorKind::UnsupportedSyntax(format!(
                "field value of kind {:?} is not a valid field value",
                other
            )))),
        }
    }

    fn translate_range(
        &mut self,
        quoted: &str,
        field: &Field,
        start: &RangeEndpoint,
        end: &RangeEndpoint,
        inclusive_start: bool,
        inclusive_end: bool,
    ) -> TranslateResult<String> {
        let mut parts = Vec::new();
        if let RangeEndpoint::Value(text) = start {
            let idx = self.push_typed_param(text, field)?;
            let op = if inclusive_start { ">=" } else { ">" };
            parts.push(format!("{} {} ${}", quoted, op, idx));
        }
        if let RangeEndpoint::Value(text) = end {
            let idx = self.push_typed_param(text, field)?;
            let op = if inclusive_end { "<=" } else { "<" };
            parts.push(format!("{} {} ${}", quoted, op, idx));
        }
        match parts.len() {
            0 => Err(TranslateError::translation(TranslationErrorKind::InvalidRange(
                "range must have at least one bounded endpoint".to_string(),
            ))),
            1 => Ok(parts.remove(0)),
            _ => Ok(format!("({})", parts.join(" AND "))),
        }
    }

    fn translate_wildcard(&mut self, quoted: &str, field: &Field, pattern: &str) -> TranslateResult<String> {
        if !self.schema.enabled_features.wildcard {
            self.check_strict("wildcard")?;
            self.ignored_features.push("wildcard".to_string());
            let idx = self.push_typed_param(pattern, field)?;
            return Ok(format!("{} = ${}", quoted, idx));
        }
        if !matches!(field.field_type, FieldType::Text | FieldType::Keyword) {
            return Err(TranslateError::translation(TranslationErrorKind::UnsupportedSyntax(format!(
                "wildcard is not supported on {:?} fields",
                field.field_type
            ))));
        }
        let like = translate_wildcard_pattern(pattern);
        let idx = self.push_param(Value::String(like), "text");
        Ok(format!("{} LIKE ${}", quoted, idx))
    }

    fn translate_regex(&mut self, quoted: &str, field: &Field, pattern: &str) -> TranslateResult<String> {
        if !self.schema.enabled_features.regex {
            self.check_strict("regex")?;
            self.ignored_features.push("regex".to_string());
            let idx = self.push_typed_param(pattern, field)?;
            return Ok(format!("{} = ${}", quoted, idx));
        }
        if !matches!(field.field_type, FieldType::Text | FieldType::Keyword) {
            return Err(TranslateError::translation(TranslationErrorKind::UnsupportedSyntax(format!(
                "regex is not supported on {:?} fields",
                field.field_type
            ))));
        }
        let idx = self.push_param(Value::String(pattern.to_string()), "text");
        Ok(format!("{} ~ ${}", quoted, idx))
    }

    /// SQL has no native fuzzy match; always degrade to an equality
    /// comparison on the inner term, erroring instead when `strictOperators`
    /// is set (spec.md §4.6).
    fn translate_fuzzy(&mut self, quoted: &str, field: &Field, inner: &Expr) -> TranslateResult<String> {
        self.check_strict("fuzzy")?;
        self.ignored_features.push("fuzzy".to_string());
        let text = match inner {
            Expr::Term { text, .. } => text,
            other => {
                return Err(TranslateError::translation(TranslationErrorKind::UnsupportedSyntax(format!(
                    "fuzzy wraps unexpected node {:?}",
                    other
                ))))
            }
        };
        let idx = self.push_typed_param(text, field)?;
        Ok(format!("{} = ${}", quoted, idx))
    }

    /// SQL has no native phrase-proximity operator; degrade to an equality
    /// comparison on the inner phrase, same strictness rule as fuzzy.
    fn translate_proximity(&mut self, quoted: &str, field: &Field, inner: &Expr) -> TranslateResult<String> {
        self.check_strict("proximity")?;
        self.ignored_features.push("proximity".to_string());
        let text = match inner {
            Expr::Phrase { text, .. } => text,
            other => {
                return Err(TranslateError::translation(TranslationErrorKind::UnsupportedSyntax(format!(
                    "proximity wraps unexpected node {:?}",
                    other
                ))))
            }
        };
        let idx = self.push_typed_param(text, field)?;
        Ok(format!("{} = ${}", quoted, idx))
    }

    fn check_strict(&self, feature: &str) -> TranslateResult<()> {
        if self.schema.strict_operators {
            Err(TranslateError::translation(TranslationErrorKind::FeatureDisabled(feature.to_string())))
        } else {
            Ok(())
        }
    }

    /// Coerce `text` to the field's declared type and push it as the next
    /// positional parameter, returning its 1-based placeholder index.
    fn push_typed_param(&mut self, text: &str, field: &Field) -> TranslateResult<usize> {
        let (value, param_type) = coerce(text, field)?;
        Ok(self.push_param(value, param_type))
    }
}

/// Collect the leaves of a left-associative chain of `OR`/implicit-OR
/// `Binary` nodes (the parser only ever builds this shape, see
/// `Parser::parse_or`), setting `saw_implicit` if any link in the chain was
/// an implicit join.
fn flatten_or_level<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>, saw_implicit: &mut bool) {
    match expr {
        Expr::Binary { op, left, right, .. } if op.is_or() => {
            *saw_implicit |= matches!(op, BinaryOp::ImplicitOr);
            flatten_or_level(left, out, saw_implicit);
            out.push(right);
        }
        other => out.push(other),
    }
}

fn coerce(text: &str, field: &Field) -> TranslateResult<(Value, &'static str)> {
    let mismatch = |expected: &str| {
        TranslateError::translation(TranslationErrorKind::TypeMismatch {
            field: field.name.clone(),
            value: text.to_string(),
            expected_type: expected.to_string(),
        })
    };
    match field.field_type {
        FieldType::Text | FieldType::Keyword => Ok((Value::String(text.to_string()), field.field_type.param_type())),
        FieldType::Integer | FieldType::Long => {
            let n: i64 = text.parse().map_err(|_| mismatch(field.field_type.param_type()))?;
            Ok((Value::from(n), field.field_type.param_type()))
        }
        FieldType::Float | FieldType::Double => {
            let n: f64 = text.parse().map_err(|_| mismatch(field.field_type.param_type()))?;
            Ok((Value::from(n), field.field_type.param_type()))
        }
        FieldType::Boolean => {
            let b = match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(mismatch("boolean")),
            };
            Ok((Value::Bool(b), "boolean"))
        }
        // Dates/datetimes are passed through verbatim; the spec defers
        // ISO-8601 validation to the database (spec.md §4.6).
        FieldType::Date | FieldType::Datetime => {
            Ok((Value::String(text.to_string()), field.field_type.param_type()))
        }
        FieldType::Json => Ok((Value::String(text.to_string()), "json")),
    }
}

/// `*` -> `%`, `?` -> `_`; existing `%`/`_`/`\` are backslash-escaped first
/// so they survive as literal characters once the wildcard chars are
/// rewritten (spec.md §4.6).
fn translate_wildcard_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => out.push('%'),
            '?' => out.push('_'),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}
