//! Schema data model: the registered field definitions a query is resolved
//! and translated against.

pub mod registry;

pub use registry::SchemaRegistry;

use crate::error::SchemaErrorKind;
use crate::ident::{self, NamingConvention};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The declared type of a field, used to choose the SQL parameter type and
/// to validate term values at translation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
    Datetime,
    Json,
}

impl FieldType {
    /// The SQL parameter type tag emitted in `Translation.parameterTypes`.
    pub fn param_type(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "timestamp",
            FieldType::Json => "json",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Long | FieldType::Float | FieldType::Double
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Datetime)
    }
}

/// A single declared field within a [`Schema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub indexed: Option<bool>,
    #[serde(default)]
    pub searchable: Option<bool>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            column: None,
            aliases: Vec::new(),
            indexed: None,
            searchable: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve the physical column name for this field against a naming
    /// convention: the override, when present, wins outright.
    pub fn column_name(&self, convention: NamingConvention) -> String {
        match &self.column {
            Some(c) => c.clone(),
            None => convention.apply(&self.name),
        }
    }
}

/// Per-schema feature toggles consulted by the parser/translator when
/// `strictOperators` is enabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnabledFeatures {
    #[serde(default = "default_true")]
    pub fuzzy: bool,
    #[serde(default = "default_true")]
    pub proximity: bool,
    #[serde(default = "default_true")]
    pub regex: bool,
    #[serde(default = "default_true")]
    pub wildcard: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EnabledFeatures {
    fn default() -> Self {
        Self { fuzzy: true, proximity: true, regex: true, wildcard: true }
    }
}

/// A registered set of fields plus the options governing how friendly names
/// resolve to columns and how strictly the pipeline treats unknowns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub naming_convention: NamingConvention,
    #[serde(default)]
    pub strict_field_names: bool,
    #[serde(default)]
    pub strict_operators: bool,
    #[serde(default)]
    pub default_field: Option<String>,
    #[serde(default)]
    pub enabled_features: EnabledFeatures,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            naming_convention: NamingConvention::default(),
            strict_field_names: false,
            strict_operators: false,
            default_field: None,
            enabled_features: EnabledFeatures::default(),
        }
    }

    /// Enforce I1 (unique field names after case-fold), I2 (aliases disjoint
    /// across fields), I3 (at least one field), plus basic per-field sanity.
    pub fn validate(&self) -> Result<(), SchemaErrorKind> {
        if self.name.trim().is_empty() {
            return Err(SchemaErrorKind::InvalidSchema("schema name must not be empty".into()));
        }
        if self.fields.is_empty() {
            return Err(SchemaErrorKind::InvalidSchema(
                "schema must declare at least one field".into(),
            ));
        }

        let mut seen_names: HashSet<String> = HashSet::new();
        let mut seen_aliases: HashSet<String> = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaErrorKind::InvalidSchema("field name must not be empty".into()));
            }
            let folded = ident::fold(&field.name);
            if !seen_names.insert(folded.clone()) {
                return Err(SchemaErrorKind::InvalidSchema(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
            if seen_aliases.contains(&folded) {
                return Err(SchemaErrorKind::InvalidSchema(format!(
                    "alias '{}' collides with a field name",
                    field.name
                )));
            }
            for alias in &field.aliases {
                let folded_alias = ident::fold(alias);
                if !seen_aliases.insert(folded_alias.clone()) {
                    return Err(SchemaErrorKind::InvalidSchema(format!(
                        "duplicate alias '{}'",
                        alias
                    )));
                }
                if seen_names.contains(&folded_alias) {
                    return Err(SchemaErrorKind::InvalidSchema(format!(
                        "alias '{}' collides with a field name",
                        alias
                    )));
                }
            }
        }
        Ok(())
    }

    /// Field resolution, spec.md §4.1: exact match, case-folded match, alias
    /// match, convention-mapped match, then (if lenient) a synthesized
    /// best-effort text field.
    pub fn resolve(&self, friendly_name: &str) -> Result<(String, Field), SchemaErrorKind> {
        if let Some(field) = self.fields.iter().find(|f| f.name == friendly_name) {
            return Ok((field.column_name(self.naming_convention), field.clone()));
        }

        let folded_query = ident::fold(friendly_name);
        if let Some(field) = self.fields.iter().find(|f| ident::fold(&f.name) == folded_query) {
            return Ok((field.column_name(self.naming_convention), field.clone()));
        }

        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.aliases.iter().any(|a| ident::fold(a) == folded_query))
        {
            return Ok((field.column_name(self.naming_convention), field.clone()));
        }

        // Convention-mapped match: e.g. a schema using snake_case lets users
        // write either `userName` or `user_name` for a field declared as
        // `user_name` — apply the convention to the *query* name and compare
        // against the declared field name, not the other way around.
        let converted_query = ident::fold(&self.naming_convention.apply(friendly_name));
        if let Some(field) = self.fields.iter().find(|f| ident::fold(&f.name) == converted_query) {
            return Ok((field.column_name(self.naming_convention), field.clone()));
        }

        if !self.strict_field_names {
            let column = self.naming_convention.apply(friendly_name);
            let synthesized = Field::new(friendly_name, FieldType::Text).with_column(column.clone());
            return Ok((column, synthesized));
        }

        Err(SchemaErrorKind::FieldNotFound(friendly_name.to_string()))
    }
}
