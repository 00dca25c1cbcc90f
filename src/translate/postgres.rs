//! PostgreSQL dialect (spec.md §4.6): the one concrete `Dialect` this crate
//! ships. Quoting follows ANSI/Postgres double-quote convention (embedded
//! `"` doubled), matching how the teacher crate treats quoted SQL
//! identifiers elsewhere in its own parser.

use super::{Dialect, DialectRules, Translation, Translator};
use crate::error::TranslateResult;
use crate::query::Expr;
use crate::schema::Schema;

pub struct PostgresDialect;

impl DialectRules for PostgresDialect {
    fn quote_ident(&self, column: &str) -> String {
        format!("\"{}\"", column.replace('"', "\"\""))
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn translate(&self, ast: &Expr, schema: &Schema) -> TranslateResult<Translation> {
        Translator::new(schema, self).run(ast)
    }
}

/// Look up a dialect by the `database` field of a translate request
/// (spec.md §6). Only `"postgres"` is implemented; this is the seam a
/// second dialect would extend.
pub fn lookup(name: &str) -> Option<Box<dyn Dialect>> {
    match name {
        "postgres" => Some(Box::new(PostgresDialect)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::NamingConvention;
    use crate::query::parser::parse;
    use crate::schema::{EnabledFeatures, Field, FieldType};
    use serde_json::json;

    fn products_schema() -> Schema {
        let mut schema = Schema::new(
            "products",
            vec![
                Field::new("product_code", FieldType::Text),
                Field::new("region", FieldType::Text),
                Field::new("status", FieldType::Text),
                Field::new("rod_length", FieldType::Integer),
                Field::new("name", FieldType::Text),
            ],
        );
        schema.naming_convention = NamingConvention::SnakeCase;
        schema
    }

    fn translate(query: &str, schema: &Schema) -> Translation {
        let ast = parse(query, 50, 10_000).unwrap();
        PostgresDialect.translate(&ast, schema).unwrap()
    }

    #[test]
    fn scenario_1_simple_field_term() {
        let t = translate("productCode:13w42", &products_schema());
        assert_eq!(t.where_clause, "product_code = $1");
        assert_eq!(t.parameters, vec![json!("13w42")]);
        assert_eq!(t.parameter_types, vec!["text"]);
    }

    #[test]
    fn scenario_2_and_binary() {
        let t = translate("productCode:13w42 AND region:ca", &products_schema());
        assert_eq!(t.where_clause, "(product_code = $1 AND region = $2)");
        assert_eq!(t.parameters, vec![json!("13w42"), json!("ca")]);
        assert_eq!(t.parameter_types, vec!["text", "text"]);
    }

    #[test]
    fn scenario_3_numeric_range() {
        let t = translate("rodLength:[50 TO 500]", &products_schema());
        assert_eq!(t.where_clause, "(rod_length >= $1 AND rod_length <= $2)");
        assert_eq!(t.parameters, vec![json!(50), json!(500)]);
        assert_eq!(t.parameter_types, vec!["integer", "integer"]);
    }

    #[test]
    fn scenario_4_grouped_or() {
        let t = translate("(productCode:13w42 AND region:ca) OR status:active", &products_schema());
        assert_eq!(t.where_clause, "((product_code = $1 AND region = $2) OR status = $3)");
        assert_eq!(t.parameters, vec![json!("13w42"), json!("ca"), json!("active")]);
    }

    #[test]
    fn scenario_5_wildcard() {
        let t = translate("name:ab*", &products_schema());
        assert_eq!(t.where_clause, "name LIKE $1");
        assert_eq!(t.parameters, vec![json!("ab%")]);
    }

    #[test]
    fn scenario_6_exists() {
        let t = translate("_exists_:productCode", &products_schema());
        assert_eq!(t.where_clause, "product_code IS NOT NULL");
        assert!(t.parameters.is_empty());
    }

    #[test]
    fn open_range_endpoint_omits_missing_half() {
        let t = translate("rodLength:[50 TO *]", &products_schema());
        assert_eq!(t.where_clause, "rod_length >= $1");
        assert_eq!(t.parameters, vec![json!(50)]);
    }

    #[test]
    fn exclusive_range_uses_strict_comparison() {
        let t = translate("rodLength:{50 TO 500}", &products_schema());
        assert_eq!(t.where_clause, "(rod_length > $1 AND rod_length < $2)");
    }

    #[test]
    fn numeric_type_mismatch_reports_error() {
        let ast = parse("rodLength:notanumber", 50, 10_000).unwrap();
        let err = PostgresDialect.translate(&ast, &products_schema()).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::TypeMismatch);
    }

    #[test]
    fn unknown_field_strict_reports_field_not_found() {
        let mut schema = products_schema();
        schema.strict_field_names = true;
        let ast = parse("unknownField:x", 50, 10_000).unwrap();
        let err = PostgresDialect.translate(&ast, &schema).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::FieldNotFound);
    }

    #[test]
    fn unknown_field_lenient_synthesizes_text_column() {
        let t = translate("unknownField:x", &products_schema());
        assert_eq!(t.where_clause, "unknown_field = $1");
    }

    #[test]
    fn fuzzy_degrades_to_equality_and_notes_ignored_feature() {
        let t = translate("name:john~2", &products_schema());
        assert_eq!(t.where_clause, "name = $1");
        assert_eq!(t.parameters, vec![json!("john")]);
        let ignored = t.metadata.get("ignoredFeatures").unwrap();
        assert_eq!(ignored, &json!(["fuzzy"]));
    }

    #[test]
    fn fuzzy_errors_under_strict_operators() {
        let mut schema = products_schema();
        schema.strict_operators = true;
        let ast = parse("name:john~2", 50, 10_000).unwrap();
        let err = PostgresDialect.translate(&ast, &schema).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::FeatureDisabled);
    }

    #[test]
    fn proximity_degrades_to_phrase_equality() {
        let t = translate(r#"name:"john smith"~5"#, &products_schema());
        assert_eq!(t.where_clause, "name = $1");
        assert_eq!(t.parameters, vec![json!("john smith")]);
    }

    #[test]
    fn implicit_or_errors_under_strict_operators() {
        let mut schema = products_schema();
        schema.strict_operators = true;
        let ast = parse("alpha beta", 50, 10_000).unwrap();
        schema.default_field = Some("name".to_string());
        let err = PostgresDialect.translate(&ast, &schema).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::FeatureDisabled);
    }

    #[test]
    fn bare_term_binds_to_default_field() {
        let mut schema = products_schema();
        schema.default_field = Some("name".to_string());
        let t = translate("alice", &schema);
        assert_eq!(t.where_clause, "name = $1");
    }

    #[test]
    fn bare_term_without_default_field_fails() {
        let ast = parse("alice", 50, 10_000).unwrap();
        let err = PostgresDialect.translate(&ast, &products_schema()).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::FieldNotFound);
    }

    #[test]
    fn required_and_prohibited_clauses_combine_with_and_not() {
        // spec.md §4.3: "+term marks a required clause; -term marks a
        // prohibited clause; when multiple such clauses coexist at a level,
        // the translation treats them as (required AND ... AND NOT
        // prohibited ...)" — even though the parser joins them via implicit
        // OR in the absence of an explicit operator.
        let t = translate("+status:active -region:ca", &products_schema());
        assert_eq!(t.where_clause, "(status = $1 AND NOT (region = $2))");
        assert_eq!(t.parameters, vec![json!("active"), json!("ca")]);
    }

    #[test]
    fn required_prohibited_and_optional_clauses_combine() {
        let t = translate("+status:active -region:ca name:bob", &products_schema());
        assert_eq!(t.where_clause, "(status = $1 AND NOT (region = $2) AND (name = $3))");
    }

    #[test]
    fn placeholder_order_follows_emission_order_not_source_order() {
        // P2 / spec.md §4.5: placeholders are assigned in left-to-right
        // *expression* order. Here the optional clause appears first in the
        // source text but required/prohibited clauses are emitted first, so
        // $1 must land on `status`, not on `name`.
        let t = translate("name:bob +status:active", &products_schema());
        assert_eq!(t.where_clause, "(status = $1 AND (name = $2))");
        assert_eq!(t.parameters, vec![json!("active"), json!("bob")]);
    }

    #[test]
    fn not_wraps_inner_in_negation() {
        let t = translate("NOT status:active", &products_schema());
        assert_eq!(t.where_clause, "NOT (status = $1)");
    }

    #[test]
    fn wildcard_disabled_degrades_to_literal_equality() {
        let mut schema = products_schema();
        schema.enabled_features = EnabledFeatures { wildcard: false, ..schema.enabled_features };
        let t = translate("name:ab*", &schema);
        assert_eq!(t.where_clause, "name = $1");
        assert_eq!(t.parameters, vec![json!("ab*")]);
    }

    #[test]
    fn quoting_applies_to_non_bare_columns() {
        let schema = Schema::new(
            "weird",
            vec![Field::new("col", FieldType::Text).with_column("weird col")],
        );
        let t = translate("col:x", &schema);
        assert_eq!(t.where_clause, "\"weird col\" = $1");
    }

    #[test]
    fn boost_is_transparent_to_where_clause_but_recorded_in_metadata() {
        let t = translate("name:john^2.5", &products_schema());
        assert_eq!(t.where_clause, "name = $1");
        assert_eq!(t.metadata.get("boosts").unwrap(), &json!([2.5]));
    }

    #[test]
    fn placeholder_indices_are_contiguous_left_to_right() {
        // P2: |parameters| == |parameterTypes| == count of $i placeholders, 1..n with no gaps.
        let t = translate("(a:1 AND b:2) OR (c:3 AND d:4)", &products_schema());
        for i in 1..=4 {
            assert!(t.where_clause.contains(&format!("${}", i)));
        }
        assert_eq!(t.parameters.len(), 4);
        assert_eq!(t.parameter_types.len(), 4);
    }
}
