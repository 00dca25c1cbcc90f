//! Identifier case-folding and naming-convention transforms.
//! ---------------------------------------------------------
//! Single source of truth for mapping a schema's "friendly" field names onto
//! physical column names when no explicit `column` override is given.

/// Case-fold an identifier for comparison purposes (field name / alias
/// lookup). Quoting is not part of this crate's query language, so folding
/// is simply a lowercase conversion.
pub fn fold(ident: &str) -> String {
    ident.to_ascii_lowercase()
}

/// The supported naming conventions a [`crate::schema::Schema`] may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum NamingConvention {
    #[serde(rename = "snake_case")]
    SnakeCase,
    #[serde(rename = "camelCase")]
    CamelCase,
    #[serde(rename = "PascalCase")]
    PascalCase,
    #[default]
    #[serde(rename = "none")]
    None,
}

impl NamingConvention {
    /// Apply this convention to a friendly field name, producing the column
    /// name used when the field declares no explicit `column` override.
    pub fn apply(&self, friendly: &str) -> String {
        match self {
            NamingConvention::SnakeCase => to_snake_case(friendly),
            NamingConvention::CamelCase => to_camel_case(friendly),
            NamingConvention::PascalCase => to_pascal_case(friendly),
            NamingConvention::None => friendly.to_string(),
        }
    }
}

/// lowercase; insert `_` before an uppercase letter preceded by a lowercase
/// letter, or before an uppercase letter immediately followed by a lowercase
/// letter (so `HTTPStatus` still splits sanely as `http_status`).
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && (prev_lower || next_lower) && chars[i - 1] != '_' {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on `_`; first segment lowercased, subsequent segments capitalized.
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, part) in s.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(&part.to_ascii_lowercase());
        } else {
            capitalize_into(part, &mut out);
        }
    }
    out
}

/// Like [`to_camel_case`] but the first segment is also capitalized.
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for part in s.split('_').filter(|p| !p.is_empty()) {
        capitalize_into(part, &mut out);
    }
    out
}

fn capitalize_into(part: &str, out: &mut String) {
    let mut chars = part.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(&chars.as_str().to_ascii_lowercase());
    }
}

/// True if `name` is a bare SQL identifier that needs no quoting in the
/// emitted WHERE clause (spec.md §4.5: `[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_camel_and_acronyms() {
        assert_eq!(to_snake_case("userName"), "user_name");
        assert_eq!(to_snake_case("productCode"), "product_code");
        assert_eq!(to_snake_case("rodLength"), "rod_length");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
    }

    #[test]
    fn snake_case_idempotent_on_canonical_input() {
        let canonical = "user_name";
        assert_eq!(to_snake_case(canonical), canonical);
    }

    #[test]
    fn camel_and_pascal_roundtrip_snake() {
        assert_eq!(to_camel_case("user_name"), "userName");
        assert_eq!(to_pascal_case("user_name"), "UserName");
        assert_eq!(to_camel_case("product_code"), "productCode");
    }

    #[test]
    fn fold_lowercases() {
        assert_eq!(fold("ProductCode"), "productcode");
        assert_eq!(fold(&fold("ProductCode")), fold("ProductCode"));
    }

    #[test]
    fn bare_identifier_detection() {
        assert!(is_bare_identifier("product_code"));
        assert!(is_bare_identifier("_private"));
        assert!(!is_bare_identifier("1col"));
        assert!(!is_bare_identifier("weird col"));
        assert!(!is_bare_identifier("weird-col"));
    }
}
