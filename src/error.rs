//! Unified error model for the query pipeline.
//!
//! A single closed taxonomy (`TranslateError`) spans lexing, parsing, schema
//! resolution and translation, the way `AppError` once spanned HTTP/WS/pgwire
//! frontends in the original query engine. Each surfaced error carries one of
//! the closed-set error codes from the external contract, an HTTP status, and
//! (for lex/parse failures) a position a caller can point a cursor at.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The closed set of error codes the external contract may return.
/// Variants with no constructor below (`RateLimited`, `Unauthorized`, ...)
/// are reserved for the external collaborators (rate limiter, auth) that sit
/// in front of this crate; they are part of the enum so every layer speaks
/// the same vocabulary, but nothing in this crate produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    ParseError,
    SchemaNotFound,
    FieldNotFound,
    TypeMismatch,
    FeatureDisabled,
    InvalidRange,
    UnsupportedSyntax,
    SchemaExists,
    InvalidSchema,
    RateLimited,
    Unauthorized,
    Forbidden,
    MetricsDisabled,
    ServiceUnavailable,
    Timeout,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::SchemaNotFound => "SCHEMA_NOT_FOUND",
            ErrorCode::FieldNotFound => "FIELD_NOT_FOUND",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::FeatureDisabled => "FEATURE_DISABLED",
            ErrorCode::InvalidRange => "INVALID_RANGE",
            ErrorCode::UnsupportedSyntax => "UNSUPPORTED_SYNTAX",
            ErrorCode::SchemaExists => "SCHEMA_EXISTS",
            ErrorCode::InvalidSchema => "INVALID_SCHEMA",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::MetricsDisabled => "METRICS_DISABLED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ParseError => 400,
            ErrorCode::SchemaNotFound => 404,
            ErrorCode::FieldNotFound => 400,
            ErrorCode::TypeMismatch => 400,
            ErrorCode::FeatureDisabled => 400,
            ErrorCode::InvalidRange => 400,
            ErrorCode::UnsupportedSyntax => 400,
            ErrorCode::SchemaExists => 409,
            ErrorCode::InvalidSchema => 400,
            ErrorCode::RateLimited => 429,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::MetricsDisabled => 404,
            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::Timeout => 504,
            ErrorCode::InternalError => 500,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One positioned sub-error, e.g. a single unexpected-token diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub position: usize,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Lexer-level failures (spec.md §7: LexError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// Parser-level failures (spec.md §7: ParseError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected token {found}")]
    UnexpectedToken { found: String },
    #[error("expected {expected}, found {found}")]
    ExpectedToken { expected: String, found: String },
    #[error("maximum nesting depth exceeded")]
    DepthExceeded,
    #[error("query exceeds maximum length")]
    QueryTooLong,
}

/// Schema registry failures (spec.md §7: SchemaError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaErrorKind {
    #[error("schema '{0}' not found")]
    SchemaNotFound(String),
    #[error("schema '{0}' already exists")]
    SchemaExists(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("field '{0}' not found")]
    FieldNotFound(String),
}

/// Translation failures (spec.md §7: TranslationError).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslationErrorKind {
    #[error("field '{0}' not found")]
    FieldNotFound(String),
    #[error("value '{value}' is not a valid {expected_type} for field '{field}'")]
    TypeMismatch { field: String, value: String, expected_type: String },
    #[error("feature '{0}' is disabled for this schema")]
    FeatureDisabled(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("dialect cannot encode {0}")]
    UnsupportedSyntax(String),
}

/// The crate-wide error type returned by lex/parse/resolve/translate and
/// surfaced, unchanged, as the HTTP error body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslateError {
    #[error("{0}")]
    Lex(LexErrorKind, usize, usize, usize),
    #[error("{0}")]
    Parse(ParseErrorKind, usize, usize, usize),
    #[error("{0}")]
    Schema(SchemaErrorKind),
    #[error("{0}")]
    Translation(TranslationErrorKind),
    #[error("{0}")]
    Internal(String),
}

impl TranslateError {
    pub fn lex(kind: LexErrorKind, offset: usize, line: usize, column: usize) -> Self {
        TranslateError::Lex(kind, offset, line, column)
    }
    pub fn parse(kind: ParseErrorKind, offset: usize, line: usize, column: usize) -> Self {
        TranslateError::Parse(kind, offset, line, column)
    }
    pub fn schema(kind: SchemaErrorKind) -> Self {
        TranslateError::Schema(kind)
    }
    pub fn translation(kind: TranslationErrorKind) -> Self {
        TranslateError::Translation(kind)
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TranslateError::Internal(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TranslateError::Lex(..) => ErrorCode::ParseError,
            TranslateError::Parse(kind, ..) => match kind {
                ParseErrorKind::DepthExceeded => ErrorCode::ParseError,
                ParseErrorKind::QueryTooLong => ErrorCode::ParseError,
                _ => ErrorCode::ParseError,
            },
            TranslateError::Schema(kind) => match kind {
                SchemaErrorKind::SchemaNotFound(_) => ErrorCode::SchemaNotFound,
                SchemaErrorKind::SchemaExists(_) => ErrorCode::SchemaExists,
                SchemaErrorKind::InvalidSchema(_) => ErrorCode::InvalidSchema,
                SchemaErrorKind::FieldNotFound(_) => ErrorCode::FieldNotFound,
            },
            TranslateError::Translation(kind) => match kind {
                TranslationErrorKind::FieldNotFound(_) => ErrorCode::FieldNotFound,
                TranslationErrorKind::TypeMismatch { .. } => ErrorCode::TypeMismatch,
                TranslationErrorKind::FeatureDisabled(_) => ErrorCode::FeatureDisabled,
                TranslationErrorKind::InvalidRange(_) => ErrorCode::InvalidRange,
                TranslationErrorKind::UnsupportedSyntax(_) => ErrorCode::UnsupportedSyntax,
            },
            TranslateError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Positioned diagnostics for this error, if any (lex/parse errors only).
    pub fn details(&self) -> Vec<ErrorDetail> {
        match self {
            TranslateError::Lex(kind, offset, line, column) => vec![ErrorDetail {
                position: *offset,
                line: *line,
                column: *column,
                message: kind.to_string(),
            }],
            TranslateError::Parse(kind, offset, line, column) => vec![ErrorDetail {
                position: *offset,
                line: *line,
                column: *column,
                message: kind.to_string(),
            }],
            _ => Vec::new(),
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;

impl From<anyhow::Error> for TranslateError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping for unclassified internal failures; callers that
        // know the specific taxonomy should construct a typed variant instead.
        TranslateError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCode::ParseError.http_status(), 400);
        assert_eq!(ErrorCode::SchemaNotFound.http_status(), 404);
        assert_eq!(ErrorCode::FeatureDisabled.http_status(), 400);
        assert_eq!(ErrorCode::SchemaExists.http_status(), 409);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn translate_error_carries_position() {
        let e = TranslateError::parse(ParseErrorKind::DepthExceeded, 12, 1, 13);
        assert_eq!(e.code(), ErrorCode::ParseError);
        let details = e.details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].position, 12);
        assert_eq!(details[0].column, 13);
        assert!(e.to_string().contains("nesting depth"));
    }

    #[test]
    fn schema_errors_map_to_expected_codes() {
        let e = TranslateError::schema(SchemaErrorKind::SchemaNotFound("products".into()));
        assert_eq!(e.code(), ErrorCode::SchemaNotFound);
        assert_eq!(e.http_status(), 404);

        let e = TranslateError::translation(TranslationErrorKind::FieldNotFound("unknownField".into()));
        assert_eq!(e.code(), ErrorCode::FieldNotFound);
    }

    #[test]
    fn internal_from_anyhow() {
        let any_err: anyhow::Error = anyhow::anyhow!("boom");
        let e: TranslateError = any_err.into();
        assert_eq!(e.code(), ErrorCode::InternalError);
    }
}
