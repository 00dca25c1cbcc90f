//! Byte-level lexer: turns a query string into a sequence of positioned
//! tokens. Grounded on the teacher crate's hand-rolled SQL tokenizer in
//! `query_common.rs` — a `Vec<char>` cursor with explicit offset/line/column
//! bookkeeping rather than a regex-driven scanner.

use super::Position;
use crate::error::{LexErrorKind, TranslateError, TranslateResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    String(String),
    Regex(String),
    Colon,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Caret(f64),
    Tilde(Option<u32>),
    Plus,
    Minus,
    Star,
    And,
    Or,
    Not,
    To,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, max_query_length: usize) -> TranslateResult<Self> {
        if src.len() > max_query_length {
            return Err(TranslateError::parse(
                crate::error::ParseErrorKind::QueryTooLong,
                0,
                1,
                1,
            ));
        }
        Ok(Self { chars: src.chars().collect(), src, offset: 0, line: 1, column: 1 })
    }

    fn position(&self) -> Position {
        Position { offset: self.offset, line: self.line, column: self.column }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn peek_at(&self, delta: usize) -> Option<char> {
        self.chars.get(self.offset + delta).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Tokenize the whole input eagerly; the parser then walks a `Vec<Token>`.
    /// The input is short enough (bounded by `maxQueryLength`) that a lazy
    /// stream buys nothing but complexity.
    pub fn tokenize(mut self) -> TranslateResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, position: start });
                break;
            };
            let kind = match c {
                ':' => {
                    self.advance();
                    TokenKind::Colon
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LBrack
                }
                ']' => {
                    self.advance();
                    TokenKind::RBrack
                }
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                '!' => {
                    self.advance();
                    TokenKind::Not
                }
                '+' => {
                    self.advance();
                    TokenKind::Plus
                }
                '-' => {
                    self.advance();
                    TokenKind::Minus
                }
                '^' => {
                    self.advance();
                    self.lex_boost(start)?
                }
                '~' => {
                    self.advance();
                    self.lex_fuzzy_suffix()?
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.advance();
                    self.advance();
                    TokenKind::And
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.advance();
                    self.advance();
                    TokenKind::Or
                }
                '"' => self.lex_string(start)?,
                '/' if !self.preceding_alphanumeric() => self.lex_regex(start)?,
                c if is_ident_start(c) => self.lex_word(),
                other => {
                    return Err(TranslateError::lex(
                        LexErrorKind::UnexpectedCharacter(other),
                        start.offset,
                        start.line,
                        start.column,
                    ));
                }
            };
            tokens.push(Token { kind, position: start });
        }
        Ok(tokens)
    }

    fn preceding_alphanumeric(&self) -> bool {
        self.offset > 0 && self.chars[self.offset - 1].is_alphanumeric()
    }

    fn lex_string(&mut self, start: Position) -> TranslateResult<TokenKind> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(TranslateError::lex(
                        LexErrorKind::UnterminatedString,
                        start.offset,
                        start.line,
                        start.column,
                    ));
                }
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        return Err(TranslateError::lex(
                            LexErrorKind::InvalidEscape(other),
                            self.position().offset,
                            self.position().line,
                            self.position().column,
                        ));
                    }
                    None => {
                        return Err(TranslateError::lex(
                            LexErrorKind::UnterminatedString,
                            start.offset,
                            start.line,
                            start.column,
                        ));
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::String(out))
    }

    fn lex_regex(&mut self, start: Position) -> TranslateResult<TokenKind> {
        self.advance(); // opening slash
        let mut out = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(TranslateError::lex(
                        LexErrorKind::UnterminatedString,
                        start.offset,
                        start.line,
                        start.column,
                    ));
                }
                Some('/') => break,
                Some('\\') => {
                    out.push('\\');
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                }
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::Regex(out))
    }

    /// Scan a maximal run of identifier characters and classify it after the
    /// fact, rather than committing to NUMBER vs IDENT from the first
    /// character: `13w42` must stay one token (a term), not split into a
    /// `Number("13")` followed by `Ident("w42")`.
    fn lex_word(&mut self) -> TokenKind {
        let start_off = self.offset;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        let text: String = self.chars[start_off..self.offset].iter().collect();
        match text.as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "TO" => TokenKind::To,
            "*" => TokenKind::Star,
            _ if is_plain_number(&text) => TokenKind::Number(text),
            _ => TokenKind::Ident(text),
        }
    }

    fn lex_boost(&mut self, start: Position) -> TranslateResult<TokenKind> {
        let start_off = self.offset;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.advance();
        }
        let text: String = self.chars[start_off..self.offset].iter().collect();
        let value: f64 = text.parse().map_err(|_| {
            TranslateError::parse(
                crate::error::ParseErrorKind::UnexpectedToken { found: format!("^{}", text) },
                start.offset,
                start.line,
                start.column,
            )
        })?;
        Ok(TokenKind::Caret(value))
    }

    fn lex_fuzzy_suffix(&mut self) -> TranslateResult<TokenKind> {
        let start_off = self.offset;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if start_off == self.offset {
            return Ok(TokenKind::Tilde(None));
        }
        let text: String = self.chars[start_off..self.offset].iter().collect();
        Ok(TokenKind::Tilde(text.parse().ok()))
    }

    #[allow(dead_code)]
    pub fn source(&self) -> &'a str {
        self.src
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '*' || c == '?'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '*' | '?')
}

/// True for tokens that are purely a decimal literal (digits, with at most
/// one `.`) so they lex as `Number` instead of `Ident`.
fn is_plain_number(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in text.chars() {
        if c == '.' {
            if seen_dot {
                return false;
            }
            seen_dot = true;
        } else if c.is_ascii_digit() {
            seen_digit = true;
        } else {
            return false;
        }
    }
    seen_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, 10_000).unwrap().tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_field_colon_value() {
        let ks = kinds("productCode:13w42");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident("productCode".into()),
                TokenKind::Colon,
                TokenKind::Ident("13w42".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_quoted_string_with_escapes() {
        let ks = kinds(r#""a \"b\" c""#);
        assert_eq!(ks[0], TokenKind::String("a \"b\" c".into()));
    }

    #[test]
    fn unterminated_string_reports_lex_error() {
        let err = Lexer::new("\"hello", 10_000).unwrap().tokenize().unwrap_err();
        assert!(matches!(err, TranslateError::Lex(LexErrorKind::UnterminatedString, ..)));
    }

    #[test]
    fn recognizes_double_ampersand_and_pipe_synonyms() {
        let ks = kinds("a && b || c");
        assert!(ks.contains(&TokenKind::And));
        assert!(ks.contains(&TokenKind::Or));
    }

    #[test]
    fn regex_literal_not_confused_with_division_after_alnum() {
        let ks = kinds("field:/ab+c/");
        assert!(matches!(ks[2], TokenKind::Regex(ref s) if s == "ab+c"));
    }

    #[test]
    fn query_too_long_rejected_before_lexing() {
        let long = "a".repeat(20);
        let err = Lexer::new(&long, 10).unwrap_err();
        assert!(matches!(err, TranslateError::Parse(crate::error::ParseErrorKind::QueryTooLong, ..)));
    }

    #[test]
    fn range_brackets_and_to_keyword() {
        let ks = kinds("[50 TO 500]");
        assert_eq!(
            ks,
            vec![
                TokenKind::LBrack,
                TokenKind::Number("50".into()),
                TokenKind::To,
                TokenKind::Number("500".into()),
                TokenKind::RBrack,
                TokenKind::Eof
            ]
        );
    }
}
