//! Lexer for SOUL source code
//!
//! Converts source text into a flat token stream. Comments are kept as trivia
//! tokens so the parser can skip them; the documentation pass never reads
//! comments from the token stream, it finds them positionally in the text.

#![allow(clippy::cast_possible_truncation)] // Spans are u32; sources larger than 4GB are rejected upstream

mod span;
mod token;

pub use span::{LineIndex, Location, Span};
pub use token::TokenKind;

use logos::Logos;
use thiserror::Error;

/// A token with its kind, span, and source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }
}

/// Lexer error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
}

/// A lexer error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedError {
    pub error: LexError,
    pub span: Span,
}

impl SpannedError {
    #[must_use]
    pub fn new(error: LexError, span: Span) -> Self {
        Self { error, span }
    }
}

impl std::fmt::Display for SpannedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.error, self.span)
    }
}

impl std::error::Error for SpannedError {}

/// The SOUL lexer
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, TokenKind>,
    source: &'source str,
    finished: bool,
    errors: Vec<SpannedError>,
}

impl<'source> Lexer<'source> {
    #[must_use]
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            finished: false,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source, returning all tokens (ending in `Eof`) and any errors
    #[must_use]
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<SpannedError>) {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.by_ref().collect();
        (tokens, lexer.errors)
    }

    /// Errors collected so far
    #[must_use]
    pub fn errors(&self) -> &[SpannedError] {
        &self.errors
    }

    fn error_token(&mut self, span: Span) -> Token {
        let text = &self.source[span.as_range()];
        let error = if text.starts_with('"') {
            LexError::UnterminatedString
        } else if text.starts_with("/*") {
            LexError::UnterminatedBlockComment
        } else {
            LexError::UnexpectedChar(text.chars().next().unwrap_or('\0'))
        };
        self.errors.push(SpannedError::new(error, span));
        Token::new(TokenKind::Error, span, text)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(kind)) => Some(Token::new(
                kind,
                Span::from(self.inner.span()),
                self.inner.slice(),
            )),
            Some(Err(())) => {
                let span = Span::from(self.inner.span());
                Some(self.error_token(span))
            }
            None => {
                self.finished = true;
                let end = self.source.len() as u32;
                Some(Token::new(TokenKind::Eof, Span::at(end), ""))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_declaration_keywords() {
        assert_eq!(
            lex_kinds("namespace processor graph struct using"),
            vec![
                TokenKind::Namespace,
                TokenKind::Processor,
                TokenKind::Graph,
                TokenKind::Struct,
                TokenKind::Using,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_endpoint_declaration() {
        assert_eq!(
            lex_kinds("input stream float<2> in;"),
            vec![
                TokenKind::Input,
                TokenKind::Stream,
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Int,
                TokenKind::Gt,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_number_suffixes() {
        let (tokens, errors) = Lexer::tokenize("1 2L 3i64 0x1F 1.5f 2.0 3f 1e3f64");
        assert!(errors.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].lexeme, "3i64");
    }

    #[test]
    fn lex_comments_as_trivia() {
        let tokens = Lexer::tokenize("/** doc **/ // line\nx").0;
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert_eq!(tokens[0].lexeme, "/** doc **/");
        assert_eq!(tokens[1].kind, TokenKind::LineComment);
        assert!(tokens[1].kind.is_trivia());
        assert_eq!(tokens[2].kind, TokenKind::Ident);
    }

    #[test]
    fn lex_block_comment_forms() {
        for source in ["/* a */", "/** x **/", "/*!*/", "/**/", "/* a ** b */"] {
            let (tokens, errors) = Lexer::tokenize(source);
            assert!(errors.is_empty(), "{source}");
            assert_eq!(tokens.len(), 2, "{source}");
            assert_eq!(tokens[0].kind, TokenKind::BlockComment);
            assert_eq!(tokens[0].lexeme, source);
        }
    }

    #[test]
    fn lex_multi_line_block_comment() {
        let source = "/*\n    Title: Gain\n\n    Levels.\n*/\nprocessor Gain {}";
        let (tokens, errors) = Lexer::tokenize(source);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert_eq!(tokens[0].span, Span::new(0, 34));
        assert_eq!(tokens[1].kind, TokenKind::Processor);
    }

    #[test]
    fn block_comment_ends_at_first_close() {
        let kinds = lex_kinds("/* a */ x /* b */");
        assert_eq!(
            kinds,
            vec![
                TokenKind::BlockComment,
                TokenKind::Ident,
                TokenKind::BlockComment,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let (tokens, errors) = Lexer::tokenize("x /* never closed");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, LexError::UnterminatedBlockComment);
        assert_eq!(errors[0].span, Span::new(2, 17));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn lex_spans_are_correct() {
        let tokens = Lexer::tokenize("let x = 42;").0;
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 5));
        assert_eq!(tokens[3].span, Span::new(8, 10));
        assert_eq!(tokens[5].span, Span::new(11, 11));
    }

    #[test]
    fn error_recovery_continues() {
        let (tokens, errors) = Lexer::tokenize("let @ x = 5;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, LexError::UnexpectedChar('@'));
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::Error));
        assert!(kinds.contains(&TokenKind::Ident));
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, errors) = Lexer::tokenize("let s = \"abc\n;");
        assert_eq!(errors[0].error, LexError::UnterminatedString);
    }

    #[test]
    fn line_index_works_with_lexer() {
        let source = "let x = 42;\nlet y = 10;";
        let index = LineIndex::new(source);
        let tokens = Lexer::tokenize(source).0;
        let y = tokens.iter().find(|t| t.lexeme == "y").unwrap();
        assert_eq!(index.location(y.span.start), Location::new(2, 5));
    }
}
