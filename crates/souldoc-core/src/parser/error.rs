//! Syntax errors raised while reading SOUL declarations

use crate::lexer::{LexError, Span, TokenKind};
use thiserror::Error;

/// A syntax error and the source range it was found at
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}{}", note_suffix(.note.as_deref()))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    /// Extra advice printed after the message
    pub note: Option<String>,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

fn note_suffix(note: Option<&str>) -> String {
    note.map(|note| format!(" ({note})")).unwrap_or_default()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("found '{found}' when expecting {expected}")]
    UnexpectedToken {
        found: TokenKind,
        expected: ExpectedToken,
    },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected an expression")]
    ExpectedExpression,

    #[error("expected a name")]
    ExpectedIdentifier,

    #[error("expected a type")]
    ExpectedType,

    /// A closing or separating token is missing after some construct
    #[error("expected '{expected}' after {context}")]
    ExpectedAfter {
        expected: &'static str,
        context: &'static str,
    },

    #[error("cannot parse number literal '{0}'")]
    InvalidNumber(String),

    /// Only namespaces may be declared with a `::` path
    #[error("a {0} name cannot contain '::'")]
    QualifiedModuleName(&'static str),

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// What the parser was looking for when it gave up
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedToken {
    Token(TokenKind),
    OneOf(Vec<TokenKind>),
    Description(&'static str),
}

impl std::fmt::Display for ExpectedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedToken::Token(kind) => write!(f, "'{kind}'"),
            ExpectedToken::OneOf(kinds) => match kinds.split_last() {
                None => f.write_str("nothing"),
                Some((last, [])) => write!(f, "'{last}'"),
                Some((last, rest)) => {
                    for (i, kind) in rest.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "'{kind}'")?;
                    }
                    write!(f, " or '{last}'")
                }
            },
            ExpectedToken::Description(text) => f.write_str(text),
        }
    }
}
