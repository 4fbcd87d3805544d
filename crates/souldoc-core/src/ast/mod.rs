//! Abstract Syntax Tree (AST) for SOUL declarations
//!
//! Only the declaration-level structure of a SOUL program is represented here.
//! Function bodies are skipped by the parser, while initialisers, parameter
//! defaults and type expressions are kept because the documentation model
//! renders them.

mod expr;
mod item;
mod types;

pub use expr::*;
pub use item::*;
pub use types::*;

pub use crate::lexer::Span;

/// Index of a source file within a [`Program`](crate::program::Program)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The file and byte range a declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context {
    pub file: FileId,
    pub span: Span,
}

impl Context {
    #[must_use]
    pub const fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// Byte offset of the start of the range
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.span.start
    }
}

/// An identifier with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// The identifier name
    pub name: String,
    /// Source location
    pub span: Span,
}

impl Ident {
    /// Create a new identifier
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A `::`-separated name such as `soul::filters::LowPass`
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl QualifiedName {
    #[must_use]
    pub fn new(segments: Vec<Ident>, span: Span) -> Self {
        Self { segments, span }
    }

    /// Name consisting of one identifier
    #[must_use]
    pub fn single(ident: Ident) -> Self {
        let span = ident.span;
        Self {
            segments: vec![ident],
            span,
        }
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    /// True when this is exactly the unqualified identifier `name`
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.is_single() && self.segments[0].name == name
    }

    /// The final segment
    #[must_use]
    pub fn last(&self) -> Option<&Ident> {
        self.segments.last()
    }

    /// Segment names as string slices
    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}
