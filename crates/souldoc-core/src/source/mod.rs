//! Source text with positional scanning helpers
//!
//! The documentation pass works on raw text as well as on the AST: comments,
//! initialiser text and function names with their generic parameters are all
//! recovered by scanning forwards or backwards from a declaration's position.

#![allow(clippy::cast_possible_truncation)] // Offsets are u32, like spans

mod comment;

pub use comment::{file_summary_comment, nearest_preceding_comment, parse_comment, Comment};

use crate::lexer::{LineIndex, Location};

/// A source file's text plus its line table
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    lines: LineIndex,
}

impl SourceText {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = LineIndex::new(&text);
        Self { text, lines }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn location(&self, offset: u32) -> Location {
        self.lines.location(offset)
    }

    /// 0-indexed line containing `offset`
    #[must_use]
    pub fn line_of(&self, offset: u32) -> usize {
        self.lines.line_of(offset)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    #[must_use]
    pub fn start_of_line(&self, offset: u32) -> u32 {
        self.lines.start_of_line(offset)
    }

    /// Text of a 0-indexed line without its line terminator
    #[must_use]
    pub fn line_text(&self, line: usize) -> &str {
        let Some(start) = self.lines.line_start(line) else {
            return "";
        };
        let end = self.lines.line_start(line + 1).unwrap_or(self.len());
        self.text[start as usize..end as usize].trim_end_matches(['\n', '\r'])
    }

    /// Offset where a 0-indexed line starts
    #[must_use]
    pub fn line_start(&self, line: usize) -> u32 {
        self.lines.line_start(line).unwrap_or(self.len())
    }

    /// Offset of the next `ch` at or after `from`
    #[must_use]
    pub fn find_next(&self, from: u32, ch: char) -> Option<u32> {
        let rest = self.text.get(from as usize..)?;
        rest.find(ch).map(|i| from + i as u32)
    }

    /// Text in `start..end`, or `None` for an inverted or out-of-range pair
    #[must_use]
    pub fn text_between(&self, start: u32, end: u32) -> Option<&str> {
        if start > end {
            return None;
        }
        self.text.get(start as usize..end as usize)
    }

    /// Offset of the `,` `;` `)` or `}` that ends the expression starting at
    /// `from`. Bracketed groups and string literals are skipped over.
    #[must_use]
    pub fn find_end_of_expression(&self, from: u32) -> Option<u32> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut i = from as usize;

        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b'(' | b'{' | b'[' => depth += 1,
                b')' | b'}' | b']' if depth > 0 => depth -= 1,
                b',' | b';' | b')' | b'}' if depth == 0 => return Some(i as u32),
                _ => {}
            }
            i += 1;
        }
        None
    }
}
