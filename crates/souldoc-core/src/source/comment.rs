//! Finding and cleaning up the comment that documents a declaration

#![allow(clippy::cast_possible_truncation)]

use serde::Serialize;

use super::SourceText;
use crate::lexer::Span;

/// A cleaned-up source comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Written as `/**`, `/*!`, `///` or `//!`
    pub is_doxygen_style: bool,
    /// Written as a `/* */` block rather than `//` lines
    pub is_star_slash: bool,
    /// Content lines with delimiters, decoration and common indentation removed
    pub lines: Vec<String>,
    /// Where the raw comment sits in the file
    #[serde(skip)]
    pub span: Option<Span>,
}

impl Comment {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines joined with newlines
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Value of a `Title:` line, if there is one
    #[must_use]
    pub fn tagged_title(&self) -> Option<String> {
        self.title_line().map(|(_, title)| title)
    }

    /// The tagged title, or else the first line
    #[must_use]
    pub fn title(&self) -> String {
        match self.title_line() {
            Some((_, title)) => title,
            None => self.lines.first().cloned().unwrap_or_default(),
        }
    }

    /// Everything except the title line
    #[must_use]
    pub fn body(&self) -> String {
        let title_index = self.title_line().map_or(0, |(index, _)| index);
        let rest: Vec<&str> = self
            .lines
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != title_index)
            .map(|(_, line)| line.as_str())
            .collect();
        trim_blank_edges(&rest).join("\n")
    }

    fn title_line(&self) -> Option<(usize, String)> {
        self.lines.iter().enumerate().find_map(|(i, line)| {
            let prefix = line.get(..6)?;
            prefix
                .eq_ignore_ascii_case("title:")
                .then(|| (i, line[6..].trim().to_string()))
        })
    }
}

/// The comment documenting a declaration at `offset`, or an empty comment
///
/// Searches backwards from the start of the declaration's line, skipping
/// blank lines. Any code between the comment and the declaration means the
/// comment belongs to something else.
#[must_use]
pub fn nearest_preceding_comment(source: &SourceText, offset: u32) -> Comment {
    find_start_of_preceding_comment(source, offset)
        .map_or_else(Comment::default, |start| parse_comment(source, start))
}

fn find_start_of_preceding_comment(source: &SourceText, offset: u32) -> Option<u32> {
    let mut line = source.line_of(offset);

    let last = loop {
        if line == 0 {
            return None;
        }
        line -= 1;
        if !source.line_text(line).trim().is_empty() {
            break line;
        }
    };

    let text = source.line_text(last);
    let trimmed = text.trim();

    if trimmed.ends_with("*/") {
        let close = source.line_start(last) as usize + text.rfind("*/")?;
        let open = source.as_str()[..close].rfind("/*")?;
        let open_line_start = source.start_of_line(open as u32) as usize;
        return source.as_str()[open_line_start..open]
            .trim()
            .is_empty()
            .then_some(open as u32);
    }

    if trimmed.starts_with("//") {
        let mut first = last;
        while first > 0 && source.line_text(first - 1).trim_start().starts_with("//") {
            first -= 1;
        }
        let text = source.line_text(first);
        return Some(source.line_start(first) + leading_whitespace(text) as u32);
    }

    None
}

/// Parse the comment that starts at `start` (which must be `/*` or `//`)
#[must_use]
pub fn parse_comment(source: &SourceText, start: u32) -> Comment {
    let Some(rest) = source.as_str().get(start as usize..) else {
        return Comment::default();
    };

    if let Some(after_open) = rest.strip_prefix("/*") {
        let Some(close) = after_open.find("*/") else {
            return Comment::default();
        };
        let raw = &after_open[..close];
        let is_doxygen_style =
            raw.starts_with('!') || (raw.starts_with('*') && !raw.starts_with("**"));
        let content = if is_doxygen_style { &raw[1..] } else { raw };
        let content = content.trim_end_matches('*');

        let raw_lines: Vec<&str> = content
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let line = line.trim_end_matches('\r');
                if i == 0 {
                    return line;
                }
                let trimmed = line.trim_start();
                match trimmed.strip_prefix('*') {
                    Some(after_star) if !is_separator(trimmed) => after_star,
                    _ => line,
                }
            })
            .collect();

        return Comment {
            is_doxygen_style,
            is_star_slash: true,
            lines: clean_lines(&raw_lines, true),
            span: Some(Span::new(start, start + 2 + close as u32 + 2)),
        };
    }

    if rest.starts_with("//") {
        // The run may start mid-line, after code or a block comment
        let first_line = source.line_of(start);
        let mut end = line_end(source, first_line);
        let mut contents = vec![source.text_between(start + 2, end).unwrap_or_default()];
        let mut line = first_line + 1;
        while line < source.line_count() {
            let trimmed = source.line_text(line).trim_start();
            let Some(content) = trimmed.strip_prefix("//") else {
                break;
            };
            contents.push(content);
            end = line_end(source, line);
            line += 1;
        }

        let first = contents[0];
        let is_doxygen_style =
            first.starts_with('!') || (first.starts_with('/') && !first.starts_with("//"));
        let raw_lines: Vec<&str> = contents
            .iter()
            .map(|&content| {
                if is_doxygen_style {
                    content
                        .strip_prefix('/')
                        .or_else(|| content.strip_prefix('!'))
                        .unwrap_or(content)
                } else {
                    content
                }
            })
            .collect();

        return Comment {
            is_doxygen_style,
            is_star_slash: false,
            lines: clean_lines(&raw_lines, false),
            span: Some(Span::new(start, end)),
        };
    }

    Comment::default()
}

/// The first leading comment of a file that carries a `Title:` line
#[must_use]
pub fn file_summary_comment(source: &SourceText) -> Comment {
    let text = source.as_str();
    let mut offset = 0usize;

    loop {
        let rest = &text[offset..];
        let trimmed = rest.trim_start();
        if !(trimmed.starts_with("/*") || trimmed.starts_with("//")) {
            return Comment::default();
        }

        let start = offset + (rest.len() - trimmed.len());
        let comment = parse_comment(source, start as u32);
        let Some(span) = comment.span else {
            return Comment::default();
        };
        if comment.tagged_title().is_some() {
            return comment;
        }
        if span.end as usize <= offset {
            return Comment::default();
        }
        offset = span.end as usize;
    }
}

fn line_end(source: &SourceText, line: usize) -> u32 {
    source.line_start(line) + source.line_text(line).len() as u32
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// A decoration line made only of `=` or only of `*`
fn is_separator(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '*'))
}

/// Drop separators, dedent, strip trailing space and trim blank edge lines
///
/// Text sharing a line with a `/*` opener is dedented on its own, since its
/// indentation is unrelated to the lines below it.
fn clean_lines(raw: &[&str], first_shares_opener_line: bool) -> Vec<String> {
    let first_inline = first_shares_opener_line
        && raw
            .first()
            .is_some_and(|line| !line.trim().is_empty() && !is_separator(line));

    let kept: Vec<&str> = raw
        .iter()
        .copied()
        .filter(|line| !is_separator(line))
        .map(str::trim_end)
        .collect();
    let kept = trim_blank_edges(&kept);
    let skip = usize::from(first_inline);

    let indent = kept
        .iter()
        .skip(skip)
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    kept.iter()
        .enumerate()
        .map(|(i, line)| {
            if i < skip {
                line.trim_start().to_string()
            } else {
                line.get(indent..).unwrap_or("").to_string()
            }
        })
        .collect()
}

fn trim_blank_edges<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |i| i + 1);
    lines[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_before(source: &str, marker: &str) -> Comment {
        let text = SourceText::new(source);
        let offset = source.find(marker).unwrap() as u32;
        nearest_preceding_comment(&text, offset)
    }

    #[test]
    fn doxygen_block_comment() {
        let comment = comment_before(
            "/** Moves the level smoothly.\n    Takes a number of steps.\n*/\nvoid rampTo (float target) {}",
            "void",
        );
        assert!(comment.is_doxygen_style);
        assert!(comment.is_star_slash);
        assert_eq!(
            comment.lines,
            vec!["Moves the level smoothly.", "Takes a number of steps."]
        );
        assert_eq!(comment.title(), "Moves the level smoothly.");
        assert_eq!(comment.body(), "Takes a number of steps.");
    }

    #[test]
    fn star_decorated_block() {
        let comment = comment_before(
            "/**\n * First line\n *   indented\n */\nint x;",
            "int",
        );
        assert_eq!(comment.lines, vec!["First line", "  indented"]);
    }

    #[test]
    fn line_comment_run_with_blank_gap() {
        let comment = comment_before(
            "int a;\n// one\n//   two\n\n\nfloat b;",
            "float",
        );
        assert!(!comment.is_doxygen_style);
        assert!(!comment.is_star_slash);
        assert_eq!(comment.lines, vec!["one", "  two"]);
    }

    #[test]
    fn triple_slash_is_doxygen() {
        let comment = comment_before("/// Gain in dB\nfloat gain;", "float");
        assert!(comment.is_doxygen_style);
        assert_eq!(comment.text(), "Gain in dB");

        let comment = comment_before("//// banner\nfloat gain;", "float");
        assert!(!comment.is_doxygen_style);
    }

    #[test]
    fn code_between_stops_the_search() {
        let comment = comment_before("/** for a */\nint a;\nint b;", "int b");
        assert_eq!(comment, Comment::default());
    }

    #[test]
    fn trailing_block_after_code_is_not_taken() {
        let comment = comment_before("int a; /* about a */\nint b;", "int b");
        assert!(comment.is_empty());
        assert_eq!(comment.span, None);
    }

    #[test]
    fn separator_lines_are_dropped() {
        let comment = comment_before("//==========\n// Section\n//==========\nint x;", "int");
        assert_eq!(comment.lines, vec!["Section"]);

        let comment = comment_before("//==========\nint x;", "int");
        assert!(comment.is_empty());
    }

    #[test]
    fn tagged_title_and_body() {
        let source = SourceText::new(
            "/*\n    Title: SOUL filters\n\n    A collection of filters.\n*/\nnamespace soul {}",
        );
        let comment = file_summary_comment(&source);
        assert_eq!(comment.tagged_title().as_deref(), Some("SOUL filters"));
        assert_eq!(comment.title(), "SOUL filters");
        assert_eq!(comment.body(), "A collection of filters.");
    }

    #[test]
    fn file_summary_skips_untitled_leading_comments() {
        let source = SourceText::new(
            "// Copyright notice\n\n/** title: Oscillators\n    Sine and saw. */\nnamespace soul {}",
        );
        let comment = file_summary_comment(&source);
        assert_eq!(comment.title(), "Oscillators");
        assert_eq!(comment.body(), "Sine and saw.");
    }

    #[test]
    fn line_comment_after_block_on_one_line() {
        let source = SourceText::new("/* licence */ // note\nprocessor P {}");
        let comment = parse_comment(&source, 14);
        assert_eq!(comment.lines, vec!["note"]);
        assert_eq!(comment.span, Some(Span::new(14, 21)));
        assert_eq!(file_summary_comment(&source), Comment::default());

        let source = SourceText::new("\n/* licence */ // note\n// Title: Mixer\nprocessor P {}");
        let comment = file_summary_comment(&source);
        assert_eq!(comment.title(), "Mixer");
        assert_eq!(comment.lines, vec!["note", "Title: Mixer"]);
    }

    #[test]
    fn file_summary_requires_leading_comment() {
        let source = SourceText::new("namespace soul {}\n/* Title: late */");
        assert_eq!(file_summary_comment(&source), Comment::default());
    }
}
