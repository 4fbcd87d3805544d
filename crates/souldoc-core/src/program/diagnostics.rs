//! Compile messages collected while building a program

use crate::lexer::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// One diagnostic, positioned in a named file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMessage {
    pub filename: String,
    pub location: Location,
    pub severity: Severity,
    pub description: String,
}

impl std::fmt::Display for CompileMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.filename, self.location, self.severity, self.description
        )
    }
}

/// An accumulating sink for compile messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<CompileMessage>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(
        &mut self,
        filename: impl Into<String>,
        location: Location,
        description: impl Into<String>,
    ) {
        self.push(filename.into(), location, Severity::Error, description.into());
    }

    pub fn add_warning(
        &mut self,
        filename: impl Into<String>,
        location: Location,
        description: impl Into<String>,
    ) {
        self.push(filename.into(), location, Severity::Warning, description.into());
    }

    fn push(&mut self, filename: String, location: Location, severity: Severity, description: String) {
        self.messages.push(CompileMessage {
            filename,
            location,
            severity,
            description,
        });
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> &[CompileMessage] {
        &self.messages
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_not_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning("a.soul", Location::new(1, 1), "unused");
        assert!(!diagnostics.has_errors());
        assert!(!diagnostics.is_empty());

        diagnostics.add_error("a.soul", Location::new(3, 7), "expected ';'");
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn messages_format_with_location() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error("gain.soul", Location::new(12, 5), "duplicate definition 'Gain'");
        diagnostics.add_error("gain.soul", Location::new(14, 1), "expected '}'");
        assert_eq!(
            diagnostics.to_string(),
            "gain.soul:12:5: error: duplicate definition 'Gain'\ngain.soul:14:1: error: expected '}'"
        );
    }
}
