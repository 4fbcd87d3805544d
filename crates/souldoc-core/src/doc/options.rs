//! Generator settings, optionally read from a `souldoc.toml`

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading generator options.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Settings for one model generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorOptions {
    /// Namespace whose sub-namespaces are merged into one TOC level
    pub library_namespace: String,

    /// Extension stripped from filenames when building file UIDs
    pub source_extension: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            library_namespace: "soul".to_string(),
            source_extension: ".soul".to_string(),
        }
    }
}

impl GeneratorOptions {
    /// Read options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse options from a TOML string. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is unusable.
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        if self.library_namespace.is_empty() {
            return Err(OptionsError::Invalid {
                field: "library_namespace",
                reason: "must not be empty",
            });
        }
        if !self.source_extension.starts_with('.') {
            return Err(OptionsError::Invalid {
                field: "source_extension",
                reason: "must start with '.'",
            });
        }
        Ok(())
    }

    /// Extension without its leading dot, for matching file paths
    #[must_use]
    pub fn bare_extension(&self) -> &str {
        self.source_extension.trim_start_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let options = GeneratorOptions::from_toml_str("").unwrap();
        assert_eq!(options, GeneratorOptions::default());
        assert_eq!(options.bare_extension(), "soul");
    }

    #[test]
    fn partial_override() {
        let options = GeneratorOptions::from_toml_str("library_namespace = \"dsp\"").unwrap();
        assert_eq!(options.library_namespace, "dsp");
        assert_eq!(options.source_extension, ".soul");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            GeneratorOptions::from_toml_str("source_extension = \"soul\""),
            Err(OptionsError::Invalid {
                field: "source_extension",
                ..
            })
        ));
        assert!(matches!(
            GeneratorOptions::from_toml_str("colour = \"red\""),
            Err(OptionsError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("souldoc.toml");
        std::fs::write(&path, "source_extension = \".sl\"\n").unwrap();
        let options = GeneratorOptions::load(&path).unwrap();
        assert_eq!(options.bare_extension(), "sl");

        assert!(matches!(
            GeneratorOptions::load(dir.path().join("missing.toml")),
            Err(OptionsError::Io(_))
        ));
    }
}
