use thiserror::Error;

use crate::program::Diagnostics;

/// Why a model could not be generated
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The sources did not compile
    #[error("compilation failed:\n{0}")]
    Compile(Diagnostics),

    /// The source text did not match what the parsed declarations imply
    #[error("internal error: {0}")]
    Internal(String),
}

impl GenerateError {
    /// The compile diagnostics, if that is what went wrong
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Compile(diagnostics) => Some(diagnostics),
            Self::Internal(_) => None,
        }
    }
}
