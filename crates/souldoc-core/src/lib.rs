//! Souldoc Core - documentation model generation for SOUL source code
//!
//! This crate provides:
//! - Lexer: Tokenization of SOUL source code
//! - AST: Declaration-level syntax tree
//! - Parser: AST construction from the token stream
//! - Program: Module arena with namespace merging, name search and type resolution
//! - Source: Positional text scanning and comment extraction
//! - Doc: The documentation model itself

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lexer module - tokenization of SOUL source code
pub mod lexer;

/// Abstract Syntax Tree - parsed SOUL declarations
pub mod ast;

/// Parser module - converts tokens into AST
pub mod parser;

/// Program arena - merged modules from every input file
pub mod program;

/// Source text scanning and comments
pub mod source;

/// Documentation model generation
pub mod doc;

/// Convenience re-export of lexer
pub use lexer::Lexer;

/// Convenience re-export of parser
pub use parser::Parser;

/// Convenience re-exports of the model entry points
pub use doc::{GenerateError, GeneratorOptions, InputFile, SourceCodeModel};
