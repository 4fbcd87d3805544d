//! Documentation model generation for SOUL source code
//!
//! This module turns parsed SOUL files into a [`SourceCodeModel`]: a tree of
//! files and modules whose members carry stable UIDs, their source comments
//! and rendered types. Producing HTML or Markdown from the model is left to
//! the caller.

mod builder;
mod error;
mod model;
mod options;
mod render;
mod toc;
mod uid;
mod visibility;

pub use builder::{InputFile, SourceCodeModel};
pub use error::GenerateError;
pub use model::{
    EndpointDescriptor, Expression, FileDescriptor, FunctionDescriptor, ModuleDescriptor, Section,
    SectionKind, SpecialisationParameterDescriptor, StructDescriptor, StructMemberDescriptor,
    VariableDescriptor,
};
pub use options::{GeneratorOptions, OptionsError};
pub use render::ExpressionRenderer;
pub use toc::{ModuleRef, TocNode};
pub use uid::{make_uid, UidKind};
pub use visibility::should_include_comment;
