//! Documentation data model
//!
//! Everything here is plain data meant to be serialised and handed to a
//! renderer. Types are kept as [`Expression`]s (sequences of classified text
//! fragments) so a renderer can style keywords and link struct names without
//! re-parsing anything.

use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::ast::{EndpointKind, ModuleKind};
use crate::program::ModuleId;
use crate::source::Comment;

/// How a fragment of rendered text should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Keyword,
    Text,
    Primitive,
    Structure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

/// A rendered type or value: an ordered list of [`Section`]s
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Expression {
    pub sections: Vec<Section>,
}

impl Expression {
    fn single(kind: SectionKind, text: impl Into<String>) -> Self {
        Self {
            sections: vec![Section {
                kind,
                text: text.into(),
            }],
        }
    }

    #[must_use]
    pub fn keyword(text: impl Into<String>) -> Self {
        Self::single(SectionKind::Keyword, text)
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::single(SectionKind::Text, text)
    }

    #[must_use]
    pub fn primitive(text: impl Into<String>) -> Self {
        Self::single(SectionKind::Primitive, text)
    }

    #[must_use]
    pub fn structure(text: impl Into<String>) -> Self {
        Self::single(SectionKind::Structure, text)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Add for Expression {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Expression {
    fn add_assign(&mut self, rhs: Self) {
        self.sections.extend(rhs.sections);
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for section in &self.sections {
            f.write_str(&section.text)?;
        }
        Ok(())
    }
}

/// One input file and the modules first declared in it
#[derive(Debug, Clone, Serialize)]
pub struct FileDescriptor {
    pub filename: String,
    pub uid: String,
    pub title: String,
    pub summary: String,
    pub file_comment: Comment,
    pub modules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    /// The program module this describes
    #[serde(skip)]
    pub module: ModuleId,
    pub uid: String,
    pub kind: ModuleKind,
    /// Qualified name without the root namespace: `soul::filters`
    pub fully_qualified_name: String,
    pub comment: Comment,
    pub specialisation_params: Vec<SpecialisationParameterDescriptor>,
    pub inputs: Vec<EndpointDescriptor>,
    pub outputs: Vec<EndpointDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
    pub variables: Vec<VariableDescriptor>,
    pub structs: Vec<StructDescriptor>,
}

impl ModuleDescriptor {
    #[must_use]
    pub fn new(module: ModuleId, uid: String, kind: ModuleKind, fully_qualified_name: String) -> Self {
        Self {
            module,
            uid,
            kind,
            fully_qualified_name,
            comment: Comment::default(),
            specialisation_params: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            functions: Vec::new(),
            variables: Vec::new(),
            structs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDescriptor {
    pub uid: String,
    pub bare_name: String,
    pub fully_qualified_name: String,
    /// Source text from the name up to `(`, e.g. `sum<T>`
    pub name_with_generics: String,
    pub comment: Comment,
    /// Absent for event handlers
    pub return_type: Option<Expression>,
    pub parameters: Vec<VariableDescriptor>,
}

/// A state variable or a function parameter
#[derive(Debug, Clone, Serialize)]
pub struct VariableDescriptor {
    pub uid: String,
    pub name: String,
    pub comment: Comment,
    #[serde(rename = "type")]
    pub ty: Expression,
    /// Source text of the initialiser, empty when there is none
    pub initialiser: String,
    pub is_external: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructDescriptor {
    pub uid: String,
    pub short_name: String,
    pub full_name: String,
    pub comment: Comment,
    pub members: Vec<StructMemberDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructMemberDescriptor {
    pub name: String,
    pub comment: Comment,
    #[serde(rename = "type")]
    pub ty: Expression,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    pub uid: String,
    pub name: String,
    pub comment: Comment,
    pub endpoint_kind: EndpointKind,
    pub data_types: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecialisationParameterDescriptor {
    pub uid: String,
    pub name: String,
    pub comment: Comment,
    #[serde(rename = "type")]
    pub ty: Expression,
    /// Source text of the default, empty when there is none
    pub default_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenation_keeps_order_and_text() {
        let a = Expression::keyword("const ") + Expression::primitive("float32");
        let b = Expression::text("[") + Expression::text("4") + Expression::text("]");
        let joined = a.clone() + b.clone();

        assert_eq!(joined.to_string(), format!("{a}{b}"));
        assert_eq!(joined.sections.len(), 5);
        assert_eq!(joined.sections[0].kind, SectionKind::Keyword);
        assert_eq!(joined.sections[4].text, "]");
    }

    #[test]
    fn concatenation_is_associative() {
        let a = Expression::structure("Voice");
        let b = Expression::text("&");
        let c = Expression::keyword("const ");
        assert_eq!((a.clone() + b.clone()) + c.clone(), a + (b + c));
    }

    #[test]
    fn sections_serialise_in_snake_case() {
        let json = serde_json::to_value(Expression::primitive("int32")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sections": [{ "kind": "primitive", "text": "int32" }] })
        );
    }
}
