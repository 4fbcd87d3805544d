//! Table of contents
//!
//! Files sit at the top level, keyed by their title. Each documented module
//! is filed under its file's title and its qualified name, with the first two
//! segments of library names merged so `soul::filters::LowPass` lands at
//! `Filters.soul / soul::filters / LowPass`.

use serde::Serialize;

use super::model::FileDescriptor;

/// Points at `files[file].modules[module]` of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleRef {
    pub file: usize,
    pub module: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TocNode {
    pub name: String,
    /// Index into the model's files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRef>,
    pub children: Vec<TocNode>,
}

impl TocNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build the tree for a set of files
    #[must_use]
    pub fn build(files: &[FileDescriptor], library_namespace: &str) -> Self {
        let mut root = Self::default();

        for (file_index, file) in files.iter().enumerate() {
            root.get_node(&[file.title.as_str()]).file = Some(file_index);

            for (module_index, module) in file.modules.iter().enumerate() {
                let mut path = vec![file.title.clone()];
                path.extend(collapse_library_prefix(
                    split_path(&module.fully_qualified_name),
                    library_namespace,
                ));
                root.get_node(&path).module = Some(ModuleRef {
                    file: file_index,
                    module: module_index,
                });
            }
        }
        root
    }

    /// The node at `path`, creating any missing nodes on the way
    ///
    /// A module named like its file's title shares the file's node, so one
    /// node can point at both.
    pub fn get_node<S: AsRef<str>>(&mut self, path: &[S]) -> &mut Self {
        let Some((first, rest)) = path.split_first() else {
            return self;
        };
        let name = first.as_ref();
        // A last segment naming this node refers to the node itself
        if rest.is_empty() && self.name == name {
            return self;
        }
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.children.push(Self::new(name));
                self.children.len() - 1
            }
        };
        self.children[index].get_node(rest)
    }

    #[must_use]
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        self.children
            .iter()
            .find(|c| c.name == first.as_ref())?
            .find(rest)
    }

    fn write_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        for child in &self.children {
            writeln!(f, "{:indent$}{}", "", child.name, indent = depth * 2)?;
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Children indented by two spaces per level
impl std::fmt::Display for TocNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Split on `::`, ignoring separators inside `<...>`
fn split_path(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn collapse_library_prefix(mut segments: Vec<String>, library_namespace: &str) -> Vec<String> {
    if segments.len() >= 2 && segments[0] == library_namespace {
        let second = segments.remove(1);
        segments[0] = format!("{library_namespace}::{second}");
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ModuleKind;
    use crate::doc::model::ModuleDescriptor;
    use crate::source::Comment;

    #[test]
    fn splitting_respects_chevrons() {
        assert_eq!(split_path("a::b::c"), vec!["a", "b", "c"]);
        assert_eq!(split_path("a::B<x::y, 2>"), vec!["a", "B<x::y, 2>"]);
        assert_eq!(split_path("single"), vec!["single"]);
        assert!(split_path("").is_empty());
    }

    #[test]
    fn library_prefix_collapses() {
        let collapse = |s: &str| collapse_library_prefix(split_path(s), "soul");
        assert_eq!(collapse("soul::filters::LowPass"), vec!["soul::filters", "LowPass"]);
        assert_eq!(collapse("soul::mixers"), vec!["soul::mixers"]);
        assert_eq!(collapse("soul"), vec!["soul"]);
        assert_eq!(collapse("mine::soul::x"), vec!["mine", "soul", "x"]);
    }

    #[test]
    fn insertion_is_idempotent() {
        let mut root = TocNode::default();
        root.get_node(&["a", "b"]).file = Some(0);
        root.get_node(&["a", "b"]).module = Some(ModuleRef { file: 0, module: 1 });
        root.get_node(&["a", "c"]);

        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 2);
        let b = root.find(&["a", "b"]).unwrap();
        assert_eq!(b.file, Some(0));
        assert_eq!(b.module, Some(ModuleRef { file: 0, module: 1 }));
        assert!(root.find(&["a", "d"]).is_none());
    }

    #[test]
    fn module_named_like_its_file_shares_the_node() {
        let program = crate::program::Program::new();
        let module = ModuleDescriptor::new(
            program.root(),
            "mod_Oscillators".to_string(),
            ModuleKind::Namespace,
            "Oscillators".to_string(),
        );
        let file = FileDescriptor {
            filename: "oscillators.soul".to_string(),
            uid: "lib_oscillators".to_string(),
            title: "Oscillators".to_string(),
            summary: String::new(),
            file_comment: Comment::default(),
            modules: vec![module],
        };

        let root = TocNode::build(&[file], "soul");
        assert_eq!(root.children.len(), 1);
        let node = root.find(&["Oscillators"]).unwrap();
        assert_eq!(node.file, Some(0));
        assert_eq!(node.module, Some(ModuleRef { file: 0, module: 0 }));
        assert!(node.children.is_empty());
    }

    #[test]
    fn display_indents_levels() {
        let mut root = TocNode::default();
        root.get_node(&["Filters.soul", "soul::filters", "LowPass"]);
        assert_eq!(
            root.to_string(),
            "Filters.soul\n  soul::filters\n    LowPass\n"
        );
    }
}
