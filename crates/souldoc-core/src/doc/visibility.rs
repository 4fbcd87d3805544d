//! Which declarations make it into the documentation

use crate::ast::{FunctionDecl, ModuleKind, StructDecl, VariableDecl};
use crate::program::{Module, Program};
use crate::source::{nearest_preceding_comment, Comment};

/// A doxygen comment counts even when it is empty
#[must_use]
pub fn should_include_comment(comment: &Comment) -> bool {
    comment.is_doxygen_style || !comment.text().trim().is_empty()
}

#[must_use]
pub fn should_show_function(program: &Program, function: &FunctionDecl) -> bool {
    let source = &program.file(function.context.file).text;
    should_include_comment(&nearest_preceding_comment(source, function.context.offset()))
}

/// Shadow declarations of value parameters are documented as parameters
#[must_use]
pub fn should_show_variable(variable: &VariableDecl) -> bool {
    !variable.is_specialisation
}

#[must_use]
pub fn should_show_struct(_structure: &StructDecl) -> bool {
    true
}

#[must_use]
pub fn should_show_module(program: &Program, module: &Module) -> bool {
    if module.kind == ModuleKind::Processor {
        return true;
    }

    let has_comment = module.keyword.is_some_and(|keyword| {
        let source = &program.file(keyword.file).text;
        should_include_comment(&nearest_preceding_comment(source, keyword.offset()))
    });

    has_comment
        || module.functions.iter().any(|f| should_show_function(program, f))
        || module.state_variables.iter().any(should_show_variable)
        || module.structs.iter().any(should_show_struct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::program::{Diagnostics, ModuleId};

    fn first_module(program: &mut Program, source: &str) -> ModuleId {
        let file = program.add_file("v.soul", source);
        let decls = Parser::parse_top_level_declarations(source, file).unwrap();
        program.add_top_level(decls, &mut Diagnostics::new())[0]
    }

    #[test]
    fn comments() {
        let doxygen_empty = Comment {
            is_doxygen_style: true,
            ..Comment::default()
        };
        assert!(should_include_comment(&doxygen_empty));

        let plain = Comment {
            lines: vec!["text".into()],
            ..Comment::default()
        };
        assert!(should_include_comment(&plain));
        assert!(!should_include_comment(&Comment::default()));
    }

    #[test]
    fn processors_always_show() {
        let mut program = Program::new();
        let id = first_module(&mut program, "processor Empty {}");
        assert!(should_show_module(&program, program.module(id)));
    }

    #[test]
    fn namespaces_need_content() {
        let mut program = Program::new();
        let id = first_module(&mut program, "namespace quiet { void helper() {} }");
        assert!(!should_show_module(&program, program.module(id)));

        let id = first_module(&mut program, "namespace loud {\n/// Documented\nvoid helper() {} }");
        assert!(should_show_module(&program, program.module(id)));

        let id = first_module(&mut program, "/** About the namespace */\nnamespace described {}");
        assert!(should_show_module(&program, program.module(id)));
    }

    #[test]
    fn graphs_with_only_parameters_are_hidden() {
        let mut program = Program::new();
        let id = first_module(&mut program, "graph G (int n) {}");
        let module = program.module(id);
        assert_eq!(module.state_variables.len(), 1);
        assert!(!should_show_module(&program, module));
    }
}
