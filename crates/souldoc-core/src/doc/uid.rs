//! Stable identifiers for documented entities
//!
//! A UID is a kind prefix plus the entity's qualified path, reduced to
//! characters that are safe in filenames and HTML anchors. The same program
//! always produces the same UIDs.

use crate::program::{strip_root_namespace, ModuleId, Program};

/// Which kind of entity a UID names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UidKind {
    Module,
    Type,
    Variable,
    Endpoint,
    Function,
    SpecialisationParam,
    Library,
}

impl UidKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Module => "mod_",
            Self::Type => "type_",
            Self::Variable => "var_",
            Self::Endpoint => "endpoint_",
            Self::Function => "fn_",
            Self::SpecialisationParam => "specparam_",
            Self::Library => "lib_",
        }
    }
}

/// The scope an entity is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope<'a> {
    Module(ModuleId),
    /// Function parameters live inside their function
    Function { module: ModuleId, name: &'a str },
}

/// Replace spaces and `::` with `_`, then drop anything outside
/// `[A-Za-z0-9_-]`
#[must_use]
pub fn make_uid(text: &str) -> String {
    text.replace(' ', "_")
        .replace("::", "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Qualified path of an entity, without the root namespace
#[must_use]
pub fn full_path_for(program: &Program, parent: ParentScope<'_>, name: &str) -> String {
    let path = match parent {
        ParentScope::Module(module) => format!("{}::{name}", program.fully_qualified_path(module)),
        ParentScope::Function {
            module,
            name: function,
        } => format!("{}::{function}::{name}", program.fully_qualified_path(module)),
    };
    strip_root_namespace(&path).to_string()
}

#[must_use]
pub fn module_uid(program: &Program, module: ModuleId) -> String {
    make_uid(&format!(
        "{}{}",
        UidKind::Module.prefix(),
        program.fully_qualified_name(module)
    ))
}

#[must_use]
pub fn entity_uid(program: &Program, kind: UidKind, parent: ParentScope<'_>, name: &str) -> String {
    make_uid(&format!("{}{}", kind.prefix(), full_path_for(program, parent, name)))
}

/// `lib_` plus the filename with its source extension removed
#[must_use]
pub fn file_uid(filename: &str, source_extension: &str) -> String {
    let stem = filename.strip_suffix(source_extension).unwrap_or(filename);
    make_uid(&format!("{}{stem}", UidKind::Library.prefix()))
}

#[must_use]
pub fn specialisation_param_uid(module_name: &str, param: &str) -> String {
    make_uid(&format!(
        "{}{module_name}_{param}",
        UidKind::SpecialisationParam.prefix()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::program::Diagnostics;

    #[test]
    fn sanitising() {
        assert_eq!(make_uid("fn_soul::filters::LowPass::process"), "fn_soul_filters_LowPass_process");
        assert_eq!(make_uid("type_a b"), "type_a_b");
        assert_eq!(make_uid("var_x<2>[3].y"), "var_x23y");
        assert_eq!(make_uid("lib_my-lib"), "lib_my-lib");
    }

    #[test]
    fn files_drop_their_extension() {
        assert_eq!(file_uid("Filters.soul", ".soul"), "lib_Filters");
        assert_eq!(file_uid("dir/Filters.soul", ".soul"), "lib_dirFilters");
        assert_eq!(file_uid("README", ".soul"), "lib_README");
    }

    #[test]
    fn specialisation_params() {
        assert_eq!(
            specialisation_param_uid("soul::Delay", "length"),
            "specparam_soul_Delay_length"
        );
    }

    #[test]
    fn paths_through_modules_and_functions() {
        let source = "namespace soul::filters { processor LowPass { void run (float x) {} } }";
        let mut program = Program::new();
        let file = program.add_file("f.soul", source);
        let decls = Parser::parse_top_level_declarations(source, file).unwrap();
        program.add_top_level(decls, &mut Diagnostics::new());

        let filters = program.find_sub_module(program.root(), "soul")
            .and_then(|soul| program.find_sub_module(soul, "filters"))
            .unwrap();
        let low_pass = program.find_sub_module(filters, "LowPass").unwrap();

        assert_eq!(module_uid(&program, low_pass), "mod_soul_filters_LowPass");
        assert_eq!(
            entity_uid(&program, UidKind::Function, ParentScope::Module(low_pass), "run"),
            "fn_soul_filters_LowPass_run"
        );
        assert_eq!(
            entity_uid(
                &program,
                UidKind::Variable,
                ParentScope::Function {
                    module: low_pass,
                    name: "run"
                },
                "x"
            ),
            "var_soul_filters_LowPass_run_x"
        );
        assert_eq!(
            full_path_for(&program, ParentScope::Module(program.root()), "top"),
            "top"
        );
    }
}
