//! Building a [`SourceCodeModel`] from source files
//!
//! Generation is all-or-nothing. Each file is parsed into a shared program,
//! its documentable modules are collected, and once every file compiled the
//! module descriptors are filled in by five independent phases before the
//! table of contents is built.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use super::error::GenerateError;
use super::model::{
    EndpointDescriptor, Expression, FileDescriptor, FunctionDescriptor, ModuleDescriptor,
    SpecialisationParameterDescriptor, StructDescriptor, StructMemberDescriptor,
    VariableDescriptor,
};
use super::options::GeneratorOptions;
use super::render::ExpressionRenderer;
use super::toc::TocNode;
use super::uid::{
    entity_uid, file_uid, full_path_for, module_uid, specialisation_param_uid, ParentScope,
    UidKind,
};
use super::visibility::{
    should_show_function, should_show_module, should_show_struct, should_show_variable,
};
use crate::ast::{Context, EndpointDirection, FileId, FunctionDecl, SpecialisationParam};
use crate::parser::Parser;
use crate::program::{Diagnostics, ModuleId, NameSearch, Program, ScopeItem};
use crate::source::{file_summary_comment, nearest_preceding_comment, Comment, SourceText};

/// One source file to document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub filename: String,
    pub content: String,
}

impl InputFile {
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// The documentation model for a set of source files
#[derive(Debug, Clone, Serialize)]
pub struct SourceCodeModel {
    pub files: Vec<FileDescriptor>,
    pub toc: TocNode,
    #[serde(skip)]
    program: Program,
    #[serde(skip)]
    options: GeneratorOptions,
}

impl SourceCodeModel {
    /// Parse and document `inputs`
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Compile`] with every diagnostic gathered so
    /// far as soon as a file fails to compile, or [`GenerateError::Internal`]
    /// if a declaration's source text cannot be scanned.
    pub fn generate(inputs: &[InputFile], options: &GeneratorOptions) -> Result<Self, GenerateError> {
        let mut program = Program::new();
        let mut diagnostics = Diagnostics::new();
        let mut documented = HashSet::new();
        let mut files = Vec::with_capacity(inputs.len());

        for input in inputs {
            debug!(file = %input.filename, "parsing");
            let file = program.add_file(input.filename.as_str(), input.content.as_str());

            let decls = match Parser::parse_top_level_declarations(&input.content, file) {
                Ok(decls) => decls,
                Err(errors) => {
                    program.report_parse_errors(file, &errors, &mut diagnostics);
                    return Err(GenerateError::Compile(diagnostics));
                }
            };

            let top_level = program.add_top_level(decls, &mut diagnostics);
            program.instantiate_specialisations();
            if diagnostics.has_errors() {
                return Err(GenerateError::Compile(diagnostics));
            }

            let mut modules = Vec::new();
            for id in top_level {
                discover_modules(&program, id, &mut documented, &mut modules);
            }
            files.push(describe_file(&program, file, modules, options));
        }

        debug!("adding specialisation parameters");
        add_specialisation_params(&program, &mut files);
        debug!("adding endpoints");
        add_endpoints(&program, &mut files);
        debug!("adding functions");
        add_functions(&program, &mut files)?;
        debug!("adding variables");
        add_variables(&program, &mut files)?;
        debug!("adding structs");
        add_structs(&program, &mut files);

        let toc = TocNode::build(&files, &options.library_namespace);
        Ok(Self {
            files,
            toc,
            program,
            options: options.clone(),
        })
    }

    /// The program the model was generated from
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// All module descriptors, in file order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.files.iter().flat_map(|f| f.modules.iter())
    }

    /// The descriptor of a module by its name without the root namespace
    #[must_use]
    pub fn find_module(&self, fully_qualified_name: &str) -> Option<&ModuleDescriptor> {
        self.modules()
            .find(|m| m.fully_qualified_name == fully_qualified_name)
    }

    /// UID of whatever `partial` names when looked up from inside `module`
    ///
    /// Graph nodes are not considered. Returns `None` when nothing matches.
    #[must_use]
    pub fn resolve_partial_name_as_uid(
        &self,
        module: &ModuleDescriptor,
        partial: &str,
    ) -> Option<String> {
        let path: Vec<&str> = partial.split("::").map(str::trim).collect();
        let search = NameSearch {
            find_variables: true,
            find_types: true,
            find_functions: true,
            find_namespaces: true,
            find_processors: true,
            find_processor_instances: false,
            find_endpoints: true,
            stop_at_first_scope_with_results: true,
        };
        let item = self.program.search(module.module, &path, &search).into_iter().next()?;
        Some(uid_for_item(&self.program, item))
    }
}

fn uid_for_item(program: &Program, item: ScopeItem) -> String {
    let entity = |kind, module: ModuleId, name: &str| {
        entity_uid(program, kind, ParentScope::Module(module), name)
    };
    match item {
        ScopeItem::Module(id) => module_uid(program, id),
        ScopeItem::Struct(m, i) => entity(UidKind::Type, m, &program.module(m).structs[i].name.name),
        ScopeItem::Using(m, i) => entity(UidKind::Type, m, &program.module(m).usings[i].name.name),
        ScopeItem::SpecialisationUsing(m, i) => specialisation_param_uid(
            &program.fully_qualified_name(m),
            &program.module(m).specialisation_params[i].name().name,
        ),
        ScopeItem::Variable(m, i) => {
            let variable = &program.module(m).state_variables[i];
            if variable.is_specialisation {
                specialisation_param_uid(&program.fully_qualified_name(m), &variable.name.name)
            } else {
                entity(UidKind::Variable, m, &variable.name.name)
            }
        }
        ScopeItem::Function(m, i) => {
            entity(UidKind::Function, m, &program.module(m).functions[i].name.name)
        }
        ScopeItem::Endpoint(m, i) => {
            entity(UidKind::Endpoint, m, &program.module(m).endpoints[i].name.name)
        }
        ScopeItem::Node(m, i) => entity(UidKind::Variable, m, &program.module(m).nodes[i].name.name),
    }
}

// ==================== Discovery ====================

/// Collect `id` and its sub-modules, skipping clones, keyword-less outer
/// namespaces and anything another file already documented
fn discover_modules(
    program: &Program,
    id: ModuleId,
    documented: &mut HashSet<ModuleId>,
    out: &mut Vec<ModuleDescriptor>,
) {
    let module = program.module(id);
    if module.origin.is_some() {
        return;
    }

    if let Some(keyword) = module.keyword {
        if !documented.contains(&id) && should_show_module(program, module) {
            documented.insert(id);
            let mut descriptor = ModuleDescriptor::new(
                id,
                module_uid(program, id),
                module.kind,
                program.fully_qualified_name(id),
            );
            descriptor.comment = comment_at(program, keyword);
            trace!(module = %descriptor.fully_qualified_name, kind = %module.kind, "documenting module");
            out.push(descriptor);
        }
    }

    for &sub in &module.sub_modules {
        discover_modules(program, sub, documented, out);
    }
}

fn describe_file(
    program: &Program,
    file: FileId,
    modules: Vec<ModuleDescriptor>,
    options: &GeneratorOptions,
) -> FileDescriptor {
    let source = program.file(file);
    let file_comment = file_summary_comment(&source.text);
    let title = file_comment
        .tagged_title()
        .unwrap_or_else(|| source.filename.clone());
    let summary = file_comment.body();

    FileDescriptor {
        uid: file_uid(&source.filename, &options.source_extension),
        filename: source.filename.clone(),
        title,
        summary,
        file_comment,
        modules,
    }
}

// ==================== Phases ====================

fn add_specialisation_params(program: &Program, files: &mut [FileDescriptor]) {
    for descriptor in files.iter_mut().flat_map(|f| f.modules.iter_mut()) {
        let module = program.module(descriptor.module);
        let keyword_line = module.keyword.map(|k| line_of(program, k));

        for param in &module.specialisation_params {
            let context = param.context();
            let source = &program.file(context.file).text;
            let renderer = ExpressionRenderer::new(program, descriptor.module, context.file);

            let (ty, default) = match param {
                SpecialisationParam::Using(using) => (Expression::keyword("using"), using.target.as_ref()),
                SpecialisationParam::Processor(alias) => {
                    (Expression::keyword("processor"), alias.target.as_ref())
                }
                SpecialisationParam::Namespace(alias) => {
                    (Expression::keyword("namespace"), alias.target.as_ref())
                }
                SpecialisationParam::Value(value) => {
                    (renderer.render_variable(value), value.initial_value.as_ref())
                }
            };
            let default_value = default
                .and_then(|expr| source.text_between(expr.span.start, expr.span.end))
                .map(|text| text.trim().to_string())
                .unwrap_or_default();

            descriptor
                .specialisation_params
                .push(SpecialisationParameterDescriptor {
                    uid: specialisation_param_uid(&descriptor.fully_qualified_name, &param.name().name),
                    name: param.name().name.clone(),
                    comment: comment_if_on_own_line(program, context, keyword_line),
                    ty,
                    default_value,
                });
        }
    }
}

fn add_endpoints(program: &Program, files: &mut [FileDescriptor]) {
    for descriptor in files.iter_mut().flat_map(|f| f.modules.iter_mut()) {
        let module = program.module(descriptor.module);

        for endpoint in &module.endpoints {
            let renderer = ExpressionRenderer::new(program, descriptor.module, endpoint.context.file);
            let endpoint_descriptor = EndpointDescriptor {
                uid: entity_uid(
                    program,
                    UidKind::Endpoint,
                    ParentScope::Module(descriptor.module),
                    &endpoint.name.name,
                ),
                name: endpoint.name.name.clone(),
                comment: comment_at(program, endpoint.context),
                endpoint_kind: endpoint.kind,
                data_types: endpoint.data_types.iter().map(|t| renderer.render(t)).collect(),
            };
            match endpoint.direction {
                EndpointDirection::Input => descriptor.inputs.push(endpoint_descriptor),
                EndpointDirection::Output => descriptor.outputs.push(endpoint_descriptor),
            }
        }
    }
}

fn add_functions(program: &Program, files: &mut [FileDescriptor]) -> Result<(), GenerateError> {
    for descriptor in files.iter_mut().flat_map(|f| f.modules.iter_mut()) {
        let module_id = descriptor.module;
        let module = program.module(module_id);

        for function in module.functions.iter().filter(|f| should_show_function(program, f)) {
            let context = function.context;
            let source = &program.file(context.file).text;
            let renderer = ExpressionRenderer::new(program, module_id, context.file);
            let name = function.name.name.as_str();
            let function_line = Some(line_of(program, context));

            let mut parameters = Vec::with_capacity(function.params.len());
            for param in &function.params {
                parameters.push(VariableDescriptor {
                    uid: entity_uid(
                        program,
                        UidKind::Variable,
                        ParentScope::Function {
                            module: module_id,
                            name,
                        },
                        &param.name.name,
                    ),
                    name: param.name.name.clone(),
                    comment: comment_if_on_own_line(program, param.context, function_line),
                    ty: renderer.render_variable(param),
                    initialiser: match param.initial_value {
                        Some(_) => initialiser_text(source, param.context, &param.name.name)?,
                        None => String::new(),
                    },
                    is_external: param.is_external,
                });
            }

            descriptor.functions.push(FunctionDescriptor {
                uid: entity_uid(program, UidKind::Function, ParentScope::Module(module_id), name),
                bare_name: name.to_string(),
                fully_qualified_name: full_path_for(program, ParentScope::Module(module_id), name),
                name_with_generics: name_with_generics(source, function)?,
                comment: comment_at(program, context),
                return_type: function.return_type.as_ref().map(|t| renderer.render(t)),
                parameters,
            });
        }
    }
    Ok(())
}

fn add_variables(program: &Program, files: &mut [FileDescriptor]) -> Result<(), GenerateError> {
    for descriptor in files.iter_mut().flat_map(|f| f.modules.iter_mut()) {
        let module_id = descriptor.module;
        let module = program.module(module_id);

        for variable in module.state_variables.iter().filter(|v| should_show_variable(v)) {
            let context = variable.context;
            let source = &program.file(context.file).text;
            let renderer = ExpressionRenderer::new(program, module_id, context.file);

            descriptor.variables.push(VariableDescriptor {
                uid: entity_uid(
                    program,
                    UidKind::Variable,
                    ParentScope::Module(module_id),
                    &variable.name.name,
                ),
                name: variable.name.name.clone(),
                comment: comment_at(program, context),
                ty: renderer.render_variable(variable),
                initialiser: match variable.initial_value {
                    Some(_) => initialiser_text(source, context, &variable.name.name)?,
                    None => String::new(),
                },
                is_external: variable.is_external,
            });
        }
    }
    Ok(())
}

fn add_structs(program: &Program, files: &mut [FileDescriptor]) {
    for descriptor in files.iter_mut().flat_map(|f| f.modules.iter_mut()) {
        let module_id = descriptor.module;
        let module = program.module(module_id);

        for structure in module.structs.iter().filter(|s| should_show_struct(s)) {
            let renderer = ExpressionRenderer::new(program, module_id, structure.context.file);
            let name = structure.name.name.as_str();

            descriptor.structs.push(StructDescriptor {
                uid: entity_uid(program, UidKind::Type, ParentScope::Module(module_id), name),
                short_name: name.to_string(),
                full_name: full_path_for(program, ParentScope::Module(module_id), name),
                comment: comment_at(program, structure.context),
                members: structure
                    .members
                    .iter()
                    .map(|member| StructMemberDescriptor {
                        name: member.name.name.clone(),
                        comment: comment_at(program, member.context),
                        ty: renderer.render(&member.ty),
                    })
                    .collect(),
            });
        }
    }
}

// ==================== Source Scanning ====================

fn comment_at(program: &Program, context: Context) -> Comment {
    nearest_preceding_comment(&program.file(context.file).text, context.offset())
}

fn line_of(program: &Program, context: Context) -> (FileId, usize) {
    (context.file, program.file(context.file).text.line_of(context.offset()))
}

/// Parameters written on the same line as their owner have no comment of
/// their own; whatever precedes that line documents the owner
fn comment_if_on_own_line(
    program: &Program,
    context: Context,
    owner_line: Option<(FileId, usize)>,
) -> Comment {
    if owner_line == Some(line_of(program, context)) {
        Comment::default()
    } else {
        comment_at(program, context)
    }
}

/// Source text of the initialiser following `name`
fn initialiser_text(source: &SourceText, context: Context, name: &str) -> Result<String, GenerateError> {
    let equals = source
        .find_next(context.span.end, '=')
        .ok_or_else(|| GenerateError::Internal(format!("expected '=' after '{name}'")))?;
    let end = source.find_end_of_expression(equals + 1).ok_or_else(|| {
        GenerateError::Internal(format!("cannot find the end of the initialiser of '{name}'"))
    })?;
    Ok(source
        .text_between(equals + 1, end)
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// The function name and any generic parameters, as written
fn name_with_generics(source: &SourceText, function: &FunctionDecl) -> Result<String, GenerateError> {
    let start = function.context.offset();
    let open = source.find_next(start, '(').ok_or_else(|| {
        GenerateError::Internal(format!("expected '(' after '{}'", function.name))
    })?;
    Ok(source
        .text_between(start, open)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(source: &str) -> SourceCodeModel {
        SourceCodeModel::generate(
            &[InputFile::new("test.soul", source)],
            &GeneratorOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn initialisers_are_taken_from_source() {
        let model = generate(
            "processor P {
                float a = 1.0f, b = max (2.0f, 3.0f);
                int[3] c = (1, 2, 3);
                external float d;
            }",
        );
        let variables = &model.files[0].modules[0].variables;
        let initialisers: Vec<_> = variables.iter().map(|v| v.initialiser.as_str()).collect();
        assert_eq!(initialisers, vec!["1.0f", "max (2.0f, 3.0f)", "(1, 2, 3)", ""]);
        assert!(variables[3].is_external);
    }

    #[test]
    fn generic_function_names() {
        let model = generate(
            "namespace n {
                /// Adds things
                T add < T > (T a, T b) { return a + b; }
            }",
        );
        let function = &model.files[0].modules[0].functions[0];
        assert_eq!(function.name_with_generics, "add < T >");
        assert_eq!(function.bare_name, "add");
        assert_eq!(function.fully_qualified_name, "n::add");
    }

    #[test]
    fn parameter_comments_need_their_own_line() {
        let model = generate(
            "namespace n {
                /// Mixes two signals
                float mix (float a,
                           /// Weight of the second signal
                           float weight) { return a * weight; }
            }",
        );
        let function = &model.files[0].modules[0].functions[0];
        assert!(function.parameters[0].comment.is_empty());
        assert_eq!(function.parameters[1].comment.text(), "Weight of the second signal");
        assert_eq!(function.parameters[1].uid, "var_n_mix_weight");
    }

    #[test]
    fn specialisation_parameters() {
        let model = generate(
            "processor Delay (using SampleType = float,
                              processor Filter = LowPass,
                              /// Delay in samples
                              int length = 100)
            {
                input stream SampleType in;
            }",
        );
        let params = &model.files[0].modules[0].specialisation_params;
        let summary: Vec<_> = params
            .iter()
            .map(|p| (p.name.as_str(), p.ty.to_string(), p.default_value.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("SampleType", "using".to_string(), "float"),
                ("Filter", "processor".to_string(), "LowPass"),
                ("length", "int32".to_string(), "100"),
            ]
        );
        assert!(params[0].comment.is_empty());
        assert_eq!(params[2].comment.text(), "Delay in samples");
        assert_eq!(params[2].uid, "specparam_Delay_length");

        // The shadow state variable stays out of the variable list
        assert!(model.files[0].modules[0].variables.is_empty());
    }

    #[test]
    fn endpoints_split_by_direction() {
        let model = generate(
            "processor Mixer {
                /// Left and right
                input stream float<2> in;
                input event (float, int) control;
                output value float level;
            }",
        );
        let module = &model.files[0].modules[0];
        assert_eq!(module.inputs.len(), 2);
        assert_eq!(module.outputs.len(), 1);
        assert_eq!(module.inputs[0].comment.text(), "Left and right");
        assert_eq!(module.inputs[0].data_types[0].to_string(), "float32<2>");
        let control: Vec<_> = module.inputs[1].data_types.iter().map(ToString::to_string).collect();
        assert_eq!(control, vec!["float32", "int32"]);
        assert_eq!(module.outputs[0].uid, "endpoint_Mixer_level");
    }

    #[test]
    fn partial_names_resolve_from_module_scope() {
        let model = generate(
            "namespace soul::filters {
                struct Coefficients { float a; }
                processor LowPass {
                    input stream float in;
                    Coefficients c;
                }
            }",
        );
        let low_pass = model.find_module("soul::filters::LowPass").unwrap();
        assert_eq!(
            model.resolve_partial_name_as_uid(low_pass, "Coefficients").as_deref(),
            Some("type_soul_filters_Coefficients")
        );
        assert_eq!(
            model.resolve_partial_name_as_uid(low_pass, "in").as_deref(),
            Some("endpoint_soul_filters_LowPass_in")
        );
        assert_eq!(
            model.resolve_partial_name_as_uid(low_pass, "filters::LowPass").as_deref(),
            Some("mod_soul_filters_LowPass")
        );
        assert_eq!(model.resolve_partial_name_as_uid(low_pass, "nothing"), None);
    }

    #[test]
    fn missing_paren_is_internal_error() {
        let source = SourceText::new("void f");
        let function = FunctionDecl {
            name: crate::ast::Ident::new("f", crate::lexer::Span::new(5, 6)),
            context: Context::new(FileId(0), crate::lexer::Span::new(5, 6)),
            return_type: None,
            generic_params: Vec::new(),
            params: Vec::new(),
            is_event_handler: false,
            has_body: false,
        };
        assert!(matches!(
            name_with_generics(&source, &function),
            Err(GenerateError::Internal(_))
        ));
    }
}
