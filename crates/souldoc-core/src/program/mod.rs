//! The program arena
//!
//! Parsed declarations from every file are merged into a single tree of
//! modules rooted at the `_root` namespace. Modules refer to each other by
//! [`ModuleId`]; a reopened namespace is the same module no matter how many
//! files declare it.

#![allow(clippy::cast_possible_truncation)] // Module and file counts fit in u32

mod diagnostics;
mod resolve;

pub use diagnostics::{CompileMessage, Diagnostics, Severity};
pub use resolve::TypeResolver;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{
    AliasDecl, Context, EndpointDecl, ExprKind, FileId, FunctionDecl, Ident, ModuleDecl,
    ModuleItem, ModuleKind, NodeDecl, SpecialisationParam, StructDecl, UsingDecl, VariableDecl,
};
use crate::lexer::Location;
use crate::parser::ParseError;
use crate::source::SourceText;

/// Name of the namespace that contains every top-level declaration
pub const ROOT_NAMESPACE_NAME: &str = "_root";

/// Remove the leading `_root::` from a fully-qualified path
#[must_use]
pub fn strip_root_namespace(path: &str) -> &str {
    match path.strip_prefix(ROOT_NAMESPACE_NAME) {
        Some("") => "",
        Some(rest) => rest.strip_prefix("::").unwrap_or(path),
        None => path,
    }
}

/// Index of a module in a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A namespace, processor or graph with everything declared inside it
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
    pub parent: Option<ModuleId>,
    /// Where the declaring keyword is; `None` for namespaces that only exist
    /// as the outer part of a qualified name
    pub keyword: Option<Context>,
    /// For specialised clones, the module they were instantiated from
    pub origin: Option<ModuleId>,
    pub specialisation_params: Vec<SpecialisationParam>,
    pub endpoints: Vec<EndpointDecl>,
    pub functions: Vec<FunctionDecl>,
    pub state_variables: Vec<VariableDecl>,
    pub structs: Vec<StructDecl>,
    pub usings: Vec<UsingDecl>,
    pub namespace_aliases: Vec<AliasDecl>,
    pub processor_aliases: Vec<AliasDecl>,
    pub nodes: Vec<NodeDecl>,
    pub sub_modules: Vec<ModuleId>,
}

impl Module {
    fn new(name: String, kind: ModuleKind, parent: Option<ModuleId>, keyword: Option<Context>) -> Self {
        Self {
            name,
            kind,
            parent,
            keyword,
            origin: None,
            specialisation_params: Vec::new(),
            endpoints: Vec::new(),
            functions: Vec::new(),
            state_variables: Vec::new(),
            structs: Vec::new(),
            usings: Vec::new(),
            namespace_aliases: Vec::new(),
            processor_aliases: Vec::new(),
            nodes: Vec::new(),
            sub_modules: Vec::new(),
        }
    }
}

/// A source file registered with a program
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub text: SourceText,
}

/// Which kinds of declaration a [`Program::search`] should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameSearch {
    pub find_variables: bool,
    pub find_types: bool,
    pub find_functions: bool,
    pub find_namespaces: bool,
    pub find_processors: bool,
    pub find_processor_instances: bool,
    pub find_endpoints: bool,
    /// Stop walking outwards once a scope produced any result
    pub stop_at_first_scope_with_results: bool,
}

impl NameSearch {
    /// Structs and `using` aliases
    #[must_use]
    pub fn types() -> Self {
        Self {
            find_types: true,
            stop_at_first_scope_with_results: true,
            ..Self::default()
        }
    }

    /// Processors and graphs
    #[must_use]
    pub fn processors() -> Self {
        Self {
            find_processors: true,
            stop_at_first_scope_with_results: true,
            ..Self::default()
        }
    }
}

/// A declaration found by [`Program::search`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeItem {
    Module(ModuleId),
    Struct(ModuleId, usize),
    Using(ModuleId, usize),
    /// A `using` entry in a module's specialisation parameter list
    SpecialisationUsing(ModuleId, usize),
    Variable(ModuleId, usize),
    Function(ModuleId, usize),
    Endpoint(ModuleId, usize),
    Node(ModuleId, usize),
}

/// Every module and source file seen so far
#[derive(Debug, Clone)]
pub struct Program {
    files: Vec<SourceFile>,
    modules: Vec<Module>,
    /// Clone created for each instantiated `(graph, node index)`
    instances: HashMap<(ModuleId, usize), ModuleId>,
    instance_count: usize,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// An empty program holding only the root namespace
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            modules: vec![Module::new(
                ROOT_NAMESPACE_NAME.to_string(),
                ModuleKind::Namespace,
                None,
                None,
            )],
            instances: HashMap::new(),
            instance_count: 0,
        }
    }

    #[must_use]
    pub const fn root(&self) -> ModuleId {
        ModuleId(0)
    }

    // ==================== Files ====================

    pub fn add_file(&mut self, filename: impl Into<String>, text: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            filename: filename.into(),
            text: SourceText::new(text),
        });
        id
    }

    /// # Panics
    /// If `id` did not come from this program
    #[must_use]
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Line and column of a declaration
    #[must_use]
    pub fn location(&self, context: Context) -> Location {
        self.file(context.file).text.location(context.offset())
    }

    /// Add one diagnostic per parse error, positioned in `file`
    pub fn report_parse_errors(
        &self,
        file: FileId,
        errors: &[ParseError],
        diagnostics: &mut Diagnostics,
    ) {
        let source = self.file(file);
        for error in errors {
            diagnostics.add_error(
                source.filename.clone(),
                source.text.location(error.span.start),
                error.to_string(),
            );
        }
    }

    fn report(&self, context: Context, description: String, diagnostics: &mut Diagnostics) {
        diagnostics.add_error(
            self.file(context.file).filename.clone(),
            self.location(context),
            description,
        );
    }

    // ==================== Modules ====================

    /// # Panics
    /// If `id` did not come from this program
    #[must_use]
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len() as u32).map(ModuleId)
    }

    /// A direct child module, ignoring specialised clones
    #[must_use]
    pub fn find_sub_module(&self, scope: ModuleId, name: &str) -> Option<ModuleId> {
        self.module(scope)
            .sub_modules
            .iter()
            .copied()
            .find(|&id| {
                let module = self.module(id);
                module.origin.is_none() && module.name == name
            })
    }

    /// Names from the root down to `id`, starting with `_root`
    #[must_use]
    pub fn path_segments(&self, id: ModuleId) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(module_id) = current {
            let module = self.module(module_id);
            segments.push(module.name.as_str());
            current = module.parent;
        }
        segments.reverse();
        segments
    }

    /// `_root::soul::filters`
    #[must_use]
    pub fn fully_qualified_path(&self, id: ModuleId) -> String {
        self.path_segments(id).join("::")
    }

    /// `soul::filters`
    #[must_use]
    pub fn fully_qualified_name(&self, id: ModuleId) -> String {
        strip_root_namespace(&self.fully_qualified_path(id)).to_string()
    }

    // ==================== Building ====================

    /// Insert a file's top-level declarations under the root namespace
    ///
    /// Returns the outermost module of each declaration, without duplicates.
    /// For `namespace soul::filters` that is `soul`.
    pub fn add_top_level(
        &mut self,
        decls: Vec<ModuleDecl>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ModuleId> {
        let root = self.root();
        let mut top_level = Vec::new();
        for decl in decls {
            let id = self.declare_module(root, decl, diagnostics);
            if !top_level.contains(&id) {
                top_level.push(id);
            }
        }
        top_level
    }

    fn declare_module(
        &mut self,
        parent: ModuleId,
        decl: ModuleDecl,
        diagnostics: &mut Diagnostics,
    ) -> ModuleId {
        let ModuleDecl {
            kind,
            name,
            keyword,
            specialisation_params,
            items,
        } = decl;

        let Some((last, outer)) = name.segments.split_last() else {
            return parent;
        };

        let mut scope = parent;
        let mut outermost = None;
        for segment in outer {
            scope = self.find_or_create_namespace(scope, segment, None, keyword, diagnostics);
            outermost.get_or_insert(scope);
        }

        let id = if kind == ModuleKind::Namespace {
            self.find_or_create_namespace(scope, last, Some(keyword), keyword, diagnostics)
        } else {
            if self.find_sub_module(scope, &last.name).is_some() {
                self.report(
                    keyword,
                    format!("duplicate definition '{}'", last.name),
                    diagnostics,
                );
            }
            self.create_module(scope, last.name.clone(), kind, Some(keyword))
        };

        self.populate(id, specialisation_params, items, diagnostics);
        outermost.unwrap_or(id)
    }

    fn find_or_create_namespace(
        &mut self,
        scope: ModuleId,
        name: &Ident,
        keyword: Option<Context>,
        declared_at: Context,
        diagnostics: &mut Diagnostics,
    ) -> ModuleId {
        if let Some(existing) = self.find_sub_module(scope, &name.name) {
            let module = self.module_mut(existing);
            if module.kind == ModuleKind::Namespace {
                if module.keyword.is_none() {
                    module.keyword = keyword;
                }
                trace!(namespace = %name, "merged namespace declaration");
                return existing;
            }
            self.report(
                declared_at,
                format!("duplicate definition '{}'", name.name),
                diagnostics,
            );
        }
        self.create_module(scope, name.name.clone(), ModuleKind::Namespace, keyword)
    }

    fn create_module(
        &mut self,
        parent: ModuleId,
        name: String,
        kind: ModuleKind,
        keyword: Option<Context>,
    ) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Module::new(name, kind, Some(parent), keyword));
        self.module_mut(parent).sub_modules.push(id);
        id
    }

    fn populate(
        &mut self,
        id: ModuleId,
        specialisation_params: Vec<SpecialisationParam>,
        items: Vec<ModuleItem>,
        diagnostics: &mut Diagnostics,
    ) {
        {
            let module = self.module_mut(id);
            for param in &specialisation_params {
                if let SpecialisationParam::Value(value) = param {
                    let mut shadow = value.clone();
                    shadow.is_specialisation = true;
                    module.state_variables.push(shadow);
                }
            }
            module.specialisation_params.extend(specialisation_params);
        }

        for item in items {
            match item {
                ModuleItem::Module(sub) => {
                    self.declare_module(id, sub, diagnostics);
                }
                ModuleItem::Function(function) => self.module_mut(id).functions.push(function),
                ModuleItem::Variable(variable) => {
                    self.module_mut(id).state_variables.push(variable);
                }
                ModuleItem::Struct(structure) => self.module_mut(id).structs.push(structure),
                ModuleItem::Endpoint(endpoint) => self.module_mut(id).endpoints.push(endpoint),
                ModuleItem::Using(using) => self.module_mut(id).usings.push(using),
                ModuleItem::NamespaceAlias(alias) => {
                    self.module_mut(id).namespace_aliases.push(alias);
                }
                ModuleItem::ProcessorAlias(alias) => {
                    self.module_mut(id).processor_aliases.push(alias);
                }
                ModuleItem::Node(node) => self.module_mut(id).nodes.push(node),
            }
        }
    }

    // ==================== Specialisation ====================

    /// Create a specialised clone for every graph node that passes
    /// arguments to a parameterised processor or graph
    ///
    /// Returns how many clones were created by this call.
    pub fn instantiate_specialisations(&mut self) -> usize {
        let mut created = 0;
        let graph_count = self.modules.len();

        for index in 0..graph_count {
            let graph = ModuleId(index as u32);
            let module = self.module(graph);
            if module.kind != ModuleKind::Graph || module.origin.is_some() {
                continue;
            }

            for node_index in 0..module.nodes.len() {
                if self.instances.contains_key(&(graph, node_index)) {
                    continue;
                }
                let Some((path, has_args)) = instantiation_target(&self.module(graph).nodes[node_index])
                else {
                    continue;
                };
                let path: Vec<&str> = path.iter().map(String::as_str).collect();
                let target = self
                    .search(graph, &path, &NameSearch::processors())
                    .into_iter()
                    .find_map(|item| match item {
                        ScopeItem::Module(id) => Some(id),
                        _ => None,
                    });
                let Some(target) = target else {
                    continue;
                };
                if !has_args || self.module(target).specialisation_params.is_empty() {
                    continue;
                }

                let clone = self.clone_module(target);
                self.instances.insert((graph, node_index), clone);
                created += 1;
            }
        }

        if created > 0 {
            debug!(created, "instantiated specialised modules");
        }
        created
    }

    /// The clone created for a graph node, if it was instantiated
    #[must_use]
    pub fn node_instance(&self, graph: ModuleId, node_index: usize) -> Option<ModuleId> {
        self.instances.get(&(graph, node_index)).copied()
    }

    fn clone_module(&mut self, target: ModuleId) -> ModuleId {
        self.instance_count += 1;
        let mut clone = self.module(target).clone();
        clone.name = format!("{}_{}", clone.name, self.instance_count);
        clone.origin = Some(target);
        clone.specialisation_params.clear();
        clone.state_variables.retain(|v| !v.is_specialisation);
        clone.sub_modules.clear();

        let parent = clone.parent.unwrap_or(self.root());
        let id = ModuleId(self.modules.len() as u32);
        trace!(name = %clone.name, "created specialised clone");
        self.modules.push(clone);
        self.module_mut(parent).sub_modules.push(id);
        id
    }

    // ==================== Name Search ====================

    /// Look up a possibly-qualified name, starting in `scope` and walking
    /// outwards through its parents
    #[must_use]
    pub fn search(&self, scope: ModuleId, path: &[&str], search: &NameSearch) -> Vec<ScopeItem> {
        let mut results = Vec::new();
        if path.is_empty() {
            return results;
        }

        let mut current = Some(scope);
        while let Some(id) = current {
            self.search_in_scope(id, path, search, &mut results);
            if search.stop_at_first_scope_with_results && !results.is_empty() {
                break;
            }
            current = self.module(id).parent;
        }
        results
    }

    fn search_in_scope(
        &self,
        scope: ModuleId,
        path: &[&str],
        search: &NameSearch,
        results: &mut Vec<ScopeItem>,
    ) {
        let Some((name, outer)) = path.split_last() else {
            return;
        };
        let mut module = scope;
        for segment in outer {
            match self.find_sub_module(module, segment) {
                Some(child) => module = child,
                None => return,
            }
        }
        self.search_local(module, name, search, results);
    }

    fn search_local(
        &self,
        id: ModuleId,
        name: &str,
        search: &NameSearch,
        results: &mut Vec<ScopeItem>,
    ) {
        let module = self.module(id);

        if search.find_variables {
            results.extend(
                position_all(&module.state_variables, |v| v.name.name == name)
                    .map(|i| ScopeItem::Variable(id, i)),
            );
        }
        if search.find_types {
            results.extend(
                position_all(&module.structs, |s| s.name.name == name)
                    .map(|i| ScopeItem::Struct(id, i)),
            );
            results.extend(
                position_all(&module.usings, |u| u.name.name == name)
                    .map(|i| ScopeItem::Using(id, i)),
            );
            results.extend(
                position_all(&module.specialisation_params, |p| {
                    matches!(p, SpecialisationParam::Using(u) if u.name.name == name)
                })
                .map(|i| ScopeItem::SpecialisationUsing(id, i)),
            );
        }
        if search.find_functions {
            results.extend(
                position_all(&module.functions, |f| f.name.name == name)
                    .map(|i| ScopeItem::Function(id, i)),
            );
        }
        if search.find_endpoints {
            results.extend(
                position_all(&module.endpoints, |e| e.name.name == name)
                    .map(|i| ScopeItem::Endpoint(id, i)),
            );
        }
        if search.find_processor_instances {
            results.extend(
                position_all(&module.nodes, |n| n.name.name == name)
                    .map(|i| ScopeItem::Node(id, i)),
            );
        }
        if search.find_namespaces || search.find_processors {
            for &sub in &module.sub_modules {
                let child = self.module(sub);
                let wanted = match child.kind {
                    ModuleKind::Namespace => search.find_namespaces,
                    ModuleKind::Processor | ModuleKind::Graph => search.find_processors,
                };
                if wanted && child.origin.is_none() && child.name == name {
                    results.push(ScopeItem::Module(sub));
                }
            }
        }
    }
}

fn position_all<'a, T>(
    items: &'a [T],
    predicate: impl Fn(&T) -> bool + 'a,
) -> impl Iterator<Item = usize> + 'a {
    items
        .iter()
        .enumerate()
        .filter(move |(_, item)| predicate(item))
        .map(|(i, _)| i)
}

/// The module path a node instantiates, and whether it passes arguments
fn instantiation_target(node: &NodeDecl) -> Option<(Vec<String>, bool)> {
    let mut target = &node.target;
    if let ExprKind::SubscriptWithBrackets { lhs, .. } = &target.kind {
        target = lhs;
    }
    let (name, has_chevron_args) = match &target.kind {
        ExprKind::SubscriptWithChevrons { lhs, rhs } => (lhs.as_qualified_name()?, rhs.is_some()),
        _ => (target.as_qualified_name()?, false),
    };
    let path = name.segments.iter().map(|s| s.name.clone()).collect();
    Some((path, has_chevron_args || !node.args.is_empty()))
}
