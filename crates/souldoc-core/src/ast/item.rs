//! Declaration AST nodes
//!
//! Every declaration carries a [`Context`] pointing at its name, which is the
//! position the documentation pass searches backward from to find comments.

use serde::Serialize;

use super::{Context, Expr, Ident, QualifiedName};

/// The three kinds of module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Namespace,
    Processor,
    Graph,
}

impl ModuleKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Processor => "processor",
            Self::Graph => "graph",
        }
    }

    /// Processors and graphs can be instantiated as graph nodes
    #[must_use]
    pub const fn is_processor_or_graph(self) -> bool {
        matches!(self, Self::Processor | Self::Graph)
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `namespace a::b { ... }`, `processor P (...) { ... }` or `graph G { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub kind: ModuleKind,
    /// Namespaces may use a qualified name; processors and graphs never do
    pub name: QualifiedName,
    /// Location of the `namespace`/`processor`/`graph` keyword
    pub keyword: Context,
    pub specialisation_params: Vec<SpecialisationParam>,
    pub items: Vec<ModuleItem>,
}

/// Anything that can appear inside a module body
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    Module(ModuleDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Struct(StructDecl),
    Endpoint(EndpointDecl),
    Using(UsingDecl),
    NamespaceAlias(AliasDecl),
    ProcessorAlias(AliasDecl),
    Node(NodeDecl),
}

/// A function or event handler. Bodies are not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub context: Context,
    /// Absent for event handlers
    pub return_type: Option<Expr>,
    pub generic_params: Vec<Ident>,
    pub params: Vec<VariableDecl>,
    pub is_event_handler: bool,
    /// False for intrinsic declarations ending in `;`
    pub has_body: bool,
}

/// A state variable, parameter or value specialisation parameter
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Ident,
    pub context: Context,
    pub declared_type: Option<Expr>,
    pub initial_value: Option<Expr>,
    pub is_external: bool,
    pub is_constant: bool,
    /// Set on the state variable that shadows a value specialisation parameter
    pub is_specialisation: bool,
}

impl VariableDecl {
    #[must_use]
    pub fn new(name: Ident, context: Context) -> Self {
        Self {
            name,
            context,
            declared_type: None,
            initial_value: None,
            is_external: false,
            is_constant: false,
            is_specialisation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Ident,
    pub context: Context,
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: Ident,
    pub context: Context,
    pub ty: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Stream,
    Value,
    Event,
}

impl EndpointKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Value => "value",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `input stream float<2> in;`
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDecl {
    pub name: Ident,
    pub context: Context,
    pub direction: EndpointDirection,
    pub kind: EndpointKind,
    /// One entry per carried type; event endpoints may carry several
    pub data_types: Vec<Expr>,
    pub array_size: Option<Expr>,
}

/// `using Name = Type;`, or `using T` / `using T = float` in a parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct UsingDecl {
    pub name: Ident,
    pub context: Context,
    pub target: Option<Expr>,
}

/// `namespace n = other::thing;` or `processor p = Target<...>;`
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDecl {
    pub name: Ident,
    pub context: Context,
    pub target: Option<Expr>,
}

/// A graph node: `node delay = Delay<float, 100>;`
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub name: Ident,
    pub context: Context,
    pub target: Expr,
    /// Arguments passed in call syntax: `Gain (0.5f)`
    pub args: Vec<Expr>,
}

/// One entry in a processor/graph/namespace parameter list
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialisationParam {
    Using(UsingDecl),
    Processor(AliasDecl),
    Namespace(AliasDecl),
    Value(VariableDecl),
}

impl SpecialisationParam {
    #[must_use]
    pub fn name(&self) -> &Ident {
        match self {
            Self::Using(u) => &u.name,
            Self::Processor(a) | Self::Namespace(a) => &a.name,
            Self::Value(v) => &v.name,
        }
    }

    #[must_use]
    pub fn context(&self) -> Context {
        match self {
            Self::Using(u) => u.context,
            Self::Processor(a) | Self::Namespace(a) => a.context,
            Self::Value(v) => v.context,
        }
    }
}
