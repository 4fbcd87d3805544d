//! Resolved SOUL types
//!
//! Type expressions in the AST are ordinary [`Expr`](super::Expr) nodes until
//! name resolution turns them into a [`Type`].

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex32,
    Complex64,
}

impl PrimitiveType {
    /// Look up a primitive type keyword, including the `int`, `float` and
    /// `complex` shorthands
    #[must_use]
    pub fn from_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Self::Void,
            "bool" => Self::Bool,
            "int" | "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float" | "float32" => Self::Float32,
            "float64" => Self::Float64,
            "complex" | "complex32" => Self::Complex32,
            "complex64" => Self::Complex64,
            _ => return None,
        })
    }

    /// Canonical name used in rendered documentation
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex32 => "complex32",
            Self::Complex64 => "complex64",
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub const fn is_floating_point(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// The two flavours of bounded integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundedKind {
    Wrap,
    Clamp,
}

impl BoundedKind {
    #[must_use]
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "wrap" => Some(Self::Wrap),
            "clamp" => Some(Self::Clamp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Wrap => "wrap",
            Self::Clamp => "clamp",
        }
    }
}

/// A fully resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    /// `float<4>`
    Vector { element: PrimitiveType, size: u64 },
    /// `int[8]`, or `int[]` for an unsized array
    Array {
        element: Box<Type>,
        size: Option<u64>,
    },
    /// `wrap<16>` / `clamp<16>`
    BoundedInt { kind: BoundedKind, limit: u64 },
    /// A named struct type
    Struct(String),
    /// `string`
    StringLiteral,
    Const(Box<Type>),
    Reference(Box<Type>),
}

impl Type {
    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    /// Adds `const`, leaving already-const types alone
    #[must_use]
    pub fn make_const(self) -> Self {
        match self {
            Self::Const(_) => self,
            Self::Reference(inner) => Self::Reference(Box::new(inner.make_const())),
            other => Self::Const(Box::new(other)),
        }
    }

    /// Adds a reference, leaving references alone
    #[must_use]
    pub fn make_reference(self) -> Self {
        match self {
            Self::Reference(_) => self,
            other => Self::Reference(Box::new(other)),
        }
    }

    #[must_use]
    pub fn remove_const(self) -> Self {
        match self {
            Self::Const(inner) => *inner,
            Self::Reference(inner) => Self::Reference(Box::new(inner.remove_const())),
            other => other,
        }
    }

    #[must_use]
    pub fn remove_reference(self) -> Self {
        match self {
            Self::Reference(inner) => *inner,
            other => other,
        }
    }

    /// Element type of an array or vector
    #[must_use]
    pub fn element_type(self) -> Option<Self> {
        match self.remove_reference().remove_const() {
            Self::Array { element, .. } => Some(*element),
            Self::Vector { element, .. } => Some(Self::Primitive(element)),
            _ => None,
        }
    }

    /// Underlying primitive of a scalar or vector
    #[must_use]
    pub fn primitive_type(self) -> Option<Self> {
        match self.remove_reference().remove_const() {
            primitive @ Self::Primitive(_) => Some(primitive),
            Self::Vector { element, .. } => Some(Self::Primitive(element)),
            Self::BoundedInt { .. } => Some(Self::Primitive(PrimitiveType::Int32)),
            _ => None,
        }
    }

    /// Number of elements in an array or vector, or the limit of a bounded int
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Array { size, .. } => *size,
            Self::Vector { size, .. } => Some(*size),
            Self::BoundedInt { limit, .. } => Some(*limit),
            Self::Const(inner) | Self::Reference(inner) => inner.size(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Vector { element, size } => write!(f, "{element}<{size}>"),
            Self::Array {
                element,
                size: Some(size),
            } => write!(f, "{element}[{size}]"),
            Self::Array {
                element,
                size: None,
            } => write!(f, "{element}[]"),
            Self::BoundedInt { kind, limit } => write!(f, "{}<{limit}>", kind.keyword()),
            Self::Struct(name) => f.write_str(name),
            Self::StringLiteral => f.write_str("string"),
            Self::Const(inner) => write!(f, "const {inner}"),
            Self::Reference(inner) => write!(f, "{inner}&"),
        }
    }
}
