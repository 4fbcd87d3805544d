//! Expression AST nodes
//!
//! SOUL uses the same grammar for value expressions and type expressions, so
//! `float<2>`, `Filter::State[4]` and `gain * 2.0f` are all [`Expr`]s. Which
//! reading applies is decided later by name resolution.

use crate::lexer::Span;

use super::{Ident, PrimitiveType, QualifiedName, Type};

/// A compile-time constant
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
}

impl Value {
    /// Printable form, using the literal suffixes that preserve the type
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => format!("{v}L"),
            Self::Float32(v) => format!("{}f", format_float(f64::from(*v))),
            Self::Float64(v) => format_float(*v),
            Self::Bool(v) => v.to_string(),
            Self::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }

    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Int32(_) => Type::Primitive(PrimitiveType::Int32),
            Self::Int64(_) => Type::Primitive(PrimitiveType::Int64),
            Self::Float32(_) => Type::Primitive(PrimitiveType::Float32),
            Self::Float64(_) => Type::Primitive(PrimitiveType::Float64),
            Self::Bool(_) => Type::Primitive(PrimitiveType::Bool),
            Self::String(_) => Type::StringLiteral,
        }
    }

    /// The value as an array/vector size, if it is a non-negative integer
    #[must_use]
    pub fn as_size(&self) -> Option<u64> {
        match self {
            Self::Int32(v) => u64::try_from(*v).ok(),
            Self::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(f64::from(*v)),
            #[allow(clippy::cast_precision_loss)]
            Self::Int64(v) => Some(*v as f64),
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `!x`
    LogicalNot,
    /// `~x`
    BitwiseNot,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::LogicalNot => "!",
            Self::BitwiseNot => "~",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
}

impl BinaryOp {
    /// Returns the precedence of the operator (higher = binds tighter)
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::LogicalOr => 1,
            Self::LogicalAnd => 2,
            Self::BitwiseOr => 3,
            Self::BitwiseXor => 4,
            Self::BitwiseAnd => 5,
            Self::Equals | Self::NotEquals => 6,
            Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => 7,
            Self::LeftShift | Self::RightShift => 8,
            Self::Add | Self::Subtract => 9,
            Self::Multiply | Self::Divide | Self::Modulo => 10,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::NotEquals
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
        )
    }
}

/// Operations applied to a type (or to the type of a value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeMetaOp {
    /// `const T`
    MakeConst,
    /// `T&`
    MakeReference,
    RemoveConst,
    RemoveReference,
    ElementType,
    PrimitiveType,
    /// `x.type`
    Type,
    Size,
    IsStruct,
    IsArray,
    IsVector,
    IsPrimitive,
    IsFloat,
    IsInt,
    IsConst,
    IsReference,
}

impl TypeMetaOp {
    /// Look up the meta-function named after a `.`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "removeConst" => Self::RemoveConst,
            "removeReference" => Self::RemoveReference,
            "elementType" => Self::ElementType,
            "primitiveType" => Self::PrimitiveType,
            "type" => Self::Type,
            "size" => Self::Size,
            "isStruct" => Self::IsStruct,
            "isArray" => Self::IsArray,
            "isVector" => Self::IsVector,
            "isPrimitive" => Self::IsPrimitive,
            "isFloat" => Self::IsFloat,
            "isInt" => Self::IsInt,
            "isConst" => Self::IsConst,
            "isReference" => Self::IsReference,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MakeConst => "makeConst",
            Self::MakeReference => "makeReference",
            Self::RemoveConst => "removeConst",
            Self::RemoveReference => "removeReference",
            Self::ElementType => "elementType",
            Self::PrimitiveType => "primitiveType",
            Self::Type => "type",
            Self::Size => "size",
            Self::IsStruct => "isStruct",
            Self::IsArray => "isArray",
            Self::IsVector => "isVector",
            Self::IsPrimitive => "isPrimitive",
            Self::IsFloat => "isFloat",
            Self::IsInt => "isInt",
            Self::IsConst => "isConst",
            Self::IsReference => "isReference",
        }
    }

    /// True if applying this operation yields a type rather than a value
    #[must_use]
    pub const fn produces_type(self) -> bool {
        matches!(
            self,
            Self::MakeConst
                | Self::MakeReference
                | Self::RemoveConst
                | Self::RemoveReference
                | Self::ElementType
                | Self::PrimitiveType
                | Self::Type
        )
    }
}

/// An expression with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The different kinds of expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Value),
    /// A possibly-qualified name: `gain`, `soul::filters::LowPass`
    QualifiedIdentifier(QualifiedName),
    /// A built-in type keyword: `float`, `int64`, `string`
    ConcreteType(Type),
    /// `lhs[rhs]`, or `lhs[]` when `rhs` is absent
    SubscriptWithBrackets {
        lhs: Box<Expr>,
        rhs: Option<Box<Expr>>,
    },
    /// `lhs<rhs>`, or `lhs<>` when `rhs` is absent
    SubscriptWithChevrons {
        lhs: Box<Expr>,
        rhs: Option<Box<Expr>>,
    },
    /// `lhs.rhs` where `rhs` is not a meta-function name
    DotOperator { lhs: Box<Expr>, rhs: Ident },
    TypeMetaFunction { op: TypeMetaOp, source: Box<Expr> },
    /// `target(args)`: a function call or a cast, undecided until resolution
    CallOrCast { target: Box<Expr>, args: Vec<Expr> },
    /// `a, b, c` inside chevrons or parentheses
    CommaList(Vec<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `condition ? then_value : else_value`
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The qualified name, if this is a plain identifier expression
    #[must_use]
    pub fn as_qualified_name(&self) -> Option<&QualifiedName> {
        match &self.kind {
            ExprKind::QualifiedIdentifier(name) => Some(name),
            _ => None,
        }
    }

    /// Evaluate the expression if it only involves constants
    #[must_use]
    pub fn fold(&self) -> Option<Value> {
        match &self.kind {
            ExprKind::Constant(value) => Some(value.clone()),
            ExprKind::Unary { op, operand } => fold_unary(*op, &operand.fold()?),
            ExprKind::Binary { op, lhs, rhs } => fold_binary(*op, &lhs.fold()?, &rhs.fold()?),
            ExprKind::Ternary {
                condition,
                then_value,
                else_value,
            } => match condition.fold()? {
                Value::Bool(true) => then_value.fold(),
                Value::Bool(false) => else_value.fold(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Type of the value this expression produces, when it can be known
    /// without name lookup
    #[must_use]
    pub fn result_type(&self) -> Option<Type> {
        if let Some(value) = self.fold() {
            return Some(value.ty());
        }
        match &self.kind {
            ExprKind::Unary { operand, .. } => operand.result_type(),
            ExprKind::Binary { op, .. } if op.is_comparison() => {
                Some(Type::Primitive(PrimitiveType::Bool))
            }
            ExprKind::Binary {
                op: BinaryOp::LogicalAnd | BinaryOp::LogicalOr,
                ..
            } => Some(Type::Primitive(PrimitiveType::Bool)),
            ExprKind::Binary { lhs, rhs, .. } => {
                let lhs = lhs.result_type()?;
                (rhs.result_type()? == lhs).then_some(lhs)
            }
            ExprKind::Ternary {
                then_value,
                else_value,
                ..
            } => {
                let then_type = then_value.result_type()?;
                (else_value.result_type()? == then_type).then_some(then_type)
            }
            _ => None,
        }
    }
}

fn fold_unary(op: UnaryOp, value: &Value) -> Option<Value> {
    match (op, value) {
        (UnaryOp::Negate, Value::Int32(v)) => v.checked_neg().map(Value::Int32),
        (UnaryOp::Negate, Value::Int64(v)) => v.checked_neg().map(Value::Int64),
        (UnaryOp::Negate, Value::Float32(v)) => Some(Value::Float32(-v)),
        (UnaryOp::Negate, Value::Float64(v)) => Some(Value::Float64(-v)),
        (UnaryOp::LogicalNot, Value::Bool(v)) => Some(Value::Bool(!v)),
        (UnaryOp::BitwiseNot, Value::Int32(v)) => Some(Value::Int32(!v)),
        (UnaryOp::BitwiseNot, Value::Int64(v)) => Some(Value::Int64(!v)),
        _ => None,
    }
}

/// Rank used to pick the wider operand type in mixed arithmetic
fn numeric_rank(value: &Value) -> Option<u8> {
    match value {
        Value::Int32(_) => Some(0),
        Value::Int64(_) => Some(1),
        Value::Float32(_) => Some(2),
        Value::Float64(_) => Some(3),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn fold_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
        return match op {
            BinaryOp::LogicalAnd => Some(Value::Bool(*a && *b)),
            BinaryOp::LogicalOr => Some(Value::Bool(*a || *b)),
            BinaryOp::Equals => Some(Value::Bool(a == b)),
            BinaryOp::NotEquals => Some(Value::Bool(a != b)),
            _ => None,
        };
    }

    let rank = numeric_rank(lhs)?.max(numeric_rank(rhs)?);

    if op.is_comparison() {
        let (a, b) = (lhs.as_f64()?, rhs.as_f64()?);
        let result = match op {
            BinaryOp::Equals => a == b,
            BinaryOp::NotEquals => a != b,
            BinaryOp::LessThan => a < b,
            BinaryOp::LessThanOrEqual => a <= b,
            BinaryOp::GreaterThan => a > b,
            _ => a >= b,
        };
        return Some(Value::Bool(result));
    }

    if rank <= 1 {
        let (a, b) = (lhs.as_i64()?, rhs.as_i64()?);
        let result = match op {
            BinaryOp::Add => a.checked_add(b)?,
            BinaryOp::Subtract => a.checked_sub(b)?,
            BinaryOp::Multiply => a.checked_mul(b)?,
            BinaryOp::Divide => a.checked_div(b)?,
            BinaryOp::Modulo => a.checked_rem(b)?,
            BinaryOp::BitwiseAnd => a & b,
            BinaryOp::BitwiseOr => a | b,
            BinaryOp::BitwiseXor => a ^ b,
            BinaryOp::LeftShift => a.checked_shl(u32::try_from(b).ok()?)?,
            BinaryOp::RightShift => a.checked_shr(u32::try_from(b).ok()?)?,
            _ => return None,
        };
        return if rank == 0 {
            i32::try_from(result).ok().map(Value::Int32)
        } else {
            Some(Value::Int64(result))
        };
    }

    let (a, b) = (lhs.as_f64()?, rhs.as_f64()?);
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => return None,
    };
    Some(if rank == 2 {
        Value::Float32(result as f32)
    } else {
        Value::Float64(result)
    })
}
