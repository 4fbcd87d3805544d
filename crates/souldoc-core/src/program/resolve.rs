//! Turning type expressions into [`Type`]s
//!
//! Only what documentation needs is resolved: struct names, `using` aliases,
//! vectors, arrays with constant sizes, bounded ints and the type
//! meta-functions. Anything else resolves to `None` and the caller falls back
//! to rendering the expression as written.

use tracing::trace;

use super::{ModuleId, NameSearch, Program, ScopeItem};
use crate::ast::{BoundedKind, Expr, ExprKind, QualifiedName, SpecialisationParam, Type, TypeMetaOp};

/// How many `using` aliases may be followed before giving up
const MAX_ALIAS_DEPTH: usize = 32;

/// Resolves type expressions as seen from one module
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    program: &'a Program,
    scope: ModuleId,
}

impl<'a> TypeResolver<'a> {
    #[must_use]
    pub const fn new(program: &'a Program, scope: ModuleId) -> Self {
        Self { program, scope }
    }

    /// The type `expr` names, if it names one
    #[must_use]
    pub fn resolve(&self, expr: &Expr) -> Option<Type> {
        self.resolve_in(self.scope, expr, 0)
    }

    /// The type of the value `expr` produces
    ///
    /// Handles constants, arithmetic over them and references to variables
    /// with a declared type.
    #[must_use]
    pub fn value_type(&self, expr: &Expr) -> Option<Type> {
        self.value_type_in(self.scope, expr, 0)
    }

    fn resolve_in(&self, scope: ModuleId, expr: &Expr, depth: usize) -> Option<Type> {
        if depth > MAX_ALIAS_DEPTH {
            trace!("type alias chain too deep");
            return None;
        }

        match &expr.kind {
            ExprKind::ConcreteType(ty) => Some(ty.clone()),
            ExprKind::QualifiedIdentifier(name) => self.resolve_name(scope, name, depth),
            ExprKind::SubscriptWithChevrons { lhs, rhs } => {
                let size = rhs
                    .as_deref()
                    .and_then(|rhs| self.constant_size(scope, rhs));

                if let Some(kind) = lhs
                    .as_qualified_name()
                    .filter(|name| name.is_single())
                    .and_then(|name| BoundedKind::from_keyword(&name.segments[0].name))
                {
                    return Some(Type::BoundedInt { kind, limit: size? });
                }

                match self.resolve_in(scope, lhs, depth)? {
                    Type::Primitive(element) => Some(Type::Vector {
                        element,
                        size: size?,
                    }),
                    _ => None,
                }
            }
            ExprKind::SubscriptWithBrackets { lhs, rhs } => {
                let element = self.resolve_in(scope, lhs, depth)?;
                let size = match rhs {
                    Some(rhs) => Some(self.constant_size(scope, rhs)?),
                    None => None,
                };
                Some(Type::Array {
                    element: Box::new(element),
                    size,
                })
            }
            ExprKind::TypeMetaFunction { op, source } => {
                let ty = self
                    .resolve_in(scope, source, depth)
                    .or_else(|| self.value_type_in(scope, source, depth))?;
                apply_meta_op(*op, ty)
            }
            ExprKind::Constant(_)
            | ExprKind::DotOperator { .. }
            | ExprKind::CallOrCast { .. }
            | ExprKind::CommaList(_)
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Ternary { .. } => None,
        }
    }

    fn resolve_name(&self, scope: ModuleId, name: &QualifiedName, depth: usize) -> Option<Type> {
        let path = name.path();
        for item in self.program.search(scope, &path, &NameSearch::types()) {
            match item {
                ScopeItem::Struct(module, index) => {
                    let structure = &self.program.module(module).structs[index];
                    return Some(Type::Struct(structure.name.name.clone()));
                }
                ScopeItem::Using(module, index) => {
                    let target = self.program.module(module).usings[index].target.as_ref()?;
                    return self.resolve_in(module, target, depth + 1);
                }
                ScopeItem::SpecialisationUsing(module, index) => {
                    let param = &self.program.module(module).specialisation_params[index];
                    let SpecialisationParam::Using(using) = param else {
                        return None;
                    };
                    // A parameter without a default has no type until specialised
                    let target = using.target.as_ref()?;
                    return self.resolve_in(module, target, depth + 1);
                }
                _ => {}
            }
        }
        trace!(name = %name, "no type found");
        None
    }

    fn value_type_in(&self, scope: ModuleId, expr: &Expr, depth: usize) -> Option<Type> {
        if let Some(ty) = expr.result_type() {
            return Some(ty);
        }
        let name = expr.as_qualified_name()?;
        let search = NameSearch {
            find_variables: true,
            stop_at_first_scope_with_results: true,
            ..NameSearch::default()
        };
        self.program
            .search(scope, &name.path(), &search)
            .into_iter()
            .find_map(|item| match item {
                ScopeItem::Variable(module, index) => {
                    let variable = &self.program.module(module).state_variables[index];
                    match &variable.declared_type {
                        Some(declared) => self.resolve_in(module, declared, depth + 1),
                        None => variable.initial_value.as_ref()?.result_type(),
                    }
                }
                _ => None,
            })
    }

    /// Fold an array or vector size, following named constants
    fn constant_size(&self, scope: ModuleId, expr: &Expr) -> Option<u64> {
        if let Some(value) = expr.fold() {
            return value.as_size();
        }
        let name = expr.as_qualified_name()?;
        let search = NameSearch {
            find_variables: true,
            stop_at_first_scope_with_results: true,
            ..NameSearch::default()
        };
        self.program
            .search(scope, &name.path(), &search)
            .into_iter()
            .find_map(|item| match item {
                ScopeItem::Variable(module, index) => {
                    let variable = &self.program.module(module).state_variables[index];
                    if !variable.is_constant {
                        return None;
                    }
                    variable.initial_value.as_ref()?.fold()?.as_size()
                }
                _ => None,
            })
    }
}

fn apply_meta_op(op: TypeMetaOp, ty: Type) -> Option<Type> {
    match op {
        TypeMetaOp::MakeConst => Some(ty.make_const()),
        TypeMetaOp::MakeReference => Some(ty.make_reference()),
        TypeMetaOp::RemoveConst => Some(ty.remove_const()),
        TypeMetaOp::RemoveReference => Some(ty.remove_reference()),
        TypeMetaOp::ElementType => ty.element_type(),
        TypeMetaOp::PrimitiveType => ty.primitive_type(),
        TypeMetaOp::Type => Some(ty),
        TypeMetaOp::Size
        | TypeMetaOp::IsStruct
        | TypeMetaOp::IsArray
        | TypeMetaOp::IsVector
        | TypeMetaOp::IsPrimitive
        | TypeMetaOp::IsFloat
        | TypeMetaOp::IsInt
        | TypeMetaOp::IsConst
        | TypeMetaOp::IsReference => None,
    }
}
