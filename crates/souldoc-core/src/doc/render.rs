//! Rendering types and type expressions into [`Expression`]s

use tracing::warn;

use super::model::Expression;
use crate::ast::{Expr, ExprKind, FileId, Type, TypeMetaOp, VariableDecl};
use crate::program::{ModuleId, Program, TypeResolver};

/// Renders expressions as seen from one module of one file
pub struct ExpressionRenderer<'a> {
    program: &'a Program,
    resolver: TypeResolver<'a>,
    file: FileId,
}

impl<'a> ExpressionRenderer<'a> {
    #[must_use]
    pub fn new(program: &'a Program, scope: ModuleId, file: FileId) -> Self {
        Self {
            program,
            resolver: TypeResolver::new(program, scope),
            file,
        }
    }

    /// Render a resolved type
    #[must_use]
    pub fn render_type(ty: &Type) -> Expression {
        match ty {
            Type::Const(inner) => Expression::keyword("const ") + Self::render_type(inner),
            Type::Reference(inner) => Self::render_type(inner) + Expression::text("&"),
            Type::Vector { element, size } => {
                Expression::primitive(element.description()) + Expression::text(format!("<{size}>"))
            }
            Type::Array {
                element,
                size: None,
            } => Self::render_type(element) + Expression::text("[]"),
            Type::Array {
                element,
                size: Some(size),
            } => Self::render_type(element) + Expression::text(format!("[{size}]")),
            Type::BoundedInt { kind, limit } => {
                Expression::keyword(kind.keyword()) + Expression::text(format!("<{limit}>"))
            }
            Type::Struct(name) => Expression::structure(name.as_str()),
            Type::StringLiteral => Expression::primitive("string"),
            Type::Primitive(primitive) => Expression::primitive(primitive.description()),
        }
    }

    /// Render a type expression structurally, falling back to its resolved
    /// type for anything that is not type syntax
    #[must_use]
    pub fn render(&self, expr: &Expr) -> Expression {
        match &expr.kind {
            ExprKind::ConcreteType(ty) => Self::render_type(ty),
            ExprKind::SubscriptWithBrackets { lhs, rhs } => {
                self.render_subscript(lhs, rhs.as_deref(), "[", "]")
            }
            ExprKind::SubscriptWithChevrons { lhs, rhs } => {
                self.render_subscript(lhs, rhs.as_deref(), "<", ">")
            }
            ExprKind::DotOperator { lhs, rhs } => {
                self.render(lhs) + Expression::text(".") + Expression::text(rhs.name.as_str())
            }
            ExprKind::QualifiedIdentifier(name) => {
                if name.is("wrap") || name.is("clamp") {
                    Expression::primitive(name.to_string())
                } else {
                    Expression::structure(name.to_string())
                }
            }
            ExprKind::Constant(value) => Expression::text(value.description()),
            ExprKind::TypeMetaFunction { op, source } => match op {
                TypeMetaOp::MakeReference => self.render(source) + Expression::text("&"),
                TypeMetaOp::MakeConst => Expression::keyword("const ") + self.render(source),
                _ => self.render(source) + Expression::text(".") + Expression::text(op.name()),
            },
            ExprKind::CommaList(items) => {
                let mut rendered = Expression::default();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        rendered += Expression::text(", ");
                    }
                    rendered += self.render(item);
                }
                rendered
            }
            ExprKind::CallOrCast { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Ternary { .. } => self.render_resolved(expr),
        }
    }

    /// The type shown for a variable or parameter
    #[must_use]
    pub fn render_variable(&self, variable: &VariableDecl) -> Expression {
        if let Some(declared) = &variable.declared_type {
            return self.render(declared);
        }
        let Some(initialiser) = &variable.initial_value else {
            return Expression::default();
        };
        if let Some(ty) = self.resolver.value_type(initialiser) {
            return Self::render_type(&ty);
        }
        if let ExprKind::CallOrCast { target, .. } = &initialiser.kind {
            return self.render(target);
        }
        warn!(variable = %variable.name, "cannot determine variable type");
        Expression::default()
    }

    fn render_subscript(&self, lhs: &Expr, rhs: Option<&Expr>, open: &str, close: &str) -> Expression {
        let mut rendered = self.render(lhs) + Expression::text(open);
        if let Some(rhs) = rhs {
            rendered += self.render(rhs);
        }
        rendered + Expression::text(close)
    }

    fn render_resolved(&self, expr: &Expr) -> Expression {
        if let Some(ty) = self
            .resolver
            .resolve(expr)
            .or_else(|| self.resolver.value_type(expr))
        {
            return Self::render_type(&ty);
        }
        if let Some(value) = expr.fold() {
            return Expression::text(value.description());
        }
        let source = &self.program.file(self.file).text;
        match source.text_between(expr.span.start, expr.span.end) {
            Some(text) => Expression::text(text.trim()),
            None => {
                warn!(span = ?expr.span, "cannot render expression");
                Expression::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BoundedKind, PrimitiveType};
    use crate::doc::model::SectionKind;
    use crate::parser::Parser;
    use crate::program::Diagnostics;

    fn render_variables(source: &str) -> Vec<(String, Expression)> {
        let mut program = Program::new();
        let file = program.add_file("t.soul", source);
        let decls = Parser::parse_top_level_declarations(source, file).unwrap();
        let module = program.add_top_level(decls, &mut Diagnostics::new())[0];
        let renderer = ExpressionRenderer::new(&program, module, file);
        program
            .module(module)
            .state_variables
            .iter()
            .map(|v| (v.name.name.clone(), renderer.render_variable(v)))
            .collect()
    }

    #[test]
    fn resolved_types() {
        let float = Type::Primitive(PrimitiveType::Float32);
        let cases = [
            (Type::Const(Box::new(float.clone())), "const float32"),
            (Type::Reference(Box::new(float.clone())), "float32&"),
            (
                Type::Vector {
                    element: PrimitiveType::Float64,
                    size: 4,
                },
                "float64<4>",
            ),
            (
                Type::Array {
                    element: Box::new(float.clone()),
                    size: None,
                },
                "float32[]",
            ),
            (
                Type::Array {
                    element: Box::new(float),
                    size: Some(8),
                },
                "float32[8]",
            ),
            (
                Type::BoundedInt {
                    kind: BoundedKind::Clamp,
                    limit: 3,
                },
                "clamp<3>",
            ),
            (Type::Struct("Voice".into()), "Voice"),
            (Type::StringLiteral, "string"),
        ];
        for (ty, expected) in cases {
            assert_eq!(ExpressionRenderer::render_type(&ty).to_string(), expected);
        }
    }

    #[test]
    fn section_kinds() {
        let rendered = ExpressionRenderer::render_type(&Type::Const(Box::new(Type::Struct("S".into()))));
        let kinds: Vec<_> = rendered.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Keyword, SectionKind::Structure]);

        let rendered = ExpressionRenderer::render_type(&Type::BoundedInt {
            kind: BoundedKind::Wrap,
            limit: 2,
        });
        assert_eq!(rendered.sections[0].kind, SectionKind::Keyword);
    }

    #[test]
    fn declared_types_render_as_written() {
        let rendered = render_variables(
            "processor P {
                const float& a;
                Voice[4] b;
                wrap<8> c;
                float<2> d;
                T.elementType e;
            }",
        );
        let strings: Vec<_> = rendered.iter().map(|(n, e)| (n.as_str(), e.to_string())).collect();
        assert_eq!(
            strings,
            vec![
                ("a", "const float32&".to_string()),
                ("b", "Voice[4]".to_string()),
                ("c", "wrap<8>".to_string()),
                ("d", "float32<2>".to_string()),
                ("e", "T.elementType".to_string()),
            ]
        );
        assert_eq!(rendered[1].1.sections[0].kind, SectionKind::Structure);
        assert_eq!(rendered[2].1.sections[0].kind, SectionKind::Primitive);
    }

    #[test]
    fn inferred_types() {
        let rendered = render_variables(
            "processor P {
                let a = 2.0f * 3.0f;
                let b = 1 < 2;
                let c = Voice (1, 2);
                var d = a;
            }",
        );
        let strings: Vec<_> = rendered.iter().map(|(_, e)| e.to_string()).collect();
        assert_eq!(strings, vec!["float32", "bool", "Voice", "float32"]);
    }
}
