//! Parser for SOUL declarations
//!
//! A recursive-descent parser with precedence climbing for expressions. It
//! builds the declaration tree of a file (namespaces, processors, graphs and
//! their members) and skips function bodies and connection blocks by brace
//! matching, since documentation never looks inside them.
//!
//! # Example
//!
//! ```
//! use souldoc_core::ast::{FileId, ModuleItem};
//! use souldoc_core::parser::Parser;
//!
//! let source = "processor Gain { input stream float in; output stream float out; }";
//! let modules = Parser::parse_top_level_declarations(source, FileId(0)).unwrap();
//! assert_eq!(modules[0].name.to_string(), "Gain");
//! assert!(matches!(modules[0].items[0], ModuleItem::Endpoint(_)));
//! ```

mod error;

pub use error::{ExpectedToken, ParseError, ParseErrorKind};

use crate::ast::{
    AliasDecl, BinaryOp, Context, EndpointDecl, EndpointDirection, EndpointKind, Expr, ExprKind,
    FileId, FunctionDecl, Ident, ModuleDecl, ModuleItem, ModuleKind, NodeDecl, PrimitiveType,
    QualifiedName, SpecialisationParam, StructDecl, StructMember, Type, TypeMetaOp, UnaryOp,
    UsingDecl, Value, VariableDecl,
};
use crate::lexer::{Lexer, Span, SpannedError, Token, TokenKind};

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Lowest operator precedence allowed inside `<...>`, so that `>` closes the
/// argument list instead of being read as a comparison
const CHEVRON_ARGUMENT_PRECEDENCE: u8 = 8;

/// The SOUL parser
pub struct Parser {
    /// Non-trivia tokens, always ending with `Eof`
    tokens: Vec<Token>,
    /// Current position in the token stream
    position: usize,
    /// File that spans refer to
    file: FileId,
    /// Collected parse errors
    errors: Vec<ParseError>,
    /// Lexer errors (passed through)
    lex_errors: Vec<SpannedError>,
    /// Nesting depth of `<...>` argument lists
    chevron_depth: u32,
}

impl Parser {
    /// Create a new parser from source code
    #[must_use]
    pub fn new(source: &str, file: FileId) -> Self {
        let (mut tokens, lex_errors) = Lexer::tokenize(source);
        tokens.retain(|t| !t.kind.is_trivia() && t.kind != TokenKind::Error);
        Self {
            tokens,
            position: 0,
            file,
            errors: Vec::new(),
            lex_errors,
            chevron_depth: 0,
        }
    }

    /// Parse every top-level namespace, processor and graph in a file
    pub fn parse_top_level_declarations(
        source: &str,
        file: FileId,
    ) -> Result<Vec<ModuleDecl>, Vec<ParseError>> {
        let mut parser = Parser::new(source, file);
        let modules = parser.top_level();
        let errors = parser.all_errors();
        if errors.is_empty() {
            Ok(modules)
        } else {
            Err(errors)
        }
    }

    /// Parse a single expression
    pub fn parse_expression(source: &str) -> Result<Expr, Vec<ParseError>> {
        let mut parser = Parser::new(source, FileId::default());
        let result = parser.expression();
        let mut errors = parser.all_errors();
        match result {
            Ok(expr) if errors.is_empty() => {
                if parser.is_eof() {
                    Ok(expr)
                } else {
                    Err(vec![parser.unexpected(ExpectedToken::Token(TokenKind::Eof))])
                }
            }
            Ok(_) => Err(errors),
            Err(e) => {
                errors.push(e);
                Err(errors)
            }
        }
    }

    /// Get all errors (both lex and parse errors), in source order
    #[must_use]
    pub fn all_errors(&self) -> Vec<ParseError> {
        let mut errors: Vec<ParseError> = self
            .lex_errors
            .iter()
            .map(|e| ParseError::new(ParseErrorKind::Lex(e.error.clone()), e.span))
            .chain(self.errors.iter().cloned())
            .collect();
        errors.sort_by_key(|e| e.span.start);
        errors
    }

    // ==================== Token Management ====================

    /// Get the current token
    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Kind of the token `offset` positions ahead
    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn is_eof(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    /// Advance to the next token
    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    /// Consume a token if it matches, returning it
    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Expect and consume a specific token, or error
    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(ExpectedToken::Token(kind)))
        }
    }

    /// Expect a token that must follow some construct
    fn expect_after(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
        context: &'static str,
    ) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                ParseErrorKind::ExpectedAfter { expected, context },
                self.current().span,
            ))
        }
    }

    /// Expect an identifier, accepting keywords that are only reserved in
    /// endpoint and graph positions
    fn expect_ident(&mut self) -> ParseResult<Ident> {
        let token = self.current().clone();
        if token.kind == TokenKind::Ident || token.kind.is_contextual_keyword() {
            self.advance();
            Ok(Ident::new(token.lexeme, token.span))
        } else if token.kind == TokenKind::Eof {
            Err(ParseError::new(ParseErrorKind::UnexpectedEof, token.span))
        } else {
            Err(ParseError::new(
                ParseErrorKind::ExpectedIdentifier,
                token.span,
            ))
        }
    }

    fn unexpected(&self, expected: ExpectedToken) -> ParseError {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            return ParseError::new(ParseErrorKind::UnexpectedEof, token.span);
        }
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                found: token.kind,
                expected,
            },
            token.span,
        )
    }

    /// Record an error but continue parsing
    fn error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn context(&self, span: Span) -> Context {
        Context::new(self.file, span)
    }

    /// `namespace x = ...` / `processor x = ...`
    fn at_alias(&self) -> bool {
        self.peek_kind(2) == TokenKind::Eq
    }

    // ==================== Module Parsing ====================

    fn top_level(&mut self) -> Vec<ModuleDecl> {
        let mut modules = Vec::new();
        while !self.is_eof() {
            let result = match self.current_kind() {
                TokenKind::Namespace | TokenKind::Processor if self.at_alias() => Err(self
                    .unexpected(ExpectedToken::Description(
                        "a namespace, processor or graph declaration",
                    ))
                    .with_note("aliases must be declared inside a namespace")),
                TokenKind::Namespace | TokenKind::Processor | TokenKind::Graph => {
                    self.module_decl()
                }
                _ => Err(self.unexpected(ExpectedToken::OneOf(vec![
                    TokenKind::Namespace,
                    TokenKind::Processor,
                    TokenKind::Graph,
                ]))),
            };
            match result {
                Ok(module) => modules.push(module),
                Err(e) => {
                    self.error(e);
                    self.synchronize_top_level();
                }
            }
        }
        modules
    }

    /// `namespace a::b (params) [[annotation]] { items }`
    fn module_decl(&mut self) -> ParseResult<ModuleDecl> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Namespace => ModuleKind::Namespace,
            TokenKind::Processor => ModuleKind::Processor,
            _ => ModuleKind::Graph,
        };

        let name = self.qualified_name()?;
        if kind != ModuleKind::Namespace && !name.is_single() {
            return Err(ParseError::new(
                ParseErrorKind::QualifiedModuleName(kind.as_str()),
                name.span,
            ));
        }

        let specialisation_params = if self.check(TokenKind::LParen) {
            self.specialisation_params()?
        } else {
            Vec::new()
        };
        self.skip_annotation()?;

        self.expect_after(TokenKind::LBrace, "{", "module name")?;
        let items = self.module_body(kind);
        self.expect_after(TokenKind::RBrace, "}", "module body")?;

        Ok(ModuleDecl {
            kind,
            name,
            keyword: self.context(keyword.span),
            specialisation_params,
            items,
        })
    }

    fn module_body(&mut self, kind: ModuleKind) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            match self.module_item(kind) {
                Ok(mut new_items) => items.append(&mut new_items),
                Err(e) => {
                    self.error(e);
                    self.synchronize_in_block();
                }
            }
        }
        items
    }

    fn module_item(&mut self, parent: ModuleKind) -> ParseResult<Vec<ModuleItem>> {
        self.skip_annotation()?;

        match self.current_kind() {
            TokenKind::Namespace if self.at_alias() => {
                Ok(vec![ModuleItem::NamespaceAlias(self.alias_decl()?)])
            }
            TokenKind::Processor if self.at_alias() => {
                Ok(vec![ModuleItem::ProcessorAlias(self.alias_decl()?)])
            }
            TokenKind::Namespace | TokenKind::Processor | TokenKind::Graph => {
                Ok(vec![ModuleItem::Module(self.module_decl()?)])
            }
            TokenKind::Struct => Ok(vec![ModuleItem::Struct(self.struct_decl()?)]),
            TokenKind::Using => Ok(vec![ModuleItem::Using(self.using_decl()?)]),
            TokenKind::Input | TokenKind::Output => self.endpoint_decls(),
            TokenKind::Node => self.node_decls(),
            TokenKind::Let if parent == ModuleKind::Graph => self.node_decls(),
            TokenKind::Let | TokenKind::Var => self.let_var_decls(),
            TokenKind::Connection => {
                self.advance();
                if self.check(TokenKind::LBrace) {
                    self.skip_braced_block()?;
                } else {
                    self.skip_to_semicolon()?;
                }
                Ok(Vec::new())
            }
            TokenKind::Event
                if self.peek_kind(1) == TokenKind::Ident
                    && self.peek_kind(2) == TokenKind::LParen =>
            {
                self.advance();
                let name = self.expect_ident()?;
                let handler = self.function_rest(None, name, true)?;
                Ok(vec![ModuleItem::Function(handler)])
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Vec::new())
            }
            TokenKind::Ident if self.current().lexeme == "static_assert" => {
                self.skip_to_semicolon()?;
                Ok(Vec::new())
            }
            _ => self.typed_declaration(),
        }
    }

    /// `namespace n = a::b;` or `processor p = Target<...>;`
    fn alias_decl(&mut self) -> ParseResult<AliasDecl> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let target = self.reference_expr()?;
        self.expect_after(TokenKind::Semicolon, ";", "alias")?;
        Ok(AliasDecl {
            context: self.context(name.span),
            name,
            target: Some(target),
        })
    }

    /// `struct Name { type a, b; type c; }`
    fn struct_decl(&mut self) -> ParseResult<StructDecl> {
        self.advance();
        let name = self.expect_ident()?;
        self.skip_annotation()?;
        self.expect_after(TokenKind::LBrace, "{", "struct name")?;

        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let ty = self.type_expr()?;
            loop {
                let member_name = self.expect_ident()?;
                self.skip_annotation()?;
                members.push(StructMember {
                    context: self.context(member_name.span),
                    name: member_name,
                    ty: ty.clone(),
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect_after(TokenKind::Semicolon, ";", "struct member")?;
        }

        self.expect_after(TokenKind::RBrace, "}", "struct members")?;
        self.eat(TokenKind::Semicolon);

        Ok(StructDecl {
            context: self.context(name.span),
            name,
            members,
        })
    }

    /// `using Name = Type;`
    fn using_decl(&mut self) -> ParseResult<UsingDecl> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect_after(TokenKind::Eq, "=", "using name")?;
        let target = self.type_expr()?;
        self.expect_after(TokenKind::Semicolon, ";", "using declaration")?;
        Ok(UsingDecl {
            context: self.context(name.span),
            name,
            target: Some(target),
        })
    }

    /// `input stream float in;`, `output { event int a; value float b; }`
    fn endpoint_decls(&mut self) -> ParseResult<Vec<ModuleItem>> {
        let direction = if self.advance().kind == TokenKind::Input {
            EndpointDirection::Input
        } else {
            EndpointDirection::Output
        };

        if self.eat(TokenKind::LBrace).is_some() {
            let mut endpoints = Vec::new();
            while !self.check(TokenKind::RBrace) && !self.is_eof() {
                endpoints.extend(self.endpoint_body(direction)?);
            }
            self.expect_after(TokenKind::RBrace, "}", "endpoint list")?;
            Ok(endpoints)
        } else {
            self.endpoint_body(direction)
        }
    }

    fn endpoint_body(&mut self, direction: EndpointDirection) -> ParseResult<Vec<ModuleItem>> {
        let kind = match self.current_kind() {
            TokenKind::Stream => EndpointKind::Stream,
            TokenKind::Value => EndpointKind::Value,
            TokenKind::Event => EndpointKind::Event,
            TokenKind::Ident => {
                // Forwarded child endpoint (`input child.in;`): nothing to document
                self.skip_to_semicolon()?;
                return Ok(Vec::new());
            }
            _ => {
                return Err(self.unexpected(ExpectedToken::OneOf(vec![
                    TokenKind::Stream,
                    TokenKind::Value,
                    TokenKind::Event,
                ])))
            }
        };
        self.advance();

        let data_types = if self.eat(TokenKind::LParen).is_some() {
            let mut types = vec![self.type_expr()?];
            while self.eat(TokenKind::Comma).is_some() {
                types.push(self.type_expr()?);
            }
            self.expect_after(TokenKind::RParen, ")", "endpoint types")?;
            types
        } else {
            vec![self.type_expr()?]
        };

        let mut endpoints = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let array_size = if self.check(TokenKind::LBracket)
                && self.peek_kind(1) != TokenKind::LBracket
            {
                self.advance();
                let size = self.expression()?;
                self.expect_after(TokenKind::RBracket, "]", "endpoint array size")?;
                Some(size)
            } else {
                None
            };
            self.skip_annotation()?;

            endpoints.push(ModuleItem::Endpoint(EndpointDecl {
                context: self.context(name.span),
                name,
                direction,
                kind,
                data_types: data_types.clone(),
                array_size,
            }));

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect_after(TokenKind::Semicolon, ";", "endpoint declaration")?;
        Ok(endpoints)
    }

    /// `node a = Target<args>(args), b = Other;` (or `let` inside a graph)
    fn node_decls(&mut self) -> ParseResult<Vec<ModuleItem>> {
        self.advance();
        let mut nodes = Vec::new();
        loop {
            let name = self.expect_ident()?;
            self.expect_after(TokenKind::Eq, "=", "node name")?;
            let target = self.type_expr()?;
            let args = if self.check(TokenKind::LParen) {
                self.arg_list()?.0
            } else {
                Vec::new()
            };
            // Clock ratio: `node x = P * 2;`
            if self.check_any(&[TokenKind::Star, TokenKind::Slash]) {
                self.advance();
                self.prefix_expr()?;
            }
            nodes.push(ModuleItem::Node(NodeDecl {
                context: self.context(name.span),
                name,
                target,
                args,
            }));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect_after(TokenKind::Semicolon, ";", "node declaration")?;
        Ok(nodes)
    }

    /// `let x = 1, y = 2;` / `var z = 3.0f;`
    fn let_var_decls(&mut self) -> ParseResult<Vec<ModuleItem>> {
        let is_constant = self.advance().kind == TokenKind::Let;
        let mut variables = Vec::new();
        loop {
            let name = self.expect_ident()?;
            self.expect_after(TokenKind::Eq, "=", "variable name")?;
            let mut variable = VariableDecl::new(name.clone(), self.context(name.span));
            variable.initial_value = Some(self.expression()?);
            variable.is_constant = is_constant;
            variables.push(ModuleItem::Variable(variable));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect_after(TokenKind::Semicolon, ";", "variable declaration")?;
        Ok(variables)
    }

    /// A declaration that starts with a type: a function or state variables
    fn typed_declaration(&mut self) -> ParseResult<Vec<ModuleItem>> {
        let is_external = self.eat(TokenKind::External).is_some();
        let ty = self.type_expr()?;
        let name = self.expect_ident()?;

        if !is_external && self.check_any(&[TokenKind::LParen, TokenKind::Lt]) {
            let function = self.function_rest(Some(ty), name, false)?;
            return Ok(vec![ModuleItem::Function(function)]);
        }

        self.variables_rest(ty, name, is_external)
    }

    /// Everything after a function's name
    fn function_rest(
        &mut self,
        return_type: Option<Expr>,
        name: Ident,
        is_event_handler: bool,
    ) -> ParseResult<FunctionDecl> {
        let mut generic_params = Vec::new();
        if self.eat(TokenKind::Lt).is_some() {
            loop {
                generic_params.push(self.expect_ident()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect_after(TokenKind::Gt, ">", "generic parameters")?;
        }

        self.expect_after(TokenKind::LParen, "(", "function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_after(TokenKind::RParen, ")", "parameters")?;
        self.skip_annotation()?;

        let has_body = if self.check(TokenKind::LBrace) {
            self.skip_braced_block()?;
            true
        } else {
            self.expect_after(TokenKind::Semicolon, ";", "function declaration")?;
            false
        };

        Ok(FunctionDecl {
            context: self.context(name.span),
            name,
            return_type,
            generic_params,
            params,
            is_event_handler,
            has_body,
        })
    }

    /// `const float& x = 1.0f`
    fn param(&mut self) -> ParseResult<VariableDecl> {
        let ty = self.type_expr()?;
        let name = self.expect_ident()?;
        let mut param = VariableDecl::new(name.clone(), self.context(name.span));
        param.is_constant = is_const_type(&ty);
        param.declared_type = Some(ty);
        if self.eat(TokenKind::Eq).is_some() {
            param.initial_value = Some(self.expression()?);
        }
        Ok(param)
    }

    /// Declarators after `type name`: `= init, other = init;`
    fn variables_rest(
        &mut self,
        ty: Expr,
        first: Ident,
        is_external: bool,
    ) -> ParseResult<Vec<ModuleItem>> {
        let mut variables = Vec::new();
        let mut name = first;
        loop {
            let mut variable = VariableDecl::new(name.clone(), self.context(name.span));
            variable.declared_type = Some(ty.clone());
            variable.is_external = is_external;
            variable.is_constant = is_const_type(&ty);
            if self.eat(TokenKind::Eq).is_some() {
                variable.initial_value = Some(self.expression()?);
            }
            self.skip_annotation()?;
            variables.push(ModuleItem::Variable(variable));

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            name = self.expect_ident()?;
        }
        self.expect_after(TokenKind::Semicolon, ";", "variable declaration")?;
        Ok(variables)
    }

    /// `(using T, processor P = Gain, int size = 8)`
    fn specialisation_params(&mut self) -> ParseResult<Vec<SpecialisationParam>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.specialisation_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_after(TokenKind::RParen, ")", "specialisation parameters")?;
        Ok(params)
    }

    fn specialisation_param(&mut self) -> ParseResult<SpecialisationParam> {
        match self.current_kind() {
            TokenKind::Using => {
                self.advance();
                let name = self.expect_ident()?;
                let target = if self.eat(TokenKind::Eq).is_some() {
                    Some(self.type_expr()?)
                } else {
                    None
                };
                Ok(SpecialisationParam::Using(UsingDecl {
                    context: self.context(name.span),
                    name,
                    target,
                }))
            }
            TokenKind::Processor | TokenKind::Namespace => {
                let is_processor = self.advance().kind == TokenKind::Processor;
                let name = self.expect_ident()?;
                let target = if self.eat(TokenKind::Eq).is_some() {
                    Some(self.reference_expr()?)
                } else {
                    None
                };
                let alias = AliasDecl {
                    context: self.context(name.span),
                    name,
                    target,
                };
                Ok(if is_processor {
                    SpecialisationParam::Processor(alias)
                } else {
                    SpecialisationParam::Namespace(alias)
                })
            }
            _ => {
                let ty = self.type_expr()?;
                let name = self.expect_ident()?;
                let mut param = VariableDecl::new(name.clone(), self.context(name.span));
                param.declared_type = Some(ty);
                param.is_constant = true;
                if self.eat(TokenKind::Eq).is_some() {
                    param.initial_value = Some(self.expression()?);
                }
                Ok(SpecialisationParam::Value(param))
            }
        }
    }

    // ==================== Names and Types ====================

    /// `a::b::c` as a declaration name
    fn qualified_name(&mut self) -> ParseResult<QualifiedName> {
        let first = self.expect_ident()?;
        let start = first.span;
        let mut segments = vec![first];
        while self.eat(TokenKind::ColonColon).is_some() {
            segments.push(self.expect_ident()?);
        }
        let span = segments.last().map_or(start, |last| start.merge(last.span));
        Ok(QualifiedName::new(segments, span))
    }

    fn qualified_identifier(&mut self) -> ParseResult<Expr> {
        let name = self.qualified_name()?;
        let span = name.span;
        Ok(Expr::new(ExprKind::QualifiedIdentifier(name), span))
    }

    /// A type, optionally `const` and/or `&`
    fn type_expr(&mut self) -> ParseResult<Expr> {
        if let Some(keyword) = self.eat(TokenKind::Const) {
            let inner = self.type_expr()?;
            let span = keyword.span.merge(inner.span);
            return Ok(Expr::new(
                ExprKind::TypeMetaFunction {
                    op: TypeMetaOp::MakeConst,
                    source: Box::new(inner),
                },
                span,
            ));
        }

        let mut ty = self.type_postfix()?;
        if let Some(amp) = self.eat(TokenKind::Ampersand) {
            let span = ty.span.merge(amp.span);
            ty = Expr::new(
                ExprKind::TypeMetaFunction {
                    op: TypeMetaOp::MakeReference,
                    source: Box::new(ty),
                },
                span,
            );
        }
        Ok(ty)
    }

    fn type_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.type_primary()?;
        loop {
            expr = match self.current_kind() {
                TokenKind::Lt => self.chevron_subscript(expr)?,
                TokenKind::LBracket if self.peek_kind(1) != TokenKind::LBracket => {
                    self.bracket_subscript(expr)?
                }
                TokenKind::Dot => self.dot_suffix(expr)?,
                _ => break,
            };
        }
        Ok(expr)
    }

    fn type_primary(&mut self) -> ParseResult<Expr> {
        if !self.check(TokenKind::Ident) {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedType,
                self.current().span,
            ));
        }
        if let Some(ty) = builtin_type(&self.current().lexeme) {
            let token = self.advance();
            return Ok(Expr::new(ExprKind::ConcreteType(ty), token.span));
        }
        self.qualified_identifier()
    }

    /// A type or processor reference, optionally followed by call arguments
    fn reference_expr(&mut self) -> ParseResult<Expr> {
        let target = self.type_expr()?;
        if !self.check(TokenKind::LParen) {
            return Ok(target);
        }
        let (args, close) = self.arg_list()?;
        let span = target.span.merge(close);
        Ok(Expr::new(
            ExprKind::CallOrCast {
                target: Box::new(target),
                args,
            },
            span,
        ))
    }

    /// `lhs<args>`; the current token is `<`
    fn chevron_subscript(&mut self, lhs: Expr) -> ParseResult<Expr> {
        self.advance();
        if let Some(close) = self.eat(TokenKind::Gt) {
            let span = lhs.span.merge(close.span);
            return Ok(Expr::new(
                ExprKind::SubscriptWithChevrons {
                    lhs: Box::new(lhs),
                    rhs: None,
                },
                span,
            ));
        }

        self.chevron_depth += 1;
        let args = self.chevron_arguments();
        self.chevron_depth -= 1;
        let mut args = args?;

        let close = self.expect_after(TokenKind::Gt, ">", "template arguments")?;
        let rhs = if args.len() == 1 {
            args.pop()
        } else {
            let span = args[0].span.merge(args[args.len() - 1].span);
            Some(Expr::new(ExprKind::CommaList(args), span))
        };
        let span = lhs.span.merge(close.span);
        Ok(Expr::new(
            ExprKind::SubscriptWithChevrons {
                lhs: Box::new(lhs),
                rhs: rhs.map(Box::new),
            },
            span,
        ))
    }

    fn chevron_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = vec![self.chevron_argument()?];
        while self.eat(TokenKind::Comma).is_some() {
            args.push(self.chevron_argument()?);
        }
        Ok(args)
    }

    /// Either a type or a constant expression
    fn chevron_argument(&mut self) -> ParseResult<Expr> {
        if self.check_any(&[TokenKind::Ident, TokenKind::Const]) {
            let lhs = self.type_expr()?;
            self.binary_rhs(lhs, CHEVRON_ARGUMENT_PRECEDENCE)
        } else {
            self.parse_precedence(CHEVRON_ARGUMENT_PRECEDENCE)
        }
    }

    /// `lhs[size]` or `lhs[]`; the current token is `[`
    fn bracket_subscript(&mut self, lhs: Expr) -> ParseResult<Expr> {
        self.advance();
        let rhs = if self.check(TokenKind::RBracket) {
            None
        } else {
            let saved_depth = std::mem::take(&mut self.chevron_depth);
            let index = self.expression();
            self.chevron_depth = saved_depth;
            Some(Box::new(index?))
        };
        let close = self.expect_after(TokenKind::RBracket, "]", "subscript")?;
        let span = lhs.span.merge(close.span);
        Ok(Expr::new(
            ExprKind::SubscriptWithBrackets {
                lhs: Box::new(lhs),
                rhs,
            },
            span,
        ))
    }

    /// `.name`, turned into a meta-function when the name is one
    fn dot_suffix(&mut self, lhs: Expr) -> ParseResult<Expr> {
        self.advance();
        let name = self.expect_ident()?;
        let span = lhs.span.merge(name.span);
        let kind = match TypeMetaOp::from_name(&name.name) {
            Some(op) => ExprKind::TypeMetaFunction {
                op,
                source: Box::new(lhs),
            },
            None => ExprKind::DotOperator {
                lhs: Box::new(lhs),
                rhs: name,
            },
        };
        Ok(Expr::new(kind, span))
    }

    // ==================== Expressions ====================

    /// Parse a full expression, including `?:`
    pub fn expression(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_precedence(0)?;
        if self.eat(TokenKind::Question).is_none() {
            return Ok(condition);
        }
        let then_value = self.expression()?;
        self.expect_after(TokenKind::Colon, ":", "'?' branch")?;
        let else_value = self.expression()?;
        let span = condition.span.merge(else_value.span);
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            span,
        ))
    }

    /// Parse expression with given minimum precedence
    fn parse_precedence(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let left = self.prefix_expr()?;
        self.binary_rhs(left, min_prec)
    }

    fn binary_rhs(&mut self, mut left: Expr, min_prec: u8) -> ParseResult<Expr> {
        while let Some((op, width)) = self.infix_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = self.parse_precedence(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    /// Current infix operator and how many tokens it spans
    fn infix_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.current_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            TokenKind::Star => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            TokenKind::EqEq => BinaryOp::Equals,
            TokenKind::NotEq => BinaryOp::NotEquals,
            TokenKind::Lt => BinaryOp::LessThan,
            TokenKind::LtEq => BinaryOp::LessThanOrEqual,
            TokenKind::Gt => {
                // `>>` is lexed as two `>` so that nested chevrons close properly
                if self.chevron_depth == 0 && self.next_is_adjacent(TokenKind::Gt) {
                    return Some((BinaryOp::RightShift, 2));
                }
                BinaryOp::GreaterThan
            }
            TokenKind::GtEq => BinaryOp::GreaterThanOrEqual,
            TokenKind::AndAnd => BinaryOp::LogicalAnd,
            TokenKind::OrOr => BinaryOp::LogicalOr,
            TokenKind::Ampersand => BinaryOp::BitwiseAnd,
            TokenKind::Pipe => BinaryOp::BitwiseOr,
            TokenKind::Caret => BinaryOp::BitwiseXor,
            TokenKind::Shl => BinaryOp::LeftShift,
            _ => return None,
        };
        Some((op, 1))
    }

    fn next_is_adjacent(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.position + 1)
            .is_some_and(|next| next.kind == kind && next.span.start == self.current().span.end)
    }

    fn prefix_expr(&mut self) -> ParseResult<Expr> {
        let op = match self.current_kind() {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Not => UnaryOp::LogicalNot,
            TokenKind::Tilde => UnaryOp::BitwiseNot,
            _ => return self.postfix_expr(),
        };
        let op_token = self.advance();
        let operand = self.prefix_expr()?;
        let span = op_token.span.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Calls, subscripts, dot suffixes and (after a type) chevrons
    fn postfix_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            expr = match self.current_kind() {
                TokenKind::LParen => {
                    let (args, close) = self.arg_list()?;
                    let span = expr.span.merge(close);
                    Expr::new(
                        ExprKind::CallOrCast {
                            target: Box::new(expr),
                            args,
                        },
                        span,
                    )
                }
                TokenKind::LBracket if self.peek_kind(1) != TokenKind::LBracket => {
                    self.bracket_subscript(expr)?
                }
                TokenKind::Dot => self.dot_suffix(expr)?,
                TokenKind::Lt if is_type_like(&expr) => self.chevron_subscript(expr)?,
                _ => break,
            };
        }
        Ok(expr)
    }

    /// `(args)`, returning the arguments and the span of the closing paren
    fn arg_list(&mut self) -> ParseResult<(Vec<Expr>, Span)> {
        self.expect(TokenKind::LParen)?;
        let saved_depth = std::mem::take(&mut self.chevron_depth);
        let args = self.comma_separated_until(TokenKind::RParen);
        self.chevron_depth = saved_depth;
        let args = args?;
        let close = self.expect_after(TokenKind::RParen, ")", "arguments")?;
        Ok((args, close.span))
    }

    fn comma_separated_until(&mut self, end: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check(end) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(TokenKind::Comma).is_none() {
                return Ok(items);
            }
        }
    }

    fn primary_expr(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let value = parse_int(&token.lexeme).map_err(|message| {
                    ParseError::new(ParseErrorKind::InvalidNumber(message), token.span)
                })?;
                Ok(Expr::new(ExprKind::Constant(value), token.span))
            }
            TokenKind::Float => {
                self.advance();
                let value = parse_float(&token.lexeme).map_err(|message| {
                    ParseError::new(ParseErrorKind::InvalidNumber(message), token.span)
                })?;
                Ok(Expr::new(ExprKind::Constant(value), token.span))
            }
            TokenKind::String => {
                self.advance();
                let value = Value::String(unescape(&token.lexeme));
                Ok(Expr::new(ExprKind::Constant(value), token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                let value = Value::Bool(token.kind == TokenKind::True);
                Ok(Expr::new(ExprKind::Constant(value), token.span))
            }
            TokenKind::Ident => {
                if let Some(ty) = builtin_type(&token.lexeme) {
                    self.advance();
                    return Ok(Expr::new(ExprKind::ConcreteType(ty), token.span));
                }
                self.qualified_identifier()
            }
            kind if kind.is_contextual_keyword() => self.qualified_identifier(),
            TokenKind::Processor => {
                // `processor.period`, `processor.frequency`
                self.advance();
                let name = QualifiedName::single(Ident::new("processor", token.span));
                Ok(Expr::new(ExprKind::QualifiedIdentifier(name), token.span))
            }
            TokenKind::LParen => self.paren_expr(),
            TokenKind::Eof => Err(ParseError::new(ParseErrorKind::UnexpectedEof, token.span)),
            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedExpression,
                token.span,
            )),
        }
    }

    /// `(expr)` or `(a, b, c)`; the span covers the parentheses
    fn paren_expr(&mut self) -> ParseResult<Expr> {
        let open = self.advance();
        let saved_depth = std::mem::take(&mut self.chevron_depth);
        let items = self.comma_separated_until(TokenKind::RParen);
        self.chevron_depth = saved_depth;
        let mut items = items?;
        let close = self.expect_after(TokenKind::RParen, ")", "expression")?;
        let span = open.span.merge(close.span);

        if items.len() == 1 {
            let mut inner = items.remove(0);
            inner.span = span;
            Ok(inner)
        } else if items.is_empty() {
            Err(ParseError::new(ParseErrorKind::ExpectedExpression, close.span))
        } else {
            Ok(Expr::new(ExprKind::CommaList(items), span))
        }
    }

    // ==================== Skipping ====================

    /// Skip `[[ ... ]]` if present
    fn skip_annotation(&mut self) -> ParseResult<()> {
        if !(self.check(TokenKind::LBracket) && self.peek_kind(1) == TokenKind::LBracket) {
            return Ok(());
        }
        self.advance();
        self.advance();
        while !(self.check(TokenKind::RBracket) && self.peek_kind(1) == TokenKind::RBracket) {
            if self.is_eof() {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedAfter {
                        expected: "]]",
                        context: "annotation",
                    },
                    self.current().span,
                ));
            }
            self.advance();
        }
        self.advance();
        self.advance();
        Ok(())
    }

    /// Skip a `{ ... }` block including nested blocks; the current token is `{`
    fn skip_braced_block(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedAfter {
                            expected: "}",
                            context: "block",
                        },
                        self.current().span,
                    ))
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip up to and including the next `;` at this nesting level
    fn skip_to_semicolon(&mut self) -> ParseResult<()> {
        while !self.check(TokenKind::Semicolon) {
            match self.current_kind() {
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedEof,
                        self.current().span,
                    ))
                }
                TokenKind::LBrace => self.skip_braced_block()?,
                _ => {
                    self.advance();
                }
            }
        }
        self.advance();
        Ok(())
    }

    // ==================== Error Recovery ====================

    /// Skip to the next top-level module keyword
    fn synchronize_top_level(&mut self) {
        let mut depth = 0usize;
        self.advance();
        while !self.is_eof() {
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                TokenKind::Namespace | TokenKind::Processor | TokenKind::Graph if depth == 0 => {
                    return
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Synchronize within a module body
    fn synchronize_in_block(&mut self) {
        while !self.is_eof() && !self.check(TokenKind::RBrace) {
            match self.current_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => {
                    let _ = self.skip_braced_block();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}

// ==================== Helper Functions ====================

fn builtin_type(name: &str) -> Option<Type> {
    if name == "string" {
        return Some(Type::StringLiteral);
    }
    PrimitiveType::from_keyword(name).map(Type::Primitive)
}

fn is_const_type(ty: &Expr) -> bool {
    matches!(
        ty.kind,
        ExprKind::TypeMetaFunction {
            op: TypeMetaOp::MakeConst,
            ..
        }
    )
}

/// Expressions that may be followed by `<...>` in expression position
fn is_type_like(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::ConcreteType(_) => true,
        ExprKind::QualifiedIdentifier(name) => name.is("wrap") || name.is("clamp"),
        _ => false,
    }
}

/// Parse an integer literal, honouring `i32`/`i64`/`L` suffixes
fn parse_int(lexeme: &str) -> Result<Value, String> {
    let clean = lexeme.replace('_', "");
    let (digits, suffix) = if let Some(d) = clean.strip_suffix("i64") {
        (d, Some(64))
    } else if let Some(d) = clean.strip_suffix('L') {
        (d, Some(64))
    } else if let Some(d) = clean.strip_suffix("i32") {
        (d, Some(32))
    } else {
        (clean.as_str(), None)
    };

    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| format!("invalid integer: {lexeme}"))?;

    match suffix {
        Some(64) => Ok(Value::Int64(parsed)),
        Some(_) => i32::try_from(parsed)
            .map(Value::Int32)
            .map_err(|_| format!("integer out of range for int32: {lexeme}")),
        None => Ok(i32::try_from(parsed).map_or(Value::Int64(parsed), Value::Int32)),
    }
}

/// Parse a float literal; `f`/`f32` give float32, anything else float64
fn parse_float(lexeme: &str) -> Result<Value, String> {
    let clean = lexeme.replace('_', "");
    let invalid = |_| format!("invalid float: {lexeme}");
    if let Some(digits) = clean.strip_suffix("f64") {
        return digits.parse::<f64>().map(Value::Float64).map_err(invalid);
    }
    if let Some(digits) = clean
        .strip_suffix("f32")
        .or_else(|| clean.strip_suffix('f'))
    {
        return digits.parse::<f32>().map(Value::Float32).map_err(invalid);
    }
    clean.parse::<f64>().map(Value::Float64).map_err(invalid)
}

/// Strip quotes and resolve escape sequences
fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
