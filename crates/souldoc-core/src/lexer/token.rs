//! Token types for the SOUL lexer

use logos::Logos;

/// The kind of token produced by the lexer
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ========== Keywords ==========
    #[token("namespace")]
    Namespace,
    #[token("processor")]
    Processor,
    #[token("graph")]
    Graph,
    #[token("struct")]
    Struct,
    #[token("using")]
    Using,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("stream")]
    Stream,
    #[token("value")]
    Value,
    #[token("event")]
    Event,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("external")]
    External,
    #[token("node")]
    Node,
    #[token("connection")]
    Connection,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ========== Literals ==========
    /// Integer literal, optionally suffixed with `i32`, `i64` or `L`
    #[regex(r"[0-9][0-9_]*(i32|i64|L)?")]
    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*(i32|i64|L)?")]
    Int,

    /// Float literal, optionally suffixed with `f`, `f32` or `f64`
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?(f|f32|f64)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+(f|f32|f64)?")]
    #[regex(r"[0-9][0-9_]*(f|f32|f64)")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ========== Operators ==========
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    Shl,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpersandEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    ShlEq,
    #[token("->")]
    Arrow,

    // ========== Delimiters ==========
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,

    // ========== Trivia ==========
    #[regex(r"//[^\n]*")]
    LineComment,

    /// Runs to the first `*/`; block comments do not nest
    #[token("/*", block_comment)]
    BlockComment,

    /// End of file (added by the lexer, never matched)
    Eof,

    /// Invalid input
    Error,
}

/// Consume a block comment body, failing if the input ends before `*/`
fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

impl TokenKind {
    /// Returns true for tokens the parser never sees
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }

    /// Keywords that may also appear as plain names in some positions
    /// (endpoint kinds are valid identifiers outside endpoint declarations)
    #[must_use]
    pub const fn is_contextual_keyword(&self) -> bool {
        matches!(self, Self::Stream | Self::Value | Self::Event | Self::Node)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Namespace => "namespace",
            Self::Processor => "processor",
            Self::Graph => "graph",
            Self::Struct => "struct",
            Self::Using => "using",
            Self::Input => "input",
            Self::Output => "output",
            Self::Stream => "stream",
            Self::Value => "value",
            Self::Event => "event",
            Self::Let => "let",
            Self::Var => "var",
            Self::Const => "const",
            Self::External => "external",
            Self::Node => "node",
            Self::Connection => "connection",
            Self::True => "true",
            Self::False => "false",
            Self::Int => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Ident => "identifier",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Shl => "<<",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Not => "!",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::Question => "?",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::AmpersandEq => "&=",
            Self::PipeEq => "|=",
            Self::CaretEq => "^=",
            Self::ShlEq => "<<=",
            Self::Arrow => "->",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::ColonColon => "::",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::LineComment => "// comment",
            Self::BlockComment => "/* comment */",
            Self::Eof => "end of file",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}
