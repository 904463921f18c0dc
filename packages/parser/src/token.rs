use serde::{Deserialize, Serialize};
use std::fmt;

/// Token kinds produced by the Tenn lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Invalid,
    Eof,
    Symbol,
    IntLit,
    FloatLit,
    StringLit,
    /// `%{ ... }`
    MarkdownLit,
    /// `$( ... )`
    Expression,
    /// `${ ... }`
    ExpressionBlock,
    /// Base64 encoded image payload. Only ever constructed programmatically,
    /// there is no source syntax that produces it.
    ImageData,
    CurlyOpen,
    CurlyClose,
    /// Explicit `;` or a newline outside of nested forms
    Separator,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Invalid => "invalid",
            TokenKind::Eof => "end of file",
            TokenKind::Symbol => "symbol",
            TokenKind::IntLit => "int literal",
            TokenKind::FloatLit => "float literal",
            TokenKind::StringLit => "string literal",
            TokenKind::MarkdownLit => "markdown literal",
            TokenKind::Expression => "expression",
            TokenKind::ExpressionBlock => "expression block",
            TokenKind::ImageData => "image data",
            TokenKind::CurlyOpen => "'{'",
            TokenKind::CurlyClose => "'}'",
            TokenKind::Separator => "statement separator",
        };
        f.write_str(name)
    }
}

/// A scanned token. Positions are zero based and counted in Unicode scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub col: usize,
    pub pos: usize,
    pub size: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let size = literal.chars().count();
        Self {
            kind,
            literal,
            line: 0,
            col: 0,
            pos: 0,
            size,
        }
    }

    pub fn at(mut self, line: usize, col: usize, pos: usize) -> Self {
        self.line = line;
        self.col = col;
        self.pos = pos;
        self
    }

    /// Newline separators are the only ones the parser may treat as
    /// incidental, `;` always terminates a command.
    pub fn is_newline_separator(&self) -> bool {
        self.kind == TokenKind::Separator && self.literal == "\n"
    }
}
