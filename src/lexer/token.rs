//! Token and source-position types.

use std::fmt;

use logos::Logos;

/// A location in a source file. Lines start at 1, columns at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range, from the first byte of a token to one past its last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub from: Position,
    pub to: Position,
}

impl Span {
    pub fn single(p: Position) -> Span {
        Span { from: p, to: p }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// The raw patterns handed to logos. [`TokenStream`](super::TokenStream)
/// wraps these into [`TokenKind`]s, adding the kinds logos never produces
/// itself (`Eof`, `Illegal`, and the automatically inserted `Eos`).
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f\n]+")]
pub(super) enum RawToken {
    // ── keywords ────────────────────────────────────────────────
    #[token("type")]
    Type,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("func")]
    Func,

    #[token("struct")]
    Struct,

    #[token("import")]
    Import,

    #[token("var")]
    Var,

    #[token("let")]
    Let,

    #[token("new")]
    New,

    #[token("delete")]
    Delete,

    // ── punctuation ─────────────────────────────────────────────
    #[token(":")]
    Colon,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token("=")]
    Equals,

    #[token("=>")]
    FatArrow,

    #[token(".")]
    Period,

    /// A literal `;`. The statement terminator can also be inserted
    /// automatically at a newline; see [`TokenStream`](super::TokenStream).
    #[token(";")]
    Eos,

    // ── literals ────────────────────────────────────────────────

    /// Integer literal: one or more decimal digits.
    #[regex("[0-9]+")]
    Int,

    /// Identifier: `_`, `'`, or a letter, then the same plus digits
    /// and `/`.
    #[regex(r"[_'\p{L}][_'/0-9\p{L}]*")]
    Ident,

    /// String literal: backtick-delimited, verbatim bytes, no escapes.
    #[regex(r"`[^`]*`")]
    Str,
}

/// The closed set of token kinds the parser consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Illegal,

    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Equals,
    FatArrow,
    Period,

    Var,
    Let,

    Eos,

    Int,

    Ident,
    Str,

    Type,
    If,
    Then,
    Else,
    Func,
    Struct,
    Import,
    New,
    Delete,
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> TokenKind {
        match raw {
            RawToken::Type => TokenKind::Type,
            RawToken::If => TokenKind::If,
            RawToken::Then => TokenKind::Then,
            RawToken::Else => TokenKind::Else,
            RawToken::Func => TokenKind::Func,
            RawToken::Struct => TokenKind::Struct,
            RawToken::Import => TokenKind::Import,
            RawToken::Var => TokenKind::Var,
            RawToken::Let => TokenKind::Let,
            RawToken::New => TokenKind::New,
            RawToken::Delete => TokenKind::Delete,
            RawToken::Colon => TokenKind::Colon,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Equals => TokenKind::Equals,
            RawToken::FatArrow => TokenKind::FatArrow,
            RawToken::Period => TokenKind::Period,
            RawToken::Eos => TokenKind::Eos,
            RawToken::Int => TokenKind::Int,
            RawToken::Ident => TokenKind::Ident,
            RawToken::Str => TokenKind::Str,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "EOF",
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Colon => "COLON",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Comma => "COMMA",
            TokenKind::Equals => "EQUALS",
            TokenKind::FatArrow => "FATARROW",
            TokenKind::Period => "PERIOD",
            TokenKind::Var => "VAR",
            TokenKind::Let => "LET",
            TokenKind::Eos => "EOS",
            TokenKind::Int => "INT",
            TokenKind::Ident => "IDENT",
            TokenKind::Str => "STRING",
            TokenKind::Type => "TYPE",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::Func => "FUNC",
            TokenKind::Struct => "STRUCT",
            TokenKind::Import => "IMPORT",
            TokenKind::New => "NEW",
            TokenKind::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single token together with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
