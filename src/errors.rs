//! Tawa error reporting — structured compile errors plus pretty,
//! coloured diagnostics for the driver.

use std::fmt;

use crate::lexer::{Span, TokenKind};

/// The phase of compilation where an error occurred.
#[derive(Debug, Clone, Copy)]
pub enum Phase {
    Lexer,
    Parser,
    Compiler,
    Linker,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexer    => write!(f, "lex"),
            Phase::Parser   => write!(f, "parse"),
            Phase::Compiler => write!(f, "compile"),
            Phase::Linker   => write!(f, "link"),
        }
    }
}

fn kind_list(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A structured compiler error. Every variant carries the span it was
/// raised at; errors unwind to the top of the phase that produced them
/// and are reported by the driver.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("got a {got}, expected a {expected}. {span}")]
    ExpectedKind {
        expected: TokenKind,
        got: TokenKind,
        span: Span,
    },

    #[error("got a {got}, expected one of {}. {span}", kind_list(.expected))]
    ExpectedOneOf {
        expected: Vec<TokenKind>,
        got: TokenKind,
        span: Span,
    },

    #[error("field {name} specified more than once. {span}")]
    DuplicateField { name: String, span: Span },

    #[error("could not look up '{name}'. {span}")]
    UnknownName { name: String, span: Span },

    #[error("'{name}' is not mutable. {span}")]
    NotMutable { name: String, span: Span },

    #[error("{context}: expected type '{expected}', found '{found}'. {span}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
        span: Span,
    },

    #[error("tried to access a field of a non-struct value. {span}")]
    NotAStruct { span: Span },

    #[error("struct type '{type_name}' does not have field '{field}'. {span}")]
    FieldNotFound {
        type_name: String,
        field: String,
        span: Span,
    },

    #[error("could not lex '{lexeme}'. {span}")]
    Lex { lexeme: String, span: Span },

    #[error("'{construct}' is not implemented yet. {span}")]
    NotImplemented { construct: &'static str, span: Span },

    #[error("internal builder error: {0}")]
    Builder(#[from] inkwell::builder::BuilderError),
}

impl CompileError {
    /// The compilation phase this error belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            CompileError::Lex { .. } => Phase::Lexer,
            CompileError::ExpectedKind { .. }
            | CompileError::ExpectedOneOf { .. }
            | CompileError::DuplicateField { .. } => Phase::Parser,
            _ => Phase::Compiler,
        }
    }
}

/// Print an error to stderr with red colouring (ANSI).
pub fn report(err: &CompileError) {
    eprintln!(
        "\x1b[1;31merror\x1b[0m\x1b[1m[{}]:\x1b[0m {err}",
        err.phase(),
    );
}

/// Shorthand for driver-level failures — print red and exit.
pub fn fatal(phase: Phase, message: impl Into<String>) -> ! {
    eprintln!(
        "\x1b[1;31merror\x1b[0m\x1b[1m[{}]:\x1b[0m {}",
        phase,
        message.into(),
    );
    std::process::exit(1);
}

/// Print a status/info message with a coloured `[tawa]` prefix.
pub fn info(message: impl fmt::Display) {
    eprintln!("\x1b[1;34m[tawa]\x1b[0m {message}");
}

/// Print a success message in green.
pub fn success(message: impl fmt::Display) {
    eprintln!("\x1b[1;32m[tawa]\x1b[0m {message}");
}
