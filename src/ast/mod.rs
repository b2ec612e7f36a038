/// Syntax tree data model and its canonical re-printer.
pub mod ast;
pub mod printer;

pub use ast::{Ast, Expression, Identifier, Literal, StructField, TopLevel, Type};
