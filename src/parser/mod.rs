/// Recursive-descent parsing of token streams into the AST.
pub mod parser;

pub use parser::Parser;
