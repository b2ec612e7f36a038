//! Canonical re-printer of the AST back to Tawa surface syntax.
//!
//! The output of [`print`] re-parses to an equal tree (spans aside),
//! which the parser tests rely on. [`signature`] renders the textual
//! function signatures embedded in the `__tawa_types` global.

use std::fmt;

use super::ast::{Ast, Expression, Literal, TopLevel, Type};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Ident(ident) => f.write_str(&ident.name),
            Type::FunctionPointer { arguments, returns } => {
                f.write_str("func(")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")?;
                if let Some(returns) = returns {
                    write!(f, " {returns}")?;
                }
                Ok(())
            }
            Type::Struct(fields) => {
                f.write_str("struct { ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.kind)?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Str(s) => write!(f, "`{s}`"),
            Literal::StructLiteral { name, fields } => {
                write!(f, "{}{{", name.name)?;
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Lit(lit) => write!(f, "{lit}"),
            Expression::Var(ident) => f.write_str(&ident.name),
            Expression::Declaration { to, value } => write!(f, "let {} = {value}", to.name),
            Expression::MutDeclaration { to, value } => write!(f, "var {} = {value}", to.name),
            Expression::Assignment { to, value, .. } => write!(f, "{} = {value}", to.name),
            Expression::Field { of, ident } => write!(f, "{of}.{}", ident.name),
            Expression::FieldAssignment {
                of, field, value, ..
            } => write!(f, "{of}.{} = {value}", field.name),
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.name)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expression::Block(statements) => {
                f.write_str("{ ")?;
                for statement in statements {
                    write!(f, "{statement}; ")?;
                }
                f.write_str("}")
            }
            Expression::If {
                condition,
                then,
                otherwise,
            } => write!(f, "if {condition} then {then} else {otherwise}"),
            Expression::Allocation(inner) => write!(f, "new {inner}"),
            Expression::Freeing(inner) => write!(f, "delete {inner}"),
        }
    }
}

impl fmt::Display for TopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopLevel::Import(path) => write!(f, "import `{path}`;"),
            TopLevel::TypeDeclaration { ident, kind } => {
                write!(f, "type {} = {kind};", ident.name)
            }
            TopLevel::Func {
                ident,
                arguments,
                returns,
                body,
            } => {
                write!(f, "func {}(", ident.name)?;
                for (i, (name, kind)) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {kind}", name.name)?;
                }
                f.write_str(")")?;
                if let Some(returns) = returns {
                    write!(f, " {returns}")?;
                }
                match body {
                    Expression::Block(_) => write!(f, " {body};"),
                    _ => write!(f, " => {body};"),
                }
            }
        }
    }
}

/// Render a whole compilation unit, one top-level per line.
pub fn print(ast: &Ast) -> String {
    let mut out = String::new();
    for toplevel in &ast.toplevels {
        out.push_str(&toplevel.to_string());
        out.push('\n');
    }
    out
}

/// The textual type signature of a function, as stored in the type-info
/// sidechannel of compiled libraries.
pub fn signature(arguments: &[(super::ast::Identifier, Type)], returns: Option<&Type>) -> String {
    let args = arguments
        .iter()
        .map(|(_, kind)| kind.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    match returns {
        Some(returns) => format!("func({args}) {returns};"),
        None => format!("func({args});"),
    }
}
