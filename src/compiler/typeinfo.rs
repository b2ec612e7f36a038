//! The type-info sidechannel.
//!
//! Compiled libraries embed a JSON document in a constant global named
//! `__tawa_types` so other tools can read back the exported function
//! signatures without reparsing source.

use std::collections::BTreeMap;

use inkwell::context::Context;
use inkwell::module::Module;
use serde::{Deserialize, Serialize};

use crate::ast::{printer, Ast, TopLevel};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeInfo {
    pub functions: BTreeMap<String, String>,
}

/// Gather the textual signature of every function in the unit.
pub fn collect(ast: &Ast) -> TypeInfo {
    let mut functions = BTreeMap::new();
    for toplevel in &ast.toplevels {
        if let TopLevel::Func {
            ident,
            arguments,
            returns,
            ..
        } = toplevel
        {
            functions.insert(
                ident.name.clone(),
                printer::signature(arguments, returns.as_ref()),
            );
        }
    }
    TypeInfo { functions }
}

/// Embed the document as a NUL-terminated constant global.
pub fn embed<'ctx>(context: &'ctx Context, module: &Module<'ctx>, info: &TypeInfo) {
    let data = serde_json::to_vec(info).expect("type info serializes");
    let array = context.const_string(&data, true);
    let global = module.add_global(array.get_type(), None, "__tawa_types");
    global.set_initializer(&array);
    global.set_constant(true);
}
