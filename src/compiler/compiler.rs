//! LLVM-backed compiler for the Tawa language.
//!
//! This is the top-level coordinator. The heavy lifting is split across:
//!
//! - [`codegen`](super::codegen)   — AST → LLVM IR lowering
//! - [`typeinfo`](super::typeinfo) — the embedded type-info sidechannel
//! - [`linker`](super::linker)     — native binary linking via clang

use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;

use super::codegen::{Lowerer, Settings};
use super::typeinfo;
use crate::ast::Ast;
use crate::errors::CompileError;

/// Holds LLVM state for a single compilation unit.
pub struct Compiler<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
}

impl<'ctx> Compiler<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self {
            context,
            module,
            builder,
        }
    }

    /// Lower a full compilation unit to LLVM IR. On failure the module
    /// contents are meaningless and must be discarded.
    pub fn compile(&self, ast: &Ast, settings: &Settings) -> Result<(), CompileError> {
        let mut lowerer = Lowerer::new(self.context, &self.module, &self.builder)?;
        lowerer.lower(&ast.toplevels)?;

        if settings.library {
            typeinfo::embed(self.context, &self.module, &typeinfo::collect(ast));
        } else {
            lowerer.emit_entrypoint()?;
        }
        Ok(())
    }

    /// The textual IR form.
    pub fn ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Write the textual IR to disk for the external toolchain.
    pub fn write_ir_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.ir_string())
    }
}
