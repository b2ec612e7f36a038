//! Code generation — walks the AST and emits typed LLVM IR.
//!
//! Lowering runs in two passes over the top-level list: the first
//! registers every type declaration and function signature so bodies
//! may reference each other freely; the second lowers function bodies.

use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{FunctionValue, GlobalValue};

mod builtins;
mod expr;
mod func;
pub mod scope;
pub mod types;

use scope::{ScopeStack, TypedValue};
use types::{Primitives, TypeId, TypeRegistry};

use crate::errors::CompileError;
use crate::lexer::Span;

/// How the module is being built.
pub struct Settings {
    /// Shared library: no entry trampoline, embed type info instead.
    pub library: bool,
}

/// Holds the state for lowering one module: the scope stack, the type
/// registry, the string-constant pool, and the recorded entry point.
pub struct Lowerer<'a, 'ctx> {
    context: &'ctx Context,
    module: &'a Module<'ctx>,
    builder: &'a Builder<'ctx>,
    registry: TypeRegistry<'ctx>,
    scopes: ScopeStack<'ctx>,
    strings: HashMap<String, GlobalValue<'ctx>>,
    prims: Primitives,
    entry: Option<FunctionValue<'ctx>>,
}

impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    pub fn new(
        context: &'ctx Context,
        module: &'a Module<'ctx>,
        builder: &'a Builder<'ctx>,
    ) -> Result<Self, CompileError> {
        let mut registry = TypeRegistry::new(context);
        let mut scopes = ScopeStack::new();
        let prims = types::install_primitives(context, &mut registry, &mut scopes);

        let mut lowerer = Lowerer {
            context,
            module,
            builder,
            registry,
            scopes,
            strings: HashMap::new(),
            prims,
            entry: None,
        };
        builtins::install(&mut lowerer)?;
        Ok(lowerer)
    }

    fn expect_value(
        &self,
        value: Option<TypedValue<'ctx>>,
        span: Span,
    ) -> Result<TypedValue<'ctx>, CompileError> {
        value.ok_or_else(|| CompileError::TypeMismatch {
            context: "expression".to_string(),
            expected: "a value".to_string(),
            found: "niets".to_string(),
            span,
        })
    }

    fn type_mismatch(
        &self,
        context: String,
        expected: TypeId,
        found: TypeId,
        span: Span,
    ) -> CompileError {
        CompileError::TypeMismatch {
            context,
            expected: self.registry.name(expected).to_string(),
            found: self.registry.name(found).to_string(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use super::*;
    use crate::ast::Ast;
    use crate::compiler::Compiler;
    use crate::lexer::TokenStream;
    use crate::parser::Parser;

    fn parse(source: &str) -> Ast {
        Parser::new(TokenStream::new(source))
            .parse()
            .expect("parse failure")
    }

    fn lower_with(source: &str, library: bool) -> Result<String, CompileError> {
        let ast = parse(source);
        let context = Context::create();
        let compiler = Compiler::new(&context, "test");
        compiler.compile(&ast, &Settings { library })?;
        Ok(compiler.ir_string())
    }

    fn lower(source: &str) -> Result<String, CompileError> {
        lower_with(source, false)
    }

    #[test]
    fn trivial_main_returns_its_value_and_gets_a_trampoline() {
        let ir = lower("func main() => 42\n").expect("lowering");
        assert!(ir.contains("ret i64 42"), "missing return: {ir}");
        assert!(ir.contains("_tawa_main"), "missing trampoline: {ir}");
    }

    #[test]
    fn struct_layout_follows_declaration_order() {
        let ir = lower(
            "type P = struct { x: int64, y: int64 }\nfunc main() { var p = P{x: 1, y: 2}; p.x = 5 }\n",
        )
        .expect("lowering");
        assert!(ir.contains("%P = type { i64, i64 }"), "missing struct type: {ir}");
        // Stores through field 0 (both the literal's x and the later
        // assignment) and field 1 (the literal's y).
        assert!(ir.contains("i32 0, i32 0"), "missing gep to field 0: {ir}");
        assert!(ir.contains("i32 0, i32 1"), "missing gep to field 1: {ir}");
    }

    #[test]
    fn string_literals_are_globalized_once() {
        let ir = lower("func main() { let s = `hi`; let t = `hi`; print(s) }\n")
            .expect("lowering");
        assert_eq!(
            ir.matches("c\"hi\"").count(),
            1,
            "string global not deduplicated: {ir}",
        );
        assert!(ir.contains("_str_"), "missing string global: {ir}");
        assert!(ir.contains("store i64 2"), "missing length store: {ir}");
        assert!(ir.contains("@print"), "missing print call: {ir}");
    }

    #[test]
    fn distinct_strings_get_distinct_globals() {
        let ir = lower("func main() { let s = `aa`; let t = `bb`; print(s) }\n")
            .expect("lowering");
        assert_eq!(ir.matches("c\"aa\"").count(), 1, "{ir}");
        assert_eq!(ir.matches("c\"bb\"").count(), 1, "{ir}");
    }

    #[test]
    fn field_assignment_through_let_binding_is_rejected() {
        let err = lower("type P = struct { x: int64 }\nfunc main() { let p = P{x: 1}; p.x = 2 }\n")
            .expect_err("expected failure");
        assert!(matches!(err, CompileError::NotMutable { ref name, .. } if name == "p"), "{err}");
    }

    #[test]
    fn field_assignment_through_var_binding_is_accepted() {
        lower("type P = struct { x: int64 }\nfunc main() { var p = P{x: 1}; p.x = 2 }\n")
            .expect("lowering");
    }

    #[test]
    fn struct_literal_field_types_are_checked() {
        let err = lower("type P = struct { x: int64 }\nfunc main() { var p = P{x: `hi`} }\n")
            .expect_err("expected failure");
        assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn struct_literal_unknown_field_is_rejected() {
        let err = lower("type P = struct { x: int64 }\nfunc main() { var p = P{z: 1} }\n")
            .expect_err("expected failure");
        assert!(matches!(err, CompileError::FieldNotFound { .. }), "{err}");
    }

    #[test]
    fn if_arms_must_agree_in_type() {
        let err = lower("func f() { if 1 then `a` else 2 }\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn if_with_agreeing_arms_merges_through_a_phi() {
        let ir = lower("func f() int64 => if 1 then 2 else 3\nfunc main() => f()\n")
            .expect("lowering");
        assert!(ir.contains("phi i64"), "missing phi: {ir}");
    }

    #[test]
    fn statement_if_with_void_arms_is_allowed() {
        lower("func f() { if 1 then print(`a`) else print(`b`) }\n").expect("lowering");
    }

    #[test]
    fn assignment_to_immutable_binding_is_rejected() {
        let err = lower("func f() { let a = 1; a = 2 }\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::NotMutable { ref name, .. } if name == "a"), "{err}");
    }

    #[test]
    fn assignment_types_are_checked() {
        let err = lower("func f() { var a = 1; a = `s` }\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn mutable_bindings_load_on_read() {
        let ir = lower("func f() int64 { var a = 1; a }\nfunc main() => f()\n")
            .expect("lowering");
        assert!(ir.contains("load i64"), "missing load: {ir}");
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = lower("func f() => missing\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::UnknownName { ref name, .. } if name == "missing"), "{err}");

        let err = lower("func f() => missing()\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::UnknownName { .. }), "{err}");
    }

    #[test]
    fn call_argument_types_are_checked() {
        let err = lower("func g(a: int64) => a\nfunc f() => g(`s`)\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn call_arity_is_checked() {
        let err = lower("func g(a: int64) => a\nfunc f() => g(1, 2)\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn functions_may_be_passed_as_pointers() {
        let ir = lower(
            "type F = func() int64\nfunc g() int64 => 1\nfunc apply(f: F) int64 => f()\nfunc main() => apply(g)\n",
        )
        .expect("lowering");
        assert!(ir.contains("@apply"), "{ir}");
    }

    #[test]
    fn new_and_delete_are_not_implemented() {
        let err = lower("func f() { new 1 }\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::NotImplemented { construct: "new", .. }), "{err}");

        let err = lower("func f() { delete 1 }\n").expect_err("expected failure");
        assert!(matches!(err, CompileError::NotImplemented { construct: "delete", .. }), "{err}");
    }

    #[test]
    fn libraries_embed_type_info_and_skip_the_trampoline() {
        let ir = lower_with("func greet(name: string) => print(name)\nfunc main() => 0\n", true)
            .expect("lowering");
        assert!(ir.contains("__tawa_types"), "missing type info: {ir}");
        assert!(ir.contains("functions"), "missing type info payload: {ir}");
        assert!(!ir.contains("_tawa_main"), "library has a trampoline: {ir}");
    }

    #[test]
    fn executables_without_main_get_no_trampoline() {
        let ir = lower("func helper() => 1\n").expect("lowering");
        assert!(!ir.contains("_tawa_main"), "{ir}");
    }

    #[test]
    fn scopes_stay_balanced_when_lowering_fails() {
        let context = Context::create();
        let module = context.create_module("test");
        let builder = context.create_builder();
        let mut lowerer = Lowerer::new(&context, &module, &builder).expect("lowerer");

        let ast = parse("func f() { let a = missing; a }\n");
        assert!(lowerer.lower(&ast.toplevels).is_err());
        assert_eq!(lowerer.scopes.depth(), 1);

        let ast = parse("func g() => 1\n");
        lowerer.lower(&ast.toplevels).expect("lowering still works");
        assert_eq!(lowerer.scopes.depth(), 1);
    }

    #[test]
    fn true_false_and_nil_are_bound() {
        let ir = lower("func f() bool => true\nfunc main() => 0\n").expect("lowering");
        assert!(ir.contains("ret i1 true"), "{ir}");
        lower("func f() { var p = nil }\n").expect("lowering");
    }

    #[test]
    fn type_aliases_share_identity() {
        lower("type MyInt = int64\nfunc f(a: MyInt) { var b = 1; b = a }\n").expect("lowering");
    }
}
