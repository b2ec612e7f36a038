//! Lexically nested name resolution.

use std::collections::HashMap;

use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use super::types::TypeId;

/// An IR value together with its logical type.
#[derive(Debug, Clone, Copy)]
pub struct TypedValue<'ctx> {
    pub value: BasicValueEnum<'ctx>,
    pub ty: TypeId,
}

/// What a name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'ctx> {
    /// `let` — an immutable SSA value.
    Value(TypedValue<'ctx>),
    /// `var` — an address in local storage; `ty` is the pointee's type.
    Mutable { ptr: PointerValue<'ctx>, ty: TypeId },
    Type(TypeId),
    Function { value: FunctionValue<'ctx>, ty: TypeId },
}

/// A stack of name → binding maps. Lookup resolves to the innermost
/// match; push and pop are strict LIFO.
pub struct ScopeStack<'ctx> {
    scopes: Vec<HashMap<String, Binding<'ctx>>>,
}

impl<'ctx> ScopeStack<'ctx> {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    /// The innermost scope, for inserting new bindings.
    pub fn top_mut(&mut self) -> &mut HashMap<String, Binding<'ctx>> {
        self.scopes.last_mut().expect("at least the root scope")
    }

    pub fn lookup(&self, name: &str) -> Option<Binding<'ctx>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::codegen::types::{TypeKind, TypeRegistry};
    use inkwell::context::Context;

    #[test]
    fn lookup_resolves_innermost_first() {
        let context = Context::create();
        let mut registry = TypeRegistry::new(&context);
        let outer_ty = registry.intern("outer", TypeKind::Void);
        let inner_ty = registry.intern("inner", TypeKind::Void);

        let mut scopes: ScopeStack<'_> = ScopeStack::new();
        scopes.top_mut().insert("x".to_string(), Binding::Type(outer_ty));
        scopes.push();
        scopes.top_mut().insert("x".to_string(), Binding::Type(inner_ty));

        match scopes.lookup("x") {
            Some(Binding::Type(id)) => assert_eq!(id, inner_ty),
            other => panic!("unexpected binding: {other:?}"),
        }

        scopes.pop();
        match scopes.lookup("x") {
            Some(Binding::Type(id)) => assert_eq!(id, outer_ty),
            other => panic!("unexpected binding: {other:?}"),
        }
    }

    #[test]
    fn popped_names_are_gone() {
        let context = Context::create();
        let mut registry = TypeRegistry::new(&context);
        let ty = registry.intern("t", TypeKind::Void);

        let mut scopes: ScopeStack<'_> = ScopeStack::new();
        assert_eq!(scopes.depth(), 1);
        scopes.push();
        scopes.top_mut().insert("local".to_string(), Binding::Type(ty));
        assert!(scopes.lookup("local").is_some());
        scopes.pop();
        assert!(scopes.lookup("local").is_none());
        assert_eq!(scopes.depth(), 1);
    }
}
