//! The type registry — interned lowered types.
//!
//! LLVM's opaque pointers erase the pointee, so every lowered value
//! carries a [`TypeId`] alongside its IR value. `TypeId` equality is the
//! type-agreement check used for struct fields, call arguments,
//! assignments, and `if` arms. Pointer and function types are interned
//! structurally so independently written spellings of the same type
//! compare equal.

use std::collections::HashMap;

use inkwell::context::Context;
use inkwell::types::{BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use super::scope::{Binding, ScopeStack, TypedValue};
use crate::ast;
use crate::errors::CompileError;
use crate::lexer::Span;

/// Handle into the [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

#[derive(Debug)]
pub enum TypeKind<'ctx> {
    /// `niets` — produces no value.
    Void,
    Basic(BasicTypeEnum<'ctx>),
    /// Field order is declaration order; a field's position is its GEP
    /// index.
    Struct {
        ir: StructType<'ctx>,
        fields: Vec<(String, TypeId)>,
    },
    Pointer {
        pointee: TypeId,
    },
    Function {
        ir: FunctionType<'ctx>,
        arguments: Vec<TypeId>,
        returns: Option<TypeId>,
    },
}

#[derive(Debug)]
pub struct LoweredType<'ctx> {
    pub name: String,
    pub kind: TypeKind<'ctx>,
}

pub struct TypeRegistry<'ctx> {
    context: &'ctx Context,
    entries: Vec<LoweredType<'ctx>>,
    pointers: HashMap<TypeId, TypeId>,
    functions: HashMap<(Vec<TypeId>, Option<TypeId>), TypeId>,
}

impl<'ctx> TypeRegistry<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        TypeRegistry {
            context,
            entries: Vec::new(),
            pointers: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    pub fn intern(&mut self, name: impl Into<String>, kind: TypeKind<'ctx>) -> TypeId {
        let id = TypeId(self.entries.len());
        self.entries.push(LoweredType {
            name: name.into(),
            kind,
        });
        id
    }

    pub fn get(&self, id: TypeId) -> &LoweredType<'ctx> {
        &self.entries[id.0]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.entries[id.0].name
    }

    /// The IR type used wherever a value of this type is stored or
    /// passed. `None` for `niets`.
    pub fn basic(&self, id: TypeId) -> Option<BasicTypeEnum<'ctx>> {
        match &self.get(id).kind {
            TypeKind::Void => None,
            TypeKind::Basic(ty) => Some(*ty),
            TypeKind::Struct { ir, .. } => Some((*ir).into()),
            TypeKind::Pointer { .. } | TypeKind::Function { .. } => {
                Some(self.context.ptr_type(AddressSpace::default()).into())
            }
        }
    }

    pub fn struct_ir(&self, id: TypeId) -> Option<StructType<'ctx>> {
        match &self.get(id).kind {
            TypeKind::Struct { ir, .. } => Some(*ir),
            _ => None,
        }
    }

    pub fn fields(&self, id: TypeId) -> Option<&[(String, TypeId)]> {
        match &self.get(id).kind {
            TypeKind::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// A field's GEP ordinal and declared type.
    pub fn field(&self, id: TypeId, name: &str) -> Option<(u32, TypeId)> {
        let fields = self.fields(id)?;
        fields
            .iter()
            .position(|(field, _)| field == name)
            .map(|index| (index as u32, fields[index].1))
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match &self.get(id).kind {
            TypeKind::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        if let Some(id) = self.pointers.get(&pointee) {
            return *id;
        }
        let name = format!("{}*", self.name(pointee));
        self.intern_pointer(name, pointee)
    }

    /// Intern a pointer type under an explicit name (`string` is the
    /// named pointer to `string_impl`).
    pub fn intern_pointer(&mut self, name: impl Into<String>, pointee: TypeId) -> TypeId {
        let id = self.intern(name, TypeKind::Pointer { pointee });
        self.pointers.insert(pointee, id);
        id
    }

    pub fn lookup_function(&self, arguments: &[TypeId], returns: Option<TypeId>) -> Option<TypeId> {
        self.functions
            .get(&(arguments.to_vec(), returns))
            .copied()
    }

    pub fn intern_function(
        &mut self,
        ir: FunctionType<'ctx>,
        arguments: Vec<TypeId>,
        returns: Option<TypeId>,
    ) -> TypeId {
        let rendered = arguments
            .iter()
            .map(|argument| self.name(*argument).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let name = match returns {
            Some(returns) => format!("func({rendered}) {}", self.name(returns)),
            None => format!("func({rendered})"),
        };
        let id = self.intern(
            name,
            TypeKind::Function {
                ir,
                arguments: arguments.clone(),
                returns,
            },
        );
        self.functions.insert((arguments, returns), id);
        id
    }
}

/// Handles to the types the lowerer reaches for constantly.
#[derive(Debug, Clone, Copy)]
pub struct Primitives {
    pub int64: TypeId,
    pub string: TypeId,
    pub string_impl: TypeId,
}

fn declare<'ctx>(
    registry: &mut TypeRegistry<'ctx>,
    scopes: &mut ScopeStack<'ctx>,
    name: &str,
    kind: TypeKind<'ctx>,
) -> TypeId {
    let id = registry.intern(name, kind);
    scopes.top_mut().insert(name.to_string(), Binding::Type(id));
    id
}

/// Register the primitive types and constants into the registry and the
/// root scope: the sized integers and floats, `bool`, `niets`, `byte`,
/// the string pair, and `true`/`false`/`nil`.
pub(super) fn install_primitives<'ctx>(
    context: &'ctx Context,
    registry: &mut TypeRegistry<'ctx>,
    scopes: &mut ScopeStack<'ctx>,
) -> Primitives {
    declare(registry, scopes, "int8", TypeKind::Basic(context.i8_type().into()));
    declare(registry, scopes, "int16", TypeKind::Basic(context.i16_type().into()));
    declare(registry, scopes, "int32", TypeKind::Basic(context.i32_type().into()));
    let int64 = declare(registry, scopes, "int64", TypeKind::Basic(context.i64_type().into()));
    declare(registry, scopes, "int128", TypeKind::Basic(context.i128_type().into()));

    declare(registry, scopes, "float16", TypeKind::Basic(context.f16_type().into()));
    declare(registry, scopes, "float32", TypeKind::Basic(context.f32_type().into()));
    declare(registry, scopes, "float64", TypeKind::Basic(context.f64_type().into()));
    declare(registry, scopes, "float128", TypeKind::Basic(context.f128_type().into()));

    let boolean = declare(registry, scopes, "bool", TypeKind::Basic(context.bool_type().into()));
    let niets = declare(registry, scopes, "niets", TypeKind::Void);
    declare(registry, scopes, "byte", TypeKind::Basic(context.i8_type().into()));

    // `string_impl` is the { length, data } aggregate; `string` is the
    // pointer user code passes around. Its two fields are touched by
    // GEP index, not by name.
    let string_struct = context.opaque_struct_type("string_impl");
    string_struct.set_body(
        &[
            context.i64_type().into(),
            context.ptr_type(AddressSpace::default()).into(),
        ],
        false,
    );
    let string_impl = declare(
        registry,
        scopes,
        "string_impl",
        TypeKind::Struct {
            ir: string_struct,
            fields: Vec::new(),
        },
    );
    let string = registry.intern_pointer("string", string_impl);
    scopes
        .top_mut()
        .insert("string".to_string(), Binding::Type(string));

    let truthy = context.bool_type().const_int(1, false);
    let falsy = context.bool_type().const_int(0, false);
    scopes.top_mut().insert(
        "true".to_string(),
        Binding::Value(TypedValue {
            value: truthy.into(),
            ty: boolean,
        }),
    );
    scopes.top_mut().insert(
        "false".to_string(),
        Binding::Value(TypedValue {
            value: falsy.into(),
            ty: boolean,
        }),
    );

    let nil_ty = registry.pointer_to(niets);
    let nil = context.ptr_type(AddressSpace::default()).const_null();
    scopes.top_mut().insert(
        "nil".to_string(),
        Binding::Value(TypedValue {
            value: nil.into(),
            ty: nil_ty,
        }),
    );

    Primitives {
        int64,
        string,
        string_impl,
    }
}

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    /// Lower an AST type through the registry.
    pub(super) fn lower_type(&mut self, kind: &ast::Type) -> Result<TypeId, CompileError> {
        match kind {
            ast::Type::Ident(ident) => match self.scopes.lookup(&ident.name) {
                Some(Binding::Type(id)) => Ok(id),
                _ => Err(CompileError::UnknownName {
                    name: ident.name.clone(),
                    span: ident.span,
                }),
            },
            ast::Type::FunctionPointer { arguments, returns } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.lower_type(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                let returns = returns
                    .as_deref()
                    .map(|returns| self.lower_type(returns))
                    .transpose()?;
                self.function_type(arguments, returns, Span::default())
            }
            ast::Type::Struct(fields) => {
                // An inline struct type outside a named declaration.
                let mut lowered = Vec::with_capacity(fields.len());
                let mut body = Vec::with_capacity(fields.len());
                for field in fields {
                    let ty = self.lower_type(&field.kind)?;
                    body.push(self.basic_of(ty, Span::default(), &field.name)?);
                    lowered.push((field.name.clone(), ty));
                }
                let ir = self.context.struct_type(&body, false);
                let name = format!(
                    "struct {{ {} }}",
                    lowered
                        .iter()
                        .map(|(name, ty)| format!("{name}: {}", self.registry.name(*ty)))
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                Ok(self.registry.intern(name, TypeKind::Struct { ir, fields: lowered }))
            }
        }
    }

    /// The structurally interned function type for a signature,
    /// building the IR function type on first sight.
    pub(super) fn function_type(
        &mut self,
        arguments: Vec<TypeId>,
        returns: Option<TypeId>,
        span: Span,
    ) -> Result<TypeId, CompileError> {
        if let Some(id) = self.registry.lookup_function(&arguments, returns) {
            return Ok(id);
        }

        let parameters = arguments
            .iter()
            .map(|argument| self.basic_of(*argument, span, "parameter").map(Into::into))
            .collect::<Result<Vec<_>, _>>()?;
        let ir = match returns {
            Some(returns) => self.basic_of(returns, span, "return type")?.fn_type(&parameters, false),
            None => self.context.void_type().fn_type(&parameters, false),
        };
        Ok(self.registry.intern_function(ir, arguments, returns))
    }

    /// Require a type to be sized (anything but `niets`).
    pub(super) fn basic_of(
        &self,
        ty: TypeId,
        span: Span,
        context: &str,
    ) -> Result<BasicTypeEnum<'ctx>, CompileError> {
        self.registry.basic(ty).ok_or_else(|| CompileError::TypeMismatch {
            context: context.to_string(),
            expected: "a sized type".to_string(),
            found: self.registry.name(ty).to_string(),
            span,
        })
    }
}
