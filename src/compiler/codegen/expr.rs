//! Expression lowering.

use inkwell::types::StructType;
use inkwell::values::{BasicMetadataValueEnum, FunctionValue, GlobalValue, PointerValue};
use inkwell::IntPredicate;

use super::scope::{Binding, TypedValue};
use super::types::{TypeId, TypeKind};
use super::Lowerer;
use crate::ast::{Expression, Identifier, Literal};
use crate::errors::CompileError;

/// FNV-1a, matching the symbol names of previously compiled modules.
fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

enum Callee<'ctx> {
    Direct(FunctionValue<'ctx>),
    Indirect(PointerValue<'ctx>),
}

impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    /// Lower a single expression. `None` means the expression produced
    /// no value (`niets`).
    pub(super) fn lower_expression(
        &mut self,
        expression: &Expression,
    ) -> Result<Option<TypedValue<'ctx>>, CompileError> {
        match expression {
            Expression::Lit(literal) => self.lower_literal(literal),

            Expression::Var(ident) => match self.scopes.lookup(&ident.name) {
                Some(Binding::Value(value)) => Ok(Some(value)),
                Some(Binding::Mutable { ptr, ty }) => {
                    let pointee = self
                        .registry
                        .basic(ty)
                        .expect("mutable bindings hold sized values");
                    let value = self.builder.build_load(pointee, ptr, &ident.name)?;
                    Ok(Some(TypedValue { value, ty }))
                }
                Some(Binding::Function { value, ty }) => Ok(Some(TypedValue {
                    value: value.as_global_value().as_pointer_value().into(),
                    ty,
                })),
                Some(Binding::Type(_)) | None => Err(CompileError::UnknownName {
                    name: ident.name.clone(),
                    span: ident.span,
                }),
            },

            Expression::Declaration { to, value } => {
                let value = self.lower_expression(value)?;
                let value = self.expect_value(value, to.span)?;
                self.scopes
                    .top_mut()
                    .insert(to.name.clone(), Binding::Value(value));
                Ok(Some(value))
            }

            Expression::MutDeclaration { to, value } => {
                let value = self.lower_expression(value)?;
                let value = self.expect_value(value, to.span)?;
                let pointee = self
                    .registry
                    .basic(value.ty)
                    .expect("declared values are sized");
                let storage = self.builder.build_alloca(pointee, &to.name)?;
                self.builder.build_store(storage, value.value)?;
                self.scopes.top_mut().insert(
                    to.name.clone(),
                    Binding::Mutable {
                        ptr: storage,
                        ty: value.ty,
                    },
                );
                Ok(Some(value))
            }

            Expression::Assignment { to, value, span } => {
                let new = self.lower_expression(value)?;
                let new = self.expect_value(new, *span)?;
                match self.scopes.lookup(&to.name) {
                    Some(Binding::Mutable { ptr, ty }) => {
                        if new.ty != ty {
                            return Err(self.type_mismatch(
                                format!("assignment to '{}'", to.name),
                                ty,
                                new.ty,
                                *span,
                            ));
                        }
                        self.builder.build_store(ptr, new.value)?;
                        Ok(Some(new))
                    }
                    Some(_) => Err(CompileError::NotMutable {
                        name: to.name.clone(),
                        span: *span,
                    }),
                    None => Err(CompileError::UnknownName {
                        name: to.name.clone(),
                        span: to.span,
                    }),
                }
            }

            Expression::Call {
                function,
                arguments,
            } => self.lower_call(function, arguments),

            Expression::Field { of, ident } => {
                let of = self.lower_expression(of)?;
                let of = self.expect_value(of, ident.span)?;
                let (struct_id, ir) = self
                    .pointee_struct(of.ty)
                    .ok_or(CompileError::NotAStruct { span: ident.span })?;
                let Some((index, field_ty)) = self.registry.field(struct_id, &ident.name) else {
                    return Err(CompileError::FieldNotFound {
                        type_name: self.registry.name(struct_id).to_string(),
                        field: ident.name.clone(),
                        span: ident.span,
                    });
                };
                let ptr = self.builder.build_struct_gep(
                    ir,
                    of.value.into_pointer_value(),
                    index,
                    &ident.name,
                )?;
                let ty = self.registry.pointer_to(field_ty);
                Ok(Some(TypedValue {
                    value: ptr.into(),
                    ty,
                }))
            }

            Expression::FieldAssignment {
                of,
                field,
                value,
                span,
            } => {
                // Writing through a plain `let` binding is rejected up
                // front, before any IR for the assignment exists.
                if let Expression::Var(base) = of.as_ref() {
                    match self.scopes.lookup(&base.name) {
                        Some(Binding::Mutable { .. }) => {}
                        Some(_) => {
                            return Err(CompileError::NotMutable {
                                name: base.name.clone(),
                                span: *span,
                            });
                        }
                        None => {
                            return Err(CompileError::UnknownName {
                                name: base.name.clone(),
                                span: base.span,
                            });
                        }
                    }
                }

                let new = self.lower_expression(value)?;
                let new = self.expect_value(new, *span)?;
                let of = self.lower_expression(of)?;
                let of = self.expect_value(of, *span)?;

                let (struct_id, ir) = self
                    .pointee_struct(of.ty)
                    .ok_or(CompileError::NotAStruct { span: *span })?;
                let Some((index, field_ty)) = self.registry.field(struct_id, &field.name) else {
                    return Err(CompileError::FieldNotFound {
                        type_name: self.registry.name(struct_id).to_string(),
                        field: field.name.clone(),
                        span: field.span,
                    });
                };
                if new.ty != field_ty {
                    return Err(self.type_mismatch(
                        format!(
                            "field '{}' of '{}'",
                            field.name,
                            self.registry.name(struct_id),
                        ),
                        field_ty,
                        new.ty,
                        *span,
                    ));
                }

                let ptr = self.builder.build_struct_gep(
                    ir,
                    of.value.into_pointer_value(),
                    index,
                    &field.name,
                )?;
                self.builder.build_store(ptr, new.value)?;
                Ok(Some(new))
            }

            Expression::Block(statements) => {
                self.scopes.push();
                let result = self.lower_statements(statements);
                self.scopes.pop();
                result
            }

            Expression::If {
                condition,
                then,
                otherwise,
            } => self.lower_if(condition, then, otherwise),

            Expression::Allocation(inner) => Err(CompileError::NotImplemented {
                construct: "new",
                span: inner.span(),
            }),
            Expression::Freeing(inner) => Err(CompileError::NotImplemented {
                construct: "delete",
                span: inner.span(),
            }),
        }
    }

    fn lower_statements(
        &mut self,
        statements: &[Expression],
    ) -> Result<Option<TypedValue<'ctx>>, CompileError> {
        let mut last = None;
        for statement in statements {
            last = self.lower_expression(statement)?;
        }
        Ok(last)
    }

    fn lower_literal(&mut self, literal: &Literal) -> Result<Option<TypedValue<'ctx>>, CompileError> {
        match literal {
            Literal::Integer(value) => Ok(Some(TypedValue {
                value: self
                    .context
                    .i64_type()
                    .const_int(*value as u64, false)
                    .into(),
                ty: self.prims.int64,
            })),

            Literal::Str(text) => {
                // A string is local { length, data } storage whose data
                // pointer aims at a deduplicated global byte array.
                let string_impl = self
                    .registry
                    .struct_ir(self.prims.string_impl)
                    .expect("string_impl is a struct");
                let storage = self.builder.build_alloca(string_impl, "str")?;

                let length_ptr = self.builder.build_struct_gep(string_impl, storage, 0, "len")?;
                let length = self.context.i64_type().const_int(text.len() as u64, false);
                self.builder.build_store(length_ptr, length)?;

                let global = self.string_constant(text);
                let data_ptr = self.builder.build_struct_gep(string_impl, storage, 1, "data")?;
                self.builder.build_store(data_ptr, global.as_pointer_value())?;

                Ok(Some(TypedValue {
                    value: storage.into(),
                    ty: self.prims.string,
                }))
            }

            Literal::StructLiteral { name, fields } => {
                let id = match self.scopes.lookup(&name.name) {
                    Some(Binding::Type(id)) => id,
                    _ => {
                        return Err(CompileError::UnknownName {
                            name: name.name.clone(),
                            span: name.span,
                        });
                    }
                };
                let Some(ir) = self.registry.struct_ir(id) else {
                    return Err(CompileError::NotAStruct { span: name.span });
                };

                for (field, _) in fields {
                    if self.registry.field(id, field).is_none() {
                        return Err(CompileError::FieldNotFound {
                            type_name: self.registry.name(id).to_string(),
                            field: field.clone(),
                            span: name.span,
                        });
                    }
                }

                let storage = self.builder.build_alloca(ir, &name.name)?;
                let declared = self
                    .registry
                    .fields(id)
                    .expect("checked to be a struct")
                    .to_vec();

                // Stores happen in declaration order; omitted fields
                // stay uninitialized.
                for (index, (field_name, field_ty)) in declared.iter().enumerate() {
                    let Some((_, value_expr)) =
                        fields.iter().find(|(provided, _)| provided == field_name)
                    else {
                        continue;
                    };
                    let value = self.lower_expression(value_expr)?;
                    let value = self.expect_value(value, name.span)?;
                    if value.ty != *field_ty {
                        return Err(self.type_mismatch(
                            format!("field '{field_name}' of '{}'", name.name),
                            *field_ty,
                            value.ty,
                            name.span,
                        ));
                    }
                    let field_ptr =
                        self.builder
                            .build_struct_gep(ir, storage, index as u32, field_name)?;
                    self.builder.build_store(field_ptr, value.value)?;
                }

                let ty = self.registry.pointer_to(id);
                Ok(Some(TypedValue {
                    value: storage.into(),
                    ty,
                }))
            }
        }
    }

    fn lower_call(
        &mut self,
        function: &Identifier,
        arguments: &[Expression],
    ) -> Result<Option<TypedValue<'ctx>>, CompileError> {
        let (callee, signature) = match self.scopes.lookup(&function.name) {
            Some(Binding::Function { value, ty }) => (Callee::Direct(value), ty),
            Some(Binding::Value(value))
                if matches!(self.registry.get(value.ty).kind, TypeKind::Function { .. }) =>
            {
                (Callee::Indirect(value.value.into_pointer_value()), value.ty)
            }
            Some(Binding::Mutable { ptr, ty })
                if matches!(self.registry.get(ty).kind, TypeKind::Function { .. }) =>
            {
                let pointee = self.registry.basic(ty).expect("function pointers are sized");
                let loaded = self.builder.build_load(pointee, ptr, &function.name)?;
                (Callee::Indirect(loaded.into_pointer_value()), ty)
            }
            _ => {
                return Err(CompileError::UnknownName {
                    name: function.name.clone(),
                    span: function.span,
                });
            }
        };

        let TypeKind::Function {
            ir,
            arguments: parameters,
            returns,
        } = &self.registry.get(signature).kind
        else {
            unreachable!("callees carry function types");
        };
        let ir = *ir;
        let parameters = parameters.clone();
        let returns = *returns;

        if parameters.len() != arguments.len() {
            return Err(CompileError::TypeMismatch {
                context: format!("call to '{}'", function.name),
                expected: format!("{} arguments", parameters.len()),
                found: format!("{} arguments", arguments.len()),
                span: function.span,
            });
        }

        let mut lowered: Vec<BasicMetadataValueEnum> = Vec::with_capacity(arguments.len());
        for (index, (argument, parameter)) in arguments.iter().zip(&parameters).enumerate() {
            let value = self.lower_expression(argument)?;
            let value = self.expect_value(value, function.span)?;
            if value.ty != *parameter {
                return Err(self.type_mismatch(
                    format!("argument {index} of function '{}'", function.name),
                    *parameter,
                    value.ty,
                    function.span,
                ));
            }
            lowered.push(value.value.into());
        }

        let site = match callee {
            Callee::Direct(value) => self.builder.build_call(value, &lowered, "call")?,
            Callee::Indirect(ptr) => {
                self.builder.build_indirect_call(ir, ptr, &lowered, "call")?
            }
        };

        Ok(match (returns, site.try_as_basic_value().left()) {
            (Some(ty), Some(value)) => Some(TypedValue { value, ty }),
            _ => None,
        })
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then: &Expression,
        otherwise: &Expression,
    ) -> Result<Option<TypedValue<'ctx>>, CompileError> {
        let span = condition.span();
        let cond = self.lower_expression(condition)?;
        let cond = self.expect_value(cond, span)?;
        if !cond.value.is_int_value() {
            return Err(CompileError::TypeMismatch {
                context: "if condition".to_string(),
                expected: "bool".to_string(),
                found: self.registry.name(cond.ty).to_string(),
                span,
            });
        }

        let origin = self.builder.get_insert_block().expect("builder is positioned");
        let function = origin.get_parent().expect("block belongs to a function");

        let then_block = self.context.append_basic_block(function, "then");
        self.builder.position_at_end(then_block);
        let then_value = self.lower_expression(then)?;
        let then_end = self.builder.get_insert_block().expect("builder is positioned");

        let else_block = self.context.append_basic_block(function, "else");
        self.builder.position_at_end(else_block);
        let else_value = self.lower_expression(otherwise)?;
        let else_end = self.builder.get_insert_block().expect("builder is positioned");

        let merge_block = self.context.append_basic_block(function, "ifcont");

        // The branches go in last, now that the arm blocks exist.
        self.builder.position_at_end(origin);
        let int = cond.value.into_int_value();
        let comparison = self.builder.build_int_compare(
            IntPredicate::NE,
            int,
            int.get_type().const_zero(),
            "ifcond",
        )?;
        self.builder
            .build_conditional_branch(comparison, then_block, else_block)?;
        self.builder.position_at_end(then_end);
        self.builder.build_unconditional_branch(merge_block)?;
        self.builder.position_at_end(else_end);
        self.builder.build_unconditional_branch(merge_block)?;
        self.builder.position_at_end(merge_block);

        match (then_value, else_value) {
            (Some(then_value), Some(else_value)) => {
                if then_value.ty != else_value.ty {
                    return Err(self.type_mismatch(
                        "if arms".to_string(),
                        then_value.ty,
                        else_value.ty,
                        span,
                    ));
                }
                let ty = self
                    .registry
                    .basic(then_value.ty)
                    .expect("arm values are sized");
                let phi = self.builder.build_phi(ty, "ifvalue")?;
                phi.add_incoming(&[
                    (&then_value.value, then_end),
                    (&else_value.value, else_end),
                ]);
                Ok(Some(TypedValue {
                    value: phi.as_basic_value(),
                    ty: then_value.ty,
                }))
            }
            // Both arms are statements; the whole `if` is one too.
            (None, None) => Ok(None),
            (then_value, else_value) => {
                let describe = |value: Option<TypedValue>| match value {
                    Some(value) => self.registry.name(value.ty).to_string(),
                    None => "niets".to_string(),
                };
                Err(CompileError::TypeMismatch {
                    context: "if arms".to_string(),
                    expected: describe(then_value),
                    found: describe(else_value),
                    span,
                })
            }
        }
    }

    fn pointee_struct(&self, ty: TypeId) -> Option<(TypeId, StructType<'ctx>)> {
        let pointee = self.registry.pointee(ty)?;
        let ir = self.registry.struct_ir(pointee)?;
        Some((pointee, ir))
    }

    /// The deduplicated global byte array for a string literal.
    fn string_constant(&mut self, text: &str) -> GlobalValue<'ctx> {
        if let Some(global) = self.strings.get(text) {
            return *global;
        }

        let name = format!("_str_{}", fnv1a32(text.as_bytes()));
        let array = self.context.i8_type().array_type(text.len() as u32);
        let global = self.module.add_global(array, None, &name);
        global.set_initializer(&self.context.const_string(text.as_bytes(), false));
        global.set_constant(true);

        self.strings.insert(text.to_string(), global);
        global
    }
}
