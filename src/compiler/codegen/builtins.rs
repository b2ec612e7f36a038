//! Built-in functions, installed into the root scope before lowering.
//!
//! Each builtin is a factory that declares its own IR. `print` writes a
//! string to stdout with a raw `write` syscall; the language has no
//! runtime library to link against.

use inkwell::AddressSpace;

use super::scope::Binding;
use super::types::TypeKind;
use super::Lowerer;
use crate::errors::CompileError;
use crate::lexer::Span;

pub(super) fn install<'a, 'ctx>(lowerer: &mut Lowerer<'a, 'ctx>) -> Result<(), CompileError> {
    let builtins: &[fn(&mut Lowerer<'a, 'ctx>) -> Result<(), CompileError>] = &[add_print];
    for builtin in builtins {
        builtin(lowerer)?;
    }
    Ok(())
}

/// `print(input: string)` — load the length and data out of the
/// `string_impl` and hand them to `write(stdout, data, len)`.
fn add_print<'a, 'ctx>(lowerer: &mut Lowerer<'a, 'ctx>) -> Result<(), CompileError> {
    let context = lowerer.context;

    let ty = lowerer.function_type(vec![lowerer.prims.string], None, Span::default())?;
    let ir = match &lowerer.registry.get(ty).kind {
        TypeKind::Function { ir, .. } => *ir,
        _ => unreachable!("function_type interns a function type"),
    };
    let function = lowerer.module.add_function("print", ir, None);
    let entry = context.append_basic_block(function, "entry");
    lowerer.builder.position_at_end(entry);

    let string_impl = lowerer
        .registry
        .struct_ir(lowerer.prims.string_impl)
        .expect("string_impl is a struct");
    let input = function
        .get_nth_param(0)
        .expect("print takes one parameter")
        .into_pointer_value();

    let length_ptr = lowerer.builder.build_struct_gep(string_impl, input, 0, "len")?;
    let length = lowerer
        .builder
        .build_load(context.i64_type(), length_ptr, "len")?;
    let data_ptr = lowerer.builder.build_struct_gep(string_impl, input, 1, "data")?;
    let data = lowerer.builder.build_load(
        context.ptr_type(AddressSpace::default()),
        data_ptr,
        "data",
    )?;

    let asm_type = context.void_type().fn_type(
        &[
            context.ptr_type(AddressSpace::default()).into(),
            context.i64_type().into(),
        ],
        false,
    );
    let write = asm_type.create_inline_asm(
        "movq $0, %rsi; movq $1, %rdx; movq $$0x1, %rax; movq $$0x1, %rdi; syscall",
        "r,r",
        true,
        false,
        None,
        false,
    );
    lowerer
        .builder
        .build_indirect_call(asm_type, write, &[data.into(), length.into()], "write")?;
    lowerer.builder.build_return(None)?;

    lowerer
        .scopes
        .top_mut()
        .insert("print".to_string(), Binding::Function { value: function, ty });
    Ok(())
}
