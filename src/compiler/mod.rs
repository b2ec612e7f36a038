/// LLVM-backed compiler — lowers the AST to native code via Inkwell.
pub mod codegen;
pub mod compiler;
pub mod linker;
pub mod typeinfo;

pub use codegen::Settings;
pub use compiler::Compiler;
