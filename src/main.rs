//! Tawa compiler driver.
//!
//! Usage:
//!   tawac init <module-name>      # write a module manifest
//!   tawac build                   # compile the current directory
//!   tawac build --dump            # print LLVM IR and exit
//!   tawac build --library         # produce a shared library
//!
//! Pipeline: source → TokenStream → Parser → AST → LLVM IR → clang →
//! native binary.

mod ast;
mod compiler;
mod errors;
mod lexer;
mod manifest;
mod parser;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser as ClapParser, Subcommand};

use ast::Ast;
use compiler::{Compiler, Settings};
use errors::Phase;
use lexer::TokenStream;
use manifest::Manifest;
use parser::Parser;

#[derive(ClapParser)]
#[command(name = "tawac", about = "Tawa compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialise a module manifest in the current directory.
    Init {
        /// The module's package name.
        name: String,
    },
    /// Compile every Tawa source file in the current directory.
    Build {
        /// Output path (defaults to the package name).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the LLVM IR and exit.
        #[arg(long)]
        dump: bool,
        /// Produce a shared library instead of an executable.
        #[arg(long)]
        library: bool,
        /// Extra objects or libraries handed to the linker.
        #[arg(long = "force-import")]
        force_import: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { name } => init(&name),
        Command::Build {
            output,
            dump,
            library,
            force_import,
        } => build(output, dump, library, &force_import),
    }
}

fn init(name: &str) {
    let manifest = Manifest {
        package: name.to_string(),
    };
    if let Err(e) = manifest.write(Path::new(".")) {
        errors::fatal(Phase::Compiler, e);
    }
    errors::success(format!("initialised module '{name}'"));
}

/// Parse every source file in the directory (non-recursive, in name
/// order) into one AST.
fn parse_directory(dir: &Path) -> Ast {
    let entries = fs::read_dir(dir).unwrap_or_else(|e| {
        errors::fatal(Phase::Parser, format!("could not read {}: {e}", dir.display()))
    });

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(manifest::SOURCE_SUFFIX))
        })
        .collect();
    paths.sort();

    let mut ast = Ast::default();
    for path in paths {
        let source = fs::read_to_string(&path).unwrap_or_else(|e| {
            errors::fatal(Phase::Parser, format!("could not read {}: {e}", path.display()))
        });

        match Parser::new(TokenStream::new(&source)).parse() {
            Ok(parsed) => ast.toplevels.extend(parsed.toplevels),
            Err(err) => {
                errors::report(&err);
                errors::fatal(Phase::Parser, format!("could not compile {}", path.display()));
            }
        }
    }
    ast
}

fn build(output: Option<PathBuf>, dump: bool, library: bool, force_imports: &[String]) {
    let manifest = Manifest::load(Path::new("."))
        .unwrap_or_else(|e| errors::fatal(Phase::Compiler, e));

    let mut output = output.unwrap_or_else(|| PathBuf::from(&manifest.package));
    if library {
        output = PathBuf::from(format!("{}{}", output.display(), manifest::LIBRARY_SUFFIX));
    }

    let ast = parse_directory(Path::new("."));

    let context = inkwell::context::Context::create();
    let compiler = Compiler::new(&context, &manifest.package);
    if let Err(err) = compiler.compile(&ast, &Settings { library }) {
        errors::report(&err);
        std::process::exit(1);
    }

    if dump {
        print!("{}", compiler.ir_string());
        return;
    }

    let ir_path = std::env::temp_dir().join(format!("{}.ll", manifest.package));
    if let Err(e) = compiler.write_ir_file(&ir_path) {
        errors::fatal(
            Phase::Compiler,
            format!("could not write {}: {e}", ir_path.display()),
        );
    }
    errors::info(format!("wrote IR → {}", ir_path.display()));

    compiler::linker::link(&ir_path, &output, library, force_imports);
    errors::success(format!("done → {}", output.display()));
}
