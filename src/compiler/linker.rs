//! Linker — hands the emitted IR text to clang.
//!
//! Executables are linked `-nostdlib` with `_tawa_main` as the entry
//! point; shared libraries get `-shared -no-pie` and no entry. Each
//! `--force-import` argument is passed through as a link input.

use std::path::Path;
use std::process::Command;

use crate::errors::{self, Phase};

pub fn link(ir_path: &Path, output_path: &Path, library: bool, force_imports: &[String]) {
    let mut command = Command::new("clang");
    command.arg("-nostdlib").arg("-o").arg(output_path);

    for lib in force_imports {
        command.arg(lib);
    }

    if library {
        command.arg("-shared").arg("-no-pie");
    } else {
        command.arg("-Wl,-e,_tawa_main");
    }

    command.arg(ir_path);

    match command.status() {
        Ok(status) if status.success() => {}
        Ok(status) => errors::fatal(Phase::Linker, format!("clang exited with {status}")),
        Err(e) => errors::fatal(Phase::Linker, format!("could not run clang: {e}")),
    }
}
