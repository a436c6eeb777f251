//! Bytecode compilation of the combined source with the host interpreter.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::diagnostics::CoilError;

/// Compile `source` to a `.pyc` at `output` using `interpreter -m compileall`.
pub fn compile_source(source: &str, output: &Path, interpreter: &str) -> Result<(), CoilError> {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("combined");

    let dir = tempfile::tempdir()
        .map_err(|e| CoilError::toolchain(format!("failed to create temporary directory: {e}")))?;
    let source_path = dir.path().join(format!("{stem}.py"));
    fs::write(&source_path, source).map_err(|e| {
        CoilError::io(format!("could not write '{}': {e}", source_path.display()), &source_path)
    })?;

    tracing::info!(interpreter, "compiling combined source");
    let result = Command::new(interpreter)
        .args(["-m", "compileall", "-b", "-q"])
        .arg(dir.path())
        .output()
        .map_err(|e| CoilError::toolchain(format!("failed to run '{interpreter}': {e}")))?;
    if !result.status.success() {
        let mut log = String::from_utf8_lossy(&result.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&result.stderr));
        return Err(CoilError::toolchain(format!("compilation failed:\n{}", log.trim_end())));
    }

    let compiled = dir.path().join(format!("{stem}.pyc"));
    fs::copy(&compiled, output).map_err(|e| {
        CoilError::io(format!("could not write '{}': {e}", output.display()), output)
    })?;
    Ok(())
}

/// Whether `interpreter` can be started at all.
pub fn interpreter_available(interpreter: &str) -> bool {
    Command::new(interpreter)
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}
