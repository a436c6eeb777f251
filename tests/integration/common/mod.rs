#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use coiler::config::BuildOptions;
use coiler::lookup::StaticSearchPaths;
use coiler::Combined;
use tempfile::TempDir;

pub fn coiler() -> Command {
    Command::new(env!("CARGO_BIN_EXE_coiler"))
}

/// A temporary project directory holding `files` (relative path, contents).
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), files);
    dir
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, body) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }
}

pub fn entry(dir: &TempDir) -> PathBuf {
    dir.path().join("main.py")
}

/// Combine `main.py` in `dir` with local search only.
pub fn combine_with(dir: &TempDir, options: &BuildOptions) -> Result<Combined, coiler::diagnostics::CoilError> {
    coiler::combine_with_provider(&entry(dir), options, &StaticSearchPaths::default())
}

pub fn combine(files: &[(&str, &str)]) -> String {
    let dir = project(files);
    combine_with(&dir, &BuildOptions::default()).unwrap().source
}

pub fn python_available() -> bool {
    coiler::toolchain::interpreter_available("python3")
}

pub fn cc_available() -> bool {
    Command::new("cc").arg("--version").output().is_ok_and(|o| o.status.success())
}

/// Run a source file with python3 and return its stdout.
pub fn run_python(path: &Path) -> String {
    let output = Command::new("python3").arg(path).output().unwrap();
    assert!(
        output.status.success(),
        "python3 failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}
