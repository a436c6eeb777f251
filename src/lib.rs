pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod imports;
pub mod declarations;
pub mod statements;
pub mod symbols;
pub mod module;
pub mod lookup;
pub mod graph;
pub mod context;
pub mod scanner;
pub mod emit;
pub mod config;
pub mod report;
pub mod toolchain;
pub mod embed;

use std::path::Path;

use config::BuildOptions;
use context::BuildContext;
use diagnostics::CoilError;
use lookup::{PythonRuntime, SearchPathProvider};
use report::BuildReport;

/// A combined program and the build state that produced it.
#[derive(Debug)]
pub struct Combined {
    pub source: String,
    pub context: BuildContext,
}

impl Combined {
    pub fn report(&self) -> BuildReport {
        BuildReport::new(&self.context, &self.source)
    }
}

/// What `build_file` writes to its output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Bytecode from `python -m compileall`.
    Bytecode,
    /// The combined source itself.
    Source,
    /// A native executable with the bytecode embedded.
    Executable,
}

/// Resolve every module reachable from `entry` (search directories from the
/// configured interpreter) and fix the emission order.
pub fn resolve(entry: &Path, options: &BuildOptions) -> Result<BuildContext, CoilError> {
    resolve_with_provider(entry, options, &PythonRuntime::new(options.interpreter.clone()))
}

/// Like [`resolve`], with system search directories supplied by `provider`.
pub fn resolve_with_provider(
    entry: &Path,
    options: &BuildOptions,
    provider: &dyn SearchPathProvider,
) -> Result<BuildContext, CoilError> {
    tracing::info!(entry = %entry.display(), mode = %options.mode, "resolving modules");
    let mut ctx = BuildContext::for_entry(entry, options, provider)?;
    scanner::parse(entry, &mut ctx)?;
    ctx.finish()?;
    tracing::info!(
        modules = ctx.graph.len(),
        externals = ctx.externals().count(),
        symbols = ctx.registry.len(),
        "resolution complete"
    );
    Ok(ctx)
}

/// Resolve and emit the combined source for `entry`.
pub fn combine_file(entry: &Path, options: &BuildOptions) -> Result<Combined, CoilError> {
    combine_with_provider(entry, options, &PythonRuntime::new(options.interpreter.clone()))
}

pub fn combine_with_provider(
    entry: &Path,
    options: &BuildOptions,
    provider: &dyn SearchPathProvider,
) -> Result<Combined, CoilError> {
    let context = resolve_with_provider(entry, options, provider)?;
    let source = emit::emit(&context);
    Ok(Combined { source, context })
}

/// Combine `entry` and write the result to `output` in the requested form.
/// Nothing is written if any step fails.
pub fn build_file(
    entry: &Path,
    output: &Path,
    options: &BuildOptions,
    kind: OutputKind,
) -> Result<Combined, CoilError> {
    let combined = combine_file(entry, options)?;
    write_output(&combined.source, output, options, kind)?;
    Ok(combined)
}

/// Write already-combined `source` to `output` in the requested form.
fn write_output(source: &str, output: &Path, options: &BuildOptions, kind: OutputKind) -> Result<(), CoilError> {
    match kind {
        OutputKind::Source => std::fs::write(output, source)
            .map_err(|e| CoilError::io(format!("could not write '{}': {e}", output.display()), output)),
        OutputKind::Bytecode => toolchain::compile_source(source, output, &options.interpreter),
        OutputKind::Executable => {
            let staging = tempfile::tempdir()
                .map_err(|e| CoilError::embed(format!("failed to create temporary directory: {e}")))?;
            let pyc = staging.path().join("program.pyc");
            toolchain::compile_source(source, &pyc, &options.interpreter)?;
            embed::create_executable(&pyc, output, &options.interpreter)
        }
    }
}
