use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{CoilError, Diagnostic};

/// Importable module name -> absolute source path.
pub type LookupTable = BTreeMap<String, PathBuf>;

/// Which directories are indexed for importable modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Entry directory and configured project paths only.
    #[default]
    #[serde(alias = "user")]
    Local,
    /// Local paths plus the interpreter's own search path.
    All,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "user" => Ok(SearchMode::Local),
            "all" => Ok(SearchMode::All),
            other => Err(format!("unknown search mode '{other}' (expected 'local' or 'all')")),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Local => write!(f, "local"),
            SearchMode::All => write!(f, "all"),
        }
    }
}

/// Supplies the host runtime's module search directories.
pub trait SearchPathProvider {
    fn search_paths(&self) -> Result<Vec<PathBuf>, CoilError>;
}

/// Asks a Python interpreter for its `sys.path`.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    pub interpreter: String,
}

impl PythonRuntime {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self { interpreter: interpreter.into() }
    }
}

impl SearchPathProvider for PythonRuntime {
    fn search_paths(&self) -> Result<Vec<PathBuf>, CoilError> {
        let output = std::process::Command::new(&self.interpreter)
            .arg("-c")
            .arg("import sys\nfor p in sys.path: print(p)")
            .output()
            .map_err(|e| CoilError::toolchain(format!("failed to run '{}': {e}", self.interpreter)))?;
        if !output.status.success() {
            return Err(CoilError::toolchain(format!(
                "'{}' could not report its search path: {}",
                self.interpreter,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

/// A fixed list of search directories.
#[derive(Debug, Clone, Default)]
pub struct StaticSearchPaths(pub Vec<PathBuf>);

impl SearchPathProvider for StaticSearchPaths {
    fn search_paths(&self) -> Result<Vec<PathBuf>, CoilError> {
        Ok(self.0.clone())
    }
}

const SKIPPED_SUFFIXES: &[&str] = &[".egg", ".egg-info", ".dist-info", ".zip"];

/// Index `local_paths` (and, in `All` mode, the provider's directories after
/// them). The first directory to provide a name wins, matching how the
/// interpreter itself walks its search path.
pub fn build_lookup_table(
    local_paths: &[PathBuf],
    mode: SearchMode,
    provider: &dyn SearchPathProvider,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<LookupTable, CoilError> {
    let mut search_order: Vec<PathBuf> = local_paths.to_vec();
    if mode == SearchMode::All {
        search_order.extend(provider.search_paths()?);
    }

    let mut table = LookupTable::new();
    for dir in &search_order {
        index_directory(dir, &mut table, diagnostics);
    }
    tracing::debug!(mode = %mode, dirs = search_order.len(), modules = table.len(), "lookup table built");
    Ok(table)
}

/// Index one directory level: `*.py` files by stem and packages
/// (directories holding `__init__.py`) by name. Within a directory a package
/// shadows a module of the same name.
fn index_directory(dir: &Path, table: &mut LookupTable, diagnostics: &mut Vec<Diagnostic>) {
    if has_skipped_suffix(dir) || !dir.is_dir() {
        tracing::debug!(path = %dir.display(), "skipping search path entry");
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            let msg = format!("could not read search directory: {e}");
            tracing::warn!(path = %dir.display(), "{msg}");
            diagnostics.push(Diagnostic::in_path(msg, dir));
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    let mut packages = Vec::new();
    let mut modules = Vec::new();
    for path in paths {
        if has_skipped_suffix(&path) {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if path.is_dir() {
            let init = path.join("__init__.py");
            if init.is_file() {
                packages.push((name, init));
            }
        } else if path.extension().is_some_and(|ext| ext == "py") {
            if let Some(stem) = path.file_stem() {
                modules.push((stem.to_string_lossy().into_owned(), path));
            }
        }
    }

    for (name, path) in packages.into_iter().chain(modules) {
        table.entry(name).or_insert_with(|| canonical(&path));
    }
}

fn has_skipped_suffix(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    SKIPPED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Canonical form of `path`, or the path itself if it cannot be resolved.
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
