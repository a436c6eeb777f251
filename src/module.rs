use std::path::{Path, PathBuf};

use crate::symbols::SymbolTable;

/// Everything known about one source file of the program being combined.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Import name the module was resolved under (`util` for `util.py`).
    pub name: String,
    /// Prefix of every symbol the module declares. Unique per build.
    pub namespace: String,
    /// Canonical absolute path; identity key for deduplication.
    pub full_path: PathBuf,
    /// Text as read when the module was parsed.
    pub source: String,
    pub symbols: SymbolTable,
    /// Locally resolved modules this one imports, in source order.
    pub dependencies: Vec<String>,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, full_path: PathBuf, source: String) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            full_path,
            source,
            symbols: SymbolTable::new(),
            dependencies: Vec::new(),
        }
    }

    /// Record a dependency on `module`, ignoring repeats and self-imports.
    pub fn add_dependency(&mut self, module: &str) {
        if module != self.name && !self.dependencies.iter().any(|d| d == module) {
            self.dependencies.push(module.to_string());
        }
    }

    /// File name for the emitted marker comment.
    pub fn file_name(&self) -> String {
        self.full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The name a file is imported under: its stem, or the package directory
/// name for `pkg/__init__.py`.
pub fn module_name(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    if stem == "__init__" {
        if let Some(dir) = path.parent().and_then(Path::file_name) {
            return dir.to_string_lossy().into_owned();
        }
    }
    stem
}

/// A valid Python identifier derived from a module name: non-identifier
/// characters dropped, `_` prefixed before a leading digit, `_module` if
/// nothing remains.
pub fn derive_namespace(module_name: &str) -> String {
    let mut namespace: String = module_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if namespace.is_empty() {
        return "_module".to_string();
    }
    if namespace.starts_with(|c: char| c.is_ascii_digit()) {
        namespace.insert(0, '_');
    }
    namespace
}
