//! Machine-readable summary of a build: what was inlined, in which order,
//! what was left external, and how every symbol was renamed.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::context::BuildContext;
use crate::diagnostics::Diagnostic;

#[derive(Debug, Clone, Serialize)]
pub struct ModuleEntry {
    pub name: String,
    pub namespace: String,
    pub path: PathBuf,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolEntry {
    pub qualified: String,
    pub translated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Modules in emission order.
    pub modules: Vec<ModuleEntry>,
    pub externals: Vec<String>,
    pub symbols: Vec<SymbolEntry>,
    pub diagnostics: Vec<Diagnostic>,
    /// Hex SHA-256 of the combined source.
    pub output_sha256: String,
}

impl BuildReport {
    pub fn new(ctx: &BuildContext, output: &str) -> Self {
        let modules = ctx.emission_order().iter()
            .map(|&id| {
                let module = ctx.graph.module(id);
                ModuleEntry {
                    name: module.name.clone(),
                    namespace: module.namespace.clone(),
                    path: module.full_path.clone(),
                    dependencies: module.dependencies.clone(),
                }
            })
            .collect();
        let symbols = ctx.registry.iter()
            .map(|(qualified, translated)| SymbolEntry {
                qualified: qualified.to_string(),
                translated: translated.to_string(),
            })
            .collect();

        Self {
            modules,
            externals: ctx.externals().map(str::to_string).collect(),
            symbols,
            diagnostics: ctx.diagnostics.clone(),
            output_sha256: sha256_hex(output.as_bytes()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "modules (emission order):");
        for (idx, module) in self.modules.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} [{}] {}", idx + 1, module.name, module.namespace, module.path.display());
            if !module.dependencies.is_empty() {
                let _ = writeln!(out, "       imports: {}", module.dependencies.join(", "));
            }
        }
        if !self.externals.is_empty() {
            let _ = writeln!(out, "external:");
            for external in &self.externals {
                let _ = writeln!(out, "  {external}");
            }
        }
        if !self.symbols.is_empty() {
            let _ = writeln!(out, "symbols:");
            for symbol in &self.symbols {
                let _ = writeln!(out, "  {} -> {}", symbol.qualified, symbol.translated);
            }
        }
        let _ = writeln!(out, "sha256: {}", self.output_sha256);
        out
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
