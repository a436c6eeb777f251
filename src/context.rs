use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::config::{BuildOptions, WildcardPolicy};
use crate::diagnostics::{CoilError, Diagnostic};
use crate::graph::{CyclePolicy, DependencyGraph, ModuleId, Ordering};
use crate::lookup::{self, LookupTable, SearchPathProvider};
use crate::symbols::SymbolRegistry;

/// State shared by every step of one build. Created once, filled in while
/// modules are scanned, then read by the emitter.
#[derive(Debug)]
pub struct BuildContext {
    pub lookup_table: LookupTable,
    visited: HashSet<String>,
    externals: IndexSet<String>,
    /// `from __future__ import ...` clauses, rendered, first-seen order.
    futures: IndexSet<String>,
    /// Names bound at module scope by external from-imports and aliases:
    /// name -> (target, binding module).
    external_names: HashMap<String, (String, ModuleId)>,
    pub registry: SymbolRegistry,
    pub graph: DependencyGraph,
    namespaces: HashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub wildcard: WildcardPolicy,
    pub cycles: CyclePolicy,
    order: Option<Ordering>,
}

impl BuildContext {
    pub fn new(lookup_table: LookupTable) -> Self {
        Self {
            lookup_table,
            visited: HashSet::new(),
            externals: IndexSet::new(),
            futures: IndexSet::new(),
            external_names: HashMap::new(),
            registry: SymbolRegistry::new(),
            graph: DependencyGraph::new(),
            namespaces: HashSet::new(),
            diagnostics: Vec::new(),
            wildcard: WildcardPolicy::default(),
            cycles: CyclePolicy::default(),
            order: None,
        }
    }

    /// Seed a context for building `entry`: the lookup table covers the entry
    /// file's directory, then the configured paths, then (in `All` mode) the
    /// provider's directories.
    pub fn for_entry(
        entry: &Path,
        options: &BuildOptions,
        provider: &dyn SearchPathProvider,
    ) -> Result<Self, CoilError> {
        let entry_dir = lookup::canonical(entry)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut local_paths = vec![entry_dir];
        local_paths.extend(options.paths.iter().cloned());

        let mut diagnostics = Vec::new();
        let lookup_table = lookup::build_lookup_table(&local_paths, options.mode, provider, &mut diagnostics)?;

        let mut ctx = Self::new(lookup_table);
        ctx.diagnostics = diagnostics;
        ctx.wildcard = options.wildcard;
        ctx.cycles = options.cycles;
        Ok(ctx)
    }

    pub fn is_visited(&self, module: &str) -> bool {
        self.visited.contains(module)
    }

    pub fn mark_visited(&mut self, module: &str) {
        self.visited.insert(module.to_string());
    }

    pub fn find_source(&self, module: &str) -> Option<&PathBuf> {
        self.lookup_table.get(module)
    }

    /// Record an import that is satisfied outside the program. Returns false
    /// if it was already known.
    pub fn add_external(&mut self, module: &str) -> bool {
        let added = self.externals.insert(module.to_string());
        if added {
            tracing::debug!(module, "external dependency");
        }
        added
    }

    pub fn is_external(&self, module: &str) -> bool {
        self.externals.contains(module)
    }

    /// External modules in first-seen order.
    pub fn externals(&self) -> impl Iterator<Item = &str> {
        self.externals.iter().map(String::as_str)
    }

    /// Record a `from __future__ import ...` clause. Every module's directives
    /// move to the top of the combined file.
    pub fn add_future(&mut self, clause: String) {
        self.futures.insert(clause);
    }

    pub fn futures(&self) -> impl Iterator<Item = &str> {
        self.futures.iter().map(String::as_str)
    }

    /// Record that module `id` binds `name` to the external `target`. Modules
    /// share one scope once combined, so another module binding `name` to a
    /// different target is reported.
    pub fn bind_external_name(&mut self, id: ModuleId, name: &str, target: String, path: &Path, line: usize) {
        match self.external_names.get(name).cloned() {
            Some((existing, owner)) if owner != id && existing != target => {
                let owner = self.graph.module(owner).name.clone();
                self.warn(Diagnostic::at(
                    format!("'{name}' is bound to '{target}' here but to '{existing}' in '{owner}'; the combined file keeps whichever runs last"),
                    path,
                    line,
                ));
            }
            Some(_) => {}
            None => {
                self.external_names.insert(name.to_string(), (target, id));
            }
        }
    }

    /// Claim `base` as a namespace, suffixing `_2`, `_3`, ... if taken.
    pub fn unique_namespace(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.namespaces.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.namespaces.insert(candidate.clone());
        candidate
    }

    /// Register a module-level declaration in both the module's table and the
    /// build-wide registry.
    pub fn declare(&mut self, id: ModuleId, name: &str) {
        let module = self.graph.module_mut(id);
        let namespace = module.namespace.clone();
        let qualified = module.symbols.declare(&namespace, name);
        self.registry.register(&qualified);
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(path = ?diagnostic.path, line = ?diagnostic.line, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Link the graph and fix the emission order. Called once scanning is done.
    pub fn finish(&mut self) -> Result<(), CoilError> {
        self.graph.discover_neighbors();
        let ordering = self.graph.ordered_nodes(self.cycles)?;
        for edge in &ordering.broken {
            let from = self.graph.module(edge.from);
            let to = self.graph.module(edge.to);
            let diagnostic = Diagnostic::in_path(
                format!("circular import '{}' -> '{}' ignored; '{}' is emitted first", from.name, to.name, to.name),
                &from.full_path,
            );
            self.diagnostics.push(diagnostic);
        }
        self.order = Some(ordering);
        Ok(())
    }

    /// Modules in emission order. Empty until [`finish`](Self::finish) succeeds.
    pub fn emission_order(&self) -> &[ModuleId] {
        self.order.as_ref().map(|o| o.modules.as_slice()).unwrap_or(&[])
    }
}
