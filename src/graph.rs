//! Module dependency graph. Nodes live in an arena indexed by [`ModuleId`];
//! edges point from an importing module to the modules it imports.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::CoilError;
use crate::module::ModuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub usize);

#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub module: ModuleContext,
    pub neighbors: Vec<ModuleId>,
}

/// What to do when the import graph contains a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Fail the build with the offending chain.
    #[default]
    Reject,
    /// Drop the back edge and keep going.
    Break,
}

impl FromStr for CyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(CyclePolicy::Reject),
            "break" => Ok(CyclePolicy::Break),
            other => Err(format!("unknown cycle policy '{other}' (expected 'reject' or 'break')")),
        }
    }
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePolicy::Reject => write!(f, "reject"),
            CyclePolicy::Break => write!(f, "break"),
        }
    }
}

/// An import edge ignored to make the graph acyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenEdge {
    pub from: ModuleId,
    pub to: ModuleId,
}

/// Emission order: every module after the modules it imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    pub modules: Vec<ModuleId>,
    pub broken: Vec<BrokenEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    by_path: HashMap<PathBuf, ModuleId>,
    by_name: HashMap<String, ModuleId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a module, or return the existing node for its path.
    pub fn add_node(&mut self, module: ModuleContext) -> ModuleId {
        if let Some(&id) = self.by_path.get(&module.full_path) {
            return id;
        }
        let id = ModuleId(self.nodes.len());
        self.by_path.insert(module.full_path.clone(), id);
        self.by_name.entry(module.name.clone()).or_insert(id);
        self.nodes.push(DependencyNode { module, neighbors: Vec::new() });
        id
    }

    /// Make `id` reachable under an additional import name.
    pub fn register_name(&mut self, name: &str, id: ModuleId) {
        self.by_name.entry(name.to_string()).or_insert(id);
    }

    pub fn find_by_name(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    pub fn module(&self, id: ModuleId) -> &ModuleContext {
        &self.nodes[id.0].module
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut ModuleContext {
        &mut self.nodes[id.0].module
    }

    pub fn node(&self, id: ModuleId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    /// Modules in insertion (first-parsed) order.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &ModuleContext)> {
        self.nodes.iter().enumerate().map(|(i, n)| (ModuleId(i), &n.module))
    }

    /// Wire edges from each module to the nodes of its dependencies. Names
    /// are matched against import names first, then namespaces.
    pub fn discover_neighbors(&mut self) {
        for i in 0..self.nodes.len() {
            let mut neighbors = Vec::new();
            for dep in &self.nodes[i].module.dependencies {
                let target = self.by_name.get(dep).copied().or_else(|| {
                    self.nodes.iter().position(|n| &n.module.namespace == dep).map(ModuleId)
                });
                match target {
                    Some(target) if target.0 != i && !neighbors.contains(&target) => neighbors.push(target),
                    Some(_) => {}
                    None => tracing::debug!(module = %self.nodes[i].module.name, dep = %dep, "dependency has no node"),
                }
            }
            self.nodes[i].neighbors = neighbors;
        }
    }

    /// Depth-first post-order over every node in insertion order, neighbors
    /// before the node itself. A back edge is a cycle and is handled per `policy`.
    pub fn ordered_nodes(&self, policy: CyclePolicy) -> Result<Ordering, CoilError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut ordering = Ordering::default();
        let mut stack: Vec<(ModuleId, usize)> = Vec::new();

        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::Visiting;
            stack.push((ModuleId(root), 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let next = self.nodes[node.0].neighbors.get(frame.1).copied();
                frame.1 += 1;

                let Some(next) = next else {
                    marks[node.0] = Mark::Done;
                    ordering.modules.push(node);
                    stack.pop();
                    continue;
                };

                match marks[next.0] {
                    Mark::Unvisited => {
                        marks[next.0] = Mark::Visiting;
                        stack.push((next, 0));
                    }
                    Mark::Visiting => match policy {
                        CyclePolicy::Reject => return Err(CoilError::circular_import(self.cycle_chain(&stack, next))),
                        CyclePolicy::Break => {
                            tracing::warn!(
                                from = %self.module(node).name,
                                to = %self.module(next).name,
                                "breaking circular import"
                            );
                            ordering.broken.push(BrokenEdge { from: node, to: next });
                        }
                    },
                    Mark::Done => {}
                }
            }
        }

        tracing::debug!(order = ?ordering.modules.iter().map(|id| &self.module(*id).name).collect::<Vec<_>>(), "emission order");
        Ok(ordering)
    }

    fn cycle_chain(&self, stack: &[(ModuleId, usize)], back_to: ModuleId) -> Vec<String> {
        let start = stack.iter().position(|(id, _)| *id == back_to).unwrap_or(0);
        stack[start..]
            .iter()
            .map(|(id, _)| self.module(*id).name.clone())
            .chain(std::iter::once(self.module(back_to).name.clone()))
            .collect()
    }
}
