//! Module dependency graph
//!
//! Boot-time diagnostics over the catalog: cycle detection and dangling
//! dependency reporting. Validation never fails startup on its own; the
//! lifecycle resolver guards its own walk independently.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::module::registry::catalog::ModuleCatalog;

/// A dependency that names no module in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    /// Module declaring the dependency
    pub module: String,
    /// Key that does not resolve
    pub dependency: String,
}

/// Graph validation result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphValidation {
    /// Each cycle as the key path from its entry point back to the closing key
    pub cycles: Vec<Vec<String>>,
    /// Dangling edges, in catalog order
    pub missing: Vec<MissingDependency>,
}

impl GraphValidation {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.missing.is_empty()
    }
}

/// Key-keyed adjacency view of the catalog (`A -> B` means A depends on B)
pub struct ModuleDependencies<'a> {
    order: Vec<&'a str>,
    edges: HashMap<&'a str, &'a [String]>,
}

impl<'a> ModuleDependencies<'a> {
    /// Build the adjacency map
    pub fn new(catalog: &'a ModuleCatalog) -> Self {
        let mut order = Vec::with_capacity(catalog.len());
        let mut edges = HashMap::with_capacity(catalog.len());
        for module in catalog.list() {
            order.push(module.key.as_str());
            edges.insert(module.key.as_str(), module.dependencies.as_slice());
        }
        Self { order, edges }
    }

    /// Detect every cycle and dangling dependency
    pub fn validate(&self) -> GraphValidation {
        let mut result = GraphValidation::default();

        for key in &self.order {
            for dep in self.edges.get(key).copied().unwrap_or_default() {
                if !self.edges.contains_key(dep.as_str()) {
                    result.missing.push(MissingDependency {
                        module: (*key).to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut visiting: HashSet<&str> = HashSet::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = Vec::new();

        for &key in &self.order {
            if !visited.contains(key) {
                self.visit(key, &mut visiting, &mut visited, &mut path, &mut result.cycles);
            }
        }

        for cycle in &result.cycles {
            warn!("Dependency cycle detected: {}", cycle.join(" -> "));
        }
        for missing in &result.missing {
            warn!(
                "Module {} depends on unknown module {}",
                missing.module, missing.dependency
            );
        }
        debug!(
            "Graph validation complete: {} cycles, {} dangling dependencies",
            result.cycles.len(),
            result.missing.len()
        );

        result
    }

    /// Three-color DFS step
    fn visit(
        &self,
        key: &'a str,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visiting.insert(key);
        path.push(key);

        for dep in self.edges.get(key).copied().unwrap_or_default() {
            let Some((&dep, _)) = self.edges.get_key_value(dep.as_str()) else {
                continue;
            };
            if visiting.contains(dep) {
                if let Some(start) = path.iter().position(|k| *k == dep) {
                    cycles.push(path[start..].iter().map(|k| k.to_string()).collect());
                }
            } else if !visited.contains(dep) {
                self.visit(dep, visiting, visited, path, cycles);
            }
        }

        path.pop();
        visiting.remove(key);
        visited.insert(key);
    }
}
