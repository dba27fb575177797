//! Registry query service
//!
//! Read-only views over the catalog, built once and shared by the lifecycle
//! orchestrator. Lookups normalize caller-supplied keys the same way the
//! catalog does, so callers never re-derive the key/name fallback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::module::registry::catalog::ModuleCatalog;
use crate::module::registry::manifest::{canonical_key, ModuleDescriptor};

/// A named bundle of modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    /// Member keys in registration order
    pub members: Vec<String>,
}

/// Borrowed view of the registry's key index
///
/// Keys are canonical; use [`ModuleRegistry::get`] for caller-supplied keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyIndex<'a> {
    index: &'a HashMap<String, usize>,
    modules: &'a [ModuleDescriptor],
}

impl<'a> KeyIndex<'a> {
    pub fn get(&self, key: &str) -> Option<&'a ModuleDescriptor> {
        self.index.get(key).and_then(|i| self.modules.get(*i))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a ModuleDescriptor)> + 'a {
        let (index, modules) = (self.index, self.modules);
        index
            .iter()
            .filter_map(move |(key, i)| modules.get(*i).map(|m| (key.as_str(), m)))
    }
}

/// Read-only registry views
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    catalog: Arc<ModuleCatalog>,
    by_key: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Build the lookup structures for a catalog
    pub fn new(catalog: Arc<ModuleCatalog>) -> Self {
        let by_key = catalog
            .list()
            .iter()
            .enumerate()
            .map(|(index, module)| (module.key.clone(), index))
            .collect();
        Self { catalog, by_key }
    }

    /// Underlying catalog
    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// All modules in registration order
    pub fn all_modules(&self) -> &[ModuleDescriptor] {
        self.catalog.list()
    }

    /// Modules a tenant may choose (neither system nor flagged non-installable)
    pub fn installable_modules(&self) -> Vec<&ModuleDescriptor> {
        self.catalog
            .list()
            .iter()
            .filter(|m| m.is_user_installable())
            .collect()
    }

    /// Key to descriptor index, built once in [`ModuleRegistry::new`]
    pub fn by_key(&self) -> KeyIndex<'_> {
        KeyIndex {
            index: &self.by_key,
            modules: self.catalog.list(),
        }
    }

    /// Look up one module; `key` may use any casing or surrounding whitespace
    pub fn get(&self, key: &str) -> Option<&ModuleDescriptor> {
        let index = match self.by_key.get(key) {
            Some(index) => *index,
            None => *self.by_key.get(&canonical_key(key))?,
        };
        self.catalog.list().get(index)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Member keys of a suite, in registration order
    pub fn suite_members(&self, suite: &str) -> Vec<&str> {
        let suite = canonical_key(suite);
        self.catalog
            .list()
            .iter()
            .filter(|m| m.suite.as_deref() == Some(suite.as_str()))
            .map(|m| m.key.as_str())
            .collect()
    }

    /// Every suite, ordered by first appearance; members ordered by `order`
    /// hint then registration order
    pub fn suites(&self) -> Vec<Suite> {
        let mut suites: Vec<Suite> = Vec::new();
        for module in self.catalog.list() {
            let Some(ref name) = module.suite else {
                continue;
            };
            match suites.iter_mut().find(|s| &s.name == name) {
                Some(suite) => suite.members.push(module.key.clone()),
                None => suites.push(Suite {
                    name: name.clone(),
                    members: vec![module.key.clone()],
                }),
            }
        }
        for suite in &mut suites {
            // Stable sort keeps registration order among equal hints
            suite.members.sort_by_key(|key| {
                self.get(key)
                    .and_then(|m| m.order)
                    .unwrap_or(i64::MAX)
            });
        }
        suites
    }

    /// Installed modules (other than `key` itself) that declare a direct
    /// dependency on `key`
    pub fn dependents_of<'a, I>(&self, key: &str, installed: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        installed
            .into_iter()
            .filter(|candidate| *candidate != key)
            .filter(|candidate| self.get(candidate).map_or(false, |m| m.depends_on(key)))
            .map(str::to_string)
            .collect()
    }
}
