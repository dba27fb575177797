//! Module descriptors
//!
//! A raw descriptor is what a catalog source declares; a `ModuleDescriptor` is
//! the immutable, canonicalized entry the rest of the system works with.

use serde::{Deserialize, Serialize};

/// Catalog entry as declared in configuration
///
/// `key` falls back to `name` when absent; the fallback is resolved once by
/// [`RawModuleDescriptor::canonicalize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RawModuleDescriptor {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Keys of modules required for full operation, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub suite: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub is_system: bool,
    /// Defaults to `!is_system`
    #[serde(default)]
    pub is_installable: Option<bool>,
    #[serde(default)]
    pub setup_wizard: Option<serde_json::Value>,
    #[serde(default)]
    pub settings_schema: Option<serde_json::Value>,
}

/// Canonical form of a key or suite name: trimmed and lowercased
pub fn canonical_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl RawModuleDescriptor {
    /// Resolve the canonical key and defaults
    ///
    /// Returns `None` when neither `key` nor `name` carries a usable value.
    pub fn canonicalize(self) -> Option<ModuleDescriptor> {
        let key = self
            .key
            .as_deref()
            .map(canonical_key)
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.name
                    .as_deref()
                    .map(canonical_key)
                    .filter(|k| !k.is_empty())
            })?;

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| key.clone());

        // Dependencies keep declaration order; repeats are dropped
        let mut dependencies: Vec<String> = Vec::with_capacity(self.dependencies.len());
        for dep in &self.dependencies {
            let dep = canonical_key(dep);
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        Some(ModuleDescriptor {
            is_installable: self.is_installable.unwrap_or(!self.is_system),
            key,
            name,
            version: self.version.trim().to_string(),
            description: self.description,
            dependencies,
            category: self.category,
            suite: self
                .suite
                .as_deref()
                .map(canonical_key)
                .filter(|s| !s.is_empty()),
            tags: self.tags,
            order: self.order,
            is_system: self.is_system,
            setup_wizard: self.setup_wizard,
            settings_schema: self.settings_schema,
        })
    }
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub key: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub category: Option<String>,
    pub suite: Option<String>,
    pub tags: Vec<String>,
    pub order: Option<i64>,
    pub is_system: bool,
    pub is_installable: bool,
    pub setup_wizard: Option<serde_json::Value>,
    pub settings_schema: Option<serde_json::Value>,
}

impl ModuleDescriptor {
    /// Whether a tenant may choose this module
    pub fn is_user_installable(&self) -> bool {
        !self.is_system && self.is_installable
    }

    /// Whether a fresh install must wait for tenant settings
    pub fn requires_setup(&self) -> bool {
        self.setup_wizard.is_some()
    }

    /// Whether this module declares a direct dependency on `key`
    pub fn depends_on(&self, key: &str) -> bool {
        self.dependencies.iter().any(|d| d == key)
    }
}
