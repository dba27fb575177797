//! Module catalog
//!
//! The immutable list of module descriptors, built once at startup from a
//! compiled-in TOML catalog or a catalog file. Construction rejects malformed
//! entries and duplicate keys instead of dropping them.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::module::registry::manifest::{ModuleDescriptor, RawModuleDescriptor};
use crate::module::traits::CatalogError;
use crate::module::validation::{ManifestValidator, ValidationResult};

const BUILTIN_CATALOG: &str = include_str!("builtin_catalog.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    modules: Vec<RawModuleDescriptor>,
}

/// Immutable module catalog in registration order
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleCatalog {
    /// Build a catalog from raw descriptors
    ///
    /// Every issue is collected before failing, so one startup run reports the
    /// whole misconfiguration.
    pub fn from_raw(raw: Vec<RawModuleDescriptor>) -> Result<Self, CatalogError> {
        let validator = ManifestValidator::new();
        let mut descriptors = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();
        let mut issues = Vec::new();
        let mut duplicates = Vec::new();

        for (index, entry) in raw.into_iter().enumerate() {
            let Some(descriptor) = entry.canonicalize() else {
                issues.push(format!("entry #{}: neither key nor name is set", index));
                continue;
            };

            if let ValidationResult::Invalid(errors) = validator.validate(&descriptor) {
                for error in errors {
                    issues.push(format!("{}: {}", descriptor.key, error));
                }
                continue;
            }

            if !seen.insert(descriptor.key.clone()) {
                duplicates.push(descriptor.key.clone());
                continue;
            }

            descriptors.push(descriptor);
        }

        if !issues.is_empty() {
            issues.extend(duplicates.iter().map(|k| format!("{}: duplicate key", k)));
            return Err(CatalogError::InvalidEntries(issues));
        }
        if let Some(key) = duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateKey(key));
        }

        debug!("Catalog built with {} modules", descriptors.len());
        Ok(Self { descriptors })
    }

    /// Parse a TOML catalog (`[[modules]]` entries)
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(contents).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_raw(file.modules)
    }

    /// Load a TOML catalog file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CatalogError::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(
            "Loaded catalog with {} modules from {:?}",
            catalog.len(),
            path.as_ref()
        );
        Ok(catalog)
    }

    /// The compiled-in business module catalog
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// All descriptors in registration order
    pub fn list(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
