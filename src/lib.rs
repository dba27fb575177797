//! Tenant Modules - module registry and organization module lifecycle
//!
//! This crate keeps a static catalog of feature modules and tracks, per
//! organization, which of them are installed and configured.
//!
//! ## Components
//!
//! 1. Catalog: immutable descriptors, built once (`module::registry`)
//! 2. Graph validation: boot-time cycle and dangling dependency diagnostics
//! 3. Registry queries: lookups, installable modules, suites
//! 4. Lifecycle orchestrator: install/uninstall/suite/configure per organization
//! 5. Migration: legacy status normalization into the canonical record set
//!
//! ## Design Principles
//!
//! 1. **Explicit state**: the catalog is a value passed to its consumers, never a global
//! 2. **Partial failure**: batch operations report per-key outcomes, never abort
//! 3. **Visible durability**: every mutating result carries its write outcome

pub mod config;
pub mod migration;
pub mod module;
pub mod storage;
pub mod utils;

pub use config::*;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use module::lifecycle::LifecycleOrchestrator;
use module::registry::{GraphValidation, ModuleCatalog, ModuleDependencies, ModuleRegistry};
use module::store::DatabaseModuleStore;
use module::traits::CatalogError;
use storage::Storage;

/// Load the configured catalog and validate its dependency graph
///
/// Graph problems are diagnostics unless `fail_on_cycles` is set, in which case
/// cycles become a startup error.
pub fn load_catalog(config: &CatalogConfig) -> Result<(ModuleCatalog, GraphValidation), CatalogError> {
    let catalog = match config.path {
        Some(ref path) => ModuleCatalog::from_file(path)?,
        None => ModuleCatalog::builtin()?,
    };
    let validation = ModuleDependencies::new(&catalog).validate();
    if !validation.is_acyclic() && config.fail_on_cycles {
        return Err(CatalogError::Cycles(validation.cycles));
    }
    Ok((catalog, validation))
}

/// Assembled service: registry, storage and orchestrator
pub struct TenantModuleService {
    registry: Arc<ModuleRegistry>,
    storage: Storage,
    orchestrator: LifecycleOrchestrator,
    validation: GraphValidation,
}

impl TenantModuleService {
    /// Build the service from configuration
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let storage = match config.storage.database_backend {
            DatabaseBackendConfig::Auto => Storage::new(&config.storage.data_dir)?,
            selected => Storage::with_backend(&config.storage.data_dir, selected.resolve())?,
        };
        Self::with_storage(config, storage)
    }

    /// Build the service over an already opened storage
    pub fn with_storage(config: &ServiceConfig, storage: Storage) -> Result<Self> {
        let (catalog, validation) = load_catalog(&config.catalog)?;
        if !validation.is_clean() {
            warn!(
                "Catalog loaded with {} cycles and {} dangling dependencies",
                validation.cycles.len(),
                validation.missing.len()
            );
        }

        let registry = Arc::new(ModuleRegistry::new(Arc::new(catalog)));
        let store = Arc::new(DatabaseModuleStore::new(storage.database())?);
        let orchestrator = LifecycleOrchestrator::new(Arc::clone(&registry), store)
            .with_uninstall_policy(config.lifecycle.uninstall_policy);

        info!(
            "Tenant module service ready: {} modules, {:?} storage",
            registry.all_modules().len(),
            storage.backend()
        );
        Ok(Self {
            registry,
            storage,
            orchestrator,
            validation,
        })
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &LifecycleOrchestrator {
        &self.orchestrator
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Graph diagnostics from startup
    pub fn validation(&self) -> &GraphValidation {
        &self.validation
    }
}
