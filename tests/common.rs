//! Shared fixtures for integration tests

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

use tenant_modules::module::lifecycle::LifecycleOrchestrator;
use tenant_modules::module::registry::{ModuleCatalog, ModuleRegistry, RawModuleDescriptor};
use tenant_modules::module::store::DatabaseModuleStore;
use tenant_modules::storage::database::{Database, DatabaseBackend};
use tenant_modules::storage::Storage;

/// On-disk storage in a temporary directory, removed on drop
pub struct TempStorage {
    pub temp_dir: TempDir,
    pub storage: Storage,
}

impl TempStorage {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let storage = Storage::with_backend(temp_dir.path(), DatabaseBackend::Redb)?;
        Ok(Self { temp_dir, storage })
    }

    pub fn database(&self) -> Arc<dyn Database> {
        self.storage.database()
    }

    /// Close and reopen the database at the same location
    pub fn reopen(self) -> anyhow::Result<Self> {
        let TempStorage { temp_dir, storage } = self;
        drop(storage);
        let storage = Storage::with_backend(temp_dir.path(), DatabaseBackend::Redb)?;
        Ok(Self { temp_dir, storage })
    }

    pub fn orchestrator(&self, catalog: ModuleCatalog) -> anyhow::Result<LifecycleOrchestrator> {
        let registry = Arc::new(ModuleRegistry::new(Arc::new(catalog)));
        let store = Arc::new(DatabaseModuleStore::new(self.database())?);
        Ok(LifecycleOrchestrator::new(registry, store))
    }

    /// Write a JSON document into a tree
    pub fn seed(&self, tree: &str, key: &str, doc: Value) -> anyhow::Result<()> {
        let tree = self.database().open_tree(tree)?;
        tree.insert(key.as_bytes(), doc.to_string().as_bytes())
    }
}

/// Descriptor builder for small test catalogs
pub fn module(key: &str, deps: &[&str]) -> RawModuleDescriptor {
    RawModuleDescriptor {
        key: Some(key.to_string()),
        version: "1.0.0".to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        ..Default::default()
    }
}

pub fn system(key: &str, deps: &[&str]) -> RawModuleDescriptor {
    RawModuleDescriptor {
        is_system: true,
        ..module(key, deps)
    }
}

/// `auth` (system) <- `inventory` <- `pos`
pub fn pos_catalog() -> ModuleCatalog {
    ModuleCatalog::from_raw(vec![
        system("auth", &[]),
        module("inventory", &["auth"]),
        module("pos", &["inventory"]),
    ])
    .expect("valid test catalog")
}
