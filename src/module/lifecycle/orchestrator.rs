//! Lifecycle orchestrator
//!
//! Loads a tenant's records, runs a [`LifecyclePlanner`] operation against the
//! snapshot, and writes the snapshot back when it changed. The write outcome is
//! returned alongside the computed result instead of being swallowed.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::module::lifecycle::plan::{LifecyclePlanner, TenantModules, UninstallPolicy};
use crate::module::lifecycle::results::{
    AvailableModule, InstallResult, InstalledModule, Persisted, SuiteResult, UninstallResult,
    WriteOutcome,
};
use crate::module::registry::{canonical_key, ModuleRegistry};
use crate::module::traits::{KeyError, OrganizationModuleRecord, OrganizationModuleStore};

/// Tenant-facing lifecycle API
///
/// Operations for the same organization must not run concurrently; two
/// overlapping writes race and the later one wins.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    registry: Arc<ModuleRegistry>,
    store: Arc<dyn OrganizationModuleStore>,
    uninstall_policy: UninstallPolicy,
}

impl LifecycleOrchestrator {
    pub fn new(registry: Arc<ModuleRegistry>, store: Arc<dyn OrganizationModuleStore>) -> Self {
        Self {
            registry,
            store,
            uninstall_policy: UninstallPolicy::default(),
        }
    }

    pub fn with_uninstall_policy(mut self, policy: UninstallPolicy) -> Self {
        self.uninstall_policy = policy;
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    fn planner(&self) -> LifecyclePlanner<'_> {
        LifecyclePlanner::new(&self.registry).with_uninstall_policy(self.uninstall_policy)
    }

    async fn load(&self, organization_id: &str) -> Result<TenantModules> {
        if organization_id.trim().is_empty() {
            anyhow::bail!("organization id cannot be empty");
        }
        let records = self.store.load(organization_id).await?;
        Ok(TenantModules::from_records(organization_id, records))
    }

    async fn persist(&self, tenant: &TenantModules, changed: bool) -> WriteOutcome {
        if !changed {
            return WriteOutcome::Unchanged;
        }
        match self
            .store
            .save(tenant.organization_id(), &tenant.to_records())
            .await
        {
            Ok(()) => WriteOutcome::Committed,
            Err(e) => {
                warn!(
                    "Failed to persist modules for organization {}: {}",
                    tenant.organization_id(),
                    e
                );
                WriteOutcome::Failed(e.to_string())
            }
        }
    }

    /// Installable modules with the tenant's status
    pub async fn list_available(&self, organization_id: &str) -> Result<Vec<AvailableModule>> {
        let tenant = self.load(organization_id).await?;
        Ok(self.planner().available(&tenant))
    }

    /// Installed modules, system modules included as implicit entries
    pub async fn list_installed(&self, organization_id: &str) -> Result<Vec<InstalledModule>> {
        let tenant = self.load(organization_id).await?;
        Ok(self.planner().installed(&tenant))
    }

    pub async fn install<S: AsRef<str> + Sync>(
        &self,
        organization_id: &str,
        keys: &[S],
    ) -> Result<Persisted<InstallResult>> {
        let mut tenant = self.load(organization_id).await?;
        let result = self.planner().install(&mut tenant, keys);
        info!(
            "Install for {}: {} installed, {} already installed, {} errors",
            organization_id,
            result.installed_keys.len(),
            result.already_installed_keys.len(),
            result.errors.len()
        );
        let write = self.persist(&tenant, result.changed()).await;
        Ok(Persisted { result, write })
    }

    pub async fn uninstall<S: AsRef<str> + Sync>(
        &self,
        organization_id: &str,
        keys: &[S],
    ) -> Result<Persisted<UninstallResult>> {
        let mut tenant = self.load(organization_id).await?;
        let result = self.planner().uninstall(&mut tenant, keys);
        info!(
            "Uninstall for {}: {} uninstalled, {} blocked, {} errors",
            organization_id,
            result.uninstalled_keys.len(),
            result.blockers.len(),
            result.errors.len()
        );
        let write = self.persist(&tenant, result.changed()).await;
        Ok(Persisted { result, write })
    }

    pub async fn install_suite(
        &self,
        organization_id: &str,
        suite: &str,
    ) -> Result<Persisted<SuiteResult>> {
        let mut tenant = self.load(organization_id).await?;
        let result = self.planner().install_suite(&mut tenant, suite);
        info!(
            "Suite {} installed for {}: {} changed, {} skipped",
            result.suite,
            organization_id,
            result.installed.len(),
            result.skipped.len()
        );
        let write = self.persist(&tenant, result.changed()).await;
        Ok(Persisted { result, write })
    }

    pub async fn uninstall_suite(
        &self,
        organization_id: &str,
        suite: &str,
    ) -> Result<Persisted<SuiteResult>> {
        let mut tenant = self.load(organization_id).await?;
        let result = self.planner().uninstall_suite(&mut tenant, suite);
        info!(
            "Suite {} uninstalled for {}: {} changed, {} blocked",
            result.suite,
            organization_id,
            result.installed.len(),
            result.blockers.len()
        );
        let write = self.persist(&tenant, result.changed()).await;
        Ok(Persisted { result, write })
    }

    /// Store settings for an installed module
    ///
    /// The inner `Err` is a per-key refusal; the outer error means the tenant
    /// state could not be loaded.
    pub async fn configure(
        &self,
        organization_id: &str,
        key: &str,
        settings: serde_json::Value,
    ) -> Result<Persisted<std::result::Result<OrganizationModuleRecord, KeyError>>> {
        let mut tenant = self.load(organization_id).await?;
        let before = tenant.get(&canonical_key(key)).cloned();
        let result = self.planner().configure(&mut tenant, key, settings);
        let changed = match result {
            Ok(ref record) => {
                debug!("Configured {} for {}", record.key, organization_id);
                before.as_ref() != Some(record)
            }
            Err(ref e) => {
                debug!("Configure refused for {}: {}", organization_id, e);
                false
            }
        };
        let write = self.persist(&tenant, changed).await;
        Ok(Persisted { result, write })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::ModuleCatalog;
    use crate::module::store::MemoryModuleStore;
    use crate::module::traits::ModuleStatus;
    use async_trait::async_trait;

    fn orchestrator(store: Arc<dyn OrganizationModuleStore>) -> LifecycleOrchestrator {
        let catalog = Arc::new(ModuleCatalog::builtin().unwrap());
        LifecycleOrchestrator::new(Arc::new(ModuleRegistry::new(catalog)), store)
    }

    struct FailingStore;

    #[async_trait]
    impl OrganizationModuleStore for FailingStore {
        async fn load(&self, _organization_id: &str) -> Result<Vec<OrganizationModuleRecord>> {
            Ok(Vec::new())
        }

        async fn save(&self, _organization_id: &str, _records: &[OrganizationModuleRecord]) -> Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }

        async fn upsert(
            &self,
            _record: &OrganizationModuleRecord,
        ) -> Result<crate::module::traits::UpsertOutcome> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_install_commits_once() {
        let store = Arc::new(MemoryModuleStore::new());
        let orchestrator = orchestrator(store.clone());

        let first = orchestrator.install("org1", &["inventory"]).await.unwrap();
        assert_eq!(first.write, WriteOutcome::Committed);
        assert_eq!(
            first.result.installed_keys,
            vec!["products", "warehouses", "inventory"]
        );

        let second = orchestrator.install("org1", &["inventory"]).await.unwrap();
        assert_eq!(second.write, WriteOutcome::Unchanged);
        assert!(second.result.installed_keys.is_empty());
        assert_eq!(store.load("org1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let orchestrator = orchestrator(Arc::new(FailingStore));
        let persisted = orchestrator.install("org1", &["products"]).await.unwrap();
        assert_eq!(persisted.result.installed_keys, vec!["products"]);
        assert!(matches!(persisted.write, WriteOutcome::Failed(ref reason) if reason == "disk full"));
    }

    #[tokio::test]
    async fn test_empty_organization_is_rejected() {
        let orchestrator = orchestrator(Arc::new(MemoryModuleStore::new()));
        assert!(orchestrator.install(" ", &["products"]).await.is_err());
    }

    #[tokio::test]
    async fn test_configure_persists_settings() {
        let store = Arc::new(MemoryModuleStore::new());
        let orchestrator = orchestrator(store.clone());
        orchestrator.install("org1", &["pos"]).await.unwrap();

        let persisted = orchestrator
            .configure("org1", "pos", serde_json::json!({ "registers": 2 }))
            .await
            .unwrap();
        assert_eq!(persisted.write, WriteOutcome::Committed);
        let record = persisted.result.unwrap();
        assert_eq!(record.status, ModuleStatus::Configured);

        let refused = orchestrator
            .configure("org1", "payroll", serde_json::json!({}))
            .await
            .unwrap();
        assert!(refused.result.is_err());
        assert_eq!(refused.write, WriteOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_configure_with_same_settings_is_unchanged() {
        let store = Arc::new(MemoryModuleStore::new());
        let orchestrator = orchestrator(store.clone());
        orchestrator.install("org1", &["pos"]).await.unwrap();

        let settings = serde_json::json!({ "registers": 2 });
        let first = orchestrator.configure("org1", "pos", settings.clone()).await.unwrap();
        assert_eq!(first.write, WriteOutcome::Committed);

        let again = orchestrator.configure("org1", "POS", settings).await.unwrap();
        assert_eq!(again.write, WriteOutcome::Unchanged);
        assert_eq!(again.result.unwrap(), first.result.unwrap());

        let updated = orchestrator
            .configure("org1", "pos", serde_json::json!({ "registers": 3 }))
            .await
            .unwrap();
        assert_eq!(updated.write, WriteOutcome::Committed);
    }
}
