//! In-memory organization module store

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::module::traits::{OrganizationModuleRecord, OrganizationModuleStore, UpsertOutcome};

/// Records grouped by organization, each group ordered by key
#[derive(Default)]
pub struct MemoryModuleStore {
    organizations: RwLock<HashMap<String, BTreeMap<String, OrganizationModuleRecord>>>,
}

impl MemoryModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of organizations with at least one record
    pub async fn organization_count(&self) -> usize {
        self.organizations
            .read()
            .await
            .values()
            .filter(|records| !records.is_empty())
            .count()
    }
}

#[async_trait]
impl OrganizationModuleStore for MemoryModuleStore {
    async fn load(&self, organization_id: &str) -> Result<Vec<OrganizationModuleRecord>> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save(&self, organization_id: &str, records: &[OrganizationModuleRecord]) -> Result<()> {
        let replacement = records
            .iter()
            .map(|record| (record.key.clone(), record.clone()))
            .collect();
        self.organizations
            .write()
            .await
            .insert(organization_id.to_string(), replacement);
        Ok(())
    }

    async fn upsert(&self, record: &OrganizationModuleRecord) -> Result<UpsertOutcome> {
        let mut organizations = self.organizations.write().await;
        let records = organizations
            .entry(record.organization_id.clone())
            .or_default();
        let outcome = match records.get(&record.key) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing == record => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Modified,
        };
        records.insert(record.key.clone(), record.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::traits::ModuleStatus;

    #[tokio::test]
    async fn test_save_replaces_organization_records() {
        let store = MemoryModuleStore::new();
        let a = OrganizationModuleRecord::new("org1", "sales", ModuleStatus::Configured);
        let b = OrganizationModuleRecord::new("org1", "pos", ModuleStatus::EnabledUnconfigured);
        store.save("org1", &[a.clone(), b]).await.unwrap();
        store.save("org1", &[a.clone()]).await.unwrap();

        assert_eq!(store.load("org1").await.unwrap(), vec![a]);
        assert!(store.load("org2").await.unwrap().is_empty());
        assert_eq!(store.organization_count().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_outcomes() {
        let store = MemoryModuleStore::new();
        let record = OrganizationModuleRecord::new("org1", "sales", ModuleStatus::EnabledUnconfigured);
        assert_eq!(store.upsert(&record).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&record).await.unwrap(), UpsertOutcome::Unchanged);

        let configured = OrganizationModuleRecord::new("org1", "sales", ModuleStatus::Configured);
        assert_eq!(store.upsert(&configured).await.unwrap(), UpsertOutcome::Modified);
        assert_eq!(store.load("org1").await.unwrap(), vec![configured]);
    }
}
