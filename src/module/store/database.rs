//! Organization module store over the storage layer
//!
//! Records live in the `organization_modules` tree under the key
//! `<organization_id>\0<module_key>` with JSON values, so one organization's
//! records are a contiguous, key-ordered prefix range.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::module::traits::{OrganizationModuleRecord, OrganizationModuleStore, UpsertOutcome};
use crate::storage::database::{Database, Tree};
use crate::storage::ORGANIZATION_MODULES_TREE;

const SEPARATOR: u8 = 0;

/// Storage key of one `(organization_id, key)` record
pub fn record_key(organization_id: &str, key: &str) -> Vec<u8> {
    let mut bytes = organization_prefix(organization_id);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

fn organization_prefix(organization_id: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(organization_id.len() + 1);
    bytes.extend_from_slice(organization_id.as_bytes());
    bytes.push(SEPARATOR);
    bytes
}

/// Tree-backed organization module store
pub struct DatabaseModuleStore {
    records: Arc<dyn Tree>,
}

impl DatabaseModuleStore {
    /// Open the canonical records tree
    pub fn new(db: Arc<dyn Database>) -> Result<Self> {
        Self::with_tree(db, ORGANIZATION_MODULES_TREE)
    }

    /// Open a store over a specific tree
    pub fn with_tree(db: Arc<dyn Database>, tree: &str) -> Result<Self> {
        let records = Arc::from(db.open_tree(tree)?);
        Ok(Self { records })
    }

    fn decode(bytes: &[u8]) -> Result<OrganizationModuleRecord> {
        serde_json::from_slice(bytes).context("Failed to decode organization module record")
    }

    /// Total number of stored records across organizations
    pub fn len(&self) -> Result<usize> {
        self.records.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.records.is_empty()
    }
}

#[async_trait]
impl OrganizationModuleStore for DatabaseModuleStore {
    async fn load(&self, organization_id: &str) -> Result<Vec<OrganizationModuleRecord>> {
        let prefix = organization_prefix(organization_id);
        let mut records = Vec::new();
        for item in self.records.scan_prefix(&prefix) {
            let (_, value) = item?;
            records.push(Self::decode(&value)?);
        }
        Ok(records)
    }

    async fn save(&self, organization_id: &str, records: &[OrganizationModuleRecord]) -> Result<()> {
        let prefix = organization_prefix(organization_id);
        let keep: HashSet<Vec<u8>> = records
            .iter()
            .map(|r| record_key(organization_id, &r.key))
            .collect();

        let mut stale = Vec::new();
        for item in self.records.scan_prefix(&prefix) {
            let (key, _) = item?;
            if !keep.contains(&key) {
                stale.push(key);
            }
        }
        for key in &stale {
            self.records.remove(key)?;
        }

        for record in records {
            let value = serde_json::to_vec(record)?;
            self.records
                .insert(&record_key(organization_id, &record.key), &value)?;
        }
        debug!(
            "Saved {} records for {} ({} removed)",
            records.len(),
            organization_id,
            stale.len()
        );
        Ok(())
    }

    async fn upsert(&self, record: &OrganizationModuleRecord) -> Result<UpsertOutcome> {
        let key = record_key(&record.organization_id, &record.key);
        let outcome = match self.records.get(&key)? {
            None => UpsertOutcome::Inserted,
            Some(bytes) if Self::decode(&bytes).ok().as_ref() == Some(record) => {
                return Ok(UpsertOutcome::Unchanged);
            }
            Some(_) => UpsertOutcome::Modified,
        };
        self.records.insert(&key, &serde_json::to_vec(record)?)?;
        Ok(outcome)
    }
}
