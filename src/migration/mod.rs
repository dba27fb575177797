//! Organization module migration
//!
//! One-shot batch pass that folds the legacy module state sources into the
//! canonical `organization_modules` collection:
//!
//! 1. organization documents (`moduleStates` / `moduleSettings` maps)
//! 2. the flat `org_modules` collection
//!
//! Entries are merged per `(organization_id, key)` with the later source
//! winning, then written with idempotent upserts, so an interrupted run can be
//! re-executed and a repeated run writes nothing.

pub mod legacy;
pub mod normalize;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::module::registry::canonical_key;
use crate::module::store::{record_key, DatabaseModuleStore};
use crate::module::traits::{
    ModuleStatus, OrganizationModuleRecord, OrganizationModuleStore, UpsertOutcome,
};
use crate::storage::database::Database;
use crate::storage::{
    LEGACY_ORGANIZATIONS_TREE, LEGACY_ORG_MODULES_TREE, ORGANIZATION_MODULES_TREE,
    UNRECOGNIZED_STATUSES_TREE,
};

pub use legacy::{LegacyOrgModule, LegacyOrganization};
pub use normalize::{normalize, normalize_json, normalize_str, NormalizedStatus, RawStatus};

/// What the migration does with a non-empty status it cannot map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStatusPolicy {
    /// Keep the status verbatim in the unrecognized-status collection
    #[default]
    Preserve,
    /// Fail the migration before anything is written
    Reject,
}

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unrecognized status {status:?} for module {key} of organization {organization_id}")]
    UnknownStatus {
        organization_id: String,
        key: String,
        status: String,
    },

    #[error("Undecodable document in {tree}: {reason}")]
    Decode { tree: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Counts for one source collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub source: String,
    pub target: String,
    /// Legacy entries read
    pub processed: usize,
    /// Records newly created in the target
    pub upserted: usize,
    /// Existing target records that changed
    pub modified: usize,
    /// Entries without a usable identity or status
    pub skipped: usize,
    /// Unrecognized statuses written to the quarantine collection
    pub quarantined: usize,
}

impl CollectionSummary {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            target: ORGANIZATION_MODULES_TREE.to_string(),
            ..Default::default()
        }
    }
}

/// Summary of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub collections: Vec<CollectionSummary>,
}

impl MigrationSummary {
    pub fn total_upserted(&self) -> usize {
        self.collections.iter().map(|c| c.upserted).sum()
    }

    pub fn total_modified(&self) -> usize {
        self.collections.iter().map(|c| c.modified).sum()
    }

    pub fn total_quarantined(&self) -> usize {
        self.collections.iter().map(|c| c.quarantined).sum()
    }

    /// Whether the run wrote nothing to the canonical collection
    pub fn is_noop(&self) -> bool {
        self.total_upserted() == 0 && self.total_modified() == 0
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.collections {
            writeln!(
                f,
                "{} -> {}: processed={} upserted={} modified={} skipped={} quarantined={}",
                c.source, c.target, c.processed, c.upserted, c.modified, c.skipped, c.quarantined
            )?;
        }
        Ok(())
    }
}

/// Quarantined legacy status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrecognizedStatusRecord {
    pub organization_id: String,
    pub key: String,
    pub status: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// One merged legacy entry
struct Candidate {
    source: usize,
    status: NormalizedStatus,
    config: Option<Value>,
}

/// The migration pass over one database
pub struct MigrationPass {
    db: Arc<dyn Database>,
    unknown_status: UnknownStatusPolicy,
}

impl MigrationPass {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            unknown_status: UnknownStatusPolicy::default(),
        }
    }

    pub fn with_unknown_status_policy(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Run the migration
    pub async fn run(&self) -> Result<MigrationSummary, MigrationError> {
        let sources = [LEGACY_ORGANIZATIONS_TREE, LEGACY_ORG_MODULES_TREE];
        let mut summary = MigrationSummary {
            collections: sources.iter().map(|s| CollectionSummary::new(s)).collect(),
        };
        let mut merged: BTreeMap<(String, String), Candidate> = BTreeMap::new();

        info!("Reading legacy organization documents");
        let organizations = self.db.open_tree(LEGACY_ORGANIZATIONS_TREE)?;
        for item in organizations.iter() {
            let (tree_key, bytes) = item?;
            let organization = LegacyOrganization::decode(&tree_key, &bytes)
                .map_err(|e| decode_error(LEGACY_ORGANIZATIONS_TREE, e))?;
            for (key, raw) in &organization.module_states {
                let config = organization.settings_for(key).cloned();
                collect(
                    &mut merged,
                    &mut summary.collections[0],
                    0,
                    &organization.id,
                    key,
                    raw,
                    config,
                );
            }
        }

        info!("Reading legacy org modules collection");
        let org_modules = self.db.open_tree(LEGACY_ORG_MODULES_TREE)?;
        for item in org_modules.iter() {
            let (_, bytes) = item?;
            let module = LegacyOrgModule::decode(&bytes)
                .map_err(|e| decode_error(LEGACY_ORG_MODULES_TREE, e))?;
            collect(
                &mut merged,
                &mut summary.collections[1],
                1,
                &module.organization_id,
                &module.key,
                &module.status,
                module.config,
            );
        }

        if self.unknown_status == UnknownStatusPolicy::Reject {
            if let Some(((organization_id, key), candidate)) = merged
                .iter()
                .find(|(_, c)| c.status.canonical().is_none())
            {
                return Err(MigrationError::UnknownStatus {
                    organization_id: organization_id.clone(),
                    key: key.clone(),
                    status: candidate.status.to_string(),
                });
            }
        }

        let store = DatabaseModuleStore::new(Arc::clone(&self.db))?;
        let quarantine = self.db.open_tree(UNRECOGNIZED_STATUSES_TREE)?;

        for ((organization_id, key), candidate) in merged {
            let counts = &mut summary.collections[candidate.source];
            match candidate.status {
                NormalizedStatus::Canonical(status) => {
                    let record = canonical_record(&organization_id, &key, status, candidate.config);
                    match store.upsert(&record).await? {
                        UpsertOutcome::Inserted => counts.upserted += 1,
                        UpsertOutcome::Modified => counts.modified += 1,
                        UpsertOutcome::Unchanged => {}
                    }
                    quarantine.remove(&record_key(&organization_id, &key))?;
                }
                NormalizedStatus::Unrecognized(status) => {
                    warn!(
                        "Quarantining unrecognized status {:?} for {}/{}",
                        status, organization_id, key
                    );
                    let entry = UnrecognizedStatusRecord {
                        organization_id: organization_id.clone(),
                        key: key.clone(),
                        status,
                        source: sources[candidate.source].to_string(),
                        config: candidate.config,
                    };
                    quarantine.insert(
                        &record_key(&organization_id, &key),
                        &serde_json::to_vec(&entry).map_err(anyhow::Error::from)?,
                    )?;
                    counts.quarantined += 1;
                }
            }
        }

        self.db.flush()?;
        for c in &summary.collections {
            info!(
                "Migrated {} -> {}: processed={} upserted={} modified={} skipped={} quarantined={}",
                c.source, c.target, c.processed, c.upserted, c.modified, c.skipped, c.quarantined
            );
        }
        Ok(summary)
    }
}

fn decode_error(tree: &str, e: serde_json::Error) -> MigrationError {
    MigrationError::Decode {
        tree: tree.to_string(),
        reason: e.to_string(),
    }
}

/// Settings survive only on `configured` records; anything else drops them
fn canonical_record(
    organization_id: &str,
    key: &str,
    status: ModuleStatus,
    config: Option<Value>,
) -> OrganizationModuleRecord {
    let mut record = OrganizationModuleRecord::new(organization_id, key, status);
    match config {
        Some(config) if status == ModuleStatus::Configured => record.config = Some(config),
        Some(_) => warn!(
            "Dropping legacy settings for {}/{}: status is {}",
            organization_id, key, status
        ),
        None => {}
    }
    record
}

/// Normalize one legacy entry into the merge map; later sources overwrite
fn collect(
    merged: &mut BTreeMap<(String, String), Candidate>,
    counts: &mut CollectionSummary,
    source: usize,
    organization_id: &str,
    key: &str,
    raw: &Value,
    config: Option<Value>,
) {
    counts.processed += 1;
    let organization_id = organization_id.trim();
    let key = canonical_key(key);
    if organization_id.is_empty() || key.is_empty() {
        warn!(
            "Skipping {} entry without organization or module key",
            counts.source
        );
        counts.skipped += 1;
        return;
    }
    let Some(status) = normalize_json(raw) else {
        debug!("Skipping {}/{}: no status", organization_id, key);
        counts.skipped += 1;
        return;
    };
    merged.insert(
        (organization_id.to_string(), key),
        Candidate {
            source,
            status,
            config,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use serde_json::json;

    fn seed(db: &Arc<dyn Database>, tree: &str, key: &str, doc: Value) {
        let tree = db.open_tree(tree).unwrap();
        tree.insert(key.as_bytes(), doc.to_string().as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_later_source_wins() {
        let db = Storage::in_memory().unwrap().database();
        seed(
            &db,
            LEGACY_ORGANIZATIONS_TREE,
            "org1",
            json!({ "moduleStates": { "pos": "pendingConfig" } }),
        );
        seed(
            &db,
            LEGACY_ORG_MODULES_TREE,
            "1",
            json!({ "organizationId": "org1", "key": "POS", "status": "ready", "config": { "registers": 1 } }),
        );

        let summary = MigrationPass::new(Arc::clone(&db)).run().await.unwrap();
        assert_eq!(summary.collections[0].processed, 1);
        assert_eq!(summary.collections[0].upserted, 0);
        assert_eq!(summary.collections[1].upserted, 1);

        let store = DatabaseModuleStore::new(db).unwrap();
        let records = store.load("org1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ModuleStatus::Configured);
        assert_eq!(records[0].config, Some(json!({ "registers": 1 })));
    }

    #[tokio::test]
    async fn test_reject_policy_writes_nothing() {
        let db = Storage::in_memory().unwrap().database();
        seed(
            &db,
            LEGACY_ORGANIZATIONS_TREE,
            "org1",
            json!({ "moduleStates": { "sales": "ready", "pos": "archived" } }),
        );

        let err = MigrationPass::new(Arc::clone(&db))
            .with_unknown_status_policy(UnknownStatusPolicy::Reject)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::UnknownStatus { ref status, .. } if status == "archived"));
        assert!(db.open_tree(ORGANIZATION_MODULES_TREE).unwrap().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_document_fails() {
        let db = Storage::in_memory().unwrap().database();
        db.open_tree(LEGACY_ORG_MODULES_TREE)
            .unwrap()
            .insert(b"1", b"not json")
            .unwrap();
        let err = MigrationPass::new(db).run().await.unwrap_err();
        assert!(matches!(err, MigrationError::Decode { .. }));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_settings_of_unconfigured_module_are_dropped_with_warning() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let (enabled, configured) = tracing::subscriber::with_default(subscriber, || {
            (
                canonical_record(
                    "org1",
                    "pos",
                    ModuleStatus::EnabledUnconfigured,
                    Some(json!({ "registers": 2 })),
                ),
                canonical_record(
                    "org1",
                    "sales",
                    ModuleStatus::Configured,
                    Some(json!({ "currency": "EUR" })),
                ),
            )
        });
        assert!(enabled.config.is_none());
        assert_eq!(configured.config, Some(json!({ "currency": "EUR" })));

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Dropping legacy settings for org1/pos"));
        assert!(!output.contains("org1/sales"));
    }

    #[tokio::test]
    async fn test_settings_not_migrated_for_pending_modules() {
        let db = Storage::in_memory().unwrap().database();
        seed(
            &db,
            LEGACY_ORGANIZATIONS_TREE,
            "org1",
            json!({
                "moduleStates": { "pos": "pending_config" },
                "moduleSettings": { "pos": { "registers": 2 } }
            }),
        );

        MigrationPass::new(Arc::clone(&db)).run().await.unwrap();
        let records = DatabaseModuleStore::new(db).unwrap().load("org1").await.unwrap();
        assert_eq!(records[0].status, ModuleStatus::EnabledUnconfigured);
        assert!(records[0].config.is_none());
    }

    #[test]
    fn test_summary_display() {
        let summary = MigrationSummary {
            collections: vec![CollectionSummary {
                processed: 3,
                upserted: 2,
                ..CollectionSummary::new(LEGACY_ORG_MODULES_TREE)
            }],
        };
        assert_eq!(
            summary.to_string(),
            "org_modules -> organization_modules: processed=3 upserted=2 modified=0 skipped=0 quarantined=0\n"
        );
        assert!(!summary.is_noop());
    }
}
