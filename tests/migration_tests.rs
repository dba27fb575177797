//! Migration pass tests over on-disk storage

mod common;

use common::TempStorage;
use serde_json::json;
use tenant_modules::migration::{MigrationPass, UnknownStatusPolicy, UnrecognizedStatusRecord};
use tenant_modules::module::store::{record_key, DatabaseModuleStore};
use tenant_modules::module::traits::{ModuleStatus, OrganizationModuleStore};
use tenant_modules::storage::{
    LEGACY_ORGANIZATIONS_TREE, LEGACY_ORG_MODULES_TREE, UNRECOGNIZED_STATUSES_TREE,
};

fn seed_legacy(temp: &TempStorage) {
    temp.seed(
        LEGACY_ORGANIZATIONS_TREE,
        "org1",
        json!({
            "_id": "org1",
            "moduleStates": {
                "Sales": "READY ",
                "pos": { "status": "pendingConfig" },
                "reports": "",
                "crm": "weird_future_status"
            },
            "moduleSettings": {
                "sales": { "currency": "EUR" },
                "pos": { "registers": 2 }
            }
        }),
    )
    .unwrap();
    temp.seed(
        LEGACY_ORGANIZATIONS_TREE,
        "org2",
        json!({ "id": "org2", "moduleStates": { "inventory": "inactive" } }),
    )
    .unwrap();
    temp.seed(
        LEGACY_ORG_MODULES_TREE,
        "a",
        json!({ "organizationId": "org2", "key": "inventory", "status": "enabled" }),
    )
    .unwrap();
    temp.seed(
        LEGACY_ORG_MODULES_TREE,
        "b",
        json!({ "organizationId": "", "key": "sales", "status": "ready" }),
    )
    .unwrap();
}

#[tokio::test]
async fn test_migration_folds_both_sources() {
    let temp = TempStorage::new().unwrap();
    seed_legacy(&temp);

    let summary = MigrationPass::new(temp.database()).run().await.unwrap();
    let organizations = &summary.collections[0];
    assert_eq!(organizations.source, LEGACY_ORGANIZATIONS_TREE);
    assert_eq!(organizations.processed, 5);
    assert_eq!(organizations.upserted, 2);
    assert_eq!(organizations.skipped, 1);
    assert_eq!(organizations.quarantined, 1);

    let org_modules = &summary.collections[1];
    assert_eq!(org_modules.processed, 2);
    assert_eq!(org_modules.upserted, 1);
    assert_eq!(org_modules.skipped, 1);

    let store = DatabaseModuleStore::new(temp.database()).unwrap();
    let org1 = store.load("org1").await.unwrap();
    assert_eq!(org1.len(), 2);
    let pos = org1.iter().find(|r| r.key == "pos").unwrap();
    assert_eq!(pos.status, ModuleStatus::EnabledUnconfigured);
    assert!(pos.config.is_none());
    let sales = org1.iter().find(|r| r.key == "sales").unwrap();
    assert_eq!(sales.status, ModuleStatus::Configured);
    assert_eq!(sales.config, Some(json!({ "currency": "EUR" })));

    // The flat collection is read last and wins
    let org2 = store.load("org2").await.unwrap();
    assert_eq!(org2.len(), 1);
    assert_eq!(org2[0].status, ModuleStatus::EnabledUnconfigured);

    let quarantine = temp.database().open_tree(UNRECOGNIZED_STATUSES_TREE).unwrap();
    let bytes = quarantine.get(&record_key("org1", "crm")).unwrap().unwrap();
    let entry: UnrecognizedStatusRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(entry.status, "weird_future_status");
    assert_eq!(entry.source, LEGACY_ORGANIZATIONS_TREE);
}

#[tokio::test]
async fn test_rerun_is_a_noop() {
    let temp = TempStorage::new().unwrap();
    seed_legacy(&temp);

    MigrationPass::new(temp.database()).run().await.unwrap();
    let second = MigrationPass::new(temp.database()).run().await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.collections[0].processed, 5);
}

#[tokio::test]
async fn test_reject_policy_leaves_target_untouched() {
    let temp = TempStorage::new().unwrap();
    seed_legacy(&temp);

    let result = MigrationPass::new(temp.database())
        .with_unknown_status_policy(UnknownStatusPolicy::Reject)
        .run()
        .await;
    assert!(result.is_err());

    let store = DatabaseModuleStore::new(temp.database()).unwrap();
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn test_migrated_state_is_lifecycle_ready() {
    let temp = TempStorage::new().unwrap();
    temp.seed(
        LEGACY_ORGANIZATIONS_TREE,
        "org1",
        json!({ "moduleStates": { "inventory": "ready" } }),
    )
    .unwrap();
    MigrationPass::new(temp.database()).run().await.unwrap();

    let orchestrator = temp.orchestrator(common::pos_catalog()).unwrap();
    let install = orchestrator.install("org1", &["pos"]).await.unwrap();
    assert_eq!(install.result.installed_keys, vec!["pos"]);
    assert_eq!(install.result.already_installed_keys, vec!["inventory"]);
}
