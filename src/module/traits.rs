//! Module system traits and shared types
//!
//! Defines the tenant-scoped record shape, the lifecycle status vocabulary,
//! the store seam used by the orchestrator, and the module system errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a module for one organization
///
/// Variants are declared in lifecycle order: a module cannot be `Configured`
/// without having passed through `EnabledUnconfigured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Module is installed but switched off (or was uninstalled under the disable policy)
    Disabled,
    /// Module is installed and waiting for tenant settings
    EnabledUnconfigured,
    /// Module is installed and has its settings
    Configured,
}

impl ModuleStatus {
    /// Canonical string form, as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Disabled => "disabled",
            ModuleStatus::EnabledUnconfigured => "enabled_unconfigured",
            ModuleStatus::Configured => "configured",
        }
    }

    /// Whether a record in this status counts as installed
    pub fn is_installed(&self) -> bool {
        !matches!(self, ModuleStatus::Disabled)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant-scoped module record, unique per `(organization_id, key)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationModuleRecord {
    pub organization_id: String,
    pub key: String,
    pub status: ModuleStatus,
    /// Tenant settings, only present once `status` is `Configured`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl OrganizationModuleRecord {
    /// Create a record without settings
    pub fn new(
        organization_id: impl Into<String>,
        key: impl Into<String>,
        status: ModuleStatus,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            key: key.into(),
            status,
            config: None,
        }
    }

    /// Attach settings to the record
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Whether this record counts as installed
    pub fn is_installed(&self) -> bool {
        self.status.is_installed()
    }
}

/// Result of an idempotent upsert keyed on `(organization_id, key)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed for the pair
    Inserted,
    /// A record existed and differed
    Modified,
    /// A record existed and was identical
    Unchanged,
}

/// Persistence seam for per-organization module state
///
/// Implementations do not serialize concurrent writers for the same
/// organization; callers run at most one lifecycle operation per tenant at a time.
#[async_trait]
pub trait OrganizationModuleStore: Send + Sync {
    /// Load every record of an organization, ordered by key
    async fn load(&self, organization_id: &str) -> anyhow::Result<Vec<OrganizationModuleRecord>>;

    /// Replace the full record set of an organization
    async fn save(
        &self,
        organization_id: &str,
        records: &[OrganizationModuleRecord],
    ) -> anyhow::Result<()>;

    /// Insert or overwrite one record (last write wins)
    async fn upsert(&self, record: &OrganizationModuleRecord) -> anyhow::Result<UpsertOutcome>;
}

/// Catalog construction errors
///
/// These are fatal at startup: a misconfigured catalog is rejected instead of
/// silently shrinking.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(String),

    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    #[error("Invalid catalog entries: {}", .0.join("; "))]
    InvalidEntries(Vec<String>),

    #[error("Duplicate module key in catalog: {0}")]
    DuplicateKey(String),

    #[error("Dependency cycles in catalog: {}", format_cycles(.0))]
    Cycles(Vec<Vec<String>>),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-key operation failures, collected into operation results
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyErrorKind {
    #[error("unknown module")]
    UnknownModule,

    #[error("module is not installable")]
    NotInstallable,

    #[error("unknown dependency of {required_by}")]
    MissingDependency { required_by: String },

    #[error("module is not installed")]
    NotInstalled,

    #[error("unknown suite")]
    UnknownSuite,
}

/// A per-key failure inside a batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyError {
    pub key: String,
    pub reason: KeyErrorKind,
}

impl KeyError {
    pub fn new(key: impl Into<String>, reason: KeyErrorKind) -> Self {
        Self {
            key: key.into(),
            reason,
        }
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_follows_lifecycle() {
        assert!(ModuleStatus::Disabled < ModuleStatus::EnabledUnconfigured);
        assert!(ModuleStatus::EnabledUnconfigured < ModuleStatus::Configured);
        assert!(!ModuleStatus::Disabled.is_installed());
        assert!(ModuleStatus::EnabledUnconfigured.is_installed());
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = OrganizationModuleRecord::new("org1", "pos", ModuleStatus::Configured)
            .with_config(serde_json::json!({ "currency": "EUR" }));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["organizationId"], "org1");
        assert_eq!(value["status"], "configured");
        assert_eq!(value["config"]["currency"], "EUR");

        let bare = OrganizationModuleRecord::new("org1", "pos", ModuleStatus::EnabledUnconfigured);
        let value = serde_json::to_value(&bare).unwrap();
        assert!(value.get("config").is_none());
    }

    #[test]
    fn test_catalog_error_messages() {
        let err = CatalogError::Cycles(vec![vec!["a".into(), "b".into()]]);
        assert_eq!(err.to_string(), "Dependency cycles in catalog: a -> b");

        let err = KeyError::new(
            "ledger",
            KeyErrorKind::MissingDependency {
                required_by: "accounts".into(),
            },
        );
        assert_eq!(err.to_string(), "ledger: unknown dependency of accounts");
    }
}
