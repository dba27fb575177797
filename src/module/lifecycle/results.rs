//! Lifecycle operation results
//!
//! Every batch operation reports per-key outcomes in a structured result;
//! nothing in a batch is signalled by an error return.

use serde::{Deserialize, Serialize};

use crate::module::traits::{KeyError, ModuleStatus};

/// Outcome of `install`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    /// Newly installed keys, dependencies before dependents
    pub installed_keys: Vec<String>,
    pub already_installed_keys: Vec<String>,
    /// System or non-installable keys reached through the closure; implicitly present
    pub skipped_system_keys: Vec<String>,
    pub errors: Vec<KeyError>,
}

impl InstallResult {
    pub fn changed(&self) -> bool {
        !self.installed_keys.is_empty()
    }
}

/// A key whose uninstall was refused because installed or system modules depend on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    pub key: String,
    pub dependents: Vec<String>,
}

/// Outcome of `uninstall`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallResult {
    pub uninstalled_keys: Vec<String>,
    pub already_uninstalled_keys: Vec<String>,
    /// System modules are never uninstallable; requests for them are no-ops
    pub skipped_system_keys: Vec<String>,
    pub blockers: Vec<Blocker>,
    pub errors: Vec<KeyError>,
}

impl UninstallResult {
    pub fn changed(&self) -> bool {
        !self.uninstalled_keys.is_empty()
    }

    pub fn blocked_keys(&self) -> Vec<&str> {
        self.blockers.iter().map(|b| b.key.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteAction {
    Install,
    Uninstall,
}

/// Outcome of a suite operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite: String,
    pub action: SuiteAction,
    /// Keys that changed state (installed or uninstalled, depending on `action`)
    pub installed: Vec<String>,
    /// Keys already in the target state, including system modules
    pub skipped: Vec<String>,
    pub errors: Vec<KeyError>,
    /// Keys whose uninstall was refused due to dependents
    pub blockers: Vec<String>,
}

impl SuiteResult {
    pub fn changed(&self) -> bool {
        !self.installed.is_empty()
    }
}

/// Persistence outcome of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Tenant state was written
    Committed,
    /// Nothing changed, nothing was written
    Unchanged,
    /// The write failed; the result is tentative until a later write succeeds
    Failed(String),
}

impl WriteOutcome {
    pub fn is_durable(&self) -> bool {
        !matches!(self, WriteOutcome::Failed(_))
    }
}

/// A computed result together with its write outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persisted<T> {
    pub result: T,
    pub write: WriteOutcome,
}

/// Entry of `list_available`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModule {
    pub key: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub category: Option<String>,
    pub suite: Option<String>,
    pub dependencies: Vec<String>,
    pub requires_setup: bool,
    /// The tenant's current status, if a record exists
    pub status: Option<ModuleStatus>,
}

/// Entry of `list_installed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledModule {
    pub key: String,
    pub name: String,
    pub status: ModuleStatus,
    /// Present without a tenant record (system modules)
    pub implicit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}
