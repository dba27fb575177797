//! Lifecycle planning
//!
//! Synchronous, in-memory state transitions over one organization's module
//! records. Nothing here touches storage; the orchestrator loads a
//! [`TenantModules`] snapshot, runs a plan against it, and writes it back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::module::lifecycle::results::{
    AvailableModule, Blocker, InstallResult, InstalledModule, SuiteAction, SuiteResult,
    UninstallResult,
};
use crate::module::registry::{canonical_key, ModuleRegistry};
use crate::module::traits::{KeyError, KeyErrorKind, ModuleStatus, OrganizationModuleRecord};

/// What uninstall does with a tenant record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UninstallPolicy {
    /// Delete the record
    #[default]
    Remove,
    /// Keep the record with status `disabled` and no settings
    Disable,
}

/// One organization's module records, keyed by canonical module key
#[derive(Debug, Clone, PartialEq)]
pub struct TenantModules {
    organization_id: String,
    records: BTreeMap<String, OrganizationModuleRecord>,
}

impl TenantModules {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build a snapshot from stored records; keys are canonicalized and later
    /// duplicates win
    pub fn from_records(
        organization_id: impl Into<String>,
        records: impl IntoIterator<Item = OrganizationModuleRecord>,
    ) -> Self {
        let mut tenant = Self::new(organization_id);
        for mut record in records {
            record.key = canonical_key(&record.key);
            record.organization_id = tenant.organization_id.clone();
            tenant.records.insert(record.key.clone(), record);
        }
        tenant
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn get(&self, key: &str) -> Option<&OrganizationModuleRecord> {
        self.records.get(key)
    }

    pub fn is_installed(&self, key: &str) -> bool {
        self.records.get(key).map_or(false, |r| r.is_installed())
    }

    /// Keys with a record in an installed status
    pub fn installed_keys(&self) -> impl Iterator<Item = &str> {
        self.records
            .values()
            .filter(|r| r.is_installed())
            .map(|r| r.key.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &OrganizationModuleRecord> {
        self.records.values()
    }

    pub fn to_records(&self) -> Vec<OrganizationModuleRecord> {
        self.records.values().cloned().collect()
    }

    fn put(&mut self, key: &str, status: ModuleStatus) {
        let record = OrganizationModuleRecord::new(self.organization_id.clone(), key, status);
        self.records.insert(key.to_string(), record);
    }
}

/// Transitive dependency closure of one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Dependencies before dependents; the root module is last
    pub keys: Vec<String>,
    /// `(required_by, missing_key)` for every dangling edge reached
    pub missing: Vec<(String, String)>,
}

/// Plans lifecycle transitions against a registry
pub struct LifecyclePlanner<'r> {
    registry: &'r ModuleRegistry,
    uninstall_policy: UninstallPolicy,
}

impl<'r> LifecyclePlanner<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            uninstall_policy: UninstallPolicy::default(),
        }
    }

    pub fn with_uninstall_policy(mut self, policy: UninstallPolicy) -> Self {
        self.uninstall_policy = policy;
        self
    }

    /// Resolve the dependency closure of `key`
    ///
    /// The walk keeps its own visited set, so a cyclic catalog still yields a
    /// finite closure in which every module appears once.
    pub fn resolve_closure(&self, key: &str) -> Closure {
        let mut closure = Closure::default();
        let mut visited = HashSet::new();
        self.collect(&canonical_key(key), None, &mut visited, &mut closure);
        closure
    }

    fn collect(
        &self,
        key: &str,
        required_by: Option<&str>,
        visited: &mut HashSet<String>,
        closure: &mut Closure,
    ) {
        if !visited.insert(key.to_string()) {
            return;
        }
        let Some(module) = self.registry.get(key) else {
            if let Some(parent) = required_by {
                closure.missing.push((parent.to_string(), key.to_string()));
            }
            return;
        };
        for dep in &module.dependencies {
            self.collect(dep, Some(&module.key), visited, closure);
        }
        closure.keys.push(module.key.clone());
    }

    /// Install the requested keys and their closures
    ///
    /// Idempotent: installed modules are reported, never rewritten, so a
    /// configured module is not downgraded.
    pub fn install<S: AsRef<str>>(&self, tenant: &mut TenantModules, keys: &[S]) -> InstallResult {
        let mut result = InstallResult::default();
        // Errors and closure placement dedupe separately: a key refused on
        // direct request is still reported when reached through a closure
        let mut reported: HashSet<String> = HashSet::new();
        let mut placed: HashSet<String> = HashSet::new();

        for raw in keys {
            let requested = canonical_key(raw.as_ref());
            let Some(module) = self.registry.get(&requested) else {
                if reported.insert(requested.clone()) {
                    result
                        .errors
                        .push(KeyError::new(requested, KeyErrorKind::UnknownModule));
                }
                continue;
            };
            if !module.is_system && !module.is_installable {
                if reported.insert(module.key.clone()) {
                    result
                        .errors
                        .push(KeyError::new(&module.key, KeyErrorKind::NotInstallable));
                }
                continue;
            }

            let closure = self.resolve_closure(&module.key);
            for (required_by, missing) in closure.missing {
                if reported.insert(missing.clone()) {
                    result.errors.push(KeyError::new(
                        missing,
                        KeyErrorKind::MissingDependency { required_by },
                    ));
                }
            }

            for key in closure.keys {
                if !placed.insert(key.clone()) {
                    continue;
                }
                let Some(descriptor) = self.registry.get(&key) else {
                    continue;
                };
                if !descriptor.is_user_installable() {
                    debug!("{} is implicitly present, skipping", key);
                    result.skipped_system_keys.push(key);
                } else if tenant.is_installed(&key) {
                    result.already_installed_keys.push(key);
                } else {
                    let status = if descriptor.requires_setup() {
                        ModuleStatus::EnabledUnconfigured
                    } else {
                        ModuleStatus::Configured
                    };
                    debug!(
                        "Installing {} for {} as {}",
                        key, tenant.organization_id, status
                    );
                    tenant.put(&key, status);
                    result.installed_keys.push(key);
                }
            }
        }

        result
    }

    /// Uninstall the requested keys
    ///
    /// Keys requested together are evaluated as a batch: a key is blocked only
    /// by installed or system dependents that are not themselves being removed.
    pub fn uninstall<S: AsRef<str>>(
        &self,
        tenant: &mut TenantModules,
        keys: &[S],
    ) -> UninstallResult {
        let mut result = UninstallResult::default();
        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = Vec::new();

        for raw in keys {
            let key = canonical_key(raw.as_ref());
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.registry.get(&key) {
                Some(module) if !module.is_user_installable() => {
                    result.skipped_system_keys.push(key);
                }
                Some(_) if !tenant.is_installed(&key) => {
                    result.already_uninstalled_keys.push(key);
                }
                Some(_) => candidates.push(key),
                // Records for modules that left the catalog can still be removed
                None if tenant.is_installed(&key) => candidates.push(key),
                None => result
                    .errors
                    .push(KeyError::new(key, KeyErrorKind::UnknownModule)),
            }
        }

        // System modules are always present, so they protect their dependencies
        let implicit: Vec<&str> = self
            .registry
            .all_modules()
            .iter()
            .filter(|m| !m.is_user_installable())
            .map(|m| m.key.as_str())
            .collect();

        let mut blocked: HashMap<String, Vec<String>> = HashMap::new();
        loop {
            let removing: HashSet<&str> = candidates
                .iter()
                .filter(|k| !blocked.contains_key(k.as_str()))
                .map(String::as_str)
                .collect();
            let remaining: Vec<&str> = implicit
                .iter()
                .copied()
                .chain(tenant.installed_keys())
                .filter(|k| !removing.contains(k))
                .collect();

            let newly_blocked: Vec<(String, Vec<String>)> = removing
                .iter()
                .filter_map(|key| {
                    let dependents = self
                        .registry
                        .dependents_of(key, remaining.iter().copied());
                    (!dependents.is_empty()).then(|| (key.to_string(), dependents))
                })
                .collect();

            if newly_blocked.is_empty() {
                break;
            }
            blocked.extend(newly_blocked);
        }

        for key in candidates {
            if let Some(dependents) = blocked.remove(&key) {
                debug!("{} blocked by dependents {:?}", key, dependents);
                result.blockers.push(Blocker { key, dependents });
                continue;
            }
            match self.uninstall_policy {
                UninstallPolicy::Remove => {
                    tenant.records.remove(&key);
                }
                UninstallPolicy::Disable => tenant.put(&key, ModuleStatus::Disabled),
            }
            result.uninstalled_keys.push(key);
        }

        result
    }

    /// Install every member of a suite
    pub fn install_suite(&self, tenant: &mut TenantModules, suite: &str) -> SuiteResult {
        let members = self.registry.suite_members(suite);
        if members.is_empty() {
            return Self::unknown_suite(suite, SuiteAction::Install);
        }
        let result = self.install(tenant, &members);
        let mut skipped = result.already_installed_keys;
        skipped.extend(result.skipped_system_keys);
        SuiteResult {
            suite: canonical_key(suite),
            action: SuiteAction::Install,
            installed: result.installed_keys,
            skipped,
            errors: result.errors,
            blockers: Vec::new(),
        }
    }

    /// Uninstall every member of a suite
    pub fn uninstall_suite(&self, tenant: &mut TenantModules, suite: &str) -> SuiteResult {
        let members = self.registry.suite_members(suite);
        if members.is_empty() {
            return Self::unknown_suite(suite, SuiteAction::Uninstall);
        }
        let result = self.uninstall(tenant, &members);
        let mut skipped = result.already_uninstalled_keys;
        skipped.extend(result.skipped_system_keys);
        SuiteResult {
            suite: canonical_key(suite),
            action: SuiteAction::Uninstall,
            installed: result.uninstalled_keys,
            skipped,
            errors: result.errors,
            blockers: result.blockers.into_iter().map(|b| b.key).collect(),
        }
    }

    fn unknown_suite(suite: &str, action: SuiteAction) -> SuiteResult {
        let suite = canonical_key(suite);
        SuiteResult {
            errors: vec![KeyError::new(&suite, KeyErrorKind::UnknownSuite)],
            suite,
            action,
            installed: Vec::new(),
            skipped: Vec::new(),
            blockers: Vec::new(),
        }
    }

    /// Store tenant settings for an installed module, moving it to `configured`
    pub fn configure(
        &self,
        tenant: &mut TenantModules,
        key: &str,
        settings: serde_json::Value,
    ) -> Result<OrganizationModuleRecord, KeyError> {
        let key = canonical_key(key);
        let Some(module) = self.registry.get(&key) else {
            return Err(KeyError::new(key, KeyErrorKind::UnknownModule));
        };
        if !module.is_user_installable() {
            return Err(KeyError::new(key, KeyErrorKind::NotInstallable));
        }
        match tenant.records.get_mut(&key) {
            Some(record) if record.is_installed() => {
                record.status = ModuleStatus::Configured;
                record.config = Some(settings);
                Ok(record.clone())
            }
            _ => Err(KeyError::new(key, KeyErrorKind::NotInstalled)),
        }
    }

    /// Installable modules with the tenant's current status
    pub fn available(&self, tenant: &TenantModules) -> Vec<AvailableModule> {
        self.registry
            .installable_modules()
            .into_iter()
            .map(|module| AvailableModule {
                key: module.key.clone(),
                name: module.name.clone(),
                version: module.version.clone(),
                description: module.description.clone(),
                category: module.category.clone(),
                suite: module.suite.clone(),
                dependencies: module.dependencies.clone(),
                requires_setup: module.requires_setup(),
                status: tenant.get(&module.key).map(|r| r.status),
            })
            .collect()
    }

    /// Implicit system modules, then installed records in catalog order, then
    /// records for modules no longer in the catalog
    pub fn installed(&self, tenant: &TenantModules) -> Vec<InstalledModule> {
        let mut listed = Vec::new();
        for module in self.registry.all_modules() {
            if !module.is_user_installable() {
                listed.push(InstalledModule {
                    key: module.key.clone(),
                    name: module.name.clone(),
                    status: ModuleStatus::Configured,
                    implicit: true,
                    config: None,
                });
            } else if let Some(record) = tenant.get(&module.key).filter(|r| r.is_installed()) {
                listed.push(InstalledModule {
                    key: module.key.clone(),
                    name: module.name.clone(),
                    status: record.status,
                    implicit: false,
                    config: record.config.clone(),
                });
            }
        }
        for record in tenant.records() {
            if record.is_installed() && !self.registry.contains(&record.key) {
                listed.push(InstalledModule {
                    key: record.key.clone(),
                    name: record.key.clone(),
                    status: record.status,
                    implicit: false,
                    config: record.config.clone(),
                });
            }
        }
        listed
    }
}
