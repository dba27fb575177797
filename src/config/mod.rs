//! Configuration management for tenant-modules
//!
//! Handles TOML configuration loading, defaults, and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::migration::UnknownStatusPolicy;
use crate::module::lifecycle::UninstallPolicy;
use crate::storage::database::{default_backend, DatabaseBackend};

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML catalog file; the built-in catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Refuse to start when the dependency graph has cycles
    #[serde(default = "default_false")]
    pub fail_on_cycles: bool,
}

fn default_false() -> bool {
    false
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database backend selection
    #[serde(default = "default_database_backend")]
    pub database_backend: DatabaseBackendConfig,

    /// Storage path
    #[serde(default = "default_storage_path")]
    pub data_dir: String,
}

/// Database backend configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackendConfig {
    /// Use sled database
    Sled,
    /// Use redb database (default)
    Redb,
    /// Non-persistent, for tests and dry runs
    Memory,
    /// Auto-select based on enabled features
    Auto,
}

impl DatabaseBackendConfig {
    /// Concrete backend for this selection
    pub fn resolve(self) -> DatabaseBackend {
        match self {
            DatabaseBackendConfig::Sled => DatabaseBackend::Sled,
            DatabaseBackendConfig::Redb => DatabaseBackend::Redb,
            DatabaseBackendConfig::Memory => DatabaseBackend::Memory,
            DatabaseBackendConfig::Auto => default_backend(),
        }
    }
}

fn default_database_backend() -> DatabaseBackendConfig {
    DatabaseBackendConfig::Auto
}

fn default_storage_path() -> String {
    "data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_backend: DatabaseBackendConfig::Auto,
            data_dir: default_storage_path(),
        }
    }
}

/// Lifecycle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// What uninstall does with a tenant record
    #[serde(default)]
    pub uninstall_policy: UninstallPolicy,
}

/// Migration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Handling of legacy statuses with no canonical mapping
    #[serde(default)]
    pub unknown_status: UnknownStatusPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "tenant_modules=debug"); `RUST_LOG` takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// JSON output (requires the `json-logging` feature)
    #[serde(default = "default_false")]
    pub json_format: bool,
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl ServiceConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let backend = self.storage.database_backend.resolve();
        if backend != DatabaseBackend::Memory && self.storage.data_dir.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "storage.data_dir cannot be empty for the {:?} backend",
                backend
            ));
        }

        #[cfg(not(feature = "sled"))]
        {
            if self.storage.database_backend == DatabaseBackendConfig::Sled {
                return Err(anyhow::anyhow!(
                    "Sled backend selected but the 'sled' feature is not enabled"
                ));
            }
        }
        #[cfg(not(feature = "redb"))]
        {
            if self.storage.database_backend == DatabaseBackendConfig::Redb {
                return Err(anyhow::anyhow!(
                    "Redb backend selected but the 'redb' feature is not enabled"
                ));
            }
        }

        if let Some(ref path) = self.catalog.path {
            if path.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("catalog.path cannot be empty when set"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert!(config.catalog.path.is_none());
        assert!(!config.catalog.fail_on_cycles);
        assert_eq!(config.storage.database_backend, DatabaseBackendConfig::Auto);
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.lifecycle.uninstall_policy, UninstallPolicy::Remove);
        assert_eq!(config.migration.unknown_status, UnknownStatusPolicy::Preserve);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_full_document() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [catalog]
            path = "catalog.toml"
            fail_on_cycles = true

            [storage]
            database_backend = "memory"
            data_dir = ""

            [lifecycle]
            uninstall_policy = "disable"

            [migration]
            unknown_status = "reject"

            [logging]
            filter = "tenant_modules=debug"
            json_format = true
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.path, Some(PathBuf::from("catalog.toml")));
        assert_eq!(config.storage.database_backend.resolve(), DatabaseBackend::Memory);
        assert_eq!(config.lifecycle.uninstall_policy, UninstallPolicy::Disable);
        assert_eq!(config.migration.unknown_status, UnknownStatusPolicy::Reject);
        let logging = config.logging.unwrap();
        assert_eq!(logging.filter.as_deref(), Some("tenant_modules=debug"));
        assert!(logging.json_format);
    }

    #[test]
    fn test_empty_data_dir_is_rejected_for_persistent_backends() {
        let err = ServiceConfig::from_toml_str(
            r#"
            [storage]
            database_backend = "auto"
            data_dir = " "
            "#,
        );
        // The default feature set resolves auto to a persistent backend
        if default_backend() != DatabaseBackend::Memory {
            assert!(err.is_err());
        }
    }

    #[test]
    fn test_unknown_policy_is_a_parse_error() {
        assert!(ServiceConfig::from_toml_str(
            r#"
            [lifecycle]
            uninstall_policy = "purge"
            "#
        )
        .is_err());
    }
}
