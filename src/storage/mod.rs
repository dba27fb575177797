//! Storage layer for tenant module state
//!
//! Provides the persistent key-value backend behind the organization module
//! store and the migration pass. Supports multiple database backends via
//! feature flags (redb, sled) plus an in-memory backend.

pub mod database;

use anyhow::Result;
use database::{create_database, default_backend, fallback_backend, Database, DatabaseBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Canonical per-(organization, key) records
pub const ORGANIZATION_MODULES_TREE: &str = "organization_modules";
/// Legacy statuses the normalizer could not map, kept verbatim
pub const UNRECOGNIZED_STATUSES_TREE: &str = "organization_modules_unrecognized";
/// Legacy organization documents with embedded `moduleStates`/`moduleSettings`
pub const LEGACY_ORGANIZATIONS_TREE: &str = "organizations";
/// Legacy flat "org modules" collection
pub const LEGACY_ORG_MODULES_TREE: &str = "org_modules";

/// Parsed data-source connection string
///
/// Accepted forms: `redb://<dir>`, `sled://<dir>`, `memory://`, or a bare
/// directory path (default backend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub backend: DatabaseBackend,
    pub data_dir: PathBuf,
}

impl DataSource {
    /// Parse a connection string
    pub fn parse(connection: &str) -> Result<Self> {
        let connection = connection.trim();
        if connection.is_empty() {
            return Err(anyhow::anyhow!("Data source connection string cannot be empty"));
        }

        let (backend, rest) = match connection.split_once("://") {
            Some(("redb", rest)) => (DatabaseBackend::Redb, rest),
            Some(("sled", rest)) => (DatabaseBackend::Sled, rest),
            Some(("memory", rest)) => (DatabaseBackend::Memory, rest),
            Some((scheme, _)) => {
                return Err(anyhow::anyhow!(
                    "Unsupported data source scheme: {} (expected redb, sled or memory)",
                    scheme
                ));
            }
            None => (default_backend(), connection),
        };

        if backend != DatabaseBackend::Memory && rest.is_empty() {
            return Err(anyhow::anyhow!(
                "Data source {:?} requires a data directory",
                backend
            ));
        }

        Ok(Self {
            backend,
            data_dir: PathBuf::from(rest),
        })
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            DatabaseBackend::Redb => write!(f, "redb://{}", self.data_dir.display()),
            DatabaseBackend::Sled => write!(f, "sled://{}", self.data_dir.display()),
            DatabaseBackend::Memory => write!(f, "memory://"),
        }
    }
}

/// Storage manager that owns the database handle
pub struct Storage {
    db: Arc<dyn Database>,
    backend: DatabaseBackend,
}

impl Storage {
    /// Create a new storage instance with default backend
    ///
    /// Attempts to use the default backend (redb), and gracefully falls back
    /// to sled if redb fails and sled is available.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let default = default_backend();

        match Self::with_backend(data_dir.as_ref(), default) {
            Ok(storage) => Ok(storage),
            Err(e) => {
                if let Some(fallback_backend) = fallback_backend(default) {
                    warn!(
                        "Failed to initialize {:?} backend: {}. Falling back to {:?}.",
                        default, e, fallback_backend
                    );
                    Self::with_backend(data_dir, fallback_backend)
                } else {
                    Err(anyhow::anyhow!(
                        "Failed to initialize {:?} backend: {}. No fallback backend available.",
                        default,
                        e
                    ))
                }
            }
        }
    }

    /// Create a new storage instance with specified backend
    pub fn with_backend<P: AsRef<Path>>(data_dir: P, backend: DatabaseBackend) -> Result<Self> {
        let db = Arc::from(create_database(data_dir.as_ref(), backend)?);
        info!(
            "Storage initialized with {:?} backend at {:?}",
            backend,
            data_dir.as_ref()
        );
        Ok(Self { db, backend })
    }

    /// Create a purely in-memory storage instance
    pub fn in_memory() -> Result<Self> {
        Self::with_backend("", DatabaseBackend::Memory)
    }

    /// Open the storage named by a data source
    pub fn open(source: &DataSource) -> Result<Self> {
        Self::with_backend(&source.data_dir, source.backend)
    }

    /// Shared database handle
    pub fn database(&self) -> Arc<dyn Database> {
        Arc::clone(&self.db)
    }

    /// Backend in use
    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()
    }
}
