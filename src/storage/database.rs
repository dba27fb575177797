//! Database abstraction layer
//!
//! Provides a unified interface for different database backends (redb, sled, memory).
//! Allows switching between storage engines via feature flags and connection strings.

use anyhow::Result;
use std::path::Path;

/// Database abstraction trait
///
/// Provides a unified interface for key-value storage operations
/// that can be implemented by different backends.
pub trait Database: Send + Sync {
    /// Open a named tree/table
    fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>>;

    /// Flush all pending writes
    fn flush(&self) -> Result<()>;
}

/// Tree/Table abstraction trait
///
/// Represents a named collection of key-value pairs within a database.
pub trait Tree: Send + Sync {
    /// Insert a key-value pair
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove a key-value pair
    fn remove(&self, key: &[u8]) -> Result<()>;

    /// Check if a key exists
    fn contains_key(&self, key: &[u8]) -> Result<bool>;

    /// Clear all entries
    fn clear(&self) -> Result<()>;

    /// Get number of entries
    fn len(&self) -> Result<usize>;

    /// Check if tree is empty
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate over all key-value pairs
    fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_>;

    /// Iterate over key-value pairs whose key starts with `prefix`
    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
        let prefix = prefix.to_vec();
        Box::new(self.iter().filter(move |item| match item {
            Ok((key, _)) => key.starts_with(&prefix),
            Err(_) => true,
        }))
    }
}

/// Database backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sled,
    Redb,
    Memory,
}

/// Create a database instance based on backend type
pub fn create_database<P: AsRef<Path>>(
    data_dir: P,
    backend: DatabaseBackend,
) -> Result<Box<dyn Database>> {
    match backend {
        #[cfg(feature = "sled")]
        DatabaseBackend::Sled => Ok(Box::new(sled_impl::SledDatabase::new(data_dir)?)),
        #[cfg(not(feature = "sled"))]
        DatabaseBackend::Sled => Err(anyhow::anyhow!(
            "Sled backend not available (feature not enabled)"
        )),
        #[cfg(feature = "redb")]
        DatabaseBackend::Redb => Ok(Box::new(redb_impl::RedbDatabase::new(data_dir)?)),
        #[cfg(not(feature = "redb"))]
        DatabaseBackend::Redb => Err(anyhow::anyhow!(
            "Redb backend not available (feature not enabled)"
        )),
        DatabaseBackend::Memory => {
            let _ = data_dir;
            Ok(Box::new(memory_impl::MemoryDatabase::new()))
        }
    }
}

/// Get default database backend
///
/// Returns the preferred persistent backend (redb if available, otherwise sled,
/// otherwise the in-memory backend).
pub fn default_backend() -> DatabaseBackend {
    #[cfg(feature = "redb")]
    {
        DatabaseBackend::Redb
    }
    #[cfg(all(not(feature = "redb"), feature = "sled"))]
    {
        DatabaseBackend::Sled
    }
    #[cfg(all(not(feature = "redb"), not(feature = "sled")))]
    {
        DatabaseBackend::Memory
    }
}

/// Get fallback database backend
///
/// Returns an alternative persistent backend if the primary fails.
/// Returns None if no fallback is available. The in-memory backend is never
/// used as a fallback since it would silently drop tenant state.
pub fn fallback_backend(primary: DatabaseBackend) -> Option<DatabaseBackend> {
    match primary {
        DatabaseBackend::Redb => {
            #[cfg(feature = "sled")]
            {
                Some(DatabaseBackend::Sled)
            }
            #[cfg(not(feature = "sled"))]
            {
                None
            }
        }
        DatabaseBackend::Sled => {
            #[cfg(feature = "redb")]
            {
                Some(DatabaseBackend::Redb)
            }
            #[cfg(not(feature = "redb"))]
            {
                None
            }
        }
        DatabaseBackend::Memory => None,
    }
}

// Sled implementation
#[cfg(feature = "sled")]
mod sled_impl {
    use super::{Database, Tree};
    use anyhow::Result;
    use sled::Db;
    use std::path::Path;
    use std::sync::Arc;

    pub struct SledDatabase {
        db: Arc<Db>,
    }

    impl SledDatabase {
        pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
            let db = sled::open(data_dir)?;
            Ok(Self { db: Arc::new(db) })
        }
    }

    impl Database for SledDatabase {
        fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>> {
            let tree = self.db.open_tree(name)?;
            Ok(Box::new(SledTree {
                tree: Arc::new(tree),
            }))
        }

        fn flush(&self) -> Result<()> {
            self.db.flush()?;
            Ok(())
        }
    }

    struct SledTree {
        tree: Arc<sled::Tree>,
    }

    impl Tree for SledTree {
        fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
            self.tree.insert(key, value)?;
            Ok(())
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.tree.get(key)?.map(|v| v.to_vec()))
        }

        fn remove(&self, key: &[u8]) -> Result<()> {
            self.tree.remove(key)?;
            Ok(())
        }

        fn contains_key(&self, key: &[u8]) -> Result<bool> {
            Ok(self.tree.contains_key(key)?)
        }

        fn clear(&self) -> Result<()> {
            self.tree.clear()?;
            Ok(())
        }

        fn len(&self) -> Result<usize> {
            Ok(self.tree.len())
        }

        fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            Box::new(self.tree.iter().map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| anyhow::anyhow!("Sled iteration error: {}", e))
            }))
        }

        fn scan_prefix(
            &self,
            prefix: &[u8],
        ) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            Box::new(self.tree.scan_prefix(prefix).map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| anyhow::anyhow!("Sled iteration error: {}", e))
            }))
        }
    }
}

// Redb implementation
#[cfg(feature = "redb")]
mod redb_impl {
    use super::{Database, Tree};
    use anyhow::Result;
    use redb::{Database as RedbDb, ReadableTable, TableDefinition};
    use std::path::Path;
    use std::sync::Arc;

    // Redb requires static table definitions, so every known tree is declared here
    static ORGANIZATION_MODULES_TABLE: TableDefinition<&[u8], &[u8]> =
        TableDefinition::new("organization_modules");
    static UNRECOGNIZED_STATUSES_TABLE: TableDefinition<&[u8], &[u8]> =
        TableDefinition::new("organization_modules_unrecognized");
    static LEGACY_ORGANIZATIONS_TABLE: TableDefinition<&[u8], &[u8]> =
        TableDefinition::new("organizations");
    static LEGACY_ORG_MODULES_TABLE: TableDefinition<&[u8], &[u8]> =
        TableDefinition::new("org_modules");

    static ALL_TABLES: [&TableDefinition<'static, &'static [u8], &'static [u8]>; 4] = [
        &ORGANIZATION_MODULES_TABLE,
        &UNRECOGNIZED_STATUSES_TABLE,
        &LEGACY_ORGANIZATIONS_TABLE,
        &LEGACY_ORG_MODULES_TABLE,
    ];

    pub struct RedbDatabase {
        db: Arc<RedbDb>,
    }

    impl RedbDatabase {
        pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
            std::fs::create_dir_all(data_dir.as_ref())?;
            let db_path = data_dir.as_ref().join("redb.db");
            let db = if db_path.exists() {
                RedbDb::open(&db_path)?
            } else {
                RedbDb::create(&db_path)?
            };

            // Open all tables once so read transactions never hit a missing table
            let write_txn = db.begin_write()?;
            for table_def in ALL_TABLES.iter() {
                let _ = write_txn.open_table(**table_def)?;
            }
            write_txn.commit()?;

            Ok(Self { db: Arc::new(db) })
        }

        fn get_table_def(
            &self,
            name: &str,
        ) -> Option<&'static TableDefinition<'static, &'static [u8], &'static [u8]>> {
            match name {
                "organization_modules" => Some(&ORGANIZATION_MODULES_TABLE),
                "organization_modules_unrecognized" => Some(&UNRECOGNIZED_STATUSES_TABLE),
                "organizations" => Some(&LEGACY_ORGANIZATIONS_TABLE),
                "org_modules" => Some(&LEGACY_ORG_MODULES_TABLE),
                _ => None,
            }
        }
    }

    impl Database for RedbDatabase {
        fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>> {
            let table_def = self.get_table_def(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown table name: {}. Redb requires pre-defined tables.",
                    name
                )
            })?;

            Ok(Box::new(RedbTree {
                db: Arc::clone(&self.db),
                table_def,
            }))
        }

        fn flush(&self) -> Result<()> {
            // Redb flushes on transaction commit; an empty commit forces a sync point
            let write_txn = self.db.begin_write()?;
            write_txn.commit()?;
            Ok(())
        }
    }

    struct RedbTree {
        db: Arc<RedbDb>,
        table_def: &'static TableDefinition<'static, &'static [u8], &'static [u8]>,
    }

    impl Tree for RedbTree {
        fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
            let write_txn = self.db.begin_write()?;
            {
                let mut table = write_txn.open_table(*self.table_def)?;
                table.insert(key, value)?;
            }
            write_txn.commit()?;
            Ok(())
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(*self.table_def)?;
            let result = table.get(key)?.map(|v| v.value().to_vec());
            Ok(result)
        }

        fn remove(&self, key: &[u8]) -> Result<()> {
            let write_txn = self.db.begin_write()?;
            {
                let mut table = write_txn.open_table(*self.table_def)?;
                table.remove(key)?;
            }
            write_txn.commit()?;
            Ok(())
        }

        fn contains_key(&self, key: &[u8]) -> Result<bool> {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(*self.table_def)?;
            let result = table.get(key)?.is_some();
            Ok(result)
        }

        fn clear(&self) -> Result<()> {
            let write_txn = self.db.begin_write()?;
            {
                let mut table = write_txn.open_table(*self.table_def)?;
                let mut keys = Vec::new();
                for item in table.range::<&[u8]>(..)? {
                    let (key, _) = item?;
                    keys.push(key.value().to_vec());
                }
                for key in keys {
                    table.remove(key.as_slice())?;
                }
            }
            write_txn.commit()?;
            Ok(())
        }

        fn len(&self) -> Result<usize> {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(*self.table_def)?;
            Ok(table.len()? as usize)
        }

        fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            Box::new(self.read_prefix(&[]).into_iter())
        }

        fn scan_prefix(
            &self,
            prefix: &[u8],
        ) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            Box::new(self.read_prefix(prefix).into_iter())
        }
    }

    impl RedbTree {
        /// Entries whose key starts with `prefix`, read from `prefix..` and
        /// stopping at the first key outside it
        ///
        /// The read transaction must outlive the range, so items are collected up front.
        fn read_prefix(&self, prefix: &[u8]) -> Vec<Result<(Vec<u8>, Vec<u8>)>> {
            let read_txn = match self.db.begin_read() {
                Ok(txn) => txn,
                Err(e) => {
                    return vec![Err(anyhow::anyhow!(
                        "Failed to begin read transaction: {}",
                        e
                    ))];
                }
            };

            let table = match read_txn.open_table(*self.table_def) {
                Ok(tbl) => tbl,
                Err(e) => return vec![Err(anyhow::anyhow!("Failed to open table: {}", e))],
            };

            let mut items = Vec::new();
            match table.range::<&[u8]>(prefix..) {
                Ok(range_iter) => {
                    for item_result in range_iter {
                        match item_result {
                            Ok((key, value)) => {
                                let key = key.value().to_vec();
                                if !key.starts_with(prefix) {
                                    break;
                                }
                                items.push(Ok((key, value.value().to_vec())));
                            }
                            Err(e) => {
                                items.push(Err(anyhow::anyhow!("Redb iteration error: {}", e)));
                            }
                        }
                    }
                }
                Err(e) => {
                    items.push(Err(anyhow::anyhow!("Failed to create range: {}", e)));
                }
            }
            items
        }
    }
}

// In-memory implementation, used for `memory://` data sources and tests
mod memory_impl {
    use super::{Database, Tree};
    use anyhow::Result;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, RwLock};

    type Table = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

    pub struct MemoryDatabase {
        tables: RwLock<HashMap<String, Table>>,
    }

    impl MemoryDatabase {
        pub fn new() -> Self {
            Self {
                tables: RwLock::new(HashMap::new()),
            }
        }
    }

    fn poisoned<T>(_: T) -> anyhow::Error {
        anyhow::anyhow!("Memory table lock poisoned")
    }

    impl Database for MemoryDatabase {
        fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>> {
            let mut tables = self.tables.write().map_err(poisoned)?;
            let table = tables
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())));
            Ok(Box::new(MemoryTree {
                table: Arc::clone(table),
            }))
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    struct MemoryTree {
        table: Table,
    }

    impl Tree for MemoryTree {
        fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
            self.table
                .write()
                .map_err(poisoned)?
                .insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.table.read().map_err(poisoned)?.get(key).cloned())
        }

        fn remove(&self, key: &[u8]) -> Result<()> {
            self.table.write().map_err(poisoned)?.remove(key);
            Ok(())
        }

        fn contains_key(&self, key: &[u8]) -> Result<bool> {
            Ok(self.table.read().map_err(poisoned)?.contains_key(key))
        }

        fn clear(&self) -> Result<()> {
            self.table.write().map_err(poisoned)?.clear();
            Ok(())
        }

        fn len(&self) -> Result<usize> {
            Ok(self.table.read().map_err(poisoned)?.len())
        }

        fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            let items: Vec<Result<(Vec<u8>, Vec<u8>)>> = match self.table.read() {
                Ok(table) => table
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.clone())))
                    .collect(),
                Err(e) => vec![Err(poisoned(e))],
            };
            Box::new(items.into_iter())
        }
    }
}
