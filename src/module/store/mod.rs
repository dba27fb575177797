//! Organization module stores
//!
//! Implementations of [`OrganizationModuleStore`]: an in-memory store for tests
//! and embedding, and a store over the storage layer's key-value trees.
//!
//! [`OrganizationModuleStore`]: crate::module::traits::OrganizationModuleStore

pub mod database;
pub mod memory;

pub use database::{record_key, DatabaseModuleStore};
pub use memory::MemoryModuleStore;
