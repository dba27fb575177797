//! Module registry
//!
//! Handles the module catalog, descriptor canonicalization, dependency graph
//! validation, and read-only registry queries.

pub mod catalog;
pub mod dependencies;
pub mod manifest;
pub mod query;

pub use catalog::ModuleCatalog;
pub use dependencies::{GraphValidation, MissingDependency, ModuleDependencies};
pub use manifest::{canonical_key, ModuleDescriptor, RawModuleDescriptor};
pub use query::{KeyIndex, ModuleRegistry, Suite};
