//! Module system
//!
//! Catalog of feature modules, their dependency graph, and the per-organization
//! lifecycle of installed modules.
//!
//! ## Architecture
//!
//! - **Catalog**: immutable descriptors built once at startup
//! - **Registry**: read-only lookups, suites and dependents over the catalog
//! - **Lifecycle**: install/uninstall/suite/configure planning over a tenant snapshot
//! - **Store**: persistence seam for per-organization records

pub mod lifecycle;
pub mod registry;
pub mod store;
pub mod traits;
pub mod validation;

pub use lifecycle::{LifecycleOrchestrator, LifecyclePlanner, Persisted, UninstallPolicy, WriteOutcome};
pub use registry::{ModuleCatalog, ModuleDependencies, ModuleDescriptor, ModuleRegistry};
pub use store::{DatabaseModuleStore, MemoryModuleStore};
pub use traits::{
    CatalogError, KeyError, KeyErrorKind, ModuleStatus, OrganizationModuleRecord,
    OrganizationModuleStore, UpsertOutcome,
};
