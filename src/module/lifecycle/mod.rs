//! Organization module lifecycle
//!
//! Install, uninstall, suite and configure operations over per-organization
//! module records.

pub mod orchestrator;
pub mod plan;
pub mod results;

pub use orchestrator::LifecycleOrchestrator;
pub use plan::{Closure, LifecyclePlanner, TenantModules, UninstallPolicy};
pub use results::{
    AvailableModule, Blocker, InstallResult, InstalledModule, Persisted, SuiteAction,
    SuiteResult, UninstallResult, WriteOutcome,
};
