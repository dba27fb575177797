//! Module descriptor validation
//!
//! Provides validation for catalog descriptors before they are registered.

pub mod manifest_validator;

pub use manifest_validator::{ManifestValidator, ValidationResult};
