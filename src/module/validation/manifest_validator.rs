//! Descriptor validation
//!
//! Validates canonical module descriptors for structure before they enter the
//! catalog. Graph-level checks (cycles, dangling dependencies) live in
//! `registry::dependencies`.

use tracing::{debug, warn};

use crate::module::registry::manifest::ModuleDescriptor;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

/// Descriptor validator
pub struct ManifestValidator {
    /// Maximum key length
    max_key_len: usize,
}

impl ManifestValidator {
    /// Create a new descriptor validator
    pub fn new() -> Self {
        Self { max_key_len: 64 }
    }

    /// Validate a module descriptor
    pub fn validate(&self, descriptor: &ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if !self.is_valid_key(&descriptor.key) {
            errors.push(format!(
                "Invalid module key: {} (must be alphanumeric with dashes/underscores)",
                descriptor.key
            ));
        }

        if descriptor.version.is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if !self.is_valid_version(&descriptor.version) {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                descriptor.version
            ));
        }

        for dep in &descriptor.dependencies {
            if !self.is_valid_key(dep) {
                errors.push(format!("Invalid dependency key: {}", dep));
            }
        }

        if descriptor.is_system && descriptor.is_installable {
            errors.push("System modules cannot be user-installable".to_string());
        }

        if let Some(ref suite) = descriptor.suite {
            if !self.is_valid_key(suite) {
                errors.push(format!("Invalid suite name: {}", suite));
            }
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", descriptor.key);
            ValidationResult::Valid
        } else {
            warn!(
                "Descriptor validation failed for module {}: {:?}",
                descriptor.key, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate key format
    #[inline]
    fn is_valid_key(&self, key: &str) -> bool {
        if key.is_empty() || key.len() > self.max_key_len {
            return false;
        }

        if !key.chars().next().map_or(false, |c| c.is_ascii_alphanumeric()) {
            return false;
        }

        key.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Validate version format (semantic versioning)
    ///
    /// Accepts: major.minor[.patch][-prerelease][+build]
    #[inline]
    fn is_valid_version(&self, version: &str) -> bool {
        let base = version.split('+').next().unwrap_or_default();
        let version_part = base.split('-').next().unwrap_or_default();

        let nums: Vec<&str> = version_part.split('.').collect();
        if nums.len() < 2 || nums.len() > 3 {
            return false;
        }

        nums.iter().all(|n| {
            !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) && n.parse::<u32>().is_ok()
        })
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}
