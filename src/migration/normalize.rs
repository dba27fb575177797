//! Status normalization
//!
//! Maps the status spellings accumulated across schema versions onto the
//! three-state lifecycle vocabulary. Normalization is total: every input yields
//! a canonical status, an unrecognized passthrough, or nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::module::traits::ModuleStatus;

/// A legacy status as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStatus {
    /// A bare status string
    Text(String),
    /// A document carrying its status in a nested `status` field
    Nested(Box<RawStatus>),
    /// Null, absent, or a value with no usable status
    Missing,
}

impl RawStatus {
    /// Interpret an arbitrary JSON value as a status
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => RawStatus::Text(s.clone()),
            Value::Object(map) => match map.get("status") {
                Some(inner) => RawStatus::Nested(Box::new(RawStatus::from_json(inner))),
                None => RawStatus::Missing,
            },
            _ => RawStatus::Missing,
        }
    }
}

impl From<&str> for RawStatus {
    fn from(s: &str) -> Self {
        RawStatus::Text(s.to_string())
    }
}

/// Normalized status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedStatus {
    Canonical(ModuleStatus),
    /// A non-empty status with no canonical mapping, kept verbatim
    Unrecognized(String),
}

impl NormalizedStatus {
    pub fn canonical(&self) -> Option<ModuleStatus> {
        match self {
            NormalizedStatus::Canonical(status) => Some(*status),
            NormalizedStatus::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for NormalizedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedStatus::Canonical(status) => write!(f, "{}", status),
            NormalizedStatus::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Map a status string, ignoring case and surrounding whitespace
pub fn normalize_str(raw: &str) -> Option<NormalizedStatus> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let status = match trimmed.to_lowercase().as_str() {
        "disabled" | "inactive" => ModuleStatus::Disabled,
        "configured" | "ready" => ModuleStatus::Configured,
        "enabled" | "enabled_unconfigured" | "pendingconfig" | "pending_config" => {
            ModuleStatus::EnabledUnconfigured
        }
        // Original spelling is kept, not the lowercased one
        _ => return Some(NormalizedStatus::Unrecognized(raw.to_string())),
    };
    Some(NormalizedStatus::Canonical(status))
}

/// Normalize a raw status
pub fn normalize(raw: &RawStatus) -> Option<NormalizedStatus> {
    match raw {
        RawStatus::Text(s) => normalize_str(s),
        RawStatus::Nested(inner) => normalize(inner),
        RawStatus::Missing => None,
    }
}

/// Normalize a JSON status value
pub fn normalize_json(value: &Value) -> Option<NormalizedStatus> {
    normalize(&RawStatus::from_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(status: ModuleStatus) -> Option<NormalizedStatus> {
        Some(NormalizedStatus::Canonical(status))
    }

    #[test]
    fn test_known_spellings() {
        assert_eq!(normalize_str("READY "), canonical(ModuleStatus::Configured));
        assert_eq!(normalize_str("Inactive"), canonical(ModuleStatus::Disabled));
        assert_eq!(
            normalize_str("pendingConfig"),
            canonical(ModuleStatus::EnabledUnconfigured)
        );
        assert_eq!(
            normalize_str("enabled"),
            canonical(ModuleStatus::EnabledUnconfigured)
        );
    }

    #[test]
    fn test_nested_status() {
        assert_eq!(
            normalize_json(&json!({ "status": "disabled" })),
            canonical(ModuleStatus::Disabled)
        );
        assert_eq!(
            normalize_json(&json!({ "status": { "status": "ready" } })),
            canonical(ModuleStatus::Configured)
        );
        assert_eq!(normalize_json(&json!({ "state": "ready" })), None);
    }

    #[test]
    fn test_empty_and_missing() {
        assert_eq!(normalize_str(""), None);
        assert_eq!(normalize_str("   "), None);
        assert_eq!(normalize_json(&Value::Null), None);
        assert_eq!(normalize_json(&json!(false)), None);
        assert_eq!(normalize_json(&json!(3)), None);
    }

    #[test]
    fn test_unknown_status_passes_through() {
        assert_eq!(
            normalize_str("weird_future_status"),
            Some(NormalizedStatus::Unrecognized("weird_future_status".into()))
        );
        let passthrough = normalize_str(" Archived").unwrap();
        assert_eq!(passthrough.canonical(), None);
        assert_eq!(passthrough.to_string(), " Archived");
    }
}
