//! Legacy document shapes
//!
//! Two historical sources hold module state: organization documents with
//! embedded `moduleStates`/`moduleSettings` maps, and a flat collection of
//! per-organization module documents. Both are decoded leniently since older
//! documents disagree on field names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::module::registry::canonical_key;

/// Organization document with embedded module maps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOrganization {
    #[serde(alias = "_id", default)]
    pub id: String,
    /// Module key to raw status (a string or a `{ "status": ... }` document)
    #[serde(default)]
    pub module_states: Map<String, Value>,
    /// Module key to tenant settings
    #[serde(default)]
    pub module_settings: Map<String, Value>,
}

/// Flat "org modules" document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOrgModule {
    #[serde(alias = "organization", alias = "orgId", default)]
    pub organization_id: String,
    #[serde(alias = "moduleKey", alias = "module", default)]
    pub key: String,
    #[serde(default)]
    pub status: Value,
    #[serde(alias = "settings", default)]
    pub config: Option<Value>,
}

impl LegacyOrganization {
    /// Decode an organization document; the tree key stands in for a missing id
    pub fn decode(tree_key: &[u8], bytes: &[u8]) -> serde_json::Result<Self> {
        let mut organization: Self = serde_json::from_slice(bytes)?;
        if organization.id.trim().is_empty() {
            organization.id = String::from_utf8_lossy(tree_key).into_owned();
        }
        Ok(organization)
    }

    /// Settings of a module; falls back to a case-insensitive key match
    pub fn settings_for(&self, key: &str) -> Option<&Value> {
        self.module_settings.get(key).or_else(|| {
            let wanted = canonical_key(key);
            self.module_settings
                .iter()
                .find(|(k, _)| canonical_key(k) == wanted)
                .map(|(_, v)| v)
        })
    }
}

impl LegacyOrgModule {
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_organization_field_aliases() {
        let doc = json!({
            "_id": "org1",
            "name": "Acme",
            "moduleStates": { "pos": "ready", "sales": { "status": "enabled" } },
            "moduleSettings": { "pos": { "registers": 2 } }
        });
        let org = LegacyOrganization::decode(b"ignored", doc.to_string().as_bytes()).unwrap();
        assert_eq!(org.id, "org1");
        assert_eq!(org.module_states.len(), 2);
        assert_eq!(org.module_settings["pos"]["registers"], 2);
        assert_eq!(org.settings_for("POS"), Some(&json!({ "registers": 2 })));
        assert_eq!(org.settings_for("sales"), None);
    }

    #[test]
    fn test_organization_id_falls_back_to_tree_key() {
        let org = LegacyOrganization::decode(b"org7", br#"{"moduleStates":{}}"#).unwrap();
        assert_eq!(org.id, "org7");
    }

    #[test]
    fn test_org_module_aliases() {
        let doc = br#"{"orgId":"org1","moduleKey":"POS","status":"READY","settings":{"a":1}}"#;
        let module = LegacyOrgModule::decode(doc).unwrap();
        assert_eq!(module.organization_id, "org1");
        assert_eq!(module.key, "POS");
        assert_eq!(module.status, json!("READY"));
        assert_eq!(module.config, Some(json!({ "a": 1 })));
    }
}
