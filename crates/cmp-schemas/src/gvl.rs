//! Global Vendor List snapshot.
//!
//! The GVL only supplies descriptive metadata (data declarations, storage
//! disclosure). It is parsed leniently: a malformed or absent snapshot yields
//! `None` and every vendor is then treated as unlisted.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Prefix used by experience vendor ids that refer to a GVL entry.
pub const GVL_ID_PREFIX: &str = "gvl.";

/// Numeric GVL id for an experience vendor id (`"gvl.42"` -> `42`).
///
/// Plain ids (`"ac.7"`, `"my_system"`, `"42"`) are not GVL ids.
pub fn gvl_vendor_id(vendor_id: &str) -> Option<u32> {
    vendor_id
        .strip_prefix(GVL_ID_PREFIX)
        .and_then(|n| n.parse::<u32>().ok())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GvlVendor {
    pub id: u32,
    pub name: String,
    /// Data category ids. `None` when the GVL entry carries no declaration.
    pub data_declaration: Option<Vec<u32>>,
    pub device_storage_disclosure_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GvlDataCategory {
    pub id: u32,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GvlSnapshot {
    pub vendor_list_version: Option<u32>,
    pub vendors: BTreeMap<u32, GvlVendor>,
    pub data_categories: BTreeMap<u32, GvlDataCategory>,
}

// Wire shape (IAB camelCase, map keys are stringified ids).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGvl {
    #[serde(default)]
    vendor_list_version: Option<u32>,
    #[serde(default)]
    vendors: BTreeMap<String, RawGvlVendor>,
    #[serde(default)]
    data_categories: BTreeMap<String, RawGvlDataCategory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGvlVendor {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data_declaration: Option<Vec<u32>>,
    #[serde(default)]
    device_storage_disclosure_url: Option<String>,
}

#[derive(Deserialize)]
struct RawGvlDataCategory {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

impl GvlSnapshot {
    /// Lenient conversion from an untyped JSON value.
    ///
    /// Entries whose key is not numeric are skipped. Anything that does not
    /// look like a GVL at all yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            warn!("gvl snapshot is not a JSON object; treating all vendors as unlisted");
            return None;
        }
        let raw: RawGvl = match RawGvl::deserialize(value) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "malformed gvl snapshot; treating all vendors as unlisted");
                return None;
            }
        };

        let mut vendors = BTreeMap::new();
        for (key, v) in raw.vendors {
            let Some(id) = key.parse::<u32>().ok().or(v.id) else {
                warn!(key = %key, "skipping gvl vendor with non-numeric key");
                continue;
            };
            vendors.insert(
                id,
                GvlVendor {
                    id,
                    name: v.name,
                    data_declaration: v.data_declaration,
                    device_storage_disclosure_url: v.device_storage_disclosure_url,
                },
            );
        }

        let mut data_categories = BTreeMap::new();
        for (key, c) in raw.data_categories {
            let Some(id) = key.parse::<u32>().ok().or(c.id) else {
                continue;
            };
            data_categories.insert(
                id,
                GvlDataCategory {
                    id,
                    name: c.name,
                    description: c.description,
                },
            );
        }

        Some(Self {
            vendor_list_version: raw.vendor_list_version,
            vendors,
            data_categories,
        })
    }

    /// Optional-in, optional-out convenience for `Experience::gvl`.
    pub fn from_optional(value: Option<&Value>) -> Option<Self> {
        value.and_then(Self::from_value)
    }

    /// GVL entry for an experience vendor id, if the id is a listed GVL id.
    pub fn vendor(&self, vendor_id: &str) -> Option<&GvlVendor> {
        gvl_vendor_id(vendor_id).and_then(|n| self.vendors.get(&n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gvl_prefix_decodes_numeric_id() {
        assert_eq!(gvl_vendor_id("gvl.2"), Some(2));
        assert_eq!(gvl_vendor_id("gvl.x"), None);
        assert_eq!(gvl_vendor_id("ac.2"), None);
        assert_eq!(gvl_vendor_id("2"), None);
    }

    #[test]
    fn snapshot_parses_vendors_and_categories() {
        let gvl = GvlSnapshot::from_value(&json!({
            "vendorListVersion": 42,
            "vendors": {
                "2": { "id": 2, "name": "Captify", "dataDeclaration": [1, 3] },
                "bogus": { "name": "ignored" }
            },
            "dataCategories": {
                "1": { "id": 1, "name": "IP addresses" }
            }
        }))
        .unwrap();

        assert_eq!(gvl.vendor_list_version, Some(42));
        assert_eq!(gvl.vendors.len(), 1);
        assert_eq!(gvl.vendor("gvl.2").unwrap().data_declaration, Some(vec![1, 3]));
        assert!(gvl.vendor("ac.2").is_none());
        assert_eq!(gvl.data_categories[&1].name, "IP addresses");
    }

    #[test]
    fn malformed_snapshot_degrades_to_none() {
        assert!(GvlSnapshot::from_value(&json!("not a gvl")).is_none());
        assert!(GvlSnapshot::from_value(&json!({ "vendors": [1, 2, 3] })).is_none());
        assert!(GvlSnapshot::from_optional(None).is_none());
    }
}
