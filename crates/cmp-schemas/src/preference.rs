use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(entity type, legal basis)` pair; each owns an independent enabled set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKey {
    Notices,
    PurposesConsent,
    PurposesLegint,
    SpecialPurposes,
    Features,
    SpecialFeatures,
    VendorsConsent,
    VendorsLegint,
}

impl GroupKey {
    pub const ALL: [GroupKey; 8] = [
        GroupKey::Notices,
        GroupKey::PurposesConsent,
        GroupKey::PurposesLegint,
        GroupKey::SpecialPurposes,
        GroupKey::Features,
        GroupKey::SpecialFeatures,
        GroupKey::VendorsConsent,
        GroupKey::VendorsLegint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::Notices => "notices",
            GroupKey::PurposesConsent => "purposesConsent",
            GroupKey::PurposesLegint => "purposesLegint",
            GroupKey::SpecialPurposes => "specialPurposes",
            GroupKey::Features => "features",
            GroupKey::SpecialFeatures => "specialFeatures",
            GroupKey::VendorsConsent => "vendorsConsent",
            GroupKey::VendorsLegint => "vendorsLegint",
        }
    }

    /// `true` for the TCF groups (everything except notices).
    pub fn is_tcf(&self) -> bool {
        !matches!(self, GroupKey::Notices)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        GroupKey::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| {
                let known: Vec<&str> = GroupKey::ALL.iter().map(|g| g.as_str()).collect();
                format!("unknown group '{t}'. expected one of: {}", known.join(" | "))
            })
    }
}

/// Tag persisted alongside a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMethod {
    Accept,
    Reject,
    Save,
    /// Proposed automatically because the global opt-out signal disabled something.
    Gpc,
}

impl ConsentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMethod::Accept => "accept",
            ConsentMethod::Reject => "reject",
            ConsentMethod::Save => "save",
            ConsentMethod::Gpc => "gpc",
        }
    }
}

/// Stored decision for one group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGroup {
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Ids shown to the visitor when the decision was made.
    #[serde(default)]
    pub served: Vec<String>,
}

impl StoredGroup {
    /// Prior choice for `id`, or `None` if the id was never served.
    ///
    /// A group written without `served` only proves what was enabled.
    pub fn prior_for(&self, id: &str) -> Option<bool> {
        let enabled = self.enabled.iter().any(|e| e == id);
        if self.served.is_empty() {
            return enabled.then_some(true);
        }
        if self.served.iter().any(|s| s == id) {
            Some(enabled)
        } else {
            None
        }
    }
}

/// Prior consent decision as read from (and written back to) the host store.
///
/// Never mutated after construction; every save produces a fresh value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPreference {
    pub history_id: String,
    pub consent_method: ConsentMethod,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub enabled_ids_by_basis: BTreeMap<GroupKey, StoredGroup>,
}

impl PersistedPreference {
    pub fn group(&self, key: GroupKey) -> Option<&StoredGroup> {
        self.enabled_ids_by_basis.get(&key)
    }

    /// Prior choice for one record, looked up by group and id.
    pub fn prior_for(&self, key: GroupKey, id: &str) -> Option<bool> {
        self.group(key).and_then(|g| g.prior_for(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_key_round_trips_through_str() {
        for g in GroupKey::ALL {
            assert_eq!(g.as_str().parse::<GroupKey>().unwrap(), g);
        }
        assert!("vendors".parse::<GroupKey>().is_err());
    }

    #[test]
    fn served_ids_distinguish_rejected_from_unknown() {
        let g = StoredGroup {
            enabled: vec!["essential".into()],
            served: vec!["essential".into(), "advertising".into()],
        };
        assert_eq!(g.prior_for("essential"), Some(true));
        assert_eq!(g.prior_for("advertising"), Some(false));
        assert_eq!(g.prior_for("analytics"), None);
    }

    #[test]
    fn missing_served_trusts_only_enabled_ids() {
        let g = StoredGroup {
            enabled: vec!["gvl.2".into()],
            served: vec![],
        };
        assert_eq!(g.prior_for("gvl.2"), Some(true));
        assert_eq!(g.prior_for("gvl.3"), None);
    }

    #[test]
    fn persisted_preference_uses_camel_case_group_keys() {
        let raw = r#"{
            "history_id": "h1",
            "consent_method": "reject",
            "timestamp": "2024-01-01T00:00:00Z",
            "enabled_ids_by_basis": {
                "vendorsLegint": { "enabled": ["gvl.2"] }
            }
        }"#;
        let p: PersistedPreference = serde_json::from_str(raw).unwrap();
        assert_eq!(p.consent_method, ConsentMethod::Reject);
        assert_eq!(p.prior_for(GroupKey::VendorsLegint, "gvl.2"), Some(true));
        assert_eq!(p.prior_for(GroupKey::VendorsConsent, "gvl.2"), None);
    }
}
