use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ExperienceError;

/// How a notice collects consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMechanism {
    OptIn,
    OptOut,
    NoticeOnly,
}

impl ConsentMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMechanism::OptIn => "opt_in",
            ConsentMechanism::OptOut => "opt_out",
            ConsentMechanism::NoticeOnly => "notice_only",
        }
    }

    /// Preference in effect before the visitor has said anything.
    pub fn derived_default(&self) -> UserConsentPreference {
        match self {
            ConsentMechanism::OptIn => UserConsentPreference::OptOut,
            ConsentMechanism::OptOut => UserConsentPreference::OptIn,
            ConsentMechanism::NoticeOnly => UserConsentPreference::Acknowledge,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserConsentPreference {
    OptIn,
    OptOut,
    Acknowledge,
}

impl UserConsentPreference {
    /// `opt_in` and `acknowledge` leave the record enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, UserConsentPreference::OptOut)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    #[default]
    Frontend,
    SystemWide,
    NotApplicable,
}

/// A privacy notice as served in the experience payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyNotice {
    pub notice_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_history_id: Option<String>,
    pub consent_mechanism: ConsentMechanism,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<UserConsentPreference>,
    /// Empty means the notice applies in every region.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Whether the notice honors a global opt-out signal (e.g. GPC).
    #[serde(default)]
    pub has_gpc_flag: bool,
    #[serde(default)]
    pub enforcement_level: EnforcementLevel,
    #[serde(default)]
    pub data_uses: Vec<String>,
}

impl PrivacyNotice {
    /// Declared default, falling back to the one implied by the mechanism.
    pub fn effective_default(&self) -> UserConsentPreference {
        self.default_preference
            .unwrap_or_else(|| self.consent_mechanism.derived_default())
    }

    pub fn applies_to(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|r| r == region)
    }
}

/// Line item nested in a vendor or purpose for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPurpose {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<String>,
}

pub type EmbeddedFeature = EmbeddedPurpose;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedVendor {
    pub id: String,
    pub name: String,
}

/// Purpose offered under consent or legitimate interest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcfPurposeRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<UserConsentPreference>,
    #[serde(default)]
    pub vendors: Vec<EmbeddedVendor>,
}

/// Special purpose, feature or special feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcfFeatureRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<UserConsentPreference>,
    #[serde(default)]
    pub vendors: Vec<EmbeddedVendor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcfVendorConsentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<UserConsentPreference>,
    #[serde(default)]
    pub has_gpc_flag: bool,
    #[serde(default)]
    pub purpose_consents: Vec<EmbeddedPurpose>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcfVendorLegintRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<UserConsentPreference>,
    #[serde(default)]
    pub has_gpc_flag: bool,
    #[serde(default)]
    pub purpose_legitimate_interests: Vec<EmbeddedPurpose>,
}

/// Descriptive relationship data for a vendor (storage, disclosures, features).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcfVendorRelationship {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub special_purposes: Vec<EmbeddedPurpose>,
    #[serde(default)]
    pub features: Vec<EmbeddedFeature>,
    #[serde(default)]
    pub special_features: Vec<EmbeddedFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_cookies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_max_age_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_refresh: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_non_cookie_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legitimate_interest_disclosure_url: Option<String>,
}

/// Region-scoped bundle of notices and TCF records currently in effect.
///
/// Every list defaults to empty: a payload with nothing for the region is a
/// valid (empty) experience, not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub region: String,
    /// Version token for the notice/vendor set a stored decision is made against.
    #[serde(default)]
    pub history_id: String,
    #[serde(default)]
    pub privacy_notices: Vec<PrivacyNotice>,

    #[serde(default)]
    pub tcf_purpose_consents: Vec<TcfPurposeRecord>,
    #[serde(default)]
    pub tcf_purpose_legitimate_interests: Vec<TcfPurposeRecord>,
    #[serde(default)]
    pub tcf_special_purposes: Vec<TcfFeatureRecord>,
    #[serde(default)]
    pub tcf_features: Vec<TcfFeatureRecord>,
    #[serde(default)]
    pub tcf_special_features: Vec<TcfFeatureRecord>,

    #[serde(default)]
    pub tcf_vendor_consents: Vec<TcfVendorConsentRecord>,
    #[serde(default)]
    pub tcf_vendor_legitimate_interests: Vec<TcfVendorLegintRecord>,
    #[serde(default)]
    pub tcf_vendor_relationships: Vec<TcfVendorRelationship>,

    /// Raw GVL snapshot. Kept untyped here; see [`crate::GvlSnapshot::from_value`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gvl: Option<Value>,
}

impl Experience {
    /// `true` when any TCF list is populated.
    pub fn is_tcf(&self) -> bool {
        !(self.tcf_purpose_consents.is_empty()
            && self.tcf_purpose_legitimate_interests.is_empty()
            && self.tcf_special_purposes.is_empty()
            && self.tcf_features.is_empty()
            && self.tcf_special_features.is_empty()
            && self.tcf_vendor_consents.is_empty()
            && self.tcf_vendor_legitimate_interests.is_empty()
            && self.tcf_vendor_relationships.is_empty())
    }
}

/// Parse an experience payload from JSON text.
pub fn parse_experience(raw: &str) -> Result<Experience, ExperienceError> {
    let exp: Experience = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;
    Ok(exp)
}

/// Notices that apply to `region`, in declaration order.
pub fn notices_for_region<'a>(experience: &'a Experience, region: &str) -> Vec<&'a PrivacyNotice> {
    experience
        .privacy_notices
        .iter()
        .filter(|n| n.applies_to(region))
        .collect()
}
