use std::collections::{BTreeMap, BTreeSet};

use cmp_schemas::{
    gvl_vendor_id, EmbeddedFeature, EmbeddedPurpose, Experience, GvlSnapshot, GvlVendor,
    TcfVendorRelationship, UserConsentPreference,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Named data category copied from the GVL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataCategory {
    pub id: u32,
    pub name: String,
}

/// Whether a vendor has a GVL counterpart, and what the GVL adds if so.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GvlStatus {
    Listed {
        gvl_id: u32,
        /// `None` when the GVL entry has no data declaration at all.
        data_categories: Option<Vec<DataCategory>>,
        device_storage_disclosure_url: Option<String>,
    },
    Unlisted,
}

impl GvlStatus {
    pub fn is_listed(&self) -> bool {
        matches!(self, GvlStatus::Listed { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub uses_cookies: bool,
    pub cookie_max_age_seconds: Option<i64>,
    pub cookie_refresh: bool,
    pub uses_non_cookie_access: bool,
}

/// Experience vendor declaration unified with its optional GVL entry.
///
/// Purposes and legal bases come only from the experience; the GVL supplies
/// descriptive metadata and never overrides what is in effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VendorRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub purpose_consents: Vec<EmbeddedPurpose>,
    pub purpose_legitimate_interests: Vec<EmbeddedPurpose>,
    pub special_purposes: Vec<EmbeddedPurpose>,
    pub features: Vec<EmbeddedFeature>,
    pub special_features: Vec<EmbeddedFeature>,
    pub gvl: GvlStatus,
    pub is_consent: bool,
    pub is_legint: bool,
    pub consent_default: Option<UserConsentPreference>,
    pub legint_default: Option<UserConsentPreference>,
    pub has_gpc_flag: bool,
    pub storage: StorageUsage,
    pub privacy_policy_url: Option<String>,
    pub legitimate_interest_disclosure_url: Option<String>,
}

impl VendorRecord {
    fn empty(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            purpose_consents: Vec::new(),
            purpose_legitimate_interests: Vec::new(),
            special_purposes: Vec::new(),
            features: Vec::new(),
            special_features: Vec::new(),
            gvl: GvlStatus::Unlisted,
            is_consent: false,
            is_legint: false,
            consent_default: None,
            legint_default: None,
            has_gpc_flag: false,
            storage: StorageUsage::default(),
            privacy_policy_url: None,
            legitimate_interest_disclosure_url: None,
        }
    }

    pub fn is_gvl(&self) -> bool {
        self.gvl.is_listed()
    }

    pub fn gvl_id(&self) -> Option<u32> {
        match &self.gvl {
            GvlStatus::Listed { gvl_id, .. } => Some(*gvl_id),
            GvlStatus::Unlisted => None,
        }
    }

    fn apply_relationship(&mut self, rel: &TcfVendorRelationship) {
        if self.name.is_empty() {
            self.name = rel.name.clone();
        }
        if self.description.is_empty() {
            self.description = rel.description.clone();
        }
        self.special_purposes = rel.special_purposes.clone();
        self.features = rel.features.clone();
        self.special_features = rel.special_features.clone();
        self.storage = StorageUsage {
            uses_cookies: rel.uses_cookies.unwrap_or(false),
            cookie_max_age_seconds: rel.cookie_max_age_seconds,
            cookie_refresh: rel.cookie_refresh.unwrap_or(false),
            uses_non_cookie_access: rel.uses_non_cookie_access.unwrap_or(false),
        };
        self.privacy_policy_url = rel.privacy_policy_url.clone();
        self.legitimate_interest_disclosure_url = rel.legitimate_interest_disclosure_url.clone();
    }
}

/// Named data categories for a vendor.
///
/// `None` for unlisted vendors and for GVL entries without a declaration;
/// `Some(&[])` when the declaration exists but names nothing known.
pub fn data_categories(vendor: &VendorRecord) -> Option<&[DataCategory]> {
    match &vendor.gvl {
        GvlStatus::Listed {
            data_categories, ..
        } => data_categories.as_deref(),
        GvlStatus::Unlisted => None,
    }
}

fn listed_status(entry: &GvlVendor, gvl: &GvlSnapshot) -> GvlStatus {
    let data_categories = entry.data_declaration.as_ref().map(|ids| {
        ids.iter()
            .filter_map(|id| match gvl.data_categories.get(id) {
                Some(c) => Some(DataCategory {
                    id: c.id,
                    name: c.name.clone(),
                }),
                None => {
                    debug!(vendor = entry.id, category = id, "gvl data category not defined");
                    None
                }
            })
            .collect()
    });
    GvlStatus::Listed {
        gvl_id: entry.id,
        data_categories,
        device_storage_disclosure_url: entry.device_storage_disclosure_url.clone(),
    }
}

/// Merge the experience's three vendor lists (consents, legitimate interests,
/// relationships) by id and enrich each record from the GVL snapshot.
///
/// Output order is first appearance across the lists. The first declaration
/// of an id within a list wins. A basis counts only when its declaration
/// lists at least one purpose. Vendors with neither legal basis are dropped.
pub fn merge_vendor_records(
    experience: &Experience,
    gvl: Option<&GvlSnapshot>,
) -> Vec<VendorRecord> {
    let mut records: Vec<VendorRecord> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    fn slot<'a>(
        records: &'a mut Vec<VendorRecord>,
        index: &mut BTreeMap<String, usize>,
        id: &str,
        name: &str,
        description: &str,
    ) -> &'a mut VendorRecord {
        let i = *index.entry(id.to_string()).or_insert_with(|| {
            records.push(VendorRecord::empty(id, name, description));
            records.len() - 1
        });
        &mut records[i]
    }

    let mut consent_seen: BTreeSet<&str> = BTreeSet::new();
    for v in &experience.tcf_vendor_consents {
        if !consent_seen.insert(v.id.as_str()) {
            warn!(vendor = %v.id, "duplicate vendor consent declaration ignored");
            continue;
        }
        let rec = slot(&mut records, &mut index, &v.id, &v.name, &v.description);
        rec.is_consent = !v.purpose_consents.is_empty();
        rec.purpose_consents = v.purpose_consents.clone();
        rec.consent_default = v.default_preference;
        rec.has_gpc_flag |= v.has_gpc_flag;
    }

    let mut legint_seen: BTreeSet<&str> = BTreeSet::new();
    for v in &experience.tcf_vendor_legitimate_interests {
        if !legint_seen.insert(v.id.as_str()) {
            warn!(vendor = %v.id, "duplicate vendor legitimate interest declaration ignored");
            continue;
        }
        let rec = slot(&mut records, &mut index, &v.id, &v.name, &v.description);
        rec.is_legint = !v.purpose_legitimate_interests.is_empty();
        rec.purpose_legitimate_interests = v.purpose_legitimate_interests.clone();
        rec.legint_default = v.default_preference;
        rec.has_gpc_flag |= v.has_gpc_flag;
    }

    let mut related: BTreeSet<&str> = BTreeSet::new();
    for rel in &experience.tcf_vendor_relationships {
        if !related.insert(rel.id.as_str()) {
            warn!(vendor = %rel.id, "duplicate vendor relationship ignored");
            continue;
        }
        let rec = slot(&mut records, &mut index, &rel.id, &rel.name, &rel.description);
        rec.apply_relationship(rel);
    }

    records.retain(|r| {
        let keep = r.is_consent || r.is_legint;
        if !keep {
            debug!(vendor = %r.id, "vendor has no legal basis; not shown");
        }
        keep
    });

    for rec in &mut records {
        rec.gvl = match gvl.and_then(|g| g.vendor(&rec.id).map(|e| (g, e))) {
            Some((g, entry)) => listed_status(entry, g),
            None => {
                if gvl_vendor_id(&rec.id).is_some() && gvl.is_some() {
                    debug!(vendor = %rec.id, "gvl-prefixed vendor missing from snapshot");
                }
                GvlStatus::Unlisted
            }
        };
    }

    records
}
