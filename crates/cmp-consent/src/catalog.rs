//! Record catalog: every togglable (or notice-only) record the visitor can see,
//! grouped by `(entity type, legal basis)`.

use std::collections::{BTreeMap, BTreeSet};

use cmp_schemas::{ConsentMechanism, Experience, GroupKey, GvlSnapshot, UserConsentPreference};
use cmp_tcf::{merge_purpose_records, merge_vendor_records, partition, VendorRecord};
use serde::Serialize;
use tracing::{debug, warn};

/// A single record as the engine sees it: id, mechanism, default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsentRecord {
    pub id: String,
    pub mechanism: ConsentMechanism,
    pub default_preference: UserConsentPreference,
    pub honors_global_signal: bool,
    pub is_gvl: bool,
}

impl ConsentRecord {
    fn new(id: impl Into<String>, mechanism: ConsentMechanism) -> Self {
        Self {
            id: id.into(),
            mechanism,
            default_preference: mechanism.derived_default(),
            honors_global_signal: false,
            is_gvl: false,
        }
    }

    fn with_default(mut self, declared: Option<UserConsentPreference>) -> Self {
        if let Some(d) = declared {
            self.default_preference = d;
        }
        self
    }

    pub fn is_notice_only(&self) -> bool {
        self.mechanism == ConsentMechanism::NoticeOnly
    }
}

/// Records of one group in display order. Ids are unique within a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordGroup {
    pub key: GroupKey,
    pub records: Vec<ConsentRecord>,
}

impl RecordGroup {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            records: Vec::new(),
        }
    }

    fn push(&mut self, record: ConsentRecord) {
        if self.contains(&record.id) {
            warn!(group = %self.key, id = %record.id, "duplicate record id ignored");
            return;
        }
        self.records.push(record);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ConsentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn notice_only_ids(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| r.is_notice_only())
            .map(|r| r.id.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Visitor region. Falls back to the experience region when `None`.
    pub region: Option<String>,
    pub tcf_enabled: bool,
}

/// All visible groups for one experience. Empty groups are not stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordCatalog {
    pub history_id: String,
    pub groups: BTreeMap<GroupKey, RecordGroup>,
}

impl RecordCatalog {
    pub fn from_experience(
        experience: &Experience,
        gvl: Option<&GvlSnapshot>,
        options: &CatalogOptions,
    ) -> Self {
        let mut groups: BTreeMap<GroupKey, RecordGroup> = GroupKey::ALL
            .iter()
            .map(|k| (*k, RecordGroup::new(*k)))
            .collect();

        let region = options
            .region
            .clone()
            .unwrap_or_else(|| experience.region.clone());

        // Notices
        if let Some(g) = groups.get_mut(&GroupKey::Notices) {
            for notice in &experience.privacy_notices {
                if !region.is_empty() && !notice.applies_to(&region) {
                    debug!(notice = %notice.notice_key, region = %region, "notice not in region");
                    continue;
                }
                if notice.notice_key.trim().is_empty() {
                    warn!("notice with empty notice_key ignored");
                    continue;
                }
                let mut rec = ConsentRecord::new(notice.notice_key.clone(), notice.consent_mechanism);
                rec.default_preference = notice.effective_default();
                rec.honors_global_signal = notice.has_gpc_flag;
                g.push(rec);
            }
        }

        if options.tcf_enabled {
            build_tcf_groups(experience, gvl, &mut groups);
        }

        groups.retain(|_, g| !g.is_empty());

        Self {
            history_id: experience.history_id.clone(),
            groups,
        }
    }

    pub fn group(&self, key: GroupKey) -> Option<&RecordGroup> {
        self.groups.get(&key)
    }

    pub fn visible_groups(&self) -> Vec<GroupKey> {
        self.groups.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn vendor_record(v: &VendorRecord, mechanism: ConsentMechanism) -> ConsentRecord {
    let declared = match mechanism {
        ConsentMechanism::OptIn => v.consent_default,
        _ => v.legint_default,
    };
    let mut rec = ConsentRecord::new(v.id.clone(), mechanism).with_default(declared);
    rec.honors_global_signal = v.has_gpc_flag;
    rec.is_gvl = v.is_gvl();
    rec
}

fn build_tcf_groups(
    experience: &Experience,
    gvl: Option<&GvlSnapshot>,
    groups: &mut BTreeMap<GroupKey, RecordGroup>,
) {
    let mut put = |key: GroupKey, rec: ConsentRecord| {
        if let Some(g) = groups.get_mut(&key) {
            g.push(rec);
        }
    };

    let purposes = merge_purpose_records(experience);
    for p in purposes.iter().filter(|p| p.is_consent) {
        put(
            GroupKey::PurposesConsent,
            ConsentRecord::new(p.id.to_string(), ConsentMechanism::OptIn).with_default(p.consent_default),
        );
    }
    // Legitimate interest is enabled until the visitor objects.
    for p in purposes.iter().filter(|p| p.is_legint) {
        put(
            GroupKey::PurposesLegint,
            ConsentRecord::new(p.id.to_string(), ConsentMechanism::OptOut).with_default(p.legint_default),
        );
    }

    for sp in &experience.tcf_special_purposes {
        put(
            GroupKey::SpecialPurposes,
            ConsentRecord::new(sp.id.to_string(), ConsentMechanism::NoticeOnly),
        );
    }
    for f in &experience.tcf_features {
        put(
            GroupKey::Features,
            ConsentRecord::new(f.id.to_string(), ConsentMechanism::NoticeOnly),
        );
    }
    for sf in &experience.tcf_special_features {
        put(
            GroupKey::SpecialFeatures,
            ConsentRecord::new(sf.id.to_string(), ConsentMechanism::OptIn).with_default(sf.default_preference),
        );
    }

    let vendors = merge_vendor_records(experience, gvl);
    let views = partition(&vendors);
    for v in &views.consent {
        put(GroupKey::VendorsConsent, vendor_record(v, ConsentMechanism::OptIn));
    }
    for v in &views.legint {
        put(GroupKey::VendorsLegint, vendor_record(v, ConsentMechanism::OptOut));
    }
}
