use std::collections::BTreeMap;

use cmp_schemas::{EmbeddedVendor, Experience, TcfPurposeRecord, UserConsentPreference};
use serde::Serialize;
use tracing::warn;

/// A purpose offered under consent, legitimate interest, or both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurposeRecord {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub is_consent: bool,
    pub is_legint: bool,
    pub consent_default: Option<UserConsentPreference>,
    pub legint_default: Option<UserConsentPreference>,
    /// Vendors declaring this purpose, consent list first, deduplicated by id.
    pub vendors: Vec<EmbeddedVendor>,
}

impl PurposeRecord {
    fn from_wire(p: &TcfPurposeRecord) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            is_consent: false,
            is_legint: false,
            consent_default: None,
            legint_default: None,
            vendors: Vec::new(),
        }
    }

    fn add_vendors(&mut self, vendors: &[EmbeddedVendor]) {
        for v in vendors {
            if !self.vendors.iter().any(|e| e.id == v.id) {
                self.vendors.push(v.clone());
            }
        }
    }
}

/// Merge `tcf_purpose_consents` and `tcf_purpose_legitimate_interests` by id.
///
/// Order: consent list first, then legitimate-interest-only purposes, each in
/// declaration order.
pub fn merge_purpose_records(experience: &Experience) -> Vec<PurposeRecord> {
    let mut out: Vec<PurposeRecord> = Vec::new();
    let mut index: BTreeMap<u32, usize> = BTreeMap::new();

    for p in &experience.tcf_purpose_consents {
        let i = *index.entry(p.id).or_insert_with(|| {
            out.push(PurposeRecord::from_wire(p));
            out.len() - 1
        });
        let rec = &mut out[i];
        if rec.is_consent {
            warn!(purpose = p.id, "duplicate purpose consent declaration ignored");
            continue;
        }
        rec.is_consent = true;
        rec.consent_default = p.default_preference;
        rec.add_vendors(&p.vendors);
    }

    for p in &experience.tcf_purpose_legitimate_interests {
        let i = *index.entry(p.id).or_insert_with(|| {
            out.push(PurposeRecord::from_wire(p));
            out.len() - 1
        });
        let rec = &mut out[i];
        if rec.is_legint {
            warn!(purpose = p.id, "duplicate purpose legitimate interest declaration ignored");
            continue;
        }
        rec.is_legint = true;
        rec.legint_default = p.default_preference;
        rec.add_vendors(&p.vendors);
    }

    out
}
