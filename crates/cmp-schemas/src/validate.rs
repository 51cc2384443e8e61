use std::collections::BTreeSet;

use thiserror::Error;

use crate::Experience;

#[derive(Debug, Error)]
pub enum ExperienceError {
    #[error("experience payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("EXPERIENCE_INVALID: {} issue(s), first: {}", .0.len(), first_issue(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn first_issue(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Advisory problems in an experience payload.
///
/// The engine tolerates every one of these (first declaration wins); they are
/// surfaced so operators can fix the payload at its source.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum ValidationIssue {
    #[error("notice key '{notice_key}' is declared more than once for region '{region}'")]
    ConflictingNoticeKey { notice_key: String, region: String },

    #[error("notice at position {index} has an empty notice_key")]
    BlankNoticeKey { index: usize },

    #[error("{list} entry at position {index} has an empty vendor id")]
    BlankVendorId { list: &'static str, index: usize },

    #[error("vendor id '{vendor_id}' is declared more than once in {list}")]
    DuplicateVendorId { list: &'static str, vendor_id: String },

    #[error("purpose id {purpose_id} is declared more than once in {list}")]
    DuplicatePurposeId { list: &'static str, purpose_id: u32 },
}

const ALL_REGIONS: &str = "*";

/// Collect every advisory issue, sorted for stable output.
pub fn validate_experience(experience: &Experience) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    // Notice keys must be unique per region. A notice without regions
    // applies everywhere and therefore conflicts with any same-key notice.
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut global_keys: BTreeSet<String> = BTreeSet::new();
    for (index, notice) in experience.privacy_notices.iter().enumerate() {
        if notice.notice_key.trim().is_empty() {
            issues.push(ValidationIssue::BlankNoticeKey { index });
            continue;
        }
        let key = notice.notice_key.clone();
        let regions: Vec<String> = if notice.regions.is_empty() {
            vec![ALL_REGIONS.to_string()]
        } else {
            notice.regions.clone()
        };
        for region in regions {
            let clash = seen.contains(&(key.clone(), region.clone()))
                || global_keys.contains(&key)
                || (region == ALL_REGIONS && seen.iter().any(|(k, _)| *k == key));
            if clash {
                issues.push(ValidationIssue::ConflictingNoticeKey {
                    notice_key: key.clone(),
                    region: region.clone(),
                });
            }
            seen.insert((key.clone(), region));
        }
        if notice.regions.is_empty() {
            global_keys.insert(key);
        }
    }

    check_vendor_ids(
        "tcf_vendor_consents",
        experience.tcf_vendor_consents.iter().map(|v| v.id.as_str()),
        &mut issues,
    );
    check_vendor_ids(
        "tcf_vendor_legitimate_interests",
        experience
            .tcf_vendor_legitimate_interests
            .iter()
            .map(|v| v.id.as_str()),
        &mut issues,
    );
    check_vendor_ids(
        "tcf_vendor_relationships",
        experience.tcf_vendor_relationships.iter().map(|v| v.id.as_str()),
        &mut issues,
    );

    check_purpose_ids(
        "tcf_purpose_consents",
        experience.tcf_purpose_consents.iter().map(|p| p.id),
        &mut issues,
    );
    check_purpose_ids(
        "tcf_purpose_legitimate_interests",
        experience.tcf_purpose_legitimate_interests.iter().map(|p| p.id),
        &mut issues,
    );

    issues.sort();
    issues.dedup();
    issues
}

fn check_vendor_ids<'a>(
    list: &'static str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for (index, id) in ids.enumerate() {
        if id.trim().is_empty() {
            issues.push(ValidationIssue::BlankVendorId { list, index });
        } else if !seen.insert(id) {
            issues.push(ValidationIssue::DuplicateVendorId {
                list,
                vendor_id: id.to_string(),
            });
        }
    }
}

fn check_purpose_ids(
    list: &'static str,
    ids: impl Iterator<Item = u32>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen: BTreeSet<u32> = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(ValidationIssue::DuplicatePurposeId {
                list,
                purpose_id: id,
            });
        }
    }
}

impl Experience {
    /// Fail with [`ExperienceError::Invalid`] if validation reports anything.
    pub fn validated(self) -> Result<Self, ExperienceError> {
        let issues = validate_experience(&self);
        if issues.is_empty() {
            Ok(self)
        } else {
            Err(ExperienceError::Invalid(issues))
        }
    }
}
