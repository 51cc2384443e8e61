//! Preference resolver: the enabled state before any explicit action.
//!
//! Precedence per record (first match wins):
//!
//! | Condition                                          | Enabled            | Origin         |
//! |----------------------------------------------------|--------------------|----------------|
//! | notice-only                                        | `true`             | `NoticeOnly`   |
//! | signal active and record honors it                 | `false`            | `GlobalSignal` |
//! | prior stored under the current history id          | stored value       | `Prior`        |
//! | otherwise (incl. prior under an older history id)  | declared default   | `Default`      |
//!
//! A prior under an older history id is surfaced as `outdated_preference`
//! whichever row applies.

use std::collections::BTreeMap;

use cmp_schemas::{GroupKey, PersistedPreference, UserConsentPreference};
use serde::Serialize;
use tracing::debug;

use crate::{
    detect_staleness, ConsentRecord, ConsentState, EnabledIdSet, RecordCatalog, SignalState,
    Staleness,
};

/// Where a record's effective state came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceOrigin {
    NoticeOnly,
    GlobalSignal,
    Prior,
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedRecord {
    pub id: String,
    pub enabled: bool,
    pub origin: PreferenceOrigin,
    pub current_preference: UserConsentPreference,
    /// Raw stored value when the stored decision is outdated.
    pub outdated_preference: Option<UserConsentPreference>,
}

/// Output of one resolution pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub state: ConsentState,
    pub records: BTreeMap<GroupKey, Vec<ResolvedRecord>>,
    pub staleness: Staleness,
    pub signal: SignalState,
}

impl Resolution {
    /// Ids per group whose stored decision is outdated.
    pub fn outdated_flags(&self) -> BTreeMap<GroupKey, Vec<String>> {
        self.records
            .iter()
            .filter_map(|(k, recs)| {
                let ids: Vec<String> = recs
                    .iter()
                    .filter(|r| r.outdated_preference.is_some())
                    .map(|r| r.id.clone())
                    .collect();
                (!ids.is_empty()).then_some((*k, ids))
            })
            .collect()
    }

    /// `true` if the signal disabled at least one record.
    pub fn signal_applied(&self) -> bool {
        self.records
            .values()
            .flatten()
            .any(|r| r.origin == PreferenceOrigin::GlobalSignal)
    }
}

fn stored_value(enabled: bool) -> UserConsentPreference {
    if enabled {
        UserConsentPreference::OptIn
    } else {
        UserConsentPreference::OptOut
    }
}

fn resolve_record(
    key: GroupKey,
    record: &ConsentRecord,
    prior: Option<&PersistedPreference>,
    staleness: &Staleness,
    signal: SignalState,
) -> ResolvedRecord {
    let stored = prior.and_then(|p| p.prior_for(key, &record.id));
    let outdated_preference = if staleness.is_outdated() {
        stored.map(|v| {
            if record.is_notice_only() {
                UserConsentPreference::Acknowledge
            } else {
                stored_value(v)
            }
        })
    } else {
        None
    };

    let (enabled, origin) = if record.is_notice_only() {
        (true, PreferenceOrigin::NoticeOnly)
    } else if signal.is_active() && record.honors_global_signal {
        debug!(group = %key, id = %record.id, "disabled by global privacy signal");
        (false, PreferenceOrigin::GlobalSignal)
    } else if let (Staleness::Current, Some(v)) = (staleness, stored) {
        (v, PreferenceOrigin::Prior)
    } else {
        (record.default_preference.is_enabled(), PreferenceOrigin::Default)
    };

    let current_preference = if record.is_notice_only() {
        UserConsentPreference::Acknowledge
    } else {
        stored_value(enabled)
    };

    ResolvedRecord {
        id: record.id.clone(),
        enabled,
        origin,
        current_preference,
        outdated_preference,
    }
}

/// Resolve the initial enabled state of every visible record.
///
/// Pure: identical `(catalog, prior, signal)` always yields an identical result.
pub fn resolve_defaults(
    catalog: &RecordCatalog,
    prior: Option<&PersistedPreference>,
    signal: SignalState,
) -> Resolution {
    let staleness = detect_staleness(prior, &catalog.history_id);
    if staleness.is_outdated() {
        debug!(?staleness, "stored consent is outdated; falling back to defaults");
    }

    let mut records: BTreeMap<GroupKey, Vec<ResolvedRecord>> = BTreeMap::new();
    let mut sets: BTreeMap<GroupKey, EnabledIdSet> = BTreeMap::new();

    for (key, group) in &catalog.groups {
        let resolved: Vec<ResolvedRecord> = group
            .records
            .iter()
            .map(|r| resolve_record(*key, r, prior, &staleness, signal))
            .collect();

        let set = EnabledIdSet::from_group(group, |id| {
            resolved.iter().any(|r| r.id == id && r.enabled)
        });
        sets.insert(*key, set);
        records.insert(*key, resolved);
    }

    Resolution {
        state: ConsentState::new(sets),
        records,
        staleness,
        signal,
    }
}
