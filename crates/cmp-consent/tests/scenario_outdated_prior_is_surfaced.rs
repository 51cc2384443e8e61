//! A prior stored against an older history id is never reused and never lost.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use cmp_consent::*;
use cmp_schemas::{
    ConsentMethod, Experience, GroupKey, PersistedPreference, StoredGroup, UserConsentPreference,
};
use serde_json::json;

fn experience(history_id: &str) -> Experience {
    serde_json::from_value(json!({
        "history_id": history_id,
        "privacy_notices": [
            { "notice_key": "advertising", "consent_mechanism": "opt_out" },
            { "notice_key": "analytics", "consent_mechanism": "opt_in" },
            { "notice_key": "essential", "consent_mechanism": "notice_only" }
        ]
    }))
    .unwrap()
}

/// Helper: rejected advertising, accepted analytics, under `history_id`.
fn prior(history_id: &str) -> PersistedPreference {
    let mut groups = BTreeMap::new();
    groups.insert(
        GroupKey::Notices,
        StoredGroup {
            enabled: vec!["analytics".into(), "essential".into()],
            served: vec!["advertising".into(), "analytics".into(), "essential".into()],
        },
    );
    PersistedPreference {
        history_id: history_id.into(),
        consent_method: ConsentMethod::Save,
        timestamp: Utc.with_ymd_and_hms(2023, 11, 5, 8, 0, 0).unwrap(),
        enabled_ids_by_basis: groups,
    }
}

fn record<'a>(r: &'a Resolution, id: &str) -> &'a ResolvedRecord {
    r.records[&GroupKey::Notices]
        .iter()
        .find(|rec| rec.id == id)
        .unwrap()
}

#[test]
fn current_prior_is_reused_verbatim() {
    let engine = ConsentEngine::new(&experience("h2"), EngineOptions::default());
    let p = prior("h2");
    let r = engine.initialize(Some(&p), SignalState::Inactive);

    assert_eq!(r.staleness, Staleness::Current);
    assert!(!r.state.is_enabled(GroupKey::Notices, "advertising"));
    assert!(r.state.is_enabled(GroupKey::Notices, "analytics"));
    assert!(r.outdated_flags().is_empty());
}

#[test]
fn outdated_prior_falls_back_to_defaults_and_is_flagged() {
    let engine = ConsentEngine::new(&experience("h2"), EngineOptions::default());
    let p = prior("h1");
    let r = engine.initialize(Some(&p), SignalState::Inactive);

    assert_eq!(
        r.staleness,
        Staleness::Outdated {
            stored_history_id: "h1".into(),
            current_history_id: "h2".into(),
        }
    );

    // Defaults: opt-out on, opt-in off.
    assert!(r.state.is_enabled(GroupKey::Notices, "advertising"));
    assert!(!r.state.is_enabled(GroupKey::Notices, "analytics"));

    let adv = record(&r, "advertising");
    assert_eq!(adv.origin, PreferenceOrigin::Default);
    assert_eq!(adv.current_preference, UserConsentPreference::OptIn);
    assert_eq!(adv.outdated_preference, Some(UserConsentPreference::OptOut));

    let analytics = record(&r, "analytics");
    assert_eq!(
        analytics.outdated_preference,
        Some(UserConsentPreference::OptIn)
    );

    let essential = record(&r, "essential");
    assert_eq!(essential.origin, PreferenceOrigin::NoticeOnly);
    assert_eq!(
        essential.outdated_preference,
        Some(UserConsentPreference::Acknowledge)
    );

    let flags = r.outdated_flags();
    assert_eq!(
        flags[&GroupKey::Notices],
        vec![
            "advertising".to_string(),
            "analytics".to_string(),
            "essential".to_string()
        ]
    );

    // The stored value itself is untouched.
    assert_eq!(p, prior("h1"));
}

#[test]
fn ids_never_served_have_no_prior() {
    let engine = ConsentEngine::new(&experience("h2"), EngineOptions::default());
    let mut p = prior("h2");
    p.enabled_ids_by_basis.insert(
        GroupKey::Notices,
        StoredGroup {
            enabled: vec![],
            served: vec!["advertising".into()],
        },
    );
    let r = engine.initialize(Some(&p), SignalState::Inactive);

    assert_eq!(record(&r, "advertising").origin, PreferenceOrigin::Prior);
    assert!(!r.state.is_enabled(GroupKey::Notices, "advertising"));
    assert_eq!(record(&r, "analytics").origin, PreferenceOrigin::Default);
}
