//! Same inputs, same outputs: resolution, every action, and persistence.

use chrono::{TimeZone, Utc};
use cmp_consent::*;
use cmp_schemas::{Experience, GroupKey};
use serde_json::json;

fn experience() -> Experience {
    serde_json::from_value(json!({
        "history_id": "h1",
        "privacy_notices": [
            { "notice_key": "advertising", "consent_mechanism": "opt_out", "has_gpc_flag": true },
            { "notice_key": "analytics", "consent_mechanism": "opt_in" },
            { "notice_key": "essential", "consent_mechanism": "notice_only" }
        ],
        "tcf_purpose_consents": [{ "id": 1, "name": "Store" }],
        "tcf_features": [{ "id": 1, "name": "Match" }]
    }))
    .unwrap()
}

#[test]
fn resolution_is_deterministic() {
    let engine = ConsentEngine::new(&experience(), EngineOptions::default());
    let a = engine.initialize(None, SignalState::Active);
    let b = engine.initialize(None, SignalState::Active);
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn applying_an_action_twice_changes_nothing() {
    let engine = ConsentEngine::new(&experience(), EngineOptions::default());
    let initial = engine.initialize(None, SignalState::Inactive);

    for action in [
        ConsentAction::AcceptAll,
        ConsentAction::RejectAll,
        ConsentAction::Save {
            keys: vec!["analytics".into(), "1".into()],
        },
    ] {
        let once = engine.apply(&initial.state, &action, &[]);
        let twice = engine.apply(&once.state, &action, &[]);
        assert_eq!(once, twice, "{action:?}");
    }
}

#[test]
fn save_order_follows_the_group_not_the_request() {
    let engine = ConsentEngine::new(&experience(), EngineOptions::default());
    let initial = engine.initialize(None, SignalState::Inactive);

    let a = engine.apply(
        &initial.state,
        &ConsentAction::Save {
            keys: vec!["analytics".into(), "advertising".into()],
        },
        &[GroupKey::Notices],
    );
    let b = engine.apply(
        &initial.state,
        &ConsentAction::Save {
            keys: vec!["advertising".into(), "analytics".into(), "analytics".into()],
        },
        &[GroupKey::Notices],
    );
    assert_eq!(a, b);
    assert_eq!(
        a.state.enabled(GroupKey::Notices),
        &["advertising".to_string(), "analytics".to_string(), "essential".to_string()]
    );
}

#[test]
fn persisted_record_is_stable() {
    let engine = ConsentEngine::new(&experience(), EngineOptions::default());
    let initial = engine.initialize(None, SignalState::Inactive);
    let t = engine.apply(&initial.state, &ConsentAction::RejectAll, &[]);
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let a = serde_json::to_string(&engine.persist(&t.state, t.method, now)).unwrap();
    let b = serde_json::to_string(&engine.persist(&t.state, t.method, now)).unwrap();
    assert_eq!(a, b);
    assert!(a.contains("\"consent_method\":\"reject\""));
    assert!(a.contains("\"purposesConsent\""));
}
