//! Unused-key guard.
//!
//! GREEN when:
//! - Unknown keys are reported under Warn without an error.
//! - Unknown keys fail under Fail with CONFIG_UNUSED_KEYS.
//! - Keys under consumed prefixes are never flagged.
//! - Reported pointers are sorted.

use cmp_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const WITH_EXTRAS: &str = r#"
engine:
  region: "us_ca"
  theme: "dark"
tcf:
  enabled: true
zeta:
  b: 2
  a: 1
"#;

#[test]
fn warn_policy_reports_without_error() {
    let loaded = load_layered_yaml_from_strings(&[WITH_EXTRAS]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn policy must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/engine/theme".to_string(),
            "/zeta/a".to_string(),
            "/zeta/b".to_string(),
        ]
    );
}

#[test]
fn fail_policy_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[WITH_EXTRAS]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();

    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("3 unused"), "got: {err}");
    assert!(err.contains("/engine/theme"), "got: {err}");
}

#[test]
fn consumed_keys_are_clean_under_fail() {
    let yaml = r#"
engine:
  region: "eea"
signal:
  honor_global_privacy_control: false
tcf:
  enabled: true
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();

    assert!(report.is_clean());
    assert_eq!(
        report.consumed_prefixes,
        vec![
            "/engine/region".to_string(),
            "/signal/honor_global_privacy_control".to_string(),
            "/tcf/enabled".to_string(),
        ]
    );
}

#[test]
fn lookalike_prefix_is_not_consumed() {
    let yaml = r#"
tcf:
  enabled_vendors: [1, 2]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/tcf/enabled_vendors/0".to_string(), "/tcf/enabled_vendors/1".to_string()]
    );
}
