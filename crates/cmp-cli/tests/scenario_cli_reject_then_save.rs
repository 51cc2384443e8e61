//! `cmp init` / `cmp act` over a California banner.
//!
//! GREEN when:
//! - init reports the declared defaults (advertising + essential).
//! - act --action reject persists only the notice-only notice.
//! - feeding that record back as --prior and saving advertising re-enables it.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const NOW: &str = "2024-06-02T09:30:00Z";

fn write_json(dir: &Path, name: &str, v: &Value) -> String {
    let p = dir.join(name);
    fs::write(&p, serde_json::to_vec_pretty(v).unwrap()).unwrap();
    p.to_string_lossy().to_string()
}

/// Helper: one opt-out notice and one notice-only notice.
fn experience() -> Value {
    json!({
        "id": "exp_us_ca",
        "region": "us_ca",
        "history_id": "h_2024_06",
        "privacy_notices": [
            { "notice_key": "advertising", "consent_mechanism": "opt_out", "regions": ["us_ca"], "has_gpc_flag": true },
            { "notice_key": "essential", "consent_mechanism": "notice_only", "regions": ["us_ca"] }
        ]
    })
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn init_reports_defaults() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args(["init", "--experience", &exp]);
    let v = stdout_json(&mut cmd);

    assert_eq!(v["history_id"], "h_2024_06");
    assert_eq!(v["enabled_ids"]["notices"], json!(["advertising", "essential"]));
    assert_eq!(v["staleness"]["status"], "no_prior");
    assert_eq!(v["gpc_proposal"], Value::Null);
    assert_eq!(v["acknowledge_only"], false);
}

#[test]
fn reject_then_save_round_trip() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut reject = Command::cargo_bin("cmp").unwrap();
    reject.args(["act", "--experience", &exp, "--action", "reject", "--now", NOW]);
    let rejected = stdout_json(&mut reject);

    assert_eq!(rejected["consent_method"], "reject");
    assert_eq!(rejected["history_id"], "h_2024_06");
    assert_eq!(
        rejected["enabled_ids_by_basis"]["notices"]["enabled"],
        json!(["essential"])
    );
    assert_eq!(
        rejected["enabled_ids_by_basis"]["notices"]["served"],
        json!(["advertising", "essential"])
    );

    let prior = write_json(dir.path(), "prior.json", &rejected);

    let mut init = Command::cargo_bin("cmp").unwrap();
    init.args(["init", "--experience", &exp, "--prior", &prior]);
    let resumed = stdout_json(&mut init);
    assert_eq!(resumed["enabled_ids"]["notices"], json!(["essential"]));
    assert_eq!(resumed["staleness"]["status"], "current");

    let mut save = Command::cargo_bin("cmp").unwrap();
    save.args([
        "act",
        "--experience",
        &exp,
        "--prior",
        &prior,
        "--action",
        "save",
        "--key",
        "advertising",
        "--scope",
        "notices",
        "--now",
        NOW,
    ]);
    let saved = stdout_json(&mut save);
    assert_eq!(saved["consent_method"], "save");
    assert_eq!(
        saved["enabled_ids_by_basis"]["notices"]["enabled"],
        json!(["advertising", "essential"])
    );
}

#[test]
fn gpc_flag_produces_proposal() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args(["init", "--experience", &exp, "--gpc"]);
    let v = stdout_json(&mut cmd);

    assert_eq!(v["signal"], "active");
    assert_eq!(v["enabled_ids"]["notices"], json!(["essential"]));
    assert_eq!(v["gpc_proposal"]["consent_method"], "gpc");
}

#[test]
fn config_can_disable_signal_handling() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());
    let cfg = dir.path().join("cmp.yaml");
    fs::write(&cfg, "signal:\n  honor_global_privacy_control: false\n").unwrap();

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args([
        "init",
        "--experience",
        &exp,
        "--gpc",
        "--config",
        cfg.to_str().unwrap(),
    ]);
    let v = stdout_json(&mut cmd);

    assert_eq!(v["signal"], "inactive");
    assert_eq!(v["enabled_ids"]["notices"], json!(["advertising", "essential"]));
}

#[test]
fn key_without_save_is_rejected() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args([
        "act",
        "--experience",
        &exp,
        "--action",
        "accept",
        "--key",
        "advertising",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--key is only valid with --action save"));
}

#[test]
fn save_without_scope_is_rejected() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args([
        "act",
        "--experience",
        &exp,
        "--action",
        "save",
        "--key",
        "advertising",
    ]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "--action save requires at least one --scope",
        ));
}

#[test]
fn unknown_scope_is_a_usage_error() {
    let dir = tempdir().unwrap();
    let exp = write_json(dir.path(), "experience.json", &experience());

    let mut cmd = Command::cargo_bin("cmp").unwrap();
    cmd.args([
        "act",
        "--experience",
        &exp,
        "--action",
        "reject",
        "--scope",
        "vendors",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown group 'vendors'"));
}
