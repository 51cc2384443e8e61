use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

/// Engine settings read from the canonical config JSON.
///
/// Every key is optional:
/// - engine.region (string): visitor region used to filter notices
/// - signal.honor_global_privacy_control (bool, default true)
/// - tcf.enabled (bool, default true)
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    pub region: Option<String>,
    pub honor_global_privacy_control: bool,
    pub tcf_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            region: None,
            honor_global_privacy_control: true,
            tcf_enabled: true,
        }
    }
}

impl EngineSettings {
    /// Wrong types are errors; absent keys and explicit nulls take the default.
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let defaults = Self::default();

        let region = match cfg.pointer("/engine/region") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(other) => bail!("CONFIG_INVALID_VALUE engine.region must be a string (got {other})"),
        };

        Ok(Self {
            region,
            honor_global_privacy_control: read_bool(
                cfg,
                "/signal/honor_global_privacy_control",
                "signal.honor_global_privacy_control",
                defaults.honor_global_privacy_control,
            )?,
            tcf_enabled: read_bool(cfg, "/tcf/enabled", "tcf.enabled", defaults.tcf_enabled)?,
        })
    }
}

fn read_bool(cfg: &Value, pointer: &str, name: &str, default: bool) -> Result<bool> {
    match cfg.pointer(pointer) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => bail!("CONFIG_INVALID_VALUE {name} must be a boolean (got {other})"),
    }
}
