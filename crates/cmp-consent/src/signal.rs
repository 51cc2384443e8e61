//! Global opt-out privacy signal (e.g. Global Privacy Control).
//!
//! Sampled once per resolution pass and passed in explicitly. An unavailable
//! detector counts as an inactive signal.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
#[error("global privacy signal unavailable: {0}")]
pub struct SignalUnavailable(pub String);

/// Host-side detector for the global opt-out signal.
pub trait SignalDetector {
    fn opt_out_active(&self) -> Result<bool, SignalUnavailable>;
}

/// Detector with a fixed answer (config overrides, CLI flags, tests).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticSignal(pub bool);

impl SignalDetector for StaticSignal {
    fn opt_out_active(&self) -> Result<bool, SignalUnavailable> {
        Ok(self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    Active,
    #[default]
    Inactive,
}

impl SignalState {
    pub fn from_flag(active: bool) -> Self {
        if active {
            SignalState::Active
        } else {
            SignalState::Inactive
        }
    }

    pub fn sample(detector: &dyn SignalDetector) -> Self {
        match detector.opt_out_active() {
            Ok(active) => Self::from_flag(active),
            Err(e) => {
                warn!(error = %e, "treating global privacy signal as inactive");
                SignalState::Inactive
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SignalState::Active)
    }
}
