use cmp_schemas::PersistedPreference;
use serde::Serialize;

/// How a stored decision relates to the experience being shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Staleness {
    /// Nothing stored.
    NoPrior,
    /// Stored against the same history id; reusable verbatim.
    Current,
    /// Stored against another history id. Kept for display and audit only.
    Outdated {
        stored_history_id: String,
        current_history_id: String,
    },
}

impl Staleness {
    pub fn is_outdated(&self) -> bool {
        matches!(self, Staleness::Outdated { .. })
    }
}

/// `outdated = stored.history_id != current_history_id`.
pub fn detect_staleness(
    stored: Option<&PersistedPreference>,
    current_history_id: &str,
) -> Staleness {
    match stored {
        None => Staleness::NoPrior,
        Some(p) if p.history_id == current_history_id => Staleness::Current,
        Some(p) => Staleness::Outdated {
            stored_history_id: p.history_id.clone(),
            current_history_id: current_history_id.to_string(),
        },
    }
}
