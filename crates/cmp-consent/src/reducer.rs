use std::collections::BTreeSet;

use cmp_schemas::ConsentMethod;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EnabledIdSet, RecordGroup};

/// Explicit visitor action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConsentAction {
    AcceptAll,
    RejectAll,
    /// `keys` is the UI's current toggle state for the group.
    Save { keys: Vec<String> },
}

impl ConsentAction {
    pub fn method(&self) -> ConsentMethod {
        match self {
            ConsentAction::AcceptAll => ConsentMethod::Accept,
            ConsentAction::RejectAll => ConsentMethod::Reject,
            ConsentAction::Save { .. } => ConsentMethod::Save,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reduction {
    pub enabled: EnabledIdSet,
    pub method: ConsentMethod,
}

/// Apply `action` to one group.
///
/// - accept: every id in the group (notice-only ids are already on)
/// - reject: exactly the notice-only ids
/// - save: `keys` intersected with the group, plus every notice-only id
///
/// Never fails; ids not in the group are dropped.
pub fn reduce(group: &RecordGroup, action: &ConsentAction) -> Reduction {
    let notice_only = group.notice_only_ids();

    let enabled = match action {
        ConsentAction::AcceptAll => EnabledIdSet::from_group(group, |_| true),
        ConsentAction::RejectAll => EnabledIdSet::from_group(group, |id| notice_only.contains(id)),
        ConsentAction::Save { keys } => {
            let requested: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
            for unknown in requested.iter().filter(|k| !group.contains(k)) {
                debug!(group = %group.key, id = %unknown, "dropping unknown id from save");
            }
            EnabledIdSet::from_group(group, |id| {
                notice_only.contains(id) || requested.contains(id)
            })
        }
    };

    Reduction {
        enabled,
        method: action.method(),
    }
}
