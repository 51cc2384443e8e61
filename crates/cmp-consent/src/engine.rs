//! Engine facade exposed to the rendering layer.
//!
//! Holds the immutable record catalog for one experience. Every operation
//! takes the current state by reference and returns a new value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cmp_schemas::{
    gvl_vendor_id, ConsentMechanism, ConsentMethod, Experience, GroupKey, GvlSnapshot,
    PersistedPreference, StoredGroup,
};
use cmp_tcf::TcfConsentSets;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    reduce, resolve_defaults, CatalogOptions, ConsentAction, ConsentState, EnabledIdSet,
    RecordCatalog, Reduction, Resolution, SignalState,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub region: Option<String>,
    pub tcf_enabled: bool,
    /// When false the signal is always treated as inactive.
    pub honor_global_signal: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            region: None,
            tcf_enabled: true,
            honor_global_signal: true,
        }
    }
}

/// Result of applying one action across one or more groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub state: ConsentState,
    pub method: ConsentMethod,
}

#[derive(Clone, Debug)]
pub struct ConsentEngine {
    catalog: RecordCatalog,
    options: EngineOptions,
}

impl ConsentEngine {
    /// Build from an experience, parsing its embedded GVL leniently.
    pub fn new(experience: &Experience, options: EngineOptions) -> Self {
        let gvl = GvlSnapshot::from_optional(experience.gvl.as_ref());
        Self::with_gvl(experience, gvl.as_ref(), options)
    }

    pub fn with_gvl(
        experience: &Experience,
        gvl: Option<&GvlSnapshot>,
        options: EngineOptions,
    ) -> Self {
        let catalog = RecordCatalog::from_experience(
            experience,
            gvl,
            &CatalogOptions {
                region: options.region.clone(),
                tcf_enabled: options.tcf_enabled,
            },
        );
        debug!(
            history_id = %catalog.history_id,
            groups = catalog.groups.len(),
            "consent catalog built"
        );
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &RecordCatalog {
        &self.catalog
    }

    pub fn history_id(&self) -> &str {
        &self.catalog.history_id
    }

    pub fn visible_groups(&self) -> Vec<GroupKey> {
        self.catalog.visible_groups()
    }

    /// Every visible record is a notice-only notice: the banner offers a
    /// single acknowledge button that behaves as accept-all.
    pub fn is_acknowledge_only(&self) -> bool {
        match self.catalog.group(GroupKey::Notices) {
            Some(notices) if self.catalog.groups.len() == 1 => notices
                .records
                .iter()
                .all(|r| r.mechanism == ConsentMechanism::NoticeOnly),
            _ => false,
        }
    }

    /// Initial resolution before any explicit action.
    pub fn initialize(
        &self,
        prior: Option<&PersistedPreference>,
        signal: SignalState,
    ) -> Resolution {
        let signal = if self.options.honor_global_signal {
            signal
        } else {
            SignalState::Inactive
        };
        resolve_defaults(&self.catalog, prior, signal)
    }

    /// Reduce one group. A group that is not visible reduces to an empty set.
    pub fn resolve(&self, action: &ConsentAction, scope: GroupKey) -> Reduction {
        match self.catalog.group(scope) {
            Some(group) => reduce(group, action),
            None => Reduction {
                enabled: EnabledIdSet::empty(),
                method: action.method(),
            },
        }
    }

    /// Apply `action` to each group in `scopes` (all visible groups when
    /// empty). Groups outside the scope keep their current sets.
    pub fn apply(
        &self,
        state: &ConsentState,
        action: &ConsentAction,
        scopes: &[GroupKey],
    ) -> Transition {
        let scopes: Vec<GroupKey> = if scopes.is_empty() {
            self.visible_groups()
        } else {
            scopes.to_vec()
        };

        let mut next = state.clone();
        for scope in scopes {
            if self.catalog.group(scope).is_none() {
                debug!(group = %scope, "action scope not visible; skipped");
                continue;
            }
            let r = self.resolve(action, scope);
            next = next.with_group(scope, r.enabled);
        }

        info!(method = action.method().as_str(), "consent action applied");
        Transition {
            state: next,
            method: action.method(),
        }
    }

    /// Tuple handed to the host store. `served` records every visible id.
    pub fn persist(
        &self,
        state: &ConsentState,
        method: ConsentMethod,
        now: DateTime<Utc>,
    ) -> PersistedPreference {
        let enabled_ids_by_basis: BTreeMap<GroupKey, StoredGroup> = self
            .catalog
            .groups
            .iter()
            .map(|(key, group)| {
                let enabled = state
                    .enabled(*key)
                    .iter()
                    .filter(|id| group.contains(id))
                    .cloned()
                    .collect();
                let served = group.ids().map(str::to_string).collect();
                (*key, StoredGroup { enabled, served })
            })
            .collect();

        PersistedPreference {
            history_id: self.catalog.history_id.clone(),
            consent_method: method,
            timestamp: now,
            enabled_ids_by_basis,
        }
    }

    /// Record to write automatically when the signal disabled something.
    pub fn gpc_proposal(
        &self,
        resolution: &Resolution,
        now: DateTime<Utc>,
    ) -> Option<PersistedPreference> {
        resolution
            .signal_applied()
            .then(|| self.persist(&resolution.state, ConsentMethod::Gpc, now))
    }

    /// Numeric id sets for the TC-string encoder.
    pub fn tcf_sets(&self, state: &ConsentState) -> TcfConsentSets {
        let numeric = |key: GroupKey| -> Vec<u32> {
            state
                .enabled(key)
                .iter()
                .filter_map(|id| id.parse::<u32>().ok())
                .collect()
        };
        let gvl_ids = |key: GroupKey| -> Vec<u32> {
            let Some(group) = self.catalog.group(key) else {
                return Vec::new();
            };
            state
                .enabled(key)
                .iter()
                .filter(|id| group.get(id).is_some_and(|r| r.is_gvl))
                .filter_map(|id| gvl_vendor_id(id))
                .collect()
        };

        TcfConsentSets {
            purposes_consent: numeric(GroupKey::PurposesConsent),
            purposes_legint: numeric(GroupKey::PurposesLegint),
            special_features: numeric(GroupKey::SpecialFeatures),
            vendors_consent: gvl_ids(GroupKey::VendorsConsent),
            vendors_legint: gvl_ids(GroupKey::VendorsLegint),
        }
        .normalized()
    }
}
