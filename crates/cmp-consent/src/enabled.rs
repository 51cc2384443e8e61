use std::collections::BTreeMap;

use cmp_schemas::GroupKey;
use serde::{Deserialize, Serialize};

use crate::RecordGroup;

/// Ordered, duplicate-free set of enabled ids for one group.
///
/// Order follows the group's display order so two equal decisions always
/// serialize identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnabledIdSet(Vec<String>);

impl EnabledIdSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Ids of `group` (in group order) for which `keep` returns true.
    pub fn from_group<F>(group: &RecordGroup, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        Self(
            group
                .ids()
                .filter(|id| keep(id))
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|e| e == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One enabled set per visible group. Replaced wholesale, never edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentState {
    groups: BTreeMap<GroupKey, EnabledIdSet>,
}

impl ConsentState {
    pub fn new(groups: BTreeMap<GroupKey, EnabledIdSet>) -> Self {
        Self { groups }
    }

    pub fn get(&self, key: GroupKey) -> Option<&EnabledIdSet> {
        self.groups.get(&key)
    }

    /// Enabled ids for `key`; empty when the group is not visible.
    pub fn enabled(&self, key: GroupKey) -> &[String] {
        self.groups.get(&key).map(|s| s.ids()).unwrap_or(&[])
    }

    pub fn is_enabled(&self, key: GroupKey, id: &str) -> bool {
        self.groups.get(&key).is_some_and(|s| s.contains(id))
    }

    /// New state with `key` replaced; every other group is carried over.
    pub fn with_group(&self, key: GroupKey, set: EnabledIdSet) -> Self {
        let mut groups = self.groups.clone();
        groups.insert(key, set);
        Self { groups }
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupKey, &EnabledIdSet)> {
        self.groups.iter().map(|(k, v)| (*k, v))
    }
}
