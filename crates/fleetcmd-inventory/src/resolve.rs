//! Merge of defaults, groups and host settings
//!
//! Resolution is a pure function of the three tiers. For every host the
//! effective settings are built by starting from the defaults, overlaying each
//! group in the order the host lists them, and finally overlaying the host's
//! own settings. Merging is shallow: a later tier replaces a top-level key
//! wholesale. Groups referenced by a host but never declared resolve to an
//! empty settings group.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InventoryError;
use crate::types::{GROUPS_KEY, Groups, HostMap, Hosts, ResolvedHost, Settings};

/// Snapshot of an inventory after resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInventory {
    /// Lowest precedence settings
    pub defaults: Settings,
    /// Declared groups plus the empty groups created for undeclared references
    pub groups: Groups,
    /// Hosts with merged settings
    pub hosts: HostMap,
}

/// Resolve every host's effective settings
#[must_use]
pub fn resolve(hosts: &Hosts, groups: &Groups, defaults: &Settings) -> ResolvedInventory {
    let mut all_groups = groups.clone();

    for (name, spec) in hosts {
        for group in &spec.groups {
            if !all_groups.contains_key(group) {
                debug!(host = %name, group = %group, "creating empty group for undeclared reference");
                all_groups.insert(group.clone(), Settings::new());
            }
        }
    }

    let resolved = hosts
        .iter()
        .map(|(name, spec)| {
            let mut settings = Settings::new();
            overlay(&mut settings, defaults, "defaults");
            for group in &spec.groups {
                if let Some(group_settings) = all_groups.get(group) {
                    overlay(&mut settings, group_settings, group);
                }
            }
            overlay(&mut settings, &spec.settings, name);

            let host = ResolvedHost {
                name: name.clone(),
                groups: spec.groups.clone(),
                settings,
            };
            (name.clone(), host)
        })
        .collect();

    ResolvedInventory {
        defaults: defaults.clone(),
        groups: all_groups,
        hosts: resolved,
    }
}

fn overlay(target: &mut Settings, source: &Settings, origin: &str) {
    for (key, value) in source {
        // Membership is never inherited; only the host's own list counts.
        if key == GROUPS_KEY {
            warn!(origin = %origin, "ignoring groups key in settings tier");
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

impl ResolvedInventory {
    /// Look up a single resolved host
    #[must_use]
    pub fn host(&self, name: &str) -> Option<&ResolvedHost> {
        self.hosts.get(name)
    }

    /// Every group name assigned to at least one host
    #[must_use]
    pub fn assigned_groups(&self) -> BTreeSet<&str> {
        self.hosts
            .values()
            .flat_map(|h| h.groups.iter().map(String::as_str))
            .collect()
    }

    /// Select hosts by name
    ///
    /// # Errors
    /// Returns `InventoryError::MissingHosts` listing every requested name that
    /// is not in the inventory.
    pub fn get_hosts<S: AsRef<str>>(&self, names: &[S]) -> Result<HostMap, InventoryError> {
        let missing = unique(
            names
                .iter()
                .map(AsRef::as_ref)
                .filter(|name| !self.hosts.contains_key(*name)),
        );
        if !missing.is_empty() {
            return Err(InventoryError::MissingHosts(missing));
        }

        Ok(names
            .iter()
            .filter_map(|name| self.hosts.get_key_value(name.as_ref()))
            .map(|(name, host)| (name.clone(), host.clone()))
            .collect())
    }

    /// Select hosts by group membership
    ///
    /// A host is selected when it belongs to at least one of `groups` and, if
    /// `filter_groups` is non-empty, to every one of `filter_groups`.
    ///
    /// # Errors
    /// Returns `InventoryError::UnassignedGroups` listing every name in
    /// `groups` or `filter_groups` that no host is assigned to.
    pub fn get_groups<S: AsRef<str>>(
        &self,
        groups: &[S],
        filter_groups: &[S],
    ) -> Result<HostMap, InventoryError> {
        let assigned = self.assigned_groups();
        let unassigned = unique(
            groups
                .iter()
                .chain(filter_groups)
                .map(AsRef::as_ref)
                .filter(|group| !assigned.contains(group)),
        );
        if !unassigned.is_empty() {
            return Err(InventoryError::UnassignedGroups(unassigned));
        }

        Ok(self
            .hosts
            .iter()
            .filter(|(_, host)| groups.iter().any(|g| host.in_group(g.as_ref())))
            .filter(|(_, host)| filter_groups.iter().all(|g| host.in_group(g.as_ref())))
            .map(|(name, host)| (name.clone(), host.clone()))
            .collect())
    }
}

/// Deduplicate while keeping first-seen order
fn unique<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
