//! Inventory store holding the three raw tiers

use tracing::debug;

use crate::error::InventoryError;
use crate::resolve::{ResolvedInventory, resolve};
use crate::types::{Groups, HostMap, Hosts, Settings};

/// Holds hosts, groups and defaults as last set
///
/// Only the raw tiers are stored. Every query resolves them afresh, so the
/// answer always reflects exactly the last values set, whatever order the
/// setters ran in.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    hosts: Hosts,
    groups: Groups,
    defaults: Settings,
}

impl InventoryStore {
    /// Create a store from the three tiers
    #[must_use]
    pub fn new(hosts: Hosts, groups: Groups, defaults: Settings) -> Self {
        Self {
            hosts,
            groups,
            defaults,
        }
    }

    /// Replace all hosts
    pub fn set_hosts(&mut self, hosts: Hosts) {
        debug!(count = hosts.len(), "setting hosts");
        self.hosts = hosts;
    }

    /// Replace all groups
    pub fn set_groups(&mut self, groups: Groups) {
        debug!(count = groups.len(), "setting groups");
        self.groups = groups;
    }

    /// Replace the defaults
    pub fn set_defaults(&mut self, defaults: Settings) {
        debug!(keys = defaults.len(), "setting defaults");
        self.defaults = defaults;
    }

    /// Resolve the current tiers
    #[must_use]
    pub fn resolved(&self) -> ResolvedInventory {
        resolve(&self.hosts, &self.groups, &self.defaults)
    }

    /// Hosts whose name is in `names`
    ///
    /// # Errors
    /// Returns `InventoryError::MissingHosts` naming every unknown host.
    pub fn get_hosts<S: AsRef<str>>(&self, names: &[S]) -> Result<HostMap, InventoryError> {
        self.resolved().get_hosts(names)
    }

    /// Hosts in any of `groups`, narrowed to those in all of `filter_groups`
    ///
    /// # Errors
    /// Returns `InventoryError::UnassignedGroups` naming every group with no
    /// assigned host.
    pub fn get_groups<S: AsRef<str>>(
        &self,
        groups: &[S],
        filter_groups: &[S],
    ) -> Result<HostMap, InventoryError> {
        self.resolved().get_groups(groups, filter_groups)
    }

    /// Every resolved host
    #[must_use]
    pub fn get_all_hosts(&self) -> HostMap {
        self.resolved().hosts
    }

    /// Defaults as last set
    #[must_use]
    pub fn get_defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Snapshot of defaults, groups and merged hosts
    #[must_use]
    pub fn get_inventory(&self) -> ResolvedInventory {
        self.resolved()
    }
}
