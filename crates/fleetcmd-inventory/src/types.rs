//! Inventory type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form settings mapping shared by hosts, groups and defaults
pub type Settings = Map<String, Value>;

/// Raw hosts keyed by hostname
pub type Hosts = BTreeMap<String, HostSpec>;

/// Group settings keyed by group name
pub type Groups = BTreeMap<String, Settings>;

/// Resolved hosts keyed by hostname
pub type HostMap = BTreeMap<String, ResolvedHost>;

/// Key that carries group membership in a host document
pub const GROUPS_KEY: &str = "groups";

/// A host as written by an inventory source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    /// Groups in precedence order (later groups override earlier ones)
    #[serde(default)]
    pub groups: Vec<String>,
    /// Host-specific settings, highest precedence
    #[serde(flatten)]
    pub settings: Settings,
}

impl HostSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group membership
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Set a host-level setting
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// A host with its effective settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHost {
    /// Hostname key (the map key when serialized)
    #[serde(skip)]
    pub name: String,
    /// Groups the host belongs to, in listed order
    pub groups: Vec<String>,
    /// Effective settings after merging defaults, groups and host overrides
    #[serde(flatten)]
    pub settings: Settings,
}

impl ResolvedHost {
    /// Effective value of a setting
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Effective value of a string setting
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    /// Whether the host is a member of `group`
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
