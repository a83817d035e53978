//! Error types for fleetcmd-inventory

use thiserror::Error;

/// Errors that can occur while loading or querying an inventory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// One or more requested hosts are not in the inventory
    #[error("missing host(s): {}", .0.join(", "))]
    MissingHosts(Vec<String>),

    /// One or more requested groups have no host assigned to them
    #[error("no host(s) assigned to group(s): {}", .0.join(", "))]
    UnassignedGroups(Vec<String>),

    /// Inventory directory does not exist
    #[error("inventory directory not found: {0}")]
    DirectoryNotFound(String),

    /// Inventory directory has no hosts document
    #[error("no hosts file found in {0}")]
    HostsFileMissing(String),

    /// Failed to read an inventory document
    #[error("failed to read {path}: {message}")]
    Io {
        /// Document path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Failed to parse an inventory document
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Document path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Device registry returned no devices
    #[error("device registry has no devices")]
    EmptyRegistry,

    /// Device record references an id missing from its lookup table
    #[error("device {device} references unknown {kind} id {id}")]
    UnknownReference {
        /// Device hostname
        device: String,
        /// Lookup table (type, section, location, rack)
        kind: &'static str,
        /// Unresolved id
        id: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_name() {
        let err = InventoryError::MissingHosts(vec!["sw1".into(), "sw2".into()]);
        assert_eq!(err.to_string(), "missing host(s): sw1, sw2");

        let err = InventoryError::UnassignedGroups(vec!["core".into(), "lab".into()]);
        assert_eq!(err.to_string(), "no host(s) assigned to group(s): core, lab");
    }
}
