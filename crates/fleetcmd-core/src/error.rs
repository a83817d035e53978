//! Core error types for fleetcmd-core

use thiserror::Error;

use fleetcmd_inventory::InventoryError;

/// Errors that fail a dispatch before any unit is spawned
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// A host lacks a required connection field
    #[error("host {host}: {field} is not set or empty")]
    MissingField {
        /// Hostname
        host: String,
        /// Missing setting
        field: &'static str,
    },

    /// A host's connection field has an unusable value
    #[error("host {host}: invalid {field}: {reason}")]
    InvalidField {
        /// Hostname
        host: String,
        /// Offending setting
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Inventory lookup failed
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}
