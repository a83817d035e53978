//! fleetcmd-inventory: Hierarchical device inventory
//!
//! Hosts, groups and defaults are merged into each host's effective settings
//! (defaults < groups in listed order < host). Provides host and group
//! selection plus loaders for directory-based and device-registry sources.

pub mod error;
pub mod registry;
pub mod resolve;
pub mod source;
pub mod store;
pub mod types;

pub use error::InventoryError;
pub use registry::{DeviceRecord, RegistryLookups, hosts_from_devices};
pub use resolve::{ResolvedInventory, resolve};
pub use source::{DocumentFormat, FileSource};
pub use store::InventoryStore;
pub use types::{GROUPS_KEY, Groups, HostMap, HostSpec, Hosts, ResolvedHost, Settings};
