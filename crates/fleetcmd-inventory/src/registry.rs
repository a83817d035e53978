//! Translation of device-registry records into hosts
//!
//! A device registry (an IPAM tool, for instance) describes devices as flat
//! records. Each record becomes one host keyed by its `hostname`:
//!
//! - the record's `ip` becomes the host's `hostname` setting (the address)
//! - the names behind the `type`, `sections`, `location` and `rack` ids become
//!   groups, in that order; an id of 0 or null is skipped
//! - custom fields (any field outside the registry's base set, with a
//!   `custom_` prefix stripped) named `username`, `password`, `port` or
//!   `device_type` become host settings when non-null; any other custom field
//!   with a non-empty value becomes a group named after that value, in the
//!   order the fields appear in the record

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::InventoryError;
use crate::types::{HostSpec, Hosts};

/// Fields every registry device record carries
pub const BASE_FIELDS: &[&str] = &[
    "id",
    "hostname",
    "ip",
    "type",
    "description",
    "sections",
    "editDate",
    "snmp_community",
    "snmp_version",
    "snmp_port",
    "snmp_timeout",
    "snmp_queries",
    "rack",
    "rack_start",
    "rack_size",
    "location",
    "snmp_v3_sec_level",
    "snmp_v3_auth_protocol",
    "snmp_v3_ctx_engine_id",
    "snmp_v3_ctx_name",
    "snmp_v3_priv_pass",
    "snmp_v3_priv_protocol",
    "snmp_v3_auth_pass",
];

/// Custom fields applied to the host instead of becoming groups
pub const HOST_FIELDS: &[&str] = &["username", "password", "port", "device_type"];

const CUSTOM_PREFIX: &str = "custom_";

/// A raw device record
pub type DeviceRecord = Map<String, Value>;

/// Id to name tables for the record fields that reference other objects
#[derive(Debug, Clone, Default)]
pub struct RegistryLookups {
    pub device_types: HashMap<u64, String>,
    pub sections: HashMap<u64, String>,
    pub locations: HashMap<u64, String>,
    pub racks: HashMap<u64, String>,
}

/// Translate registry device records into hosts
///
/// # Errors
/// Returns `InventoryError::EmptyRegistry` for an empty device list and
/// `InventoryError::UnknownReference` when a record points at an id missing
/// from `lookups`.
pub fn hosts_from_devices(
    devices: &[DeviceRecord],
    lookups: &RegistryLookups,
) -> Result<Hosts, InventoryError> {
    if devices.is_empty() {
        return Err(InventoryError::EmptyRegistry);
    }

    let mut hosts = Hosts::new();

    for device in devices {
        let Some(name) = device.get("hostname").and_then(scalar_string) else {
            debug!(id = ?device.get("id"), "skipping device record without hostname");
            continue;
        };

        let mut host = HostSpec::new();
        if let Some(ip) = device.get("ip").filter(|v| !v.is_null()) {
            host.settings.insert("hostname".to_string(), ip.clone());
        }

        let references = [
            ("type", "device type", &lookups.device_types),
            ("sections", "section", &lookups.sections),
            ("location", "location", &lookups.locations),
            ("rack", "rack", &lookups.racks),
        ];
        for (field, kind, table) in references {
            let Some(id) = device.get(field).and_then(reference_id) else {
                continue;
            };
            let group = table
                .get(&id)
                .ok_or_else(|| InventoryError::UnknownReference {
                    device: name.clone(),
                    kind,
                    id,
                })?;
            host.groups.push(group.clone());
        }

        for (key, value) in device {
            if BASE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let field = key.strip_prefix(CUSTOM_PREFIX).unwrap_or(key);

            if HOST_FIELDS.contains(&field) {
                if !value.is_null() {
                    host.settings.insert(field.to_string(), value.clone());
                }
            } else if !is_unset(value)
                && let Some(group) = scalar_string(value)
            {
                host.groups.push(group);
            }
        }

        hosts.insert(name, host);
    }

    Ok(hosts)
}

/// Id stored in a reference field; 0, null and empty values mean "none"
fn reference_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (id != 0).then_some(id)
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> DeviceRecord {
        value.as_object().cloned().unwrap()
    }

    fn lookups() -> RegistryLookups {
        RegistryLookups {
            device_types: HashMap::from([(1, "switch".to_string())]),
            sections: HashMap::from([(3, "datacenter".to_string())]),
            locations: HashMap::from([(7, "brussels".to_string())]),
            racks: HashMap::from([(9, "rack-a1".to_string())]),
        }
    }

    #[test]
    fn test_translate_device() {
        let devices = vec![record(json!({
            "id": "12",
            "hostname": "core-sw1",
            "ip": "10.0.0.1",
            "type": "1",
            "sections": "3",
            "location": 7,
            "rack": "9",
            "description": "core switch",
            "custom_username": "netops",
            "custom_port": "2222",
            "custom_password": null,
            "custom_role": "spine",
            "custom_vendor": ""
        }))];

        let hosts = hosts_from_devices(&devices, &lookups()).unwrap();
        let host = &hosts["core-sw1"];

        assert_eq!(host.settings.get("hostname"), Some(&json!("10.0.0.1")));
        assert_eq!(host.settings.get("username"), Some(&json!("netops")));
        assert_eq!(host.settings.get("port"), Some(&json!("2222")));
        assert!(!host.settings.contains_key("password"));
        assert_eq!(
            host.groups,
            vec!["switch", "datacenter", "brussels", "rack-a1", "spine"]
        );
    }

    #[test]
    fn test_zero_references_are_skipped() {
        let devices = vec![record(json!({
            "hostname": "edge-sw1",
            "ip": "10.0.0.2",
            "type": "0",
            "sections": null,
            "location": 0,
            "rack": "0"
        }))];

        let hosts = hosts_from_devices(&devices, &lookups()).unwrap();
        assert!(hosts["edge-sw1"].groups.is_empty());
    }

    #[test]
    fn test_unknown_reference() {
        let devices = vec![record(json!({"hostname": "sw", "ip": "10.0.0.3", "rack": 4}))];
        let err = hosts_from_devices(&devices, &lookups()).unwrap_err();
        assert_eq!(
            err,
            InventoryError::UnknownReference {
                device: "sw".into(),
                kind: "rack",
                id: 4,
            }
        );
    }

    #[test]
    fn test_empty_registry() {
        let err = hosts_from_devices(&[], &lookups()).unwrap_err();
        assert_eq!(err, InventoryError::EmptyRegistry);
    }

    #[test]
    fn test_custom_groups_follow_record_order() {
        let devices: Vec<DeviceRecord> = serde_json::from_str(
            r#"[{
                "hostname": "leaf-1",
                "ip": "10.0.1.1",
                "custom_zone": "dc-west",
                "custom_role": "leaf",
                "custom_asset": "A-1042"
            }]"#,
        )
        .unwrap();

        let hosts = hosts_from_devices(&devices, &lookups()).unwrap();
        assert_eq!(hosts["leaf-1"].groups, vec!["dc-west", "leaf", "A-1042"]);
    }
}
