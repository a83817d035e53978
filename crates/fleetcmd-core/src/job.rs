//! Command batches and per-host jobs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fleetcmd_exec::{CommandType, ConnectionParams};
use fleetcmd_inventory::{HostMap, ResolvedHost};

use crate::error::CoreError;

/// Ordered commands of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBatch {
    pub command_type: CommandType,
    pub commands: Vec<String>,
}

impl CommandBatch {
    pub fn new<I, S>(command_type: CommandType, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command_type,
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    /// CLI commands
    pub fn cli<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandType::Cli, commands)
    }

    /// Operational commands
    pub fn operation<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandType::Operation, commands)
    }

    /// Configuration commands
    pub fn configure<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandType::Configure, commands)
    }
}

/// One host's unit of work
#[derive(Debug, Clone)]
pub struct Job {
    /// Inventory hostname
    pub host: String,
    /// Connection parameters taken from the host's effective settings
    pub params: ConnectionParams,
}

impl Job {
    /// Build the job for the host keyed `name`, validating its connection
    /// settings
    ///
    /// `device_type`, `hostname`, `username` and `password` must be present
    /// and non-empty. `port` defaults to 22, `secret` to empty and `raw` to
    /// false.
    ///
    /// # Errors
    /// Returns `CoreError::MissingField` or `CoreError::InvalidField` naming
    /// the host and the offending setting.
    pub fn from_host(name: &str, host: &ResolvedHost) -> Result<Self, CoreError> {
        let device_type = required(name, host, "device_type")?;
        let address = required(name, host, "hostname")?;
        let username = required(name, host, "username")?;
        let password = required(name, host, "password")?;

        let mut params = ConnectionParams::new(device_type, address, username, password);

        if let Some(port) = host.get("port").filter(|v| !v.is_null()) {
            params.port = parse_port(port).ok_or_else(|| CoreError::InvalidField {
                host: name.to_string(),
                field: "port",
                reason: format!("{port} is not a valid port number"),
            })?;
        }
        if let Some(secret) = host.get("secret").and_then(scalar) {
            params.secret = secret;
        }
        if let Some(raw) = host.get("raw").filter(|v| !v.is_null()) {
            params.raw = parse_flag(raw).ok_or_else(|| CoreError::InvalidField {
                host: name.to_string(),
                field: "raw",
                reason: format!("{raw} is not a boolean"),
            })?;
        }

        Ok(Self {
            host: name.to_string(),
            params,
        })
    }
}

/// Validate every host and build its job
///
/// Jobs are keyed by the map key, never by `ResolvedHost::name`, so every
/// input host gets exactly one job. Nothing is returned unless every host
/// validates.
///
/// # Errors
/// Returns the first validation error encountered, in hostname order.
pub fn build_jobs(hosts: &HostMap) -> Result<Vec<Job>, CoreError> {
    hosts
        .iter()
        .map(|(name, host)| Job::from_host(name, host))
        .collect()
}

fn required(name: &str, host: &ResolvedHost, field: &'static str) -> Result<String, CoreError> {
    host.get(field)
        .and_then(scalar)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CoreError::MissingField {
            host: name.to_string(),
            field,
        })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_port(value: &Value) -> Option<u16> {
    let port: u16 = match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (port != 0).then_some(port)
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn host(name: &str, settings: Value) -> ResolvedHost {
        ResolvedHost {
            name: name.to_string(),
            groups: vec![],
            settings: settings.as_object().cloned().unwrap(),
        }
    }

    fn complete() -> Value {
        json!({
            "device_type": "junos",
            "hostname": "192.168.0.1",
            "username": "admin",
            "password": "secret"
        })
    }

    #[test]
    fn test_from_host_defaults() {
        let job = Job::from_host("sw1", &host("sw1", complete())).unwrap();
        assert_eq!(job.host, "sw1");
        assert_eq!(job.params.address, "192.168.0.1");
        assert_eq!(job.params.port, 22);
        assert!(job.params.secret.is_empty());
        assert!(!job.params.raw);
    }

    #[test]
    fn test_from_host_optional_fields() {
        let mut settings = complete();
        settings["port"] = json!("2222");
        settings["secret"] = json!("enable");
        settings["raw"] = json!(true);

        let job = Job::from_host("sw1", &host("sw1", settings)).unwrap();
        assert_eq!(job.params.port, 2222);
        assert_eq!(job.params.secret, "enable");
        assert!(job.params.raw);
    }

    #[test]
    fn test_missing_field_names_host_and_field() {
        for field in ["device_type", "hostname", "username", "password"] {
            let mut settings = complete();
            settings.as_object_mut().unwrap().remove(field);

            let err = Job::from_host("sw1", &host("sw1", settings)).unwrap_err();
            match err {
                CoreError::MissingField { host, field: missing } => {
                    assert_eq!(host, "sw1");
                    assert_eq!(missing, field);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_field_is_missing() {
        let mut settings = complete();
        settings["password"] = json!("");
        let err = Job::from_host("sw1", &host("sw1", settings)).unwrap_err();
        assert_eq!(err.to_string(), "host sw1: password is not set or empty");
    }

    #[test]
    fn test_invalid_port() {
        let mut settings = complete();
        settings["port"] = json!(70000);
        assert!(matches!(
            Job::from_host("sw1", &host("sw1", settings)),
            Err(CoreError::InvalidField { field: "port", .. })
        ));
    }

    #[test]
    fn test_build_jobs_fails_whole_set() {
        let mut hosts = HostMap::new();
        hosts.insert("a".into(), host("a", complete()));
        hosts.insert("b".into(), host("b", json!({"device_type": "junos"})));

        assert!(build_jobs(&hosts).is_err());

        hosts.remove("b");
        assert_eq!(build_jobs(&hosts).unwrap().len(), 1);
    }

    #[test]
    fn test_build_jobs_keys_by_map_key() {
        let mut hosts = HostMap::new();
        hosts.insert("r1".into(), host("", complete()));
        hosts.insert("r2".into(), host("", complete()));
        hosts.insert("r3".into(), host("r1", json!({"device_type": "junos"})));

        let err = build_jobs(&hosts).unwrap_err();
        assert!(matches!(err, CoreError::MissingField { ref host, .. } if host == "r3"));

        hosts.insert("r3".into(), host("r1", complete()));
        let jobs = build_jobs(&hosts).unwrap();
        let names: Vec<_> = jobs.iter().map(|j| j.host.as_str()).collect();
        assert_eq!(names, vec!["r1", "r2", "r3"]);
    }
}
