//! Per-host results and the aggregate run report

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use kameo_macros::Reply;
use serde::{Deserialize, Serialize};

use fleetcmd_exec::{CommandOutputs, CommandType};

/// Where a host's failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The executor reported an error (connection, auth, protocol, command)
    Execution,
    /// The result could not travel back intact
    Transport,
    /// The unit died before reporting
    Unit,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Execution => "execution",
            FailureKind::Transport => "transport",
            FailureKind::Unit => "unit",
        };
        f.write_str(name)
    }
}

/// Explicit failure value stored in place of a host's outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// Outcome of one host's job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostResult {
    /// Output per command
    Success(CommandOutputs),
    /// The job did not produce outputs
    Failed(Failure),
}

impl HostResult {
    /// Build a failure result
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        HostResult::Failed(Failure {
            kind,
            message: message.into(),
        })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, HostResult::Success(_))
    }

    #[must_use]
    pub fn outputs(&self) -> Option<&CommandOutputs> {
        match self {
            HostResult::Success(outputs) => Some(outputs),
            HostResult::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            HostResult::Success(_) => None,
            HostResult::Failed(failure) => Some(failure),
        }
    }
}

/// Aggregate outcome of a dispatch run, keyed by hostname
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub command_type: CommandType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: BTreeMap<String, HostResult>,
}

impl RunReport {
    /// Result for one host
    #[must_use]
    pub fn get(&self, host: &str) -> Option<&HostResult> {
        self.results.get(host)
    }

    /// Host and success counts
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let succeeded = self.results.values().filter(|r| r.is_success()).count();
        RunSummary {
            command_type: self.command_type,
            hosts: self.results.len(),
            succeeded,
            failed: self.results.len() - succeeded,
            finished_at: self.finished_at,
        }
    }
}

/// Counts describing a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Reply)]
pub struct RunSummary {
    pub command_type: CommandType,
    pub hosts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let mut results = BTreeMap::new();
        results.insert(
            "a".to_string(),
            HostResult::Success([("show version", "1.0")].into_iter().collect()),
        );
        results.insert(
            "b".to_string(),
            HostResult::failed(FailureKind::Execution, "connection refused"),
        );

        let report = RunReport {
            command_type: CommandType::Cli,
            started_at: now,
            finished_at: now,
            results,
        };

        let summary = report.summary();
        assert_eq!(summary.hosts, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            report.get("b").and_then(HostResult::failure).map(ToString::to_string),
            Some("execution error: connection refused".to_string())
        );
    }

    #[test]
    fn test_result_serialization_is_explicit() {
        let failed = HostResult::failed(FailureKind::Transport, "empty payload");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"failed": {"kind": "transport", "message": "empty payload"}})
        );
    }
}
