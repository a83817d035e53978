//! Command batch, connection and output types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a command batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    /// Plain CLI commands
    Cli,
    /// Operational-mode commands
    Operation,
    /// Configuration commands
    Configure,
}

impl CommandType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Cli => "cli",
            CommandType::Operation => "operation",
            CommandType::Configure => "configure",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(CommandType::Cli),
            "operation" => Ok(CommandType::Operation),
            "configure" => Ok(CommandType::Configure),
            other => Err(format!("unknown command type: {other}")),
        }
    }
}

/// Connection parameters for a single device
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Device type (e.g. `junos`, `cisco_ios`, `local`)
    pub device_type: String,
    /// Address or DNS name of the device
    pub address: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// SSH port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable secret, empty when unused
    #[serde(default)]
    pub secret: String,
    /// Return raw, unfiltered output
    #[serde(default)]
    pub raw: bool,
}

/// Default SSH port
#[must_use]
pub fn default_port() -> u16 {
    22
}

impl ConnectionParams {
    /// Create new connection params with default port, no secret and filtered output
    pub fn new(
        device_type: impl Into<String>,
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            device_type: device_type.into(),
            address: address.into(),
            username: username.into(),
            password: password.into(),
            port: default_port(),
            secret: String::new(),
            raw: false,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set enable secret
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Request raw output
    #[must_use]
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("device_type", &self.device_type)
            .field("address", &self.address)
            .field("username", &self.username)
            .field("port", &self.port)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// Output of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub command: String,
    pub output: String,
}

/// Outputs of a command batch, in the order the commands were sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandOutputs(Vec<CommandOutput>);

impl CommandOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record the output of a command
    pub fn push(&mut self, command: impl Into<String>, output: impl Into<String>) {
        self.0.push(CommandOutput {
            command: command.into(),
            output: output.into(),
        });
    }

    /// Output of the first occurrence of `command`
    #[must_use]
    pub fn get(&self, command: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|o| o.command == command)
            .map(|o| o.output.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandOutput> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C, O> FromIterator<(C, O)> for CommandOutputs
where
    C: Into<String>,
    O: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, O)>>(iter: I) -> Self {
        let mut outputs = Self::new();
        for (command, output) in iter {
            outputs.push(command, output);
        }
        outputs
    }
}

impl<'a> IntoIterator for &'a CommandOutputs {
    type Item = &'a CommandOutput;
    type IntoIter = std::slice::Iter<'a, CommandOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Strip trailing whitespace from every line and surrounding blank lines
#[must_use]
pub fn clean_output(output: &str) -> String {
    output
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
