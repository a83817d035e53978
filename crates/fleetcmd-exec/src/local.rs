//! Local command execution using `tokio::process`

use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::{CommandOutputs, CommandType, ConnectionParams, clean_output};
use crate::traits::CommandExecutor;

/// Local command executor
///
/// Runs every command of a batch on this machine through `sh -c`, one after
/// the other. Connection parameters other than `raw` are ignored.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run a single command and return its stdout
    #[instrument(skip(self), level = "debug")]
    async fn run_one(&self, cmd: &str) -> Result<String, ExecError> {
        let start = Instant::now();

        debug!(command = %cmd, "executing local command");

        // Use shell to support pipes, redirections, etc.
        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        debug!(
            command = %cmd,
            status = status,
            duration = ?start.elapsed(),
            "command completed"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(
                command = %cmd,
                status = status,
                stderr = %stderr,
                "command failed"
            );
            return Err(ExecError::CommandFailed {
                command: cmd.to_string(),
                status,
                stderr,
            });
        }

        Ok(stdout)
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    #[instrument(skip(self, params, commands), fields(command_type = %command_type))]
    async fn execute(
        &self,
        params: &ConnectionParams,
        command_type: CommandType,
        commands: &[String],
    ) -> Result<CommandOutputs, ExecError> {
        let mut outputs = CommandOutputs::new();

        for cmd in commands {
            let stdout = self.run_one(cmd).await?;
            let output = if params.raw {
                stdout
            } else {
                clean_output(&stdout)
            };
            outputs.push(cmd.clone(), output);
        }

        Ok(outputs)
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}
