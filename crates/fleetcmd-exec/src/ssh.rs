//! SSH command execution using russh crate

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect, client};
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::result::{CommandOutputs, CommandType, ConnectionParams, clean_output};
use crate::traits::CommandExecutor;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// Raw result of one remote command
struct RemoteOutput {
    status: i32,
    stdout: String,
    stderr: String,
}

/// SSH command executor
///
/// Opens one password-authenticated session per batch and runs every command
/// on its own exec channel, in order. All three command types travel the same
/// way; mode handling is left to the device CLI.
#[derive(Clone, Default)]
pub struct SshExecutor {
    config: Arc<client::Config>,
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor").finish_non_exhaustive()
    }
}

impl SshExecutor {
    /// Create a new SSH executor with the default client configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with a custom russh client configuration
    #[must_use]
    pub fn with_config(config: client::Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Connect and authenticate to the device
    #[instrument(skip(self, params), fields(host = %params.address))]
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<client::Handle<SshClientHandler>, ExecError> {
        info!(
            host = %params.address,
            port = params.port,
            user = %params.username,
            device_type = %params.device_type,
            "connecting to SSH"
        );

        let mut session = client::connect(
            self.config.clone(),
            (&params.address[..], params.port),
            SshClientHandler,
        )
        .await
        .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        let auth_res = session
            .authenticate_password(&params.username, &params.password)
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(
                "password authentication failed".to_string(),
            ));
        }

        info!(host = %params.address, "SSH connected and authenticated");

        Ok(session)
    }

    /// Execute a single command on an open session
    async fn execute_remote(
        session: &client::Handle<SshClientHandler>,
        cmd: &str,
    ) -> Result<RemoteOutput, ExecError> {
        debug!(command = %cmd, "executing remote command");

        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = -1;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // Exit status usually arrives after EOF, so read until the channel closes.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => status = exit_status.cast_signed(),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        debug!(
            command = %cmd,
            status = status,
            duration = ?start.elapsed(),
            "remote command completed"
        );

        Ok(RemoteOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    async fn run_batch(
        session: &client::Handle<SshClientHandler>,
        params: &ConnectionParams,
        commands: &[String],
    ) -> Result<CommandOutputs, ExecError> {
        let mut outputs = CommandOutputs::new();

        for cmd in commands {
            let remote = Self::execute_remote(session, cmd).await?;

            // Network gear often reports a non-zero status alongside useful output.
            if remote.status > 0 && remote.stdout.trim().is_empty() {
                return Err(ExecError::CommandFailed {
                    command: cmd.clone(),
                    status: remote.status,
                    stderr: remote.stderr,
                });
            }

            let output = if params.raw {
                remote.stdout
            } else {
                clean_output(&remote.stdout)
            };
            outputs.push(cmd.clone(), output);
        }

        Ok(outputs)
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    #[instrument(skip(self, params, commands), fields(host = %params.address, command_type = %command_type))]
    async fn execute(
        &self,
        params: &ConnectionParams,
        command_type: CommandType,
        commands: &[String],
    ) -> Result<CommandOutputs, ExecError> {
        let session = self.connect(params).await?;

        let result = Self::run_batch(&session, params, commands).await;

        // Disconnect on every path; a failed goodbye does not change the outcome.
        if let Err(e) = session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            warn!(host = %params.address, error = %e, "SSH disconnect failed");
        } else {
            info!(host = %params.address, "SSH disconnected");
        }

        result
    }

    fn executor_type(&self) -> &'static str {
        "ssh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_device_is_connection_error() {
        let executor = SshExecutor::new();
        // Port 1 on localhost is closed on any sane test machine.
        let params = ConnectionParams::new("junos", "127.0.0.1", "admin", "admin").with_port(1);
        let result = executor
            .execute(&params, CommandType::Cli, &["show version".to_string()])
            .await;

        assert!(matches!(result, Err(ExecError::ConnectionFailed(_))));
    }

    #[tokio::test]
    #[ignore = "requires SSH server"]
    async fn test_ssh_batch() {
        let executor = SshExecutor::new();
        let params = ConnectionParams::new("linux", "127.0.0.1", "root", "root");
        let outputs = executor
            .execute(&params, CommandType::Cli, &["echo ok".to_string()])
            .await
            .unwrap();
        assert_eq!(outputs.get("echo ok"), Some("ok"));
    }
}
