//! Error types for fleetcmd-exec

use thiserror::Error;

/// Errors that can occur while executing a command batch on a device
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to connect to the device
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The device rejected or aborted a command
    #[error("command '{command}' failed: {status} - {stderr}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// The device type is not handled by this executor
    #[error("unsupported device type: {0}")]
    UnsupportedDevice(String),
}

impl ExecError {
    /// Whether the failure happened before any command reached the device
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectionFailed(_) | ExecError::AuthenticationFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors() {
        assert!(ExecError::ConnectionFailed("refused".into()).is_connection_error());
        assert!(ExecError::AuthenticationFailed("denied".into()).is_connection_error());
        assert!(!ExecError::IoError("eof".into()).is_connection_error());
    }

    #[test]
    fn test_command_failed_display() {
        let err = ExecError::CommandFailed {
            command: "show version".to_string(),
            status: 2,
            stderr: "syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "command 'show version' failed: 2 - syntax error"
        );
    }
}
