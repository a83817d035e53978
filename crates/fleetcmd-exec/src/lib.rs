//! fleetcmd-exec: Device command execution
//!
//! Provides the `CommandExecutor` trait and implementations for running
//! command batches locally and on remote devices via SSH.

pub mod error;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::{CommandOutput, CommandOutputs, CommandType, ConnectionParams};
pub use ssh::SshExecutor;
pub use traits::CommandExecutor;
