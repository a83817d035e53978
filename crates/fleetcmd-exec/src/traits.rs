//! Command executor trait

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{CommandOutputs, CommandType, ConnectionParams};

/// Runs a command batch against one device
///
/// Implementations own protocol, transport and any retry behaviour. A call
/// either yields one output per command, in order, or an error.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `commands` on the device described by `params`
    async fn execute(
        &self,
        params: &ConnectionParams,
        command_type: CommandType,
        commands: &[String],
    ) -> Result<CommandOutputs, ExecError>;

    /// Executor type name, used in logs
    fn executor_type(&self) -> &'static str;
}
