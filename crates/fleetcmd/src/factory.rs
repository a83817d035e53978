//! Executor routing by device type

use std::sync::Arc;

use async_trait::async_trait;
use fleetcmd_exec::{
    CommandExecutor, CommandOutputs, CommandType, ConnectionParams, ExecError, LocalExecutor,
    SshExecutor,
};

/// Device type that runs commands on this machine instead of over SSH
pub const LOCAL_DEVICE_TYPE: &str = "local";

/// Picks an executor per host from its `device_type`
///
/// `local` runs through [`LocalExecutor`]; every other device type goes
/// through a shared [`SshExecutor`].
pub struct RoutingExecutor {
    local: Arc<dyn CommandExecutor>,
    ssh: Arc<dyn CommandExecutor>,
}

impl RoutingExecutor {
    /// Create a router over the default executors
    pub fn new() -> Self {
        Self::with_executors(Arc::new(LocalExecutor::new()), Arc::new(SshExecutor::new()))
    }

    /// Create a router over explicit executors
    pub fn with_executors(local: Arc<dyn CommandExecutor>, ssh: Arc<dyn CommandExecutor>) -> Self {
        Self { local, ssh }
    }

    fn route(&self, params: &ConnectionParams) -> &Arc<dyn CommandExecutor> {
        if params.device_type.eq_ignore_ascii_case(LOCAL_DEVICE_TYPE) {
            &self.local
        } else {
            &self.ssh
        }
    }
}

impl Default for RoutingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for RoutingExecutor {
    async fn execute(
        &self,
        params: &ConnectionParams,
        command_type: CommandType,
        commands: &[String],
    ) -> Result<CommandOutputs, ExecError> {
        let executor = self.route(params);
        tracing::debug!(
            host = %params.address,
            device_type = %params.device_type,
            executor = executor.executor_type(),
            "routing command batch"
        );
        executor.execute(params, command_type, commands).await
    }

    fn executor_type(&self) -> &'static str {
        "routing"
    }
}
