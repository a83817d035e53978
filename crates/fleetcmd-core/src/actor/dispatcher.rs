//! `DispatcherActor`: serialized access to the dispatch engine
//!
//! Owns a [`Dispatcher`] and handles one run at a time. Runs are not
//! cancellable, so a `RunCommands` request occupies the actor until every
//! unit of that run has been reaped.

use std::sync::Arc;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::{info, warn};

use fleetcmd_exec::CommandExecutor;

use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::message::{GetLastRun, LastRun, RunCommands};
use crate::progress::{NoProgress, ProgressObserver};
use crate::result::{RunReport, RunSummary};

/// Arguments for spawning a `DispatcherActor`
pub struct DispatcherActorArgs {
    /// Command executor shared by every unit
    pub executor: Arc<dyn CommandExecutor>,
    /// Progress observer
    pub progress: Arc<dyn ProgressObserver>,
    /// Dispatch settings
    pub config: DispatchConfig,
}

impl DispatcherActorArgs {
    /// Arguments with no progress reporting
    pub fn new(executor: Arc<dyn CommandExecutor>, config: DispatchConfig) -> Self {
        Self {
            executor,
            progress: Arc::new(NoProgress),
            config,
        }
    }
}

/// Actor wrapping the dispatch engine
pub struct DispatcherActor {
    dispatcher: Dispatcher,
    last_run: Option<RunSummary>,
    runs: u64,
}

impl Actor for DispatcherActor {
    type Args = DispatcherActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        args.config.validate()?;

        info!(
            id = %actor_ref.id(),
            executor = args.executor.executor_type(),
            buffer_size = args.config.buffer_size,
            max_concurrency = ?args.config.max_concurrency,
            "DispatcherActor starting"
        );

        if args.config.max_concurrency.is_none() {
            info!("unbounded fan-out: one concurrent connection per selected host");
        }

        let dispatcher = Dispatcher::new(args.executor, args.config).with_progress(args.progress);

        Ok(Self {
            dispatcher,
            last_run: None,
            runs: 0,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, runs = self.runs, "DispatcherActor stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<RunCommands> for DispatcherActor {
    type Reply = Result<RunReport, CoreError>;

    async fn handle(
        &mut self,
        msg: RunCommands,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        match self.dispatcher.run(&msg.batch, &msg.hosts).await {
            Ok(report) => {
                self.runs += 1;
                self.last_run = Some(report.summary());
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "run rejected before dispatch");
                Err(e)
            }
        }
    }
}

impl Message<GetLastRun> for DispatcherActor {
    type Reply = LastRun;

    async fn handle(
        &mut self,
        _msg: GetLastRun,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        LastRun {
            summary: self.last_run.clone(),
            runs: self.runs,
        }
    }
}
