//! fleetcmd-core: Concurrent multi-host dispatch
//!
//! Validates jobs, fans a command batch out to one isolated unit per host,
//! carries each unit's result back over a one-shot channel and aggregates a
//! hostname-keyed report. Also exposes the engine as a kameo actor.

pub mod actor;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod message;
pub mod progress;
pub mod result;
pub mod state;

pub use actor::{DispatcherActor, DispatcherActorArgs};
pub use channel::{ResultChannel, ResultReader, ResultWriter, TransportError};
pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use job::{CommandBatch, Job, build_jobs};
pub use message::{GetLastRun, LastRun, RunCommands};
pub use progress::{NoProgress, ProgressObserver};
pub use result::{Failure, FailureKind, HostResult, RunReport, RunSummary};
pub use state::JobState;
