//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use kameo_macros::Reply;

use fleetcmd_inventory::HostMap;

use crate::job::CommandBatch;
use crate::result::RunSummary;

/// Run a command batch on a resolved host selection
#[derive(Debug)]
pub struct RunCommands {
    /// Commands and their category
    pub batch: CommandBatch,
    /// Hosts with effective settings, keyed by hostname
    pub hosts: HostMap,
}

/// Ask for the outcome of the most recent successful run
#[derive(Debug)]
pub struct GetLastRun;

/// Outcome of the most recent run, if any
#[derive(Debug, Clone, Reply)]
pub struct LastRun {
    pub summary: Option<RunSummary>,
    /// Number of runs completed by this actor
    pub runs: u64,
}
