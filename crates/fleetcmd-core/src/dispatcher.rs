//! Concurrent multi-host dispatch engine
//!
//! A run fans one isolated unit out per host. Each unit is a tokio task that
//! owns its job, calls the executor, and reports exactly one [`HostResult`]
//! through its own [`ResultChannel`]. The dispatcher reaps units in
//! completion order through a `JoinSet`, so a slow host never delays
//! collecting a fast one. The run returns once every unit has been reaped;
//! there is no timeout and no cancellation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, instrument, trace, warn};

use fleetcmd_exec::CommandExecutor;
use fleetcmd_inventory::HostMap;

use crate::channel::{ResultChannel, ResultReader, ResultWriter};
use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::job::{CommandBatch, Job, build_jobs};
use crate::progress::{NoProgress, ProgressObserver, dispatch_label, retrieve_label};
use crate::result::{FailureKind, HostResult, RunReport};
use crate::state::JobState;

/// A dispatched job the aggregator is still waiting on
struct Outstanding {
    host: String,
    reader: ResultReader,
    state: JobState,
}

fn transition(host: &str, state: &mut JobState, next: JobState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal job transition {state} -> {next}"
    );
    trace!(host = %host, from = %state, to = %next, "job transition");
    *state = next;
}

/// Fans command batches out to hosts and aggregates their results
pub struct Dispatcher {
    executor: Arc<dyn CommandExecutor>,
    progress: Arc<dyn ProgressObserver>,
    config: DispatchConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("executor", &self.executor.executor_type())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher that reports no progress
    pub fn new(executor: Arc<dyn CommandExecutor>, config: DispatchConfig) -> Self {
        Self {
            executor,
            progress: Arc::new(NoProgress),
            config,
        }
    }

    /// Report progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run `batch` on every host in `hosts`
    ///
    /// All hosts are validated before anything is dispatched. Execution and
    /// transport failures land in the failing host's slot and never affect
    /// other hosts.
    ///
    /// # Errors
    /// Returns `CoreError` for an invalid configuration or when any host is
    /// missing a required connection setting.
    #[instrument(skip_all, fields(command_type = %batch.command_type, hosts = hosts.len()))]
    pub async fn run(&self, batch: &CommandBatch, hosts: &HostMap) -> Result<RunReport, CoreError> {
        self.config.validate()?;
        let jobs = build_jobs(hosts)?;
        let started_at = Utc::now();

        info!(
            queued_jobs = jobs.len(),
            command_type = %batch.command_type,
            max_concurrency = ?self.config.max_concurrency,
            "starting dispatch"
        );
        for command in &batch.commands {
            debug!(command = %command, "queued command");
        }

        let limiter = self
            .config
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let batch = Arc::new(batch.clone());

        let mut units = JoinSet::new();
        let mut outstanding: HashMap<Id, Outstanding> = HashMap::with_capacity(jobs.len());

        for job in jobs {
            self.progress.advance(1, &dispatch_label(&job.host));

            let (writer, reader) = ResultChannel::open(self.config.buffer_size);
            let mut state = JobState::Pending;
            transition(&job.host, &mut state, JobState::Dispatched);
            let host = job.host.clone();

            let handle = units.spawn(run_unit(
                job,
                Arc::clone(&batch),
                Arc::clone(&self.executor),
                limiter.clone(),
                writer,
            ));
            transition(&host, &mut state, JobState::Running);
            outstanding.insert(
                handle.id(),
                Outstanding {
                    host,
                    reader,
                    state,
                },
            );
        }

        let mut results = BTreeMap::new();

        while let Some(joined) = units.join_next_with_id().await {
            let (id, panic) = match joined {
                Ok((id, ())) => (id, None),
                Err(e) => (e.id(), Some(e)),
            };

            let Some(Outstanding {
                host,
                reader,
                mut state,
            }) = outstanding.remove(&id)
            else {
                error!(task = %id, "reaped unknown unit");
                continue;
            };
            transition(&host, &mut state, JobState::Exited);

            self.progress.advance(1, &retrieve_label(&host));

            let result = match panic {
                Some(e) => {
                    error!(host = %host, error = %e, "unit died before reporting");
                    // Release the read end without reading.
                    drop(reader);
                    HostResult::failed(FailureKind::Unit, format!("unit failed: {e}"))
                }
                None => match reader.receive().await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(host = %host, error = %e, "result transport failed");
                        HostResult::from(e)
                    }
                },
            };

            transition(&host, &mut state, JobState::Reaped);
            debug!(host = %host, success = result.is_success(), "job reaped");
            results.insert(host, result);
        }

        debug_assert!(outstanding.is_empty());

        let report = RunReport {
            command_type: batch.command_type,
            started_at,
            finished_at: Utc::now(),
            results,
        };

        let summary = report.summary();
        info!(
            hosts = summary.hosts,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "dispatch finished"
        );

        Ok(report)
    }
}

/// Body of one dispatch unit
///
/// Always writes exactly one message: executor errors are folded into the
/// result. The write end is consumed by `send`, so it is closed on return and
/// dropped on unwind.
async fn run_unit(
    job: Job,
    batch: Arc<CommandBatch>,
    executor: Arc<dyn CommandExecutor>,
    limiter: Option<Arc<Semaphore>>,
    writer: ResultWriter,
) {
    let _permit = match limiter {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    };

    debug!(host = %job.host, executor = executor.executor_type(), "unit running");

    let result = match executor
        .execute(&job.params, batch.command_type, &batch.commands)
        .await
    {
        Ok(outputs) => HostResult::Success(outputs),
        Err(e) => {
            warn!(host = %job.host, error = %e, "execution failed");
            HostResult::failed(FailureKind::Execution, e.to_string())
        }
    };

    if let Err(e) = writer.send(&result).await {
        error!(host = %job.host, error = %e, "failed to send result");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use fleetcmd_exec::{CommandOutputs, CommandType, ConnectionParams, ExecError};
    use fleetcmd_inventory::ResolvedHost;

    use super::*;

    /// Behaviour keyed by device address
    #[derive(Default)]
    struct ScriptedExecutor {
        fail: Vec<String>,
        panic: Vec<String>,
        huge: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            params: &ConnectionParams,
            _command_type: CommandType,
            commands: &[String],
        ) -> Result<CommandOutputs, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(&params.address) {
                return Err(ExecError::ConnectionFailed("connection refused".into()));
            }
            if self.panic.contains(&params.address) {
                panic!("driver crashed");
            }
            let body = if self.huge.contains(&params.address) {
                "x".repeat(10_000)
            } else {
                format!("output from {}", params.address)
            };
            Ok(commands.iter().map(|c| (c.clone(), body.clone())).collect())
        }

        fn executor_type(&self) -> &'static str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        labels: Mutex<Vec<String>>,
    }

    impl ProgressObserver for RecordingProgress {
        fn advance(&self, count: u64, label: &str) {
            assert_eq!(count, 1);
            self.labels.lock().unwrap().push(label.to_string());
        }
    }

    fn host(name: &str) -> ResolvedHost {
        ResolvedHost {
            name: name.to_string(),
            groups: vec![],
            settings: json!({
                "device_type": "junos",
                "hostname": name,
                "username": "admin",
                "password": "admin"
            })
            .as_object()
            .cloned()
            .unwrap(),
        }
    }

    fn hosts(names: &[&str]) -> HostMap {
        names.iter().map(|n| (n.to_string(), host(n))).collect()
    }

    #[tokio::test]
    async fn test_one_failing_host_of_three() {
        let executor = Arc::new(ScriptedExecutor {
            fail: vec!["r2".into()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(executor, DispatchConfig::default());
        let batch = CommandBatch::cli(["show version", "show interfaces terse"]);

        let report = dispatcher
            .run(&batch, &hosts(&["r1", "r2", "r3"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 3);
        let failure = report.get("r2").unwrap().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Execution);
        assert!(failure.message.contains("connection refused"));

        for name in ["r1", "r3"] {
            let outputs = report.get(name).unwrap().outputs().unwrap();
            assert_eq!(outputs.len(), 2);
            assert_eq!(
                outputs.get("show version"),
                Some(format!("output from {name}").as_str())
            );
        }
        assert_eq!(report.command_type, CommandType::Cli);
    }

    #[tokio::test]
    async fn test_result_keys_match_hosts_and_progress_twice_per_host() {
        let progress = Arc::new(RecordingProgress::default());
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedExecutor::default()),
            DispatchConfig::default(),
        )
        .with_progress(progress.clone());

        let names = ["a", "b", "c", "d", "e"];
        let report = dispatcher
            .run(&CommandBatch::operation(["show chassis"]), &hosts(&names))
            .await
            .unwrap();

        assert_eq!(report.results.keys().cloned().collect::<Vec<_>>(), names);

        let labels = progress.labels.lock().unwrap();
        assert_eq!(labels.len(), names.len() * 2);
        for name in names {
            assert_eq!(labels.iter().filter(|l| **l == dispatch_label(name)).count(), 1);
            assert_eq!(labels.iter().filter(|l| **l == retrieve_label(name)).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_panicking_unit_is_isolated() {
        let executor = Arc::new(ScriptedExecutor {
            panic: vec!["bad".into()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(executor, DispatchConfig::default());

        let report = dispatcher
            .run(&CommandBatch::cli(["show version"]), &hosts(&["bad", "good"]))
            .await
            .unwrap();

        assert_eq!(
            report.get("bad").unwrap().failure().unwrap().kind,
            FailureKind::Unit
        );
        assert!(report.get("good").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_oversized_result_is_transport_failure() {
        let executor = Arc::new(ScriptedExecutor {
            huge: vec!["big".into()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(executor, DispatchConfig::default().with_buffer_size(1024));

        let report = dispatcher
            .run(&CommandBatch::cli(["show configuration"]), &hosts(&["big", "small"]))
            .await
            .unwrap();

        let failure = report.get("big").unwrap().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert!(failure.message.contains("exceeds buffer size"));
        assert!(report.get("small").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_validation_happens_before_dispatch() {
        let executor = Arc::new(ScriptedExecutor::default());
        let progress = Arc::new(RecordingProgress::default());
        let dispatcher = Dispatcher::new(executor.clone(), DispatchConfig::default())
            .with_progress(progress.clone());

        let mut selection = hosts(&["ok"]);
        let mut broken = host("broken");
        broken.settings.remove("username");
        selection.insert("broken".into(), broken);

        let err = dispatcher
            .run(&CommandBatch::configure(["set system host-name r1"]), &selection)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::MissingField {
                field: "username",
                ..
            }
        ));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(progress.labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bounded_pool_completes_every_host() {
        let executor = Arc::new(ScriptedExecutor::default());
        let dispatcher =
            Dispatcher::new(executor.clone(), DispatchConfig::default().with_max_concurrency(1));

        let report = dispatcher
            .run(&CommandBatch::cli(["show version"]), &hosts(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(report.results.values().all(HostResult::is_success));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_host_set() {
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedExecutor::default()),
            DispatchConfig::default(),
        );
        let report = dispatcher
            .run(&CommandBatch::cli(["show version"]), &HostMap::new())
            .await
            .unwrap();
        assert!(report.results.is_empty());
    }

    /// Holds the `slow` device until the dispatcher has reaped `fast`
    struct GatedExecutor {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CommandExecutor for GatedExecutor {
        async fn execute(
            &self,
            params: &ConnectionParams,
            _command_type: CommandType,
            commands: &[String],
        ) -> Result<CommandOutputs, ExecError> {
            if params.address == "slow" {
                self.release.notified().await;
            }
            Ok(commands.iter().map(|c| (c.clone(), "done")).collect())
        }

        fn executor_type(&self) -> &'static str {
            "gated"
        }
    }

    struct ReleaseOnRetrieve {
        release: Arc<Notify>,
        order: Mutex<Vec<String>>,
    }

    impl ProgressObserver for ReleaseOnRetrieve {
        fn advance(&self, _count: u64, label: &str) {
            self.order.lock().unwrap().push(label.to_string());
            if label == retrieve_label("fast") {
                self.release.notify_one();
            }
        }
    }

    #[tokio::test]
    async fn test_slow_host_does_not_block_reaping() {
        let release = Arc::new(Notify::new());
        let progress = Arc::new(ReleaseOnRetrieve {
            release: release.clone(),
            order: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(
            Arc::new(GatedExecutor { release }),
            DispatchConfig::default(),
        )
        .with_progress(progress.clone());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.run(&CommandBatch::cli(["show version"]), &hosts(&["fast", "slow"])),
        )
        .await
        .expect("reaping blocked on the slow host")
        .unwrap();

        assert_eq!(report.results.len(), 2);
        let order = progress.order.lock().unwrap();
        let fast = order.iter().position(|l| *l == retrieve_label("fast")).unwrap();
        let slow = order.iter().position(|l| *l == retrieve_label("slow")).unwrap();
        assert!(fast < slow);
    }

    #[tokio::test]
    async fn test_results_keyed_by_host_map_after_snapshot_round_trip() {
        use fleetcmd_inventory::{HostSpec, Hosts, InventoryStore, ResolvedInventory};

        let mut inventory = Hosts::new();
        for name in ["r1", "r2", "r3"] {
            inventory.insert(
                name.to_string(),
                HostSpec::new().with_group("core").with_setting("hostname", name),
            );
        }
        let defaults = json!({"device_type": "junos", "username": "admin", "password": "admin"})
            .as_object()
            .cloned()
            .unwrap();
        let store = InventoryStore::new(inventory, Default::default(), defaults);

        let printed = serde_json::to_string(&store.get_inventory()).unwrap();
        let snapshot: ResolvedInventory = serde_json::from_str(&printed).unwrap();
        assert!(snapshot.hosts.values().all(|h| h.name.is_empty()));

        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedExecutor::default()),
            DispatchConfig::default(),
        );
        let report = dispatcher
            .run(&CommandBatch::cli(["show version"]), &snapshot.hosts)
            .await
            .unwrap();

        assert_eq!(
            report.results.keys().collect::<Vec<_>>(),
            snapshot.hosts.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            report.get("r2").and_then(HostResult::outputs).and_then(|o| o.get("show version")),
            Some("output from r2")
        );
    }
}
