//! Progress reporting hook for dispatch runs

/// Receives progress notifications from the dispatcher
///
/// A run advances the observer twice per host: once when the host's unit is
/// dispatched and once when its result is retrieved.
pub trait ProgressObserver: Send + Sync {
    /// Advance by `count` steps, describing the step with `label`
    fn advance(&self, count: u64, label: &str);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn advance(&self, _count: u64, _label: &str) {}
}

/// Label announced when a host's unit is dispatched
#[must_use]
pub fn dispatch_label(host: &str) -> String {
    format!("Sending command(s) to {host}")
}

/// Label announced when a host's result is retrieved
#[must_use]
pub fn retrieve_label(host: &str) -> String {
    format!("Retrieving output from {host}")
}
