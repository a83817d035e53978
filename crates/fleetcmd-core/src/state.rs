//! Job lifecycle state machine

use std::fmt;

/// Lifecycle of a job inside a dispatch run
///
/// `Pending → Dispatched → Running → Exited → Reaped`. There is no
/// cancellation edge: once dispatched a job is followed until it is reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Validated, no channel yet
    Pending,
    /// Channel opened
    Dispatched,
    /// Unit spawned onto the runtime
    Running,
    /// Unit finished, normally or by panicking
    Exited,
    /// Result read and stored
    Reaped,
}

impl JobState {
    /// Whether `next` is the single legal successor of this state
    #[must_use]
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Dispatched)
                | (JobState::Dispatched, JobState::Running)
                | (JobState::Running, JobState::Exited)
                | (JobState::Exited, JobState::Reaped)
        )
    }

    /// Whether the job has reached its final state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == JobState::Reaped
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Dispatched => "dispatched",
            JobState::Running => "running",
            JobState::Exited => "exited",
            JobState::Reaped => "reaped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        let path = [
            JobState::Pending,
            JobState::Dispatched,
            JobState::Running,
            JobState::Exited,
            JobState::Reaped,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
            assert!(!pair[1].can_transition_to(pair[0]));
        }
        assert!(!JobState::Running.can_transition_to(JobState::Reaped));
        assert!(!JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Reaped.is_terminal());
        assert!(!JobState::Exited.is_terminal());
    }
}
