// src/job/status.rs

//! Job status state machine.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Initial state, before the blocked check.
    Submitted,
    /// Waiting for at least one input to become ready for reading.
    Blocked,
    /// Queued for dispatch.
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl JobStatus {
    /// `true` for the four terminal states.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Skipped
        )
    }

    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match self {
            Submitted => matches!(next, Blocked | Pending | Cancelled),
            Blocked => matches!(next, Pending | Cancelled),
            Pending => matches!(next, Running | Skipped | Cancelled),
            Running => matches!(next, Completed | Failed | Skipped | Cancelled),
            Completed | Failed | Cancelled | Skipped => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Blocked => "BLOCKED",
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
