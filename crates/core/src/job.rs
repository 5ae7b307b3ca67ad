//! Snapshot job lifecycle
//!
//! ```text
//! Dumping ──► Archiving ──► Succeeded
//!    │            │
//!    └────────────┴──────► Failed
//! ```
//!
//! States only move forward. `Succeeded` and `Failed` are terminal.

use crate::error::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a snapshot job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Entity dumps and the audit drain are running
    Dumping,
    /// The working tree is being packed into the final archive
    Archiving,
    /// Archive written and status persisted
    Succeeded,
    /// Aborted; the failure reason was persisted
    Failed,
}

impl JobState {
    /// Check if the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Check if `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Dumping, JobState::Archiving)
                | (JobState::Dumping, JobState::Failed)
                | (JobState::Archiving, JobState::Succeeded)
                | (JobState::Archiving, JobState::Failed)
        )
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Dumping => "dumping",
            JobState::Archiving => "archiving",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One snapshot creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotJob {
    id: String,
    include_logs: bool,
    include_events: bool,
    state: JobState,
}

impl SnapshotJob {
    /// Create a job that includes events and logs
    pub fn new(id: impl Into<String>) -> Self {
        SnapshotJob {
            id: id.into(),
            include_logs: true,
            include_events: true,
            state: JobState::Dumping,
        }
    }

    /// Include or skip log entries when dumping events
    pub fn with_logs(mut self, include_logs: bool) -> Self {
        self.include_logs = include_logs;
        self
    }

    /// Include or skip the `events` dump type entirely
    pub fn with_events(mut self, include_events: bool) -> Self {
        self.include_events = include_events;
        self
    }

    /// Snapshot id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether log entries are dumped along with events
    pub fn include_logs(&self) -> bool {
        self.include_logs
    }

    /// Whether events are dumped
    pub fn include_events(&self) -> bool {
        self.include_events
    }

    /// Current lifecycle state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`, rejecting backward or post-terminal transitions
    pub fn advance(&mut self, next: JobState) -> SnapshotResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(SnapshotError::invariant(format!(
                "snapshot {}: illegal state transition {} -> {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}
