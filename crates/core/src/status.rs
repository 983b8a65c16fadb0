//! Job lifecycle states and the legal edges between them.
//!
//! ```text
//! queued ──► running ──► completed
//!   │           │  └───► failed
//!   └───────────┴──────► canceled
//! ```
//!
//! `running → running` is also accepted so progress writes can go through
//! the same guarded transition as everything else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Current lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobState {
    /// All states, in lifecycle order.
    pub const ALL: [JobState; 5] = [
        JobState::Queued,
        JobState::Running,
        JobState::Completed,
        JobState::Failed,
        JobState::Canceled,
    ];

    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        }
    }

    /// `completed`, `failed` and `canceled` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Canceled
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle edge.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Canceled)
                | (Running, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Canceled)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown job state '{s}'. Must be one of: queued, running, completed, failed, canceled"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Canceled.is_terminal());
    }

    #[test]
    fn nothing_leaves_a_terminal_state() {
        for from in JobState::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in JobState::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn queued_cannot_skip_running() {
        assert!(!JobState::Queued.can_transition_to(JobState::Completed));
        assert!(!JobState::Queued.can_transition_to(JobState::Failed));
        assert!(!JobState::Queued.can_transition_to(JobState::Queued));
    }

    #[test]
    fn cancel_reachable_from_queued_and_running() {
        assert!(JobState::Queued.can_transition_to(JobState::Canceled));
        assert!(JobState::Running.can_transition_to(JobState::Canceled));
    }

    #[test]
    fn parse_round_trips_wire_names() {
        for state in JobState::ALL {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
        assert!("waiting".parse::<JobState>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&JobState::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }
}
