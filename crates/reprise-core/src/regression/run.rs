//! Regression run record and status machine

use crate::evaluator::{EvaluationResult, Verdict};
use crate::executor::{ExecutionOutcome, ExecutionStatus};
use crate::replay::overrides::ReplayOverrides;
use crate::types::{new_id, now, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a regression run
///
/// ```text
/// pending --(worker pool starts)--> running --(all cases done)--> completed
/// pending --(no test cases found)--> failed
/// running --(unrecoverable setup fault)--> failed
/// ```
///
/// `completed` and `failed` are terminal and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, no workers started yet
    Pending,
    /// Worker pool is processing cases
    Running,
    /// All cases were processed (individual failures included)
    Completed,
    /// The run could not proceed at all
    Failed,
}

impl RunStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Whether a transition to `next` is legal
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Aggregate counters for a run.
///
/// `success`/`failed` track execution health; `passed`/`declined`/`unknown`
/// track judge verdicts. The two groups are independent — a case can execute
/// successfully and still be declined by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunCounters {
    /// Test cases enumerated for the run
    pub total: u32,
    /// Cases whose execution produced a response
    pub success: u32,
    /// Cases whose execution errored or timed out
    pub failed: u32,
    /// Cases the judge marked passing
    pub passed: u32,
    /// Cases the judge marked failing
    pub declined: u32,
    /// Cases with no verdict (no expectation, judge failure, or no committed result)
    pub unknown: u32,
}

impl RunCounters {
    /// Cases with a committed execution result
    pub fn processed(&self) -> u32 {
        self.success + self.failed
    }
}

/// Increment applied to run counters when one case finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub success: u32,
    pub failed: u32,
    pub passed: u32,
    pub declined: u32,
    pub unknown: u32,
}

impl CounterDelta {
    /// Delta for a case with a committed outcome and evaluation
    pub fn from_case(outcome: &ExecutionOutcome, evaluation: &EvaluationResult) -> Self {
        let mut delta = Self::default();
        match outcome.status {
            ExecutionStatus::Success => delta.success = 1,
            ExecutionStatus::Failed => delta.failed = 1,
        }
        match evaluation.verdict {
            Verdict::Passed => delta.passed = 1,
            Verdict::Declined => delta.declined = 1,
            Verdict::Unknown => delta.unknown = 1,
        }
        delta
    }

    /// Delta for a case rejected before execution (composition precondition)
    pub fn rejected() -> Self {
        Self {
            failed: 1,
            unknown: 1,
            ..Self::default()
        }
    }
}

/// One batch execution of all test cases owned by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRun {
    /// Run identifier
    pub id: Id,
    /// Agent under test
    pub agent_id: Id,
    /// Lifecycle state
    pub status: RunStatus,
    /// Resolved overrides the run executes under
    pub overrides: ReplayOverrides,
    /// Aggregate counters
    pub counters: RunCounters,
    /// Reason the run failed, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When work began
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When a terminal status was reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RegressionRun {
    /// Create a fresh pending run.
    pub fn new(agent_id: Id, overrides: ReplayOverrides) -> Self {
        Self {
            id: new_id(),
            agent_id,
            status: RunStatus::Pending,
            overrides,
            counters: RunCounters::default(),
            error_message: None,
            created_at: now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether the run reached a terminal status
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Failed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));

        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn test_counter_delta_keeps_groups_separate() {
        let outcome = ExecutionOutcome::success("ok", 12);
        let evaluation = EvaluationResult {
            verdict: Verdict::Declined,
            feedback: String::new(),
            model_name: String::new(),
            satisfied_criteria: Vec::new(),
            missing_criteria: Vec::new(),
        };
        let delta = CounterDelta::from_case(&outcome, &evaluation);
        assert_eq!(delta.success, 1);
        assert_eq!(delta.failed, 0);
        assert_eq!(delta.declined, 1);
        assert_eq!(delta.passed, 0);
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = RegressionRun::new(new_id(), ReplayOverrides::none());
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.counters.processed(), 0);
        assert!(run.started_at.is_none());
        assert!(!run.is_finished());
    }
}
