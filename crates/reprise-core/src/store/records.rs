//! Durable records exchanged across the persistence boundary

use crate::evaluator::EvaluationResult;
use crate::executor::ExecutionOutcome;
use crate::replay::composer::ComposedRequest;
use crate::replay::overrides::ReplayOverrides;
use crate::transcript::transcript::CapturedTranscript;
use crate::types::{new_id, now, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An agent whose calls are captured and replayed.
///
/// The defaults layer under run-level overrides when a regression starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent identifier
    pub id: Id,
    /// Agent name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default overrides applied to every replay for this agent
    #[serde(default)]
    pub defaults: ReplayOverrides,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AgentProfile {
    /// Create a new agent profile.
    pub fn new(name: impl Into<String>, defaults: ReplayOverrides) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            defaults,
            created_at: now(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A stored test case: one captured transcript plus the expectation its
/// replays are judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Test case identifier
    pub id: Id,
    /// Owning agent
    pub agent_id: Id,
    /// Test case name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The captured transcript replayed by this case
    pub transcript: CapturedTranscript,
    /// Acceptance criteria for the judge; absent means evaluation is skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// Create a new test case.
    pub fn new(agent_id: Id, name: impl Into<String>, transcript: CapturedTranscript) -> Self {
        Self {
            id: new_id(),
            agent_id,
            name: name.into(),
            description: None,
            transcript,
            expectation: None,
            created_at: now(),
        }
    }

    /// Set the acceptance criteria
    pub fn with_expectation(mut self, expectation: impl Into<String>) -> Self {
        self.expectation = Some(expectation.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Append-only record of one execution attempt.
///
/// Combines the effective composed fields with the outcome and the
/// evaluation; created exactly once per attempt and never mutated after the
/// evaluation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestLog {
    /// Log identifier
    pub id: Id,
    /// Test case that was executed
    pub test_case_id: Id,
    /// Agent the case belongs to
    pub agent_id: Id,
    /// Regression run this execution belonged to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_run_id: Option<Id>,
    /// Effective model name
    pub model_name: String,
    /// Effective model settings
    pub model_settings: crate::backend::settings::ModelSettings,
    /// Effective system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Effective final user message
    pub user_message: String,
    /// Effective tool list
    pub tools: Vec<crate::transcript::message::ToolDefinition>,
    /// Execution outcome
    pub outcome: ExecutionOutcome,
    /// Evaluation of the response
    pub evaluation: EvaluationResult,
    /// When the execution happened
    pub executed_at: DateTime<Utc>,
}

impl TestLog {
    /// Build the log for one completed execution attempt.
    pub fn new(
        case: &TestCase,
        regression_run_id: Option<Id>,
        composed: &ComposedRequest,
        outcome: ExecutionOutcome,
        evaluation: EvaluationResult,
    ) -> Self {
        Self {
            id: new_id(),
            test_case_id: case.id,
            agent_id: case.agent_id,
            regression_run_id,
            model_name: composed.model_name.clone(),
            model_settings: composed.settings.clone(),
            system_prompt: composed.system_prompt().map(String::from),
            user_message: composed.user_message().to_string(),
            tools: composed.tools.clone(),
            outcome,
            evaluation,
            executed_at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::settings::ModelSettings;
    use crate::evaluator::Verdict;
    use crate::replay::{compose, ReplayOverrides};
    use crate::transcript::message::TranscriptMessage;

    #[test]
    fn test_log_captures_effective_fields() {
        let transcript = CapturedTranscript::new(
            vec![
                TranscriptMessage::system("sys"),
                TranscriptMessage::user("Hi"),
            ],
            "gpt-4o",
            ModelSettings::default(),
            Vec::new(),
        );
        let case = TestCase::new(new_id(), "greeting", transcript);
        let composed = compose(
            &case.transcript,
            &ReplayOverrides::none().with_user_message("Hello there"),
        )
        .unwrap();

        let log = TestLog::new(
            &case,
            None,
            &composed,
            ExecutionOutcome::success("ok", 10),
            EvaluationResult {
                verdict: Verdict::Unknown,
                feedback: "evaluation skipped".to_string(),
                model_name: "judge".to_string(),
                satisfied_criteria: Vec::new(),
                missing_criteria: Vec::new(),
            },
        );

        assert_eq!(log.test_case_id, case.id);
        assert_eq!(log.system_prompt.as_deref(), Some("sys"));
        assert_eq!(log.user_message, "Hello there");
        assert!(log.regression_run_id.is_none());
        assert!(log.outcome.is_success());
    }
}
