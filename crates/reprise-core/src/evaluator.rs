//! Automated response evaluation

use crate::backend::JudgeBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Judge verdict for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The response satisfies the expectation
    Passed,
    /// The response misses or contradicts the expectation
    Declined,
    /// No expectation was supplied, or the judge itself failed
    Unknown,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::Declined => write!(f, "declined"),
            Verdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of evaluating one response.
///
/// Evaluation is advisory: it never alters the execution outcome it judged,
/// and a verdict of `unknown` is a normal, non-fatal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The verdict
    pub verdict: Verdict,
    /// Human-readable summary of the judgement
    pub feedback: String,
    /// Model that produced the judgement
    pub model_name: String,
    /// Criteria the response satisfied
    #[serde(default)]
    pub satisfied_criteria: Vec<String>,
    /// Criteria the response missed or contradicted
    #[serde(default)]
    pub missing_criteria: Vec<String>,
}

impl EvaluationResult {
    fn bare(verdict: Verdict, feedback: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            verdict,
            feedback: feedback.into(),
            model_name: model_name.into(),
            satisfied_criteria: Vec::new(),
            missing_criteria: Vec::new(),
        }
    }
}

/// Judges responses against per-case expectations.
///
/// Evaluation is opt-in: a case without an expectation is never sent to the
/// judge. Judge failures of any kind degrade to an `unknown` verdict — they
/// are never allowed to fail the execution or the run that triggered them.
pub struct Evaluator {
    judge: Arc<dyn JudgeBackend>,
}

impl Evaluator {
    /// Create an evaluator over a judge backend.
    pub fn new(judge: Arc<dyn JudgeBackend>) -> Self {
        Self { judge }
    }

    /// Evaluate a produced response against an expectation.
    #[instrument(skip_all, fields(judge = %self.judge.model_name()))]
    pub async fn evaluate(
        &self,
        user_message: &str,
        response: Option<&str>,
        expectation: Option<&str>,
    ) -> EvaluationResult {
        let model_name = self.judge.model_name().to_string();

        let Some(expectation) = expectation.filter(|e| !e.trim().is_empty()) else {
            return EvaluationResult::bare(Verdict::Unknown, "evaluation skipped", model_name);
        };

        let Some(response) = response.filter(|r| !r.trim().is_empty()) else {
            return EvaluationResult::bare(
                Verdict::Declined,
                "no response was produced to evaluate",
                model_name,
            );
        };

        match self.judge.judge(user_message, response, expectation).await {
            Ok(output) => {
                let verdict = if output.passed {
                    Verdict::Passed
                } else {
                    Verdict::Declined
                };
                let feedback = if output.feedback.trim().is_empty() {
                    String::from("evaluation completed without additional feedback")
                } else {
                    output.feedback
                };
                EvaluationResult {
                    verdict,
                    feedback,
                    model_name,
                    satisfied_criteria: output.satisfied_criteria,
                    missing_criteria: output.missing_criteria,
                }
            }
            Err(e) => {
                warn!(error = %e, "evaluation degraded to unknown");
                EvaluationResult::bare(
                    Verdict::Unknown,
                    format!("evaluation failed: {}", e),
                    model_name,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JudgeOutput, MockJudgeBackend};
    use crate::error::RepriseError;

    fn judge_with_output(output: JudgeOutput) -> MockJudgeBackend {
        let mut judge = MockJudgeBackend::new();
        judge
            .expect_judge()
            .returning(move |_, _, _| Ok(output.clone()));
        judge.expect_model_name().return_const("judge-model".to_string());
        judge
    }

    #[tokio::test]
    async fn test_no_expectation_skips_judge() {
        let mut judge = MockJudgeBackend::new();
        judge.expect_judge().never();
        judge.expect_model_name().return_const("judge-model".to_string());

        let evaluator = Evaluator::new(Arc::new(judge));
        let result = evaluator.evaluate("Hi", Some("Hello"), None).await;
        assert_eq!(result.verdict, Verdict::Unknown);
        assert_eq!(result.feedback, "evaluation skipped");

        let result = evaluator.evaluate("Hi", Some("Hello"), Some("  ")).await;
        assert_eq!(result.verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_missing_response_declines_without_judge() {
        let mut judge = MockJudgeBackend::new();
        judge.expect_judge().never();
        judge.expect_model_name().return_const("judge-model".to_string());

        let evaluator = Evaluator::new(Arc::new(judge));
        let result = evaluator.evaluate("Hi", None, Some("greets the user")).await;
        assert_eq!(result.verdict, Verdict::Declined);
        assert!(result.feedback.contains("no response"));
    }

    #[tokio::test]
    async fn test_passing_verdict() {
        let judge = judge_with_output(JudgeOutput {
            passed: true,
            feedback: "greets politely".to_string(),
            satisfied_criteria: vec!["greets".to_string()],
            missing_criteria: Vec::new(),
        });

        let evaluator = Evaluator::new(Arc::new(judge));
        let result = evaluator
            .evaluate("Hi", Some("Hello there"), Some("greets the user"))
            .await;
        assert_eq!(result.verdict, Verdict::Passed);
        assert_eq!(result.model_name, "judge-model");
        assert_eq!(result.satisfied_criteria, vec!["greets"]);
    }

    #[tokio::test]
    async fn test_declining_verdict_with_empty_feedback_gets_default() {
        let judge = judge_with_output(JudgeOutput {
            passed: false,
            feedback: String::new(),
            satisfied_criteria: Vec::new(),
            missing_criteria: vec!["greets".to_string()],
        });

        let evaluator = Evaluator::new(Arc::new(judge));
        let result = evaluator
            .evaluate("Hi", Some("Go away"), Some("greets the user"))
            .await;
        assert_eq!(result.verdict, Verdict::Declined);
        assert!(!result.feedback.is_empty());
        assert_eq!(result.missing_criteria, vec!["greets"]);
    }

    #[tokio::test]
    async fn test_judge_failure_degrades_to_unknown() {
        let mut judge = MockJudgeBackend::new();
        judge
            .expect_judge()
            .returning(|_, _, _| Err(RepriseError::judge("judge unreachable")));
        judge.expect_model_name().return_const("judge-model".to_string());

        let evaluator = Evaluator::new(Arc::new(judge));
        let result = evaluator
            .evaluate("Hi", Some("Hello"), Some("greets the user"))
            .await;
        assert_eq!(result.verdict, Verdict::Unknown);
        assert!(result.feedback.contains("evaluation failed"));
    }
}
