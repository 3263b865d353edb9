//! Judge backend driven by a regular model backend

use crate::backend::settings::ModelSettings;
use crate::backend::{JudgeBackend, JudgeOutput, ModelBackend};
use crate::error::{RepriseError, RepriseResult};
use crate::replay::composer::ComposedRequest;
use crate::transcript::message::TranscriptMessage;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const JUDGE_SYSTEM_PROMPT: &str = "\
You are an impartial judge that decides whether an AI assistant's response \
satisfies explicit acceptance criteria.

1. The acceptance criteria are the source of truth. Every critical requirement \
must be satisfied; missing or contradicting information means failure.
2. Do not require exact wording as long as the criteria are satisfied.
3. Reference concrete issues in your feedback and keep it brief.

Reply with a single JSON object and nothing else:
{\"passed\": bool, \"feedback\": string, \"satisfied_criteria\": [string], \"missing_criteria\": [string]}";

/// Judge that runs an ordinary chat model with a fixed judging prompt and
/// parses its structured verdict.
pub struct ModelJudge {
    backend: Arc<dyn ModelBackend>,
    model_name: String,
    call_timeout: Duration,
}

impl ModelJudge {
    /// Create a judge over any model backend.
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        model_name: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            model_name: model_name.into(),
            call_timeout,
        }
    }

    fn build_prompt(user_message: &str, response: &str, expectation: &str) -> String {
        let mut sections = Vec::new();
        if !user_message.is_empty() {
            sections.push(format!("User Message:\n{}", user_message.trim()));
        }
        sections.push(format!("Acceptance Criteria:\n{}", expectation.trim()));
        sections.push(format!("Actual Response to Evaluate:\n{}", response.trim()));
        sections.push(String::from(
            "Determine if the actual response satisfies the acceptance criteria. \
If any critical requirement is missing or incorrect, mark it as failed.",
        ));
        sections.join("\n\n")
    }
}

#[async_trait]
impl JudgeBackend for ModelJudge {
    #[instrument(skip(self, user_message, response, expectation), fields(model = %self.model_name))]
    async fn judge(
        &self,
        user_message: &str,
        response: &str,
        expectation: &str,
    ) -> RepriseResult<JudgeOutput> {
        let request = ComposedRequest {
            model_name: self.model_name.clone(),
            messages: vec![
                TranscriptMessage::system(JUDGE_SYSTEM_PROMPT),
                TranscriptMessage::user(Self::build_prompt(user_message, response, expectation)),
            ],
            settings: ModelSettings::with_temperature(0.0),
            tools: Vec::new(),
        };

        let reply = self
            .backend
            .call(&request, self.call_timeout)
            .await
            .map_err(|e| RepriseError::judge(format!("judge call failed: {}", e)))?;

        let output = parse_verdict(&reply)?;
        debug!(passed = output.passed, "judge verdict parsed");
        Ok(output)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parse the judge's reply into a structured verdict.
///
/// Accepts a bare JSON object or one wrapped in a fenced code block.
fn parse_verdict(reply: &str) -> RepriseResult<JudgeOutput> {
    let block = extract_json_object(reply)
        .ok_or_else(|| RepriseError::judge("judge reply held no JSON object"))?;
    serde_json::from_str(block)
        .map_err(|e| RepriseError::judge(format!("malformed judge verdict: {}", e)))
}

fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the fence language tag and the closing fence.
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        rest.split("```").next().unwrap_or(rest)
    } else {
        trimmed
    };

    let start = inner.find('{')?;
    let end = inner.rfind('}')?;
    (end > start).then(|| &inner[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockModelBackend;

    #[test]
    fn test_extract_bare_json() {
        let text = "{\"passed\": true, \"feedback\": \"ok\"}";
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "```json\n{\"passed\": false}\n```";
        assert_eq!(extract_json_object(text), Some("{\"passed\": false}"));
    }

    #[test]
    fn test_extract_json_with_prose_around_it() {
        let text = "Here is my verdict: {\"passed\": true} — done.";
        assert_eq!(extract_json_object(text), Some("{\"passed\": true}"));
    }

    #[test]
    fn test_parse_verdict_defaults_missing_lists() {
        let output = parse_verdict("{\"passed\": true, \"feedback\": \"fine\"}").unwrap();
        assert!(output.passed);
        assert!(output.satisfied_criteria.is_empty());
        assert!(output.missing_criteria.is_empty());
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        assert!(parse_verdict("the response looks good to me").is_err());
    }

    #[tokio::test]
    async fn test_judge_round_trip() {
        let mut backend = MockModelBackend::new();
        backend.expect_call().returning(|_, _| {
            Ok("{\"passed\": true, \"feedback\": \"criteria met\", \
\"satisfied_criteria\": [\"greets\"], \"missing_criteria\": []}"
                .to_string())
        });
        backend.expect_name().return_const("mock".to_string());

        let judge = ModelJudge::new(Arc::new(backend), "judge-model", Duration::from_secs(5));
        let output = judge.judge("Hi", "Hello there", "greets the user").await.unwrap();
        assert!(output.passed);
        assert_eq!(output.satisfied_criteria, vec!["greets"]);
    }

    #[tokio::test]
    async fn test_judge_call_failure_surfaces_as_judge_error() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_call()
            .returning(|_, _| Err(RepriseError::backend("boom")));

        let judge = ModelJudge::new(Arc::new(backend), "judge-model", Duration::from_secs(5));
        let err = judge.judge("u", "r", "e").await.unwrap_err();
        assert!(matches!(err, RepriseError::Judge(_)));
    }
}
