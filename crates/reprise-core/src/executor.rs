//! Single-case execution against the model backend

use crate::backend::ModelBackend;
use crate::replay::composer::ComposedRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Execution health of one replayed case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The backend returned a response
    Success,
    /// The backend errored or timed out
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one execution attempt.
///
/// Created once per attempt and never mutated. The response is present
/// exactly when the status is success; the error description exactly when it
/// is failed. Latency covers the backend call alone and is recorded on both
/// paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether the backend produced a response
    pub status: ExecutionStatus,
    /// Wall-clock latency of the backend call in milliseconds
    pub latency_ms: u64,
    /// Response text (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Error description (failure only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Successful outcome with the produced response
    pub fn success(response: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::Success,
            latency_ms,
            response: Some(response.into()),
            error: None,
        }
    }

    /// Failed outcome with an error description
    pub fn failed(error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            latency_ms,
            response: None,
            error: Some(error.into()),
        }
    }

    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Executes composed requests one at a time against a model backend.
///
/// Every backend problem (timeout, transport error, bad status, unparseable
/// body) is absorbed into a failed [`ExecutionOutcome`]; nothing escapes this
/// boundary, so callers can treat every case independently. There is no
/// internal retry — failed cases are reported, and re-execution is an
/// operator decision.
pub struct CaseExecutor {
    backend: Arc<dyn ModelBackend>,
    call_timeout: Duration,
}

impl CaseExecutor {
    /// Create an executor over a backend with a per-call timeout.
    pub fn new(backend: Arc<dyn ModelBackend>, call_timeout: Duration) -> Self {
        Self {
            backend,
            call_timeout,
        }
    }

    /// Execute one composed request and classify the outcome.
    #[instrument(skip(self, request), fields(model = %request.model_name, backend = %self.backend.name()))]
    pub async fn execute(&self, request: &ComposedRequest) -> ExecutionOutcome {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.call_timeout, self.backend.call(request, self.call_timeout))
                .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(response)) => {
                info!(latency_ms, chars = response.len(), "case executed");
                ExecutionOutcome::success(response, latency_ms)
            }
            Ok(Err(e)) => {
                error!(latency_ms, error = %e, "case execution failed");
                ExecutionOutcome::failed(e.to_string(), latency_ms)
            }
            Err(_) => {
                let seconds = self.call_timeout.as_secs();
                error!(latency_ms, seconds, "case execution timed out");
                ExecutionOutcome::failed(
                    crate::error::RepriseError::timeout(seconds).to_string(),
                    latency_ms,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::settings::ModelSettings;
    use crate::backend::MockModelBackend;
    use crate::error::RepriseError;
    use crate::transcript::message::TranscriptMessage;

    fn request() -> ComposedRequest {
        ComposedRequest {
            model_name: "gpt-4o".to_string(),
            messages: vec![TranscriptMessage::user("Hi")],
            settings: ModelSettings::default(),
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_success_outcome_carries_response_and_latency() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_call()
            .returning(|_, _| Ok("Hello there".to_string()));
        backend.expect_name().return_const("mock".to_string());

        let executor = CaseExecutor::new(Arc::new(backend), Duration::from_secs(5));
        let outcome = executor.execute(&request()).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.response.as_deref(), Some("Hello there"));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_backend_error_becomes_failed_outcome() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_call()
            .returning(|_, _| Err(RepriseError::backend("503 overloaded")));
        backend.expect_name().return_const("mock".to_string());

        let executor = CaseExecutor::new(Arc::new(backend), Duration::from_secs(5));
        let outcome = executor.execute(&request()).await;
        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.response.is_none());
        assert!(outcome.error.as_deref().unwrap().contains("503"));
    }

    struct SlowBackend;

    #[async_trait::async_trait]
    impl crate::backend::ModelBackend for SlowBackend {
        async fn call(
            &self,
            _request: &ComposedRequest,
            _timeout: Duration,
        ) -> crate::error::RepriseResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_outcome() {
        let executor = CaseExecutor::new(Arc::new(SlowBackend), Duration::from_millis(20));
        let outcome = executor.execute(&request()).await;
        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.error.as_deref().unwrap().contains("timed out"));
    }
}
