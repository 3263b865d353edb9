//! End-to-end regression flow against scripted backends

use async_trait::async_trait;
use reprise_core::{
    backend::{JudgeBackend, JudgeOutput, ModelBackend},
    store::MemoryStore,
    ComposedRequest, EngineConfig, RepriseError, RepriseResult,
};
use reprise_sdk::{AgentProfile, ExecutionStatus, ReplayOverrides, RepriseClient, RunStatus, Verdict};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Backend that fails any case whose final user message contains a marker.
struct ScriptedBackend {
    fail_marker: &'static str,
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn call(&self, request: &ComposedRequest, _timeout: Duration) -> RepriseResult<String> {
        if request.user_message().contains(self.fail_marker) {
            Err(RepriseError::timeout(5))
        } else {
            Ok(format!("Hello from {}", request.model_name))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Judge that passes any response containing "Hello".
struct ScriptedJudge;

#[async_trait]
impl JudgeBackend for ScriptedJudge {
    async fn judge(
        &self,
        _user_message: &str,
        response: &str,
        _expectation: &str,
    ) -> RepriseResult<JudgeOutput> {
        Ok(JudgeOutput {
            passed: response.contains("Hello"),
            feedback: "scripted verdict".to_string(),
            satisfied_criteria: Vec::new(),
            missing_criteria: Vec::new(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted-judge"
    }
}

/// Judge that always errors.
struct BrokenJudge;

#[async_trait]
impl JudgeBackend for BrokenJudge {
    async fn judge(
        &self,
        _user_message: &str,
        _response: &str,
        _expectation: &str,
    ) -> RepriseResult<JudgeOutput> {
        Err(RepriseError::judge("judge backend unreachable"))
    }

    fn model_name(&self) -> &str {
        "broken-judge"
    }
}

fn capture(user_message: &str) -> serde_json::Value {
    json!({
        "attributes": {
            "http.request.body.text": {
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You are helpful"},
                    {"role": "assistant", "content": "ack"},
                    {"role": "user", "content": user_message}
                ]
            }
        }
    })
}

fn client_with(judge: Arc<dyn JudgeBackend>) -> RepriseClient {
    RepriseClient::with_components(
        EngineConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedBackend {
            fail_marker: "case-2",
        }),
        judge,
    )
    .expect("client construction")
}

#[tokio::test]
async fn regression_run_with_one_backend_failure() {
    let client = client_with(Arc::new(ScriptedJudge));

    let agent_id = client
        .create_agent(AgentProfile::new("support-bot", ReplayOverrides::none()))
        .await
        .unwrap();
    for name in ["case-1", "case-2", "case-3"] {
        client
            .import_test_case(
                agent_id,
                name,
                &capture(name),
                Some("greets the user".to_string()),
            )
            .await
            .unwrap();
    }

    let run = client
        .start_regression(agent_id, ReplayOverrides::none())
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Pending);

    let watcher = client.watcher(Duration::from_millis(20));
    let mut snapshots = Vec::new();
    let finished = watcher
        .wait_with_progress(run.id, |snapshot| snapshots.push(snapshot.counters))
        .await
        .unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(finished.counters.total, 3);
    assert_eq!(finished.counters.success, 2);
    assert_eq!(finished.counters.failed, 1);
    assert_eq!(finished.counters.passed, 2);
    assert_eq!(finished.counters.declined, 1);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());

    // Counters never regressed or overshot while we watched.
    for pair in snapshots.windows(2) {
        assert!(pair[1].success >= pair[0].success);
        assert!(pair[1].failed >= pair[0].failed);
    }
    for snapshot in &snapshots {
        assert!(snapshot.success + snapshot.failed <= 3);
    }

    // Exactly one log per case, each tied to the run.
    let logs = client.run_logs(finished.id).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.regression_run_id == Some(finished.id)));
    let failed_log = logs
        .iter()
        .find(|l| l.outcome.status == ExecutionStatus::Failed)
        .expect("one failed case");
    assert!(failed_log.outcome.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(failed_log.evaluation.verdict, Verdict::Declined);
}

#[tokio::test]
async fn judge_failure_never_touches_execution_results() {
    let client = client_with(Arc::new(BrokenJudge));

    let agent_id = client
        .create_agent(AgentProfile::new("support-bot", ReplayOverrides::none()))
        .await
        .unwrap();
    for name in ["case-1", "case-3"] {
        client
            .import_test_case(
                agent_id,
                name,
                &capture(name),
                Some("greets the user".to_string()),
            )
            .await
            .unwrap();
    }

    let run = client
        .start_regression(agent_id, ReplayOverrides::none())
        .await
        .unwrap();
    let finished = client.wait_for_run(run.id).await.unwrap();

    // Executions stay healthy; every verdict degrades to unknown.
    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(finished.counters.success, 2);
    assert_eq!(finished.counters.failed, 0);
    assert_eq!(finished.counters.unknown, 2);

    let logs = client.run_logs(finished.id).await.unwrap();
    assert_eq!(logs.len(), 2);
    for log in logs {
        assert_eq!(log.outcome.status, ExecutionStatus::Success);
        assert_eq!(log.evaluation.verdict, Verdict::Unknown);
        assert!(log.evaluation.feedback.contains("evaluation failed"));
    }
}

#[tokio::test]
async fn zero_case_agent_fails_fast() {
    let client = client_with(Arc::new(ScriptedJudge));
    let agent_id = client
        .create_agent(AgentProfile::new("empty-agent", ReplayOverrides::none()))
        .await
        .unwrap();

    let run = client
        .start_regression(agent_id, ReplayOverrides::none())
        .await
        .unwrap();
    let finished = client.wait_for_run(run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(finished.counters.total, 0);
    assert!(client.run_logs(finished.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn overrides_flow_through_to_the_backend() {
    let client = client_with(Arc::new(ScriptedJudge));
    let agent_id = client
        .create_agent(AgentProfile::new(
            "support-bot",
            ReplayOverrides::none().with_system_prompt("agent default"),
        ))
        .await
        .unwrap();
    let case = client
        .import_test_case(agent_id, "case-1", &capture("case-1"), None)
        .await
        .unwrap();

    let report = client
        .run_case(
            case.id,
            ReplayOverrides::none().with_model_name("replacement-model"),
        )
        .await
        .unwrap();

    assert_eq!(report.outcome.status, ExecutionStatus::Success);
    assert_eq!(
        report.outcome.response.as_deref(),
        Some("Hello from replacement-model")
    );
    // No expectation on this case: evaluation was skipped, not failed.
    assert_eq!(report.evaluation.verdict, Verdict::Unknown);
    assert_eq!(report.evaluation.feedback, "evaluation skipped");
}
