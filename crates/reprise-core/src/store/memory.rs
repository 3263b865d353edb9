//! In-memory store adapter

use crate::error::{RepriseError, RepriseResult};
use crate::regression::run::{CounterDelta, RegressionRun, RunStatus};
use crate::store::records::{AgentProfile, TestCase, TestLog};
use crate::store::RegressionStore;
use crate::types::{now, Id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    agents: HashMap<Id, AgentProfile>,
    cases: HashMap<Id, TestCase>,
    runs: HashMap<Id, RegressionRun>,
    logs: HashMap<Id, TestLog>,
    log_order: Vec<Id>,
}

/// In-memory [`RegressionStore`].
///
/// Backs tests and one-shot CLI invocations where nothing needs to outlive
/// the process. All mutation goes through one async mutex, which also makes
/// counter updates atomic read-modify-writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegressionStore for MemoryStore {
    async fn create_agent(&self, agent: AgentProfile) -> RepriseResult<Id> {
        let mut inner = self.inner.lock().await;
        let id = agent.id;
        inner.agents.insert(id, agent);
        Ok(id)
    }

    async fn get_agent(&self, id: Id) -> RepriseResult<Option<AgentProfile>> {
        let inner = self.inner.lock().await;
        Ok(inner.agents.get(&id).cloned())
    }

    async fn create_test_case(&self, case: TestCase) -> RepriseResult<Id> {
        let mut inner = self.inner.lock().await;
        let id = case.id;
        inner.cases.insert(id, case);
        Ok(id)
    }

    async fn get_test_case(&self, id: Id) -> RepriseResult<Option<TestCase>> {
        let inner = self.inner.lock().await;
        Ok(inner.cases.get(&id).cloned())
    }

    async fn list_test_cases(&self, agent_id: Id) -> RepriseResult<Vec<TestCase>> {
        let inner = self.inner.lock().await;
        let mut cases: Vec<TestCase> = inner
            .cases
            .values()
            .filter(|c| c.agent_id == agent_id)
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(cases)
    }

    async fn create_run(&self, run: RegressionRun) -> RepriseResult<Id> {
        let mut inner = self.inner.lock().await;
        let id = run.id;
        inner.runs.insert(id, run);
        Ok(id)
    }

    async fn get_run(&self, id: Id) -> RepriseResult<Option<RegressionRun>> {
        let inner = self.inner.lock().await;
        Ok(inner.runs.get(&id).cloned())
    }

    async fn begin_run(&self, id: Id, total_count: u32) -> RepriseResult<()> {
        let mut inner = self.inner.lock().await;
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| RepriseError::store(format!("run not found: {}", id)))?;
        if !run.status.can_transition_to(RunStatus::Running) {
            return Err(RepriseError::store(format!(
                "illegal transition {} -> running for run {}",
                run.status, id
            )));
        }
        run.status = RunStatus::Running;
        run.counters.total = total_count;
        run.started_at = Some(now());
        Ok(())
    }

    async fn set_run_status(
        &self,
        id: Id,
        status: RunStatus,
        error_message: Option<String>,
    ) -> RepriseResult<()> {
        let mut inner = self.inner.lock().await;
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| RepriseError::store(format!("run not found: {}", id)))?;
        if !run.status.can_transition_to(status) {
            return Err(RepriseError::store(format!(
                "illegal transition {} -> {} for run {}",
                run.status, status, id
            )));
        }
        run.status = status;
        run.error_message = error_message;
        if status.is_terminal() {
            run.completed_at = Some(now());
        }
        Ok(())
    }

    async fn update_run_counters(&self, id: Id, delta: CounterDelta) -> RepriseResult<()> {
        let mut inner = self.inner.lock().await;
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| RepriseError::store(format!("run not found: {}", id)))?;
        if run.status.is_terminal() {
            return Err(RepriseError::store(format!(
                "run {} is {}; counters are frozen",
                id, run.status
            )));
        }
        run.counters.success += delta.success;
        run.counters.failed += delta.failed;
        run.counters.passed += delta.passed;
        run.counters.declined += delta.declined;
        run.counters.unknown += delta.unknown;
        Ok(())
    }

    async fn append_log(&self, log: TestLog) -> RepriseResult<Id> {
        let mut inner = self.inner.lock().await;
        let id = log.id;
        inner.logs.insert(id, log);
        inner.log_order.push(id);
        Ok(id)
    }

    async fn get_log(&self, id: Id) -> RepriseResult<Option<TestLog>> {
        let inner = self.inner.lock().await;
        Ok(inner.logs.get(&id).cloned())
    }

    async fn list_logs_for_run(&self, run_id: Id) -> RepriseResult<Vec<TestLog>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .log_order
            .iter()
            .filter_map(|id| inner.logs.get(id))
            .filter(|log| log.regression_run_id == Some(run_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayOverrides;
    use crate::types::new_id;

    #[tokio::test]
    async fn test_run_lifecycle() {
        let store = MemoryStore::new();
        let run = RegressionRun::new(new_id(), ReplayOverrides::none());
        let id = store.create_run(run).await.unwrap();

        store.begin_run(id, 3).await.unwrap();
        let run = store.get_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.counters.total, 3);
        assert!(run.started_at.is_some());

        store
            .update_run_counters(
                id,
                CounterDelta {
                    success: 1,
                    passed: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .set_run_status(id, RunStatus::Completed, None)
            .await
            .unwrap();

        let run = store.get_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.counters.success, 1);
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_status_is_never_revisited() {
        let store = MemoryStore::new();
        let run = RegressionRun::new(new_id(), ReplayOverrides::none());
        let id = store.create_run(run).await.unwrap();

        store
            .set_run_status(id, RunStatus::Failed, Some("no test cases".to_string()))
            .await
            .unwrap();

        assert!(store.begin_run(id, 1).await.is_err());
        assert!(store
            .set_run_status(id, RunStatus::Completed, None)
            .await
            .is_err());
        assert!(store
            .update_run_counters(id, CounterDelta::rejected())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_test_cases_filters_by_agent() {
        use crate::backend::settings::ModelSettings;
        use crate::transcript::message::TranscriptMessage;
        use crate::transcript::transcript::CapturedTranscript;

        let store = MemoryStore::new();
        let agent_a = new_id();
        let agent_b = new_id();
        let transcript = CapturedTranscript::new(
            vec![TranscriptMessage::user("Hi")],
            "m",
            ModelSettings::default(),
            Vec::new(),
        );
        store
            .create_test_case(TestCase::new(agent_a, "one", transcript.clone()))
            .await
            .unwrap();
        store
            .create_test_case(TestCase::new(agent_b, "other", transcript))
            .await
            .unwrap();

        let cases = store.list_test_cases(agent_a).await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "one");
    }
}
