//! Regression run orchestration

use crate::error::{RepriseError, RepriseResult};
use crate::evaluator::EvaluationResult;
use crate::executor::ExecutionOutcome;
use crate::regression::pipeline::{CaseDisposition, CasePipeline};
use crate::regression::run::{CounterDelta, RegressionRun, RunStatus};
use crate::replay::overrides::ReplayOverrides;
use crate::store::records::TestCase;
use crate::store::RegressionStore;
use crate::types::Id;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Result of a single-case execution outside a regression run
#[derive(Debug, Clone)]
pub struct CaseReport {
    /// Log written for the execution
    pub log_id: Id,
    /// Execution outcome
    pub outcome: ExecutionOutcome,
    /// Evaluation of the response
    pub evaluation: EvaluationResult,
}

/// Fans the case pipeline out over every test case an agent owns and keeps
/// the run record honest while doing it.
///
/// One orchestrator serves any number of concurrent runs; each run gets its
/// own worker pool bounded by `max_concurrency`. Cancellation is cooperative:
/// the token is checked between case dispatches, in-flight cases always
/// finish their full pipeline unit.
pub struct RegressionOrchestrator {
    store: Arc<dyn RegressionStore>,
    pipeline: Arc<CasePipeline>,
    max_concurrency: usize,
    cancel: CancellationToken,
}

impl RegressionOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        store: Arc<dyn RegressionStore>,
        pipeline: Arc<CasePipeline>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            pipeline,
            max_concurrency: max_concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops dispatching new cases when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a cooperative stop of all runs driven by this orchestrator.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Launch a regression run for an agent.
    ///
    /// Creates the run record and returns its pending snapshot immediately;
    /// execution continues on a background task. Poll [`get_status`] for
    /// progress.
    ///
    /// [`get_status`]: Self::get_status
    #[instrument(skip(self, overrides), fields(agent_id = %agent_id))]
    pub async fn start(
        &self,
        agent_id: Id,
        overrides: ReplayOverrides,
    ) -> RepriseResult<RegressionRun> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| RepriseError::invalid_input(format!("agent not found: {}", agent_id)))?;

        let resolved = ReplayOverrides::layered(&agent.defaults, &overrides);
        let run = RegressionRun::new(agent_id, resolved.clone());
        let run_id = self.store.create_run(run.clone()).await?;
        info!(run_id = %run_id, "regression run created");

        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = self.cancel.child_token();
        let max_concurrency = self.max_concurrency;
        tokio::spawn(async move {
            execute_run(store, pipeline, cancel, max_concurrency, run_id, agent_id, resolved).await;
        });

        Ok(run)
    }

    /// Current snapshot of a run.
    pub async fn get_status(&self, run_id: Id) -> RepriseResult<Option<RegressionRun>> {
        self.store.get_run(run_id).await
    }

    /// Execute one test case outside any regression run.
    ///
    /// The caller's overrides are layered over the owning agent's defaults,
    /// and the log is written without a run reference.
    #[instrument(skip(self, overrides), fields(test_case_id = %test_case_id))]
    pub async fn run_case(
        &self,
        test_case_id: Id,
        overrides: ReplayOverrides,
    ) -> RepriseResult<CaseReport> {
        let case = self.store.get_test_case(test_case_id).await?.ok_or_else(|| {
            RepriseError::invalid_input(format!("test case not found: {}", test_case_id))
        })?;
        let agent = self
            .store
            .get_agent(case.agent_id)
            .await?
            .ok_or_else(|| {
                RepriseError::invalid_input(format!("agent not found: {}", case.agent_id))
            })?;

        let resolved = ReplayOverrides::layered(&agent.defaults, &overrides);
        match self.pipeline.run_case(&case, &resolved, None).await {
            CaseDisposition::Committed {
                log_id,
                outcome,
                evaluation,
            } => Ok(CaseReport {
                log_id,
                outcome,
                evaluation,
            }),
            CaseDisposition::Uncommitted { error, .. } => Err(error),
            CaseDisposition::Rejected { error } => Err(error.into()),
        }
    }
}

/// Drive one run to a terminal status. Runs on a background task.
#[instrument(skip_all, fields(run_id = %run_id))]
async fn execute_run(
    store: Arc<dyn RegressionStore>,
    pipeline: Arc<CasePipeline>,
    cancel: CancellationToken,
    max_concurrency: usize,
    run_id: Id,
    agent_id: Id,
    overrides: ReplayOverrides,
) {
    let cases = match store.list_test_cases(agent_id).await {
        Ok(cases) => cases,
        Err(e) => {
            error!(error = %e, "run setup failed while listing test cases");
            fail_run(&store, run_id, format!("failed to list test cases: {}", e)).await;
            return;
        }
    };

    if cases.is_empty() {
        info!("agent has no test cases; failing run");
        fail_run(&store, run_id, "agent has no test cases".to_string()).await;
        return;
    }

    let total = cases.len();
    if let Err(e) = store.begin_run(run_id, total as u32).await {
        error!(error = %e, "run setup failed while marking run running");
        fail_run(&store, run_id, format!("failed to start run: {}", e)).await;
        return;
    }
    info!(total, "regression run started");

    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut workers = JoinSet::new();
    let mut dispatched = 0usize;

    for case in cases {
        // Cooperative cancellation point: in-flight cases always finish
        // their full pipeline unit.
        if cancel.is_cancelled() {
            warn!(dispatched, total, "cancellation requested; no further cases dispatched");
            break;
        }

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        dispatched += 1;

        let store = Arc::clone(&store);
        let pipeline = Arc::clone(&pipeline);
        let overrides = overrides.clone();
        workers.spawn(async move {
            let _permit = permit;
            process_case(store, pipeline, run_id, case, overrides).await;
        });
    }

    while workers.join_next().await.is_some() {}

    if dispatched < total {
        fail_run(
            &store,
            run_id,
            format!("run cancelled after dispatching {} of {} cases", dispatched, total),
        )
        .await;
        return;
    }

    if let Err(e) = store.set_run_status(run_id, RunStatus::Completed, None).await {
        error!(error = %e, "failed to mark run completed");
        return;
    }
    info!("regression run completed");
}

async fn process_case(
    store: Arc<dyn RegressionStore>,
    pipeline: Arc<CasePipeline>,
    run_id: Id,
    case: TestCase,
    overrides: ReplayOverrides,
) {
    let case_id = case.id;
    let delta = match pipeline.run_case(&case, &overrides, Some(run_id)).await {
        CaseDisposition::Committed {
            outcome,
            evaluation,
            ..
        } => CounterDelta::from_case(&outcome, &evaluation),
        CaseDisposition::Rejected { error } => {
            warn!(case_id = %case_id, error = %error, "case rejected; counted as failed");
            CounterDelta::rejected()
        }
        CaseDisposition::Uncommitted { error, .. } => {
            // The commit itself failed: counting this case would claim a
            // result that exists nowhere. The gap stays visible as
            // success + failed < total.
            warn!(case_id = %case_id, error = %error, "case result uncommitted; counters untouched");
            return;
        }
    };

    if let Err(e) = store.update_run_counters(run_id, delta).await {
        warn!(case_id = %case_id, error = %e, "counter update failed");
    }
}

async fn fail_run(store: &Arc<dyn RegressionStore>, run_id: Id, message: String) {
    if let Err(e) = store
        .set_run_status(run_id, RunStatus::Failed, Some(message))
        .await
    {
        error!(error = %e, "failed to mark run failed");
    }
}
