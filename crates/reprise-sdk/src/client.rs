//! SDK client implementation

use reprise_core::{
    backend::{JudgeBackend, ModelBackend},
    config::EngineConfig,
    error::RepriseResult,
    evaluator::Evaluator,
    executor::CaseExecutor,
    regression::{CasePipeline, CaseReport, RegressionOrchestrator, RegressionRun},
    replay::ReplayOverrides,
    store::{AgentProfile, MemoryStore, RegressionStore, TestCase, TestLog},
    transcript::parse_captured,
    types::Id,
    ModelJudge, OpenAiBackend,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::watcher::RunWatcher;

/// High-level client for the Reprise engine.
///
/// Owns the wiring: store, model backend, judge, and the orchestrator built
/// over them. One client serves any number of concurrent regression runs.
pub struct RepriseClient {
    config: EngineConfig,
    store: Arc<dyn RegressionStore>,
    orchestrator: Arc<RegressionOrchestrator>,
}

impl RepriseClient {
    /// Create a client with default configuration, an in-memory store, and
    /// the OpenAI-compatible backend.
    pub fn new() -> RepriseResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a client from configuration, with an in-memory store and the
    /// OpenAI-compatible backend.
    pub fn with_config(config: EngineConfig) -> RepriseResult<Self> {
        let backend: Arc<dyn ModelBackend> = Arc::new(OpenAiBackend::new(&config.backend)?);
        let judge: Arc<dyn JudgeBackend> = Arc::new(ModelJudge::new(
            Arc::clone(&backend),
            config.judge.model_name.clone(),
            config.judge.call_timeout,
        ));
        Self::with_components(config, Arc::new(MemoryStore::new()), backend, judge)
    }

    /// Create a client from a TOML configuration file.
    pub fn with_config_file<P: AsRef<Path>>(path: P) -> RepriseResult<Self> {
        let config = EngineConfig::load(Some(path.as_ref()))?;
        tracing::info!(path = %path.as_ref().display(), "loaded SDK config");
        Self::with_config(config)
    }

    /// Create a client over explicit collaborators. This is the seam used by
    /// tests and by embedders with their own store or backends.
    pub fn with_components(
        config: EngineConfig,
        store: Arc<dyn RegressionStore>,
        backend: Arc<dyn ModelBackend>,
        judge: Arc<dyn JudgeBackend>,
    ) -> RepriseResult<Self> {
        config.validate()?;

        let executor = CaseExecutor::new(backend, config.case_timeout);
        let evaluator = Evaluator::new(judge);
        let pipeline = CasePipeline::new(executor, evaluator, Arc::clone(&store));
        let orchestrator = Arc::new(RegressionOrchestrator::new(
            Arc::clone(&store),
            Arc::new(pipeline),
            config.max_concurrency,
        ));

        Ok(Self {
            config,
            store,
            orchestrator,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The store this client writes through
    pub fn store(&self) -> Arc<dyn RegressionStore> {
        Arc::clone(&self.store)
    }

    /// Register an agent.
    pub async fn create_agent(&self, agent: AgentProfile) -> RepriseResult<Id> {
        self.store.create_agent(agent).await
    }

    /// Parse a captured export and store it as a test case for an agent.
    pub async fn import_test_case(
        &self,
        agent_id: Id,
        name: impl Into<String>,
        raw: &serde_json::Value,
        expectation: Option<String>,
    ) -> RepriseResult<TestCase> {
        let transcript = parse_captured(raw)?;
        let mut case = TestCase::new(agent_id, name, transcript);
        case.expectation = expectation.filter(|e| !e.trim().is_empty());
        self.store.create_test_case(case.clone()).await?;
        Ok(case)
    }

    /// Execute one stored test case outside any run.
    pub async fn run_case(
        &self,
        test_case_id: Id,
        overrides: ReplayOverrides,
    ) -> RepriseResult<CaseReport> {
        self.orchestrator.run_case(test_case_id, overrides).await
    }

    /// Launch a regression run; returns the pending snapshot immediately.
    pub async fn start_regression(
        &self,
        agent_id: Id,
        overrides: ReplayOverrides,
    ) -> RepriseResult<RegressionRun> {
        self.orchestrator.start(agent_id, overrides).await
    }

    /// Current snapshot of a run.
    pub async fn get_run(&self, run_id: Id) -> RepriseResult<Option<RegressionRun>> {
        self.orchestrator.get_status(run_id).await
    }

    /// Logs written for a run, in append order.
    pub async fn run_logs(&self, run_id: Id) -> RepriseResult<Vec<TestLog>> {
        self.store.list_logs_for_run(run_id).await
    }

    /// Polling watcher over this client's runs.
    pub fn watcher(&self, interval: Duration) -> RunWatcher {
        RunWatcher::new(Arc::clone(&self.orchestrator), interval)
    }

    /// Block until a run reaches a terminal status, polling at the default
    /// one-second interval.
    pub async fn wait_for_run(&self, run_id: Id) -> RepriseResult<RegressionRun> {
        self.watcher(Duration::from_secs(1)).wait(run_id).await
    }

    /// Ask all in-flight runs to stop dispatching new cases.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}

impl std::fmt::Debug for RepriseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepriseClient")
            .field("max_concurrency", &self.config.max_concurrency)
            .field("case_timeout", &self.config.case_timeout)
            .finish()
    }
}
