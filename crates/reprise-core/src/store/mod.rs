//! Persistence boundary
//!
//! The engine reads and writes agents, test cases, runs, and logs through the
//! [`RegressionStore`] trait. A database-backed adapter lives outside this
//! crate; the in-memory adapter here backs tests and the CLI.

pub mod memory;
pub mod records;

pub use memory::MemoryStore;
pub use records::{AgentProfile, TestCase, TestLog};

use crate::error::RepriseResult;
use crate::regression::run::{CounterDelta, RegressionRun, RunStatus};
use crate::types::Id;
use async_trait::async_trait;

/// Storage boundary for the regression engine.
///
/// Logs are append-only; run counters only grow while a run is `running`;
/// terminal run statuses are never overwritten. Adapters are expected to
/// enforce all three.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegressionStore: Send + Sync {
    /// Persist a new agent profile
    async fn create_agent(&self, agent: AgentProfile) -> RepriseResult<Id>;

    /// Fetch an agent profile
    async fn get_agent(&self, id: Id) -> RepriseResult<Option<AgentProfile>>;

    /// Persist a new test case
    async fn create_test_case(&self, case: TestCase) -> RepriseResult<Id>;

    /// Fetch a test case
    async fn get_test_case(&self, id: Id) -> RepriseResult<Option<TestCase>>;

    /// All test cases owned by an agent, oldest first
    async fn list_test_cases(&self, agent_id: Id) -> RepriseResult<Vec<TestCase>>;

    /// Persist a new regression run record
    async fn create_run(&self, run: RegressionRun) -> RepriseResult<Id>;

    /// Fetch a run snapshot
    async fn get_run(&self, id: Id) -> RepriseResult<Option<RegressionRun>>;

    /// Transition a pending run to running, recording the enumerated case
    /// count and the start timestamp in one write.
    async fn begin_run(&self, id: Id, total_count: u32) -> RepriseResult<()>;

    /// Transition a run to a terminal status (or pending→failed), stamping
    /// `completed_at`. Illegal transitions are errors.
    async fn set_run_status(
        &self,
        id: Id,
        status: RunStatus,
        error_message: Option<String>,
    ) -> RepriseResult<()>;

    /// Atomically add a delta to the run counters. Rejected once the run is
    /// terminal.
    async fn update_run_counters(&self, id: Id, delta: CounterDelta) -> RepriseResult<()>;

    /// Append one execution log
    async fn append_log(&self, log: TestLog) -> RepriseResult<Id>;

    /// Fetch a log
    async fn get_log(&self, id: Id) -> RepriseResult<Option<TestLog>>;

    /// All logs written for a run, in append order
    async fn list_logs_for_run(&self, run_id: Id) -> RepriseResult<Vec<TestLog>>;
}
