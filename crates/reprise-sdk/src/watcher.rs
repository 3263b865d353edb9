//! Run status polling

use reprise_core::{
    error::{RepriseError, RepriseResult},
    regression::{RegressionOrchestrator, RegressionRun},
    types::Id,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Polls a run at a fixed interval until it reaches a terminal status.
///
/// This is the one status-following client in the system; every surface that
/// wants live progress goes through it instead of rolling its own loop.
pub struct RunWatcher {
    orchestrator: Arc<RegressionOrchestrator>,
    interval: Duration,
}

impl RunWatcher {
    /// Create a watcher polling at the given interval.
    pub fn new(orchestrator: Arc<RegressionOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval: interval.max(Duration::from_millis(10)),
        }
    }

    /// Wait for a run to finish and return its final snapshot.
    pub async fn wait(&self, run_id: Id) -> RepriseResult<RegressionRun> {
        self.wait_with_progress(run_id, |_| {}).await
    }

    /// Wait for a run to finish, handing every polled snapshot to the
    /// progress callback (the final snapshot included).
    pub async fn wait_with_progress<F>(
        &self,
        run_id: Id,
        mut on_progress: F,
    ) -> RepriseResult<RegressionRun>
    where
        F: FnMut(&RegressionRun),
    {
        loop {
            let run = self
                .orchestrator
                .get_status(run_id)
                .await?
                .ok_or_else(|| RepriseError::invalid_input(format!("run not found: {}", run_id)))?;

            on_progress(&run);
            if run.is_finished() {
                debug!(run_id = %run_id, status = %run.status, "run reached terminal status");
                return Ok(run);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
