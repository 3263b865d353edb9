//! The per-case execution unit

use crate::error::RepriseError;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::executor::{CaseExecutor, ExecutionOutcome};
use crate::replay::composer::{compose, ComposeError};
use crate::replay::overrides::ReplayOverrides;
use crate::store::records::{TestCase, TestLog};
use crate::store::RegressionStore;
use crate::types::Id;
use std::sync::Arc;
use tracing::{instrument, warn};

/// How one case ended.
#[derive(Debug)]
pub enum CaseDisposition {
    /// Executed, evaluated, and its log committed
    Committed {
        log_id: Id,
        outcome: ExecutionOutcome,
        evaluation: EvaluationResult,
    },
    /// Executed and evaluated, but the log write failed — the result exists
    /// nowhere durable and must not be counted
    Uncommitted {
        error: RepriseError,
        outcome: ExecutionOutcome,
        evaluation: EvaluationResult,
    },
    /// Rejected before any backend call; no log was written
    Rejected { error: ComposeError },
}

/// Runs one test case end to end: compose, execute, evaluate, persist.
///
/// The four steps form one unit — a case either completes all of them or is
/// reported as rejected/uncommitted. Cancellation never splits the unit;
/// callers only stop dispatching new cases.
pub struct CasePipeline {
    executor: CaseExecutor,
    evaluator: Evaluator,
    store: Arc<dyn RegressionStore>,
}

impl CasePipeline {
    /// Create a pipeline from its three collaborators.
    pub fn new(
        executor: CaseExecutor,
        evaluator: Evaluator,
        store: Arc<dyn RegressionStore>,
    ) -> Self {
        Self {
            executor,
            evaluator,
            store,
        }
    }

    /// Execute one case under resolved overrides.
    #[instrument(skip(self, case, overrides), fields(case_id = %case.id, case_name = %case.name))]
    pub async fn run_case(
        &self,
        case: &TestCase,
        overrides: &ReplayOverrides,
        regression_run_id: Option<Id>,
    ) -> CaseDisposition {
        let composed = match compose(&case.transcript, overrides) {
            Ok(composed) => composed,
            Err(error) => {
                warn!(error = %error, "case rejected before execution");
                return CaseDisposition::Rejected { error };
            }
        };

        let outcome = self.executor.execute(&composed).await;
        let evaluation = self
            .evaluator
            .evaluate(
                composed.user_message(),
                outcome.response.as_deref(),
                case.expectation.as_deref(),
            )
            .await;

        let log = TestLog::new(
            case,
            regression_run_id,
            &composed,
            outcome.clone(),
            evaluation.clone(),
        );
        match self.store.append_log(log).await {
            Ok(log_id) => CaseDisposition::Committed {
                log_id,
                outcome,
                evaluation,
            },
            Err(error) => {
                warn!(error = %error, "log write failed; case result is uncommitted");
                CaseDisposition::Uncommitted {
                    error,
                    outcome,
                    evaluation,
                }
            }
        }
    }
}
