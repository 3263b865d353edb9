//! Model and judge backend boundaries
//!
//! The engine talks to models through two narrow traits: [`ModelBackend`]
//! replays a composed request and returns the produced text, and
//! [`JudgeBackend`] scores a response against an expectation. Concrete
//! adapters live next to the traits; tests substitute mocks.

pub mod judge;
pub mod openai;
pub mod settings;

pub use judge::ModelJudge;
pub use openai::OpenAiBackend;
pub use settings::ModelSettings;

use crate::error::RepriseResult;
use crate::replay::composer::ComposedRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend that serves replayed requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send one composed request and return the produced text.
    ///
    /// The timeout bounds the complete request/response cycle; a timed-out
    /// call surfaces as an error like any other backend failure.
    async fn call(&self, request: &ComposedRequest, timeout: Duration) -> RepriseResult<String>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Structured verdict returned by a judge backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeOutput {
    /// Whether the response satisfies the expectation
    pub passed: bool,
    /// Brief explanation of the judgement
    #[serde(default)]
    pub feedback: String,
    /// Criteria the response satisfied
    #[serde(default)]
    pub satisfied_criteria: Vec<String>,
    /// Criteria the response missed or contradicted
    #[serde(default)]
    pub missing_criteria: Vec<String>,
}

/// Backend that judges a response against an expectation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    /// Judge one response. Callers are expected to treat any error as a
    /// degraded (unknown) verdict rather than a failure of the execution
    /// being judged.
    async fn judge(
        &self,
        user_message: &str,
        response: &str,
        expectation: &str,
    ) -> RepriseResult<JudgeOutput>;

    /// Model identifier used for judging
    fn model_name(&self) -> &str;
}
