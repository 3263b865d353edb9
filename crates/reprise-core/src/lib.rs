//! Reprise Core Library
//!
//! This crate provides the core functionality for replaying captured
//! LLM-agent transcripts: replay composition, single-case execution,
//! automated evaluation, regression orchestration, and the persistence
//! boundary they all share.

pub mod backend;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod regression;
pub mod replay;
pub mod store;
pub mod transcript;
pub mod types;

// Re-export commonly used types
pub use backend::{JudgeBackend, JudgeOutput, ModelBackend, ModelJudge, ModelSettings, OpenAiBackend};
pub use config::{BackendConfig, EngineConfig, JudgeConfig};
pub use error::{RepriseError, RepriseResult};
pub use evaluator::{EvaluationResult, Evaluator, Verdict};
pub use executor::{CaseExecutor, ExecutionOutcome, ExecutionStatus};
pub use regression::{
    CaseReport, CasePipeline, CounterDelta, RegressionOrchestrator, RegressionRun, RunCounters,
    RunStatus,
};
pub use replay::{compose, ComposeError, ComposedRequest, ReplayOverrides};
pub use store::{AgentProfile, MemoryStore, RegressionStore, TestCase, TestLog};
pub use transcript::{
    parse_captured, validate_captured_format, CapturedTranscript, MessageRole, ToolCall,
    ToolDefinition, TranscriptMessage,
};
pub use types::Id;
