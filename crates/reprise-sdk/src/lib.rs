//! Reprise SDK
//!
//! High-level client for the Reprise replay and regression engine. Wires the
//! store, model backend, judge, and orchestrator together behind one facade,
//! and provides the single polling client used to follow a run to completion.

pub mod client;
pub mod watcher;

pub use client::RepriseClient;
pub use watcher::RunWatcher;

// Re-export the core types callers handle through the SDK
pub use reprise_core::{
    AgentProfile, CaseReport, EngineConfig, EvaluationResult, ExecutionOutcome, ExecutionStatus,
    Id, RegressionRun, ReplayOverrides, RepriseError, RepriseResult, RunStatus, TestCase, TestLog,
    Verdict,
};
