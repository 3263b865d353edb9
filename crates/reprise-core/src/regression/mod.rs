//! Regression runs
//!
//! A regression run replays every test case an agent owns under one resolved
//! set of overrides, with bounded concurrency and run-level accounting. The
//! pipeline executes one case as an indivisible compose→execute→evaluate→
//! persist unit; the orchestrator fans the pipeline out and drives the run
//! status machine.

pub mod orchestrator;
pub mod pipeline;
pub mod run;

pub use orchestrator::{CaseReport, RegressionOrchestrator};
pub use pipeline::{CaseDisposition, CasePipeline};
pub use run::{CounterDelta, RegressionRun, RunCounters, RunStatus};
