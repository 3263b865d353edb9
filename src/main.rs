//! Reprise CLI
//!
//! Operator entry point for the replay and regression engine: inspect a
//! captured export, replay it once with modified parameters, or run a
//! regression batch over a directory of captures and watch it finish.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reprise_sdk::{
    AgentProfile, EngineConfig, ExecutionStatus, RegressionRun, ReplayOverrides, RepriseClient,
    RunStatus, Verdict,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reprise", version, about = "Replay captured LLM-agent transcripts and run regression batches")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what a captured export would replay
    Inspect {
        /// Captured export (JSON)
        capture: PathBuf,
    },
    /// Replay one captured export and print the outcome
    RunCase {
        /// Captured export (JSON)
        capture: PathBuf,
        /// Override the model name
        #[arg(long)]
        model: Option<String>,
        /// Override the system prompt
        #[arg(long)]
        system_prompt: Option<String>,
        /// Override the final user message
        #[arg(long)]
        user_message: Option<String>,
        /// Acceptance criteria to judge the response against
        #[arg(long)]
        expectation: Option<String>,
    },
    /// Run a regression batch over a directory of captured exports
    Regress {
        /// Directory of case files (JSON)
        cases: PathBuf,
        /// Name for the ad-hoc agent owning the cases
        #[arg(long, default_value = "cli-agent")]
        agent_name: String,
        /// Override the model name for every case
        #[arg(long)]
        model: Option<String>,
        /// Override the system prompt for every case
        #[arg(long)]
        system_prompt: Option<String>,
        /// Poll interval in seconds while the run is live
        #[arg(long, default_value_t = 1)]
        poll_secs: u64,
    },
}

/// One case file: either a bare captured export, or a wrapper carrying a
/// name and acceptance criteria alongside the capture.
struct CaseFile {
    name: String,
    raw: serde_json::Value,
    expectation: Option<String>,
}

fn load_case_file(path: &Path) -> Result<CaseFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "case".to_string());

    if let Some(capture) = value.get("capture") {
        Ok(CaseFile {
            name: value
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or(&stem)
                .to_string(),
            expectation: value
                .get("expectation")
                .and_then(|e| e.as_str())
                .map(String::from),
            raw: capture.clone(),
        })
    } else {
        Ok(CaseFile {
            name: stem,
            raw: value,
            expectation: None,
        })
    }
}

fn overrides_from(
    model: Option<String>,
    system_prompt: Option<String>,
    user_message: Option<String>,
) -> ReplayOverrides {
    let mut overrides = ReplayOverrides::none();
    if let Some(model) = model {
        overrides = overrides.with_model_name(model);
    }
    if let Some(prompt) = system_prompt {
        overrides = overrides.with_system_prompt(prompt);
    }
    if let Some(message) = user_message {
        overrides = overrides.with_user_message(message);
    }
    overrides
}

fn print_run_summary(run: &RegressionRun) {
    println!();
    println!("run {}", run.id);
    println!("  status:   {}", run.status);
    if let Some(error) = &run.error_message {
        println!("  error:    {}", error);
    }
    println!("  total:    {}", run.counters.total);
    println!("  success:  {}", run.counters.success);
    println!("  failed:   {}", run.counters.failed);
    println!(
        "  verdicts: {} passed / {} declined / {} unknown",
        run.counters.passed, run.counters.declined, run.counters.unknown
    );
}

async fn cmd_inspect(capture: &Path) -> Result<()> {
    let case = load_case_file(capture)?;
    let transcript = reprise_core::parse_captured(&case.raw)?;

    println!("capture {}", capture.display());
    println!("  model:         {}", transcript.model_name);
    println!(
        "  system prompt: {}",
        transcript.system_prompt().unwrap_or("(none)")
    );
    println!(
        "  user message:  {}",
        transcript.last_user_message().unwrap_or("(none)")
    );
    println!("  middle msgs:   {}", transcript.middle_messages().len());
    println!("  tools:         {}", transcript.tools.len());
    if !transcript.model_settings.is_empty() {
        println!(
            "  settings:      {}",
            serde_json::to_string(&transcript.model_settings)?
        );
    }
    Ok(())
}

async fn cmd_run_case(
    client: &RepriseClient,
    capture: &Path,
    overrides: ReplayOverrides,
    expectation: Option<String>,
) -> Result<()> {
    let case_file = load_case_file(capture)?;
    let agent_id = client
        .create_agent(AgentProfile::new("cli-agent", ReplayOverrides::none()))
        .await?;
    let expectation = expectation.or(case_file.expectation);
    let case = client
        .import_test_case(agent_id, case_file.name, &case_file.raw, expectation)
        .await?;

    let report = client.run_case(case.id, overrides).await?;

    println!("case {} ({})", case.name, case.id);
    println!("  status:  {}", report.outcome.status);
    println!("  latency: {} ms", report.outcome.latency_ms);
    match report.outcome.status {
        ExecutionStatus::Success => {
            println!();
            println!("{}", report.outcome.response.as_deref().unwrap_or_default());
        }
        ExecutionStatus::Failed => {
            println!("  error:   {}", report.outcome.error.as_deref().unwrap_or_default());
        }
    }
    println!();
    println!("  verdict:  {}", report.evaluation.verdict);
    println!("  feedback: {}", report.evaluation.feedback);

    if report.outcome.status == ExecutionStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_regress(
    client: &RepriseClient,
    cases_dir: &Path,
    agent_name: &str,
    overrides: ReplayOverrides,
    poll_secs: u64,
) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(cases_dir)
        .with_context(|| format!("failed to read {}", cases_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("no .json case files under {}", cases_dir.display());
    }

    let agent_id = client
        .create_agent(AgentProfile::new(agent_name, ReplayOverrides::none()))
        .await?;
    for path in &paths {
        let case_file = load_case_file(path)?;
        client
            .import_test_case(agent_id, case_file.name, &case_file.raw, case_file.expectation)
            .await
            .with_context(|| format!("failed to import {}", path.display()))?;
    }
    println!("imported {} cases", paths.len());

    let run = client.start_regression(agent_id, overrides).await?;
    println!("run {} started", run.id);

    let watcher = client.watcher(std::time::Duration::from_secs(poll_secs.max(1)));
    let mut last_processed = u32::MAX;
    let finished = watcher
        .wait_with_progress(run.id, |snapshot| {
            let processed = snapshot.counters.processed();
            if processed != last_processed {
                println!(
                    "  {}/{} processed ({} success, {} failed)",
                    processed,
                    snapshot.counters.total,
                    snapshot.counters.success,
                    snapshot.counters.failed
                );
                last_processed = processed;
            }
        })
        .await?;

    print_run_summary(&finished);

    let logs = client.run_logs(finished.id).await?;
    for log in logs
        .iter()
        .filter(|l| l.outcome.status == ExecutionStatus::Failed || l.evaluation.verdict == Verdict::Declined)
    {
        println!();
        println!("  case {}:", log.test_case_id);
        if let Some(error) = &log.outcome.error {
            println!("    execution error: {}", error);
        }
        if log.evaluation.verdict == Verdict::Declined {
            println!("    declined: {}", log.evaluation.feedback);
        }
    }

    let clean = finished.status == RunStatus::Completed
        && finished.counters.failed == 0
        && finished.counters.declined == 0;
    if !clean {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Inspect { capture } => cmd_inspect(&capture).await,
        Command::RunCase {
            capture,
            model,
            system_prompt,
            user_message,
            expectation,
        } => {
            let client = RepriseClient::with_config(config)?;
            cmd_run_case(
                &client,
                &capture,
                overrides_from(model, system_prompt, user_message),
                expectation,
            )
            .await
        }
        Command::Regress {
            cases,
            agent_name,
            model,
            system_prompt,
            poll_secs,
        } => {
            let client = RepriseClient::with_config(config)?;
            cmd_regress(
                &client,
                &cases,
                &agent_name,
                overrides_from(model, system_prompt, None),
                poll_secs,
            )
            .await
        }
    }
}
