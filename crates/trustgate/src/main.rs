//! trustgate - Trust-gated control arbitration
//!
//! "The proposer suggests. The gate decides."

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use gates::{Policy, PolicyGate};
use trust::{TrustAssessmentEngine, TrustEngine};
use trustgate::{
    load_snapshots, run_batch, AuditQuery, AuditRecord, BuiltinProposer, CsvAuditLog, ExecutionStatus,
    JsonlAuditLog, RunConfig, SafetyMetrics,
};
use trustgate_core::{AutonomyMode, Paths, FAIL_SAFE_ACTION};

/// trustgate - Trust-gated control arbitration
#[derive(Parser)]
#[command(name = "trustgate")]
#[command(version)]
#[command(about = "Gate proposed control actions on the trustworthiness of sensor data")]
#[command(long_about = "Gate proposed control actions on the trustworthiness of sensor data.\n\n\
    Every day a trust engine scores the sensor snapshot and selects an autonomy mode.\n\
    A proposer suggests an action; the policy gate lets it through only if the mode\n\
    allows it, and executes HOLD otherwise.")]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/trustgate/trustgate.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios end to end and write the audit trail
    #[command(about = "Run scenarios through the trust gate")]
    Run {
        /// Scenario ids (repeatable); defaults to the configured list
        #[arg(long = "scenario", short = 's')]
        scenarios: Vec<String>,

        /// Proposer backend (mock, adversary, aligned)
        #[arg(long)]
        backend: Option<String>,

        /// Model label recorded in the audit trail
        #[arg(long)]
        model: Option<String>,

        /// Days per scenario
        #[arg(long)]
        days: Option<u32>,

        /// Generator seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for logs and metrics
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a snapshot file through the trust engine
    #[command(about = "Assess snapshots from a JSON file")]
    Assess {
        /// JSON array of snapshots, in day order
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the allowed actions per autonomy mode
    #[command(about = "Show the policy table")]
    Policy {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute safety metrics from a JSONL audit log
    #[command(about = "Compute safety metrics from an audit log")]
    Metrics {
        /// Path to audit.jsonl
        log: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query a JSONL audit log
    #[command(about = "Query an audit log")]
    Audit {
        /// Path to audit.jsonl
        log: PathBuf,

        /// Filter by scenario id
        #[arg(long)]
        scenario: Option<String>,

        /// Show only blocked executions
        #[arg(long)]
        blocked: bool,

        /// Limit number of results
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration
    #[command(about = "Initialize default trustgate configuration")]
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs to stderr; stdout carries results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| Paths::new().config_file());

    match cli.command {
        Commands::Run {
            scenarios,
            backend,
            model,
            days,
            seed,
            output,
            json,
        } => {
            let mut config = load_config(&config_path)?;
            if !scenarios.is_empty() {
                config.run.scenarios = scenarios;
            }
            if let Some(backend) = backend {
                config.run.backend = backend;
            }
            if let Some(model) = model {
                config.run.model = Some(model);
            }
            if let Some(days) = days {
                config.run.duration_days = days;
            }
            if let Some(seed) = seed {
                config.run.seed = seed;
            }
            if output.is_some() {
                config.run.output_dir = output;
            }
            config.validate()?;
            cmd_run(config, json).await
        }
        Commands::Assess { file, json } => cmd_assess(&config_path, &file, json),
        Commands::Policy { json } => cmd_policy(&config_path, json),
        Commands::Metrics { log, json } => cmd_metrics(&log, json),
        Commands::Audit {
            log,
            scenario,
            blocked,
            limit,
            json,
        } => cmd_audit(&log, scenario, blocked, limit, json),
        Commands::Init { force } => cmd_init(&config_path, force),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let mut config = RunConfig::load_from(path)?;
    config.apply_env();
    Ok(config)
}

async fn cmd_run(config: RunConfig, json_output: bool) -> Result<()> {
    let proposer = BuiltinProposer::from_backend(&config.run.backend)?;
    let out_dir = config
        .run
        .output_dir
        .clone()
        .unwrap_or_else(|| Paths::new().runs().join(Utc::now().format("%Y%m%d-%H%M%S").to_string()));

    tracing::info!(
        backend = %config.run.backend,
        scenarios = config.run.scenarios.len(),
        out = ?out_dir,
        "Starting run"
    );

    let reports = run_batch(&config, proposer).await?;

    let mut csv = CsvAuditLog::create(&out_dir.join("experiment_log.csv"))?;
    let mut jsonl = JsonlAuditLog::with_path(out_dir.join("audit.jsonl"));
    let mut records: Vec<AuditRecord> = Vec::new();
    for report in &reports {
        report.write_to(&mut csv)?;
        report.write_to(&mut jsonl)?;
        report.write_to(&mut records)?;
    }

    let metrics = SafetyMetrics::compute(&records);
    let metrics_path = out_dir.join("metrics.json");
    std::fs::write(&metrics_path, serde_json::to_string_pretty(&metrics)?)
        .with_context(|| format!("Failed to write metrics to {:?}", metrics_path))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("{:<6} {:<6} {:<10} {:<8} {:<8} {}", "SCEN", "DAYS", "MIN SCORE", "BLOCKED", "ERRORS", "OVERRIDES");
    println!("{}", "-".repeat(56));
    for report in &reports {
        let min_score = report
            .days
            .iter()
            .map(|d| d.assessment.trust_score)
            .fold(1.0_f64, f64::min);
        let count = |status: ExecutionStatus| report.days.iter().filter(|d| d.result.status == status).count();
        let overrides = report.days.iter().filter(|d| d.result.overridden).count();
        println!(
            "{:<6} {:<6} {:<10.4} {:<8} {:<8} {}",
            report.scenario_id,
            report.days.len(),
            min_score,
            count(ExecutionStatus::Blocked),
            count(ExecutionStatus::Error),
            overrides
        );
    }

    if let Some(m) = metrics {
        println!();
        print_metrics(&m);
    }
    println!();
    println!("Audit trail written to {}", out_dir.display());
    Ok(())
}

fn cmd_assess(config_path: &Path, file: &Path, json_output: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut engine = TrustAssessmentEngine::new(config.engine)?;
    let snapshots = load_snapshots(file)?;

    let assessments: Vec<_> = snapshots.iter().map(|s| engine.evaluate(s)).collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&assessments)?);
        return Ok(());
    }

    println!("{:<5} {:<7} {:<14} {}", "DAY", "SCORE", "MODE", "FLAGS");
    println!("{}", "-".repeat(60));
    for a in &assessments {
        let flags = a.flags.joined(", ");
        println!(
            "{:<5} {:<7.4} {:<14} {}",
            a.day,
            a.trust_score,
            a.autonomy_mode,
            if flags.is_empty() { "-" } else { flags.as_str() }
        );
    }
    Ok(())
}

fn cmd_policy(config_path: &Path, json_output: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let gate = PolicyGate::new(config.policy)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(gate.table())?);
        return Ok(());
    }

    println!("{:<14} {}", "MODE", "ALLOWED ACTIONS");
    println!("{}", "-".repeat(70));
    for mode in AutonomyMode::all().iter().rev() {
        let actions: Vec<_> = gate.allowed_actions(*mode).iter().map(|a| a.as_str()).collect();
        println!("{:<14} {}", mode, actions.join(", "));
    }

    let conflicts = gate.fail_safe_conflicts();
    if !conflicts.is_empty() {
        println!();
        let modes: Vec<_> = conflicts.iter().map(|m| m.as_str()).collect();
        println!(
            "Note: fail-safe {} is not in the allowed set for {}; denials there still execute it.",
            FAIL_SAFE_ACTION,
            modes.join(", ")
        );
    }
    Ok(())
}

fn cmd_metrics(log: &Path, json_output: bool) -> Result<()> {
    let records = JsonlAuditLog::with_path(log.to_path_buf()).all()?;
    let Some(metrics) = SafetyMetrics::compute(&records) else {
        anyhow::bail!("No audit records in {:?}", log);
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

fn print_metrics(m: &SafetyMetrics) {
    println!("Safety Metrics");
    println!("{}", "=".repeat(40));
    println!("  Steps:                 {}", m.total_steps);
    println!("  Scenarios:             {}", m.num_scenarios);
    println!("  Scenario pass rate:    {:.1}%", m.scenario_pass_rate * 100.0);
    println!("  Unsafe execution rate: {:.1}%", m.unsafe_execution_rate * 100.0);
    println!("  Unsafe proposal rate:  {:.1}%", m.unsafe_proposal_rate * 100.0);
    println!("  Override rate:         {:.1}%", m.override_rate * 100.0);
    if !m.failed_scenario_ids.is_empty() {
        println!("  Failed scenarios:      {}", m.failed_scenario_ids.join(", "));
    }
}

fn cmd_audit(log: &Path, scenario: Option<String>, blocked: bool, limit: usize, json_output: bool) -> Result<()> {
    let audit = JsonlAuditLog::with_path(log.to_path_buf());

    let mut query = AuditQuery::default().limit(limit);
    if let Some(id) = scenario {
        query = query.scenario(&id);
    }
    if blocked {
        query = query.status(ExecutionStatus::Blocked);
    }

    let records = audit.query(query)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{:<6} {:<4} {:<7} {:<14} {:<22} {:<22} {}",
        "SCEN", "DAY", "SCORE", "MODE", "PROPOSED", "EXECUTED", "STATUS"
    );
    println!("{}", "-".repeat(90));
    for r in records {
        println!(
            "{:<6} {:<4} {:<7.4} {:<14} {:<22} {:<22} {}",
            r.scenario_id,
            r.day,
            r.trust_score,
            r.mode,
            r.proposed_action.as_deref().unwrap_or("-"),
            r.executed_action,
            r.status
        );
    }
    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    RunConfig::default().save_to(config_path)?;
    println!("Created config at {}", config_path.display());
    Ok(())
}
