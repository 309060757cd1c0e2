//! Warden Guardrail Engine: Demo CLI
//!
//! Runs one or all of the reference scenarios. Each scenario builds a fresh
//! `Warden` from the loaded configuration, drives it with mock
//! collaborators, and prints the audit trail it produced.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- code-review
//!   cargo run -p demo -- --config policies/warden.toml resilience

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_contracts::{config::GuardConfig, error::GuardResult};
use warden_ops::scenarios::{bypass, code_review, queued_actions, resilience, sandbox};
use warden_policy::config::load_config_file;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Warden: authorization, screening, sandboxing, retries, caching and rate
/// limiting around sensitive operations.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Warden guardrail engine demo",
    long_about = "Runs Warden scenarios showing authorization, input screening,\n\
                  command sandboxing, retry with backoff, caching, rate limiting\n\
                  and the hash-chained audit trail."
)]
struct Cli {
    /// Guardrail configuration (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Review, cache hit, viewer denial, injected prompt.
    CodeReview,
    /// Flaky and unavailable model under exponential backoff.
    Resilience,
    /// Command policy, timeout kill, daemon permission.
    Sandbox,
    /// Materialize the execution queue.
    QueuedActions,
    /// Rate-limit exhaustion and audited guardrail bypass.
    Bypass,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => println!("All selected scenarios completed."),
        Err(e) => {
            eprintln!("Demo error: {e}");
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> GuardResult<GuardConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading guardrail configuration");
            load_config_file(path)
        }
        None => Ok(GuardConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run(command: Command, config: &GuardConfig) -> GuardResult<()> {
    match command {
        Command::RunAll => {
            code_review::run_scenario(config).await?;
            resilience::run_scenario(config).await?;
            sandbox::run_scenario(config).await?;
            queued_actions::run_scenario(config).await?;
            bypass::run_scenario(config).await
        }
        Command::CodeReview => code_review::run_scenario(config).await,
        Command::Resilience => resilience::run_scenario(config).await,
        Command::Sandbox => sandbox::run_scenario(config).await,
        Command::QueuedActions => queued_actions::run_scenario(config).await,
        Command::Bypass => bypass::run_scenario(config).await,
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Warden: Guardrail & Reliability Engine");
    println!("=======================================");
    println!();
    println!("Every guarded operation passes, in order:");
    println!("  [1] Authorization against the fixed role table");
    println!("  [2] Per-actor rate limit for the operation's class");
    println!("  [3] Cache lookup (cacheable operations only)");
    println!("  [4] Input screening / command policy, then execution");
    println!("  [5] Retry with exponential backoff on transient failure");
    println!("  [6] Audit event for every outcome, SHA-256 chained");
    println!();
}
