use anyhow::Context;
use api_client::{InitializeParams, IsucoinClientFactory};
use audit_log::IsulogClient;
use clap::Parser;
use configuration::{Overrides, init_tracing, load_config};
use engine::ScenarioEngine;
use ledger::IsubankClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

mod report;

/// The main entry point for the exchange conformance tester.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Drives an isucoin exchange through a fixed trading scenario and checks it
/// against the bank ledger and the audit log.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,
}

// ==============================================================================
// Run Logic
// ==============================================================================

/// Returns whether the exchange passed. Setup problems are errors instead.
async fn run() -> anyhow::Result<bool> {
    // App ids usually live in .env; running without one is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.apply_overrides(&cli.overrides);
    config
        .validate()
        .context("Invalid configuration after applying command-line overrides")?;

    let _log_guard = init_tracing(&config.logging).context("Failed to initialize logging")?;

    let exchange = IsucoinClientFactory::new(&config.target.endpoint, &config.tester);
    if config.target.initialize {
        exchange
            .initialize(&InitializeParams::from_config(&config))
            .await
            .context("Failed to initialize the exchange")?;
    }

    let bank = IsubankClient::new(&config.bank, config.tester.client_timeout)
        .context("Failed to build the bank client")?;
    let log = IsulogClient::new(&config.log, config.tester.client_timeout)
        .context("Failed to build the audit log client")?;
    let engine = ScenarioEngine::new(
        Arc::new(exchange),
        Arc::new(bank),
        Arc::new(log),
        config.tester.clone(),
    );

    let run_id = Uuid::new_v4();
    let started_at = chrono::Local::now();
    let started = Instant::now();
    let outcome = engine
        .run()
        .instrument(tracing::info_span!("run", %run_id, target = %config.target.endpoint))
        .await;

    if let Err(e) = &outcome {
        tracing::error!(%run_id, phase = %e.phase, error = %e.source, "conformance run failed");
    }
    println!("{}", report::render(&outcome, started_at, started.elapsed()));
    Ok(outcome.is_ok())
}
