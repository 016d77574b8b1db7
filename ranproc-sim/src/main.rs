//! ranproc loopback simulator
//!
//! Runs the MAC and CU-CP procedure engines against loopback collaborators:
//! - Configuration loading and validation
//! - UE creation, PDU session setup, reconfiguration and deletion
//! - Consistency summary (the exit code is non-zero on any deviation)
//!
//! # Usage
//!
//! ```bash
//! nr-proc-sim -c config/proc.yaml --ues 8 --reject rrc-reconfiguration
//! ```

mod loopback;
mod scenario;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use ranproc_common::{init_logging, load_and_validate_config, ProcConfig, SimRejectStep};

use crate::scenario::{Scenario, ScenarioSummary};

/// ranproc - control-plane procedure simulator
#[derive(Parser, Debug)]
#[command(name = "nr-proc-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: String,

    /// Number of UEs to simulate (overrides `sim.nof_ues`)
    #[arg(long = "ues", value_name = "N")]
    nof_ues: Option<usize>,

    /// PDU sessions per UE (overrides `sim.sessions_per_ue`)
    #[arg(long = "sessions", value_name = "M")]
    sessions_per_ue: Option<usize>,

    /// Collaborator step that rejects (overrides `sim.reject_step`)
    #[arg(long = "reject", value_name = "STEP")]
    reject_step: Option<SimRejectStep>,
}

/// Loads the configuration file and applies command line overrides.
fn load_config(args: &Args) -> Result<ProcConfig> {
    let mut config = load_and_validate_config(&args.config_file)
        .with_context(|| format!("Failed to load configuration from {}", args.config_file))?;

    if let Some(nof_ues) = args.nof_ues {
        config.sim.nof_ues = nof_ues;
    }
    if let Some(sessions_per_ue) = args.sessions_per_ue {
        config.sim.sessions_per_ue = sessions_per_ue;
    }
    if let Some(reject_step) = args.reject_step {
        config.sim.reject_step = reject_step;
    }
    config
        .validate()
        .context("Invalid command line overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nr-proc-sim: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_level);

    println!("ranproc - control-plane procedure simulator");
    println!("===========================================");

    match run_sim(config).await {
        Ok(summary) => {
            println!("{summary}");
            let problems = summary.inconsistencies();
            if problems.is_empty() {
                info!("Simulation finished consistently");
                ExitCode::SUCCESS
            } else {
                for problem in &problems {
                    error!("Inconsistency: {}", problem);
                }
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main simulation logic
async fn run_sim(config: ProcConfig) -> Result<ScenarioSummary> {
    info!(
        max_nof_ues = config.max_nof_ues,
        nof_cells = config.nof_cells,
        nof_ues = config.sim.nof_ues,
        sessions_per_ue = config.sim.sessions_per_ue,
        reject_step = %config.sim.reject_step,
        latency_ms = config.sim.collaborator_latency_ms,
        "Starting simulation"
    );
    Scenario::new(config).run().await
}
