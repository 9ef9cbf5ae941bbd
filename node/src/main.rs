// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # yVault Keeper
//!
//! Entry point for the `yvault-keeper` binary. Parses CLI arguments,
//! initializes logging and metrics, deploys the configured vault, and keeps
//! its strategies harvested.
//!
//! The binary supports four subcommands:
//!
//! - `deploy`   deploy from a config file and print the addresses
//! - `simulate` run the keeper over simulated blocks and report
//! - `run`      keep harvesting on a block timer, serving `/metrics`
//! - `version`  print build version information

mod cli;
mod config;
mod keeper;
mod logging;
mod metrics;
mod simulation;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::signal;

use yvault_protocol::vault::VaultSnapshot;

use cli::{Commands, ConfigArgs, KeeperCli};
use config::DeploymentConfig;
use keeper::{Keeper, TickReport};
use logging::LogFormat;
use metrics::KeeperMetrics;
use simulation::Simulation;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KeeperCli::parse();

    if !matches!(cli.command, Commands::Version) {
        logging::init_logging(&cli.log_level, LogFormat::from_flag(&cli.log_format));
    }

    match cli.command {
        Commands::Deploy(args) => deploy(args),
        Commands::Simulate(args) => simulate(args),
        Commands::Run(args) => run_keeper(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<DeploymentConfig> {
    let path = args
        .config
        .as_deref()
        .context("no deployment config: pass --config or set YVAULT_CONFIG")?;
    DeploymentConfig::load(path)
}

/// Deploys and prints the resulting addresses.
fn deploy(args: cli::DeployArgs) -> Result<()> {
    if args.example {
        println!("{}", serde_json::to_string_pretty(&DeploymentConfig::example())?);
        return Ok(());
    }

    let config = load_config(&args.config)?;
    let simulation = Simulation::deploy(&config)?;
    let report = simulation.report();

    if args.json {
        #[derive(Serialize)]
        struct Output<'a> {
            deployed_at: String,
            #[serde(flatten)]
            report: &'a simulation::DeploymentReport,
        }
        let output = Output {
            deployed_at: chrono::Utc::now().to_rfc3339(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Vault deployed.");
    println!("  Token      : {}", report.token);
    println!("  Vault      : {} ({} / {})", report.vault, report.name, report.symbol);
    println!("  Governance : {}", report.governance);
    println!("  Rewards    : {}", report.rewards);
    println!("  Guardian   : {}", report.guardian);
    for (index, s) in report.strategies.iter().enumerate() {
        println!("  Strategy {index} : {} (market {})", s.strategy, s.market);
        println!("    strategist {} keeper {}", s.strategist, s.keeper);
    }
    Ok(())
}

/// One keeper step with market activity around it: borrowers repay, the
/// keeper ticks, borrowers draw again.
fn step(keeper: &mut Keeper, block: u64, utilization_bps: u64) -> Result<TickReport> {
    let simulation = keeper.simulation_mut();
    simulation.advance_to(block);
    for index in 0..simulation.strategies().len() {
        simulation.repay(index)?;
    }

    let report = keeper.tick(block);

    let simulation = keeper.simulation_mut();
    for index in 0..simulation.strategies().len() {
        simulation.borrow(index, utilization_bps)?;
    }
    Ok(report)
}

/// Final state of a simulation run.
#[derive(Debug, Serialize)]
struct SimulationSummary {
    blocks: u64,
    /// Assets the depositor put in, if any.
    deposited: Option<u128>,
    /// Assets the depositor got back for all its shares.
    redeemed: Option<u128>,
    harvests: u64,
    failed_harvests: u64,
    vault: VaultSnapshot,
}

/// Runs the keeper over simulated blocks as fast as it can.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let metrics = KeeperMetrics::new().context("failed to create metrics registry")?;
    let mut keeper = Keeper::new(Simulation::deploy(&config)?, args.keeper.call_cost, metrics);

    let depositor = keeper.simulation().depositor(0);
    let deposited = if args.deposit > 0 {
        Some(keeper.simulation_mut().deposit(&depositor, args.deposit)?)
    } else {
        None
    };

    let mut block = 0;
    while block < args.blocks {
        block = (block + args.step).min(args.blocks);
        let report = step(&mut keeper, block, args.keeper.utilization_bps)?;
        tracing::debug!(
            block,
            harvested = report.harvested.len(),
            failed = report.failed.len(),
            "tick"
        );
    }
    // Leave the markets fully repaid so the final state is liquid.
    let simulation = keeper.simulation_mut();
    for index in 0..simulation.strategies().len() {
        simulation.repay(index)?;
    }

    let redeemed = match deposited {
        Some(shares) => Some(
            simulation
                .withdraw(&depositor, shares)
                .context("depositor could not redeem")?,
        ),
        None => None,
    };

    let summary = SimulationSummary {
        blocks: args.blocks,
        deposited: deposited.map(|_| args.deposit),
        redeemed,
        harvests: keeper.metrics().harvests_total.get(),
        failed_harvests: keeper.metrics().harvest_failures_total.get(),
        vault: keeper.simulation().snapshot(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let vault = &summary.vault;
    let scale = 10f64.powi(i32::from(vault.decimals));
    println!("Simulated {} blocks.", summary.blocks);
    println!("  Harvests        : {} ({} failed)", summary.harvests, summary.failed_harvests);
    println!("  Total assets    : {}", vault.total_assets);
    println!("  Idle            : {}", vault.idle);
    println!("  Total debt      : {}", vault.total_debt);
    println!("  Price per share : {:.6}", vault.price_per_share as f64 / scale);
    if let (Some(deposited), Some(redeemed)) = (summary.deposited, summary.redeemed) {
        println!("  Depositor       : {deposited} in, {redeemed} out");
    }
    for record in &vault.strategies {
        println!(
            "  Strategy {} : debt {} (limit {})",
            record.strategy, record.debt.outstanding_debt, record.params.debt_limit
        );
    }
    Ok(())
}

/// Keeps harvesting on a wall-clock block timer until interrupted.
async fn run_keeper(args: cli::RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let metrics = Arc::new(KeeperMetrics::new().context("failed to create metrics registry")?);
    let keeper = Arc::new(Mutex::new(Keeper::new(
        Simulation::deploy(&config)?,
        args.keeper.call_cost,
        (*metrics).clone(),
    )));

    tracing::info!(
        block_time_ms = args.block_time_ms,
        metrics_port = args.metrics_port,
        strategies = config.strategies.len(),
        "starting yvault-keeper"
    );

    // --- Metrics server ---
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Block loop ---
    let keeper_ref = Arc::clone(&keeper);
    let utilization_bps = args.keeper.utilization_bps;
    let block_time = Duration::from_millis(args.block_time_ms.max(1));
    let block_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(block_time);
        let mut block = 0u64;
        loop {
            interval.tick().await;
            block += 1;
            let outcome = step(&mut keeper_ref.lock(), block, utilization_bps);
            match outcome {
                Ok(report) if !report.harvested.is_empty() || !report.failed.is_empty() => {
                    tracing::info!(
                        block,
                        harvested = report.harvested.len(),
                        failed = report.failed.len(),
                        at = %chrono::Utc::now().to_rfc3339(),
                        "tick"
                    );
                }
                Ok(_) => tracing::debug!(block, "tick"),
                Err(e) => tracing::error!(block, "market activity failed: {:#}", e),
            }
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(metrics_listener, metrics::router(Arc::clone(&metrics))) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    block_loop.abort();
    let final_state = keeper.lock().simulation().snapshot();
    tracing::info!(
        total_assets = final_state.total_assets,
        total_debt = final_state.total_debt,
        price_per_share = final_state.price_per_share,
        "yvault-keeper stopped"
    );
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("yvault-keeper {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", yvault_protocol::config::PROTOCOL_VERSION);
    println!("vault api     {}", yvault_protocol::config::VAULT_API_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. A handler that fails
/// to install never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
