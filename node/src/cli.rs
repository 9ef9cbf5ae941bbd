//! # CLI Interface
//!
//! Defines the command-line argument structure for `yvault-keeper` using
//! `clap` derive. Supports four subcommands: `deploy`, `simulate`, `run`,
//! and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// yVault deployment tooling and harvest keeper.
///
/// Deploys a vault and its strategies from a JSON description, then keeps
/// them harvested: either as a fast offline simulation or as a long-running
/// service that exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "yvault-keeper",
    about = "yVault deployment tooling and harvest keeper",
    version,
    propagate_version = true
)]
pub struct KeeperCli {
    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "YVAULT_LOG", default_value = crate::logging::DEFAULT_DIRECTIVES)]
    pub log_level: String,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "YVAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the keeper binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy from a config file and print the resulting addresses.
    Deploy(DeployArgs),
    /// Deploy, then run the keeper over simulated blocks and print the
    /// final vault state.
    Simulate(SimulateArgs),
    /// Deploy, then keep harvesting on a wall-clock block timer.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Where the deployment description comes from.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the deployment config (JSON).
    #[arg(long, short = 'c', env = "YVAULT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Market activity and keeper cost shared by `simulate` and `run`.
#[derive(Args, Debug)]
pub struct KeeperArgs {
    /// Harvest cost estimate in asset units, weighed by each strategy's
    /// trigger.
    #[arg(long, env = "YVAULT_CALL_COST", default_value_t = 0)]
    pub call_cost: u128,

    /// Share of each market's cash the borrower draws between harvests,
    /// in basis points.
    #[arg(long, default_value_t = 5_000, value_parser = clap::value_parser!(u64).range(0..=10_000))]
    pub utilization_bps: u64,
}

/// Arguments for the `deploy` subcommand.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print an example deployment config instead of deploying.
    #[arg(long, conflicts_with = "config")]
    pub example: bool,

    /// Print the deployment report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub keeper: KeeperArgs,

    /// Number of blocks to simulate.
    #[arg(long, default_value_t = 100_000)]
    pub blocks: u64,

    /// Amount a depositor puts in at the start and redeems at the end.
    #[arg(long, default_value_t = 0)]
    pub deposit: u128,

    /// Blocks between keeper ticks.
    #[arg(long, default_value_t = 1_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub step: u64,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub keeper: KeeperArgs,

    /// Wall-clock milliseconds per simulated block.
    #[arg(long, env = "YVAULT_BLOCK_TIME_MS", default_value_t = yvault_protocol::config::BLOCK_TIME_MS)]
    pub block_time_ms: u64,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "YVAULT_METRICS_PORT", default_value_t = 9742)]
    pub metrics_port: u16,
}
