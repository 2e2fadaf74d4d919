//! Stride CLI, the main entry point.
//!
//! Commands:
//! - `tip`: Run the tip pipeline for one domain
//! - `detect`: Run the detectors over an energy series
//! - `plan`: Spread a deficit over upcoming capacities
//! - `assign`: Show a user's experiment variants
//! - `warmup`: Run cheap passes for every domain
//! - `doctor`: Diagnose configuration and storage

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stride_core::DomainId;

mod commands;

#[derive(Parser)]
#[command(
    name = "stride",
    about = "Stride: energy-aware money tips for students",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.stride/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a tip for one domain
    Tip {
        #[arg(short, long)]
        domain: DomainId,

        #[arg(short, long)]
        user: String,

        /// JSON object merged over the stored snapshot
        #[arg(long = "override")]
        context_override: Option<String>,

        /// Total time budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Skip agents and text generation
        #[arg(long)]
        algorithms_only: bool,

        /// Experiment to evaluate (repeatable, in precedence order)
        #[arg(long = "experiment")]
        experiments: Vec<String>,
    },

    /// Run the detectors over an energy series
    Detect {
        /// Weekly energy levels, oldest first (e.g. 30,35,85)
        #[arg(long, value_delimiter = ',', required = true)]
        levels: Vec<f64>,

        /// Savings shortfall to plan a catch-up for
        #[arg(long, default_value_t = 0.0)]
        deficit: f64,

        /// Forecast capacity for the coming weeks
        #[arg(long, value_delimiter = ',')]
        capacities: Vec<f64>,
    },

    /// Spread a deficit over upcoming weeks by capacity
    Plan {
        #[arg(long)]
        deficit: f64,

        #[arg(long, value_delimiter = ',', required = true)]
        capacities: Vec<f64>,
    },

    /// Show which experiment variants a user lands in
    Assign {
        #[arg(short, long)]
        user: String,

        /// Experiment to evaluate (repeatable); all when omitted
        #[arg(long = "experiment")]
        experiments: Vec<String>,
    },

    /// Run cheap passes for every domain
    Warmup {
        #[arg(short, long)]
        user: String,

        /// Domain to warm (repeatable); all when omitted
        #[arg(short, long = "domain")]
        domains: Vec<DomainId>,
    },

    /// Diagnose configuration and storage
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Tip {
            domain,
            user,
            context_override,
            timeout_ms,
            algorithms_only,
            experiments,
        } => {
            let args = commands::tip::TipArgs {
                domain,
                user,
                context_override,
                timeout_ms,
                algorithms_only,
                experiments,
            };
            commands::tip::run(config_path, args).await?
        }
        Commands::Detect {
            levels,
            deficit,
            capacities,
        } => commands::detect::run(config_path, levels, deficit, capacities)?,
        Commands::Plan {
            deficit,
            capacities,
        } => commands::detect::plan(deficit, &capacities)?,
        Commands::Assign { user, experiments } => {
            commands::assign::run(config_path, &user, experiments)?
        }
        Commands::Warmup { user, domains } => {
            commands::warmup::run(config_path, &user, domains).await?
        }
        Commands::Doctor => commands::doctor::run(config_path)?,
    }

    Ok(())
}
