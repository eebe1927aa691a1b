//! Kuba Rollup command line
//!
//! # CLI Commands
//!
//! - `check-config` - Validate a configuration file and print the tier layout
//! - `plan` - Resolve tier and output interval for a synthetic batch
//!
//! # Configuration
//!
//! The configuration is read from:
//! 1. `--config <file>`
//! 2. `ROLLUP_CONFIG` environment variable (path to TOML file)
//! 3. Default configuration
//!
//! Environment overrides are applied on top in every case.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use kuba_rollup::config::Config;
use kuba_rollup::query::{AlignmentPlanner, Request};
use kuba_rollup::{Consolidator, Timestamp};

#[derive(Parser)]
#[command(name = "kuba-rollup")]
#[command(version)]
#[command(about = "Tier selection and runtime consolidation planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides ROLLUP_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    CheckConfig,

    /// Print the plan for a batch of series sharing one window
    Plan {
        /// Window start (unix seconds, inclusive)
        #[arg(long)]
        from: Timestamp,

        /// Window end (unix seconds, exclusive)
        #[arg(long)]
        to: Timestamp,

        /// Lower point bound (defaults to query.default_min_points)
        #[arg(long)]
        min_points: Option<u32>,

        /// Upper point bound (defaults to query.default_max_points)
        #[arg(long)]
        max_points: Option<u32>,

        /// Consolidation function
        #[arg(long, default_value = "avg")]
        consolidator: String,

        /// Raw interval of each series in the batch
        #[arg(long = "raw-interval", required = true, num_args = 1..)]
        raw_intervals: Vec<u32>,

        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("ROLLUP_CONFIG").ok().map(PathBuf::from));

    let config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    Ok(config)
}

fn cmd_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    println!("Configuration is valid!");
    println!();
    println!("Storage:");
    println!(
        "  Raw: chunk span {}s, resident span {}s",
        config.storage.raw_chunk_span, config.storage.raw_resident_span
    );
    for (i, tier) in config.storage.tiers.iter().enumerate() {
        println!(
            "  Tier {}: interval {}s, chunk span {}s x {} resident ({}s)",
            i + 1,
            tier.interval,
            tier.chunk_span,
            tier.resident_chunks,
            tier.resident_span()
        );
    }
    println!();
    println!("Query:");
    println!("  Max parallel fetches: {}", config.query.max_parallel_fetches);
    println!(
        "  Default points: {}-{}",
        config.query.default_min_points, config.query.default_max_points
    );
    println!();
    println!("Monitoring:");
    println!("  Prometheus enabled: {}", config.monitoring.metrics_enabled);
    println!("  Log level: {}", config.monitoring.log_level);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_plan(
    config: &Config,
    from: Timestamp,
    to: Timestamp,
    min_points: Option<u32>,
    max_points: Option<u32>,
    consolidator: &str,
    raw_intervals: &[u32],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let consolidator: Consolidator = consolidator.parse()?;
    let min_points = min_points.unwrap_or(config.query.default_min_points);
    let max_points = max_points.unwrap_or(config.query.default_max_points);

    let planner = AlignmentPlanner::new(config.tier_set());
    let reqs: Vec<Request> = raw_intervals
        .iter()
        .enumerate()
        .map(|(i, &raw)| {
            Request::new(
                format!("series{}", i),
                from,
                to,
                min_points,
                max_points,
                consolidator,
                raw,
            )
        })
        .collect();

    let explained: Vec<_> = reqs.iter().map(|r| planner.explain(r)).collect();
    let planned = planner.plan(reqs)?;
    info!(series = planned.len(), "Planned batch");

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    for (req, costs) in planned.iter().zip(explained) {
        println!("{}", req);
        for cost in costs {
            let marker = if cost.tier == req.tier { "*" } else { " " };
            println!(
                "  {} tier {} interval {:>6}s: {:>8} points, {:>8} memory, {:>8} durable",
                marker,
                cost.tier,
                cost.interval,
                cost.native_points,
                cost.memory_points,
                cost.durable_points
            );
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitoring.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        tiers = config.storage.tiers.len(),
        raw_resident_span = config.storage.raw_resident_span,
        "Configuration loaded"
    );

    match &cli.command {
        Commands::CheckConfig => cmd_check_config(&config),
        Commands::Plan {
            from,
            to,
            min_points,
            max_points,
            consolidator,
            raw_intervals,
            format,
        } => cmd_plan(
            &config,
            *from,
            *to,
            *min_points,
            *max_points,
            consolidator,
            raw_intervals,
            format,
        ),
    }
}
