//! Shadow-Query CLI
//!
//! Command-line interface for assembling committed circuit inputs from
//! chain-data fixtures and inspecting the dummy table and result cache.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shadow_query_core::check_satisfied;
use shadow_query_host::circuits::SlotSummary;
use shadow_query_host::io;
use shadow_query_host::prelude::*;
use shadow_query_host::{QueryFile, ResultCache};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "shadow-query")]
#[command(about = "Verifiable historical Ethereum data for ZK guest circuits")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch queries from a fixture source, commit them and dry-run
    Commit {
        /// Chain data fixtures (JSON)
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Query file (JSON)
        #[arg(short, long)]
        queries: PathBuf,

        /// Querier configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to save the completed circuit input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-check every commitment of a saved circuit input
    Check {
        /// Path to the circuit input JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the dummy commitment table
    Dummies {
        /// Querier configuration with overrides (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect or clear the result cache
    Cache {
        /// Path to the cache file
        #[arg(short, long)]
        path: PathBuf,

        /// Remove every entry
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Commit {
            fixtures,
            queries,
            config,
            output,
        } => cmd_commit(fixtures, queries, config, output).await,
        Commands::Check { input } => cmd_check(input),
        Commands::Dummies { config } => cmd_dummies(config),
        Commands::Cache { path, clear } => cmd_cache(path, clear),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<QuerierConfig> {
    match path {
        Some(path) => QuerierConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(QuerierConfig::default()),
    }
}

async fn cmd_commit(
    fixtures: PathBuf,
    queries: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("Shadow-Query Commit");
    println!("===================");

    let config = load_config(config)?;
    let source = MemorySource::load(&fixtures)
        .with_context(|| format!("Failed to load fixtures from {}", fixtures.display()))?;
    let file: QueryFile = io::load_json(&queries)?;

    let mut querier = Querier::new(Arc::new(source), config)?;
    let allocation = querier.add_query_file(file)?;
    info!(queries = querier.num_queries(), "queries loaded");

    let guest = SlotSummary::new(allocation);
    let input = querier.build_circuit_input(&guest).await?;

    println!("\nCommitments:");
    println!("{}", io::format_commitments(&input));

    if let Some(path) = output {
        io::save_input_json(&input, &path)?;
        println!("\nCircuit input saved to {}", path.display());
    }
    Ok(())
}

fn cmd_check(path: PathBuf) -> Result<()> {
    println!("Shadow-Query Check");
    println!("==================");

    let input = io::load_input_json(&path)?;
    if input.output_commitment().is_none() {
        bail!("{} has no output commitment, run `commit` first", path.display());
    }
    let guest = SlotSummary::new(*input.allocation());
    let evaluation = check_satisfied(&input, &guest).context("Circuit is not satisfied")?;

    println!("✓ All commitments hold");
    println!("  Constraints: {}", evaluation.constraints);
    println!("  Fingerprint: {}", io::format_hash(&evaluation.fingerprint));
    println!("\n{}", io::format_commitments(&input));
    Ok(())
}

fn cmd_dummies(config: Option<PathBuf>) -> Result<()> {
    let table = load_config(config)?.dummy_table();
    for (chain_id, dummies) in table.chains() {
        println!("chain {chain_id}");
        println!("  receipt:     {}", dummies.receipt);
        println!("  storage:     {}", dummies.storage);
        println!("  transaction: {}", dummies.transaction);
    }
    Ok(())
}

fn cmd_cache(path: PathBuf, clear: bool) -> Result<()> {
    let cache = ResultCache::open(&path);
    if clear {
        let removed = cache.len();
        cache.clear();
        cache.flush()?;
        println!("Removed {removed} entries from {}", path.display());
        return Ok(());
    }
    println!("{}: {} entries", path.display(), cache.len());
    for (category, count) in cache.stats() {
        println!("  {category}: {count}");
    }
    Ok(())
}
