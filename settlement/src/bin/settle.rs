//! Group settlement CLI
//!
//! Reads a group snapshot (members, expenses, recorded payments) and prints
//! balances plus suggested payments as JSON. `SETTLEMENT_*` environment
//! variables override the config file, or the defaults when none is given.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use group_settlement::{Config, GroupSnapshot, SettlementEngine};

#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(about = "Compute balances and suggested payments for a group")]
struct Cli {
    /// Group snapshot (JSON)
    snapshot: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, short, env = "SETTLEMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    let content = std::fs::read_to_string(&cli.snapshot)
        .with_context(|| format!("failed to read {}", cli.snapshot.display()))?;
    let snapshot: GroupSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse group snapshot {}", cli.snapshot.display()))?;

    let engine = SettlementEngine::new(config)?;
    let summary = engine.summarize(&snapshot)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
