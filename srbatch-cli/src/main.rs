//! srbatch CLI
//!
//! Applies the pending rows of a worklist to the service-request portal.
//!
//! Usage:
//!   srbatch run                          # Process pending rows using ./config.json
//!   srbatch run --config other.json      # Use another configuration file
//!   srbatch check                        # Validate config and list pending rows, no browser

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use srbatch::{Action, BatchRunner, Config, CsvWorklistStore, RunReport, WorklistStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "srbatch")]
#[command(about = "📋 Bulk edits of service requests driven by a worklist")]
struct Cli {
    /// Path to the JSON configuration file
    #[clap(long, short, global = true, env = "SRBATCH_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Verbose output
    #[clap(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and apply every pending row
    Run,
    /// Validate the configuration and worklist without opening a browser
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run => run(&cli.config).await,
        Commands::Check => check(&cli.config),
    };
    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let default_filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn load(config_path: &PathBuf) -> Result<(Config, CsvWorklistStore)> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let delimiter = u8::try_from(config.script.delimiter)
        .context("Worklist delimiter must be a single ASCII character")?;
    let store = CsvWorklistStore::new(config.script.worklist_path.clone(), delimiter);
    Ok((config, store))
}

async fn run(config_path: &PathBuf) -> Result<()> {
    let (config, store) = load(config_path)?;
    info!("🚀 Starting run against {}", config.login.url);

    let report = BatchRunner::new(&config, &store).run().await;
    print_summary(&report);

    if let Some(e) = report.fatal {
        return Err(e).context("Run did not finish");
    }
    if let Some(e) = report.persistence {
        return Err(e).context("Results were not saved");
    }
    Ok(())
}

fn check(config_path: &PathBuf) -> Result<()> {
    let (_config, store) = load(config_path)?;
    let worklist = store.load()?;
    let pending = worklist.pending_indices();

    println!("✅ Configuration is valid");
    println!("📁 Worklist: {} ({} rows)", store.describe(), worklist.len());
    println!("📊 Pending rows: {}", pending.len());
    let mut unsupported = 0;
    for index in pending {
        let row = &worklist.rows()[index];
        match Action::parse(&row.action) {
            Ok(action) => println!("  • {} → {}", row.id, action),
            Err(e) => {
                unsupported += 1;
                println!("  ⚠️  {} → {}", row.id, e);
            }
        }
    }
    if unsupported > 0 {
        println!("⚠️  {unsupported} row(s) would fail with an unsupported action");
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("📊 Run summary");
    println!("  Rows in worklist: {}", report.total_rows);
    println!("  Eligible:         {}", report.eligible);
    println!("  Processed:        {}", report.processed());
    println!("  ✅ Completed:     {}", report.completed);
    println!("  ❌ Failed:        {}", report.failed);
    println!("  ⏭️  Skipped:       {}", report.skipped());
    println!(
        "  Worklist saved:   {}",
        if report.persisted { "yes" } else { "no" }
    );
}
