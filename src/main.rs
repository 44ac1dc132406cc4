//! CLI entry point for the placemarks harvester.

use anyhow::{Context, Result};
use clap::Parser;
use placemarks_core::{HarvestConfig, Harvester, InsertPolicy};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    info!(root = %args.root.display(), "Placemarks starting");

    let config = HarvestConfig {
        workers: usize::from(args.workers),
        output_dir: args.output_dir.clone(),
        insert_policy: if args.skip_invalid {
            InsertPolicy::Skip
        } else {
            InsertPolicy::Abort
        },
    };

    let harvester = Harvester::new(config)?;
    let summary = harvester
        .run(&args.root)
        .await
        .with_context(|| format!("harvest of {} failed", args.root.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.database.display());
    }

    Ok(())
}
