//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use placemarks_core::default_worker_count;

/// Harvest KMZ placemarks into a SQLite database.
///
/// Every `.kmz` archive under ROOT is unpacked, its KML placemark read, and
/// the point written to a new `<uuid>.db` file.
#[derive(Parser, Debug)]
#[command(name = "placemarks")]
#[command(author, version, about)]
pub struct Args {
    /// Directory (or single archive) to search for .kmz files
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Number of extraction workers (1-256, defaults to available CPUs)
    #[arg(short = 'w', long, default_value_t = default_workers(), value_parser = clap::value_parser!(u16).range(1..=256))]
    pub workers: u16,

    /// Directory in which the database file is created
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Skip records whose point cannot be stored instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn default_workers() -> u16 {
    u16::try_from(default_worker_count()).unwrap_or(1)
}
