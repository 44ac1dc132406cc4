//! Concurrent extraction pipeline.
//!
//! - [`WorkerPool`] fans archive paths out to extraction workers
//! - [`collect`] fans their outcomes back in, exactly one per job
//!
//! # Example
//!
//! ```no_run
//! use placemarks_core::pipeline::WorkerPool;
//! use std::path::PathBuf;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = WorkerPool::new(4)?;
//! let harvested = pool.run(vec![PathBuf::from("a.kmz"), PathBuf::from("b.kmz")]);
//! println!("{} records, {} failures", harvested.records.len(), harvested.failures.len());
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod pool;

use std::path::PathBuf;

pub use aggregate::{Failure, Harvested, collect};
pub use pool::{MAX_WORKERS, PoolError, WorkerPool, default_worker_count};

use crate::extract::ExtractError;
use crate::record::Record;

/// Result of processing one job.
#[derive(Debug)]
pub struct Outcome {
    /// The archive that was processed.
    pub path: PathBuf,
    /// The extracted record, or why there is none.
    pub result: Result<Record, ExtractError>,
}
