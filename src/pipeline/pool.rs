//! Fixed-size worker pool for archive extraction.
//!
//! Workers are scoped OS threads sharing one bounded job channel and one
//! bounded result channel, both sized to the number of jobs. Each worker pulls
//! paths until the job channel is empty and closed, and sends exactly one
//! [`Outcome`] per path. The calling thread drains the result channel through
//! [`collect`] and returns once every job has been answered.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, info, instrument, warn};

use super::aggregate::{Harvested, collect};
use super::Outcome;
use crate::extract::{ExtractError, Extractor, KmzExtractor};
use crate::record::Record;

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 256;

/// Error type for worker pool configuration.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Returns the host's available parallelism, clamped to the valid range.
#[must_use]
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map_or(MIN_WORKERS, std::num::NonZeroUsize::get)
        .clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Pool of extraction workers.
///
/// The pool holds no per-run state: every call to [`WorkerPool::run`] creates
/// fresh channels and threads, so one pool can be reused across runs.
#[derive(Debug, Clone)]
pub struct WorkerPool<E = KmzExtractor> {
    workers: usize,
    extractor: E,
}

impl WorkerPool<KmzExtractor> {
    /// Creates a KMZ pool with `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if `workers` is outside
    /// `1..=MAX_WORKERS`.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        Self::with_extractor(workers, KmzExtractor)
    }
}

impl<E: Extractor> WorkerPool<E> {
    /// Creates a pool that runs `extractor` on `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if `workers` is outside
    /// `1..=MAX_WORKERS`.
    pub fn with_extractor(workers: usize, extractor: E) -> Result<Self, PoolError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(PoolError::InvalidWorkerCount { value: workers });
        }

        debug!(workers, "creating worker pool");
        Ok(Self { workers, extractor })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extracts every archive in `jobs` and returns the partitioned outcomes.
    ///
    /// Exactly one outcome is collected per job; failures of individual
    /// archives are reported in [`Harvested::failures`] and never stop other
    /// workers. No more threads than jobs are started.
    #[instrument(skip(self, jobs), fields(jobs = jobs.len(), workers = self.workers))]
    pub fn run(&self, jobs: Vec<PathBuf>) -> Harvested {
        let expected = jobs.len();
        if expected == 0 {
            info!("no archives to process");
            return Harvested::default();
        }

        let (job_tx, job_rx) = bounded::<PathBuf>(expected);
        let (result_tx, result_rx) = bounded::<Outcome>(expected);
        let workers = self.workers.min(expected);

        info!(archives = expected, workers, "starting extraction");

        let harvested = thread::scope(|scope| {
            for id in 1..=workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let extractor = &self.extractor;

                let spawned = thread::Builder::new()
                    .name(format!("kmz-worker-{id}"))
                    .spawn_scoped(scope, move || worker_loop(id, extractor, &jobs, &results));

                if let Err(error) = spawned {
                    warn!(worker = id, %error, "failed to start worker");
                }
            }

            // Only workers hold these ends now; the channels close with them.
            drop(job_rx);
            drop(result_tx);

            for job in jobs {
                if let Err(unsent) = job_tx.send(job) {
                    warn!(path = %unsent.0.display(), "no worker available to accept job");
                    break;
                }
            }
            drop(job_tx);

            collect(&result_rx, expected)
        });

        info!(
            extracted = harvested.records.len(),
            failed = harvested.failures.len(),
            total = harvested.total(),
            "extraction complete"
        );

        harvested
    }
}

fn worker_loop<E: Extractor>(
    id: usize,
    extractor: &E,
    jobs: &Receiver<PathBuf>,
    results: &Sender<Outcome>,
) {
    for path in jobs {
        info!(worker = id, path = %path.display(), "processing archive");
        let result = extract_guarded(extractor, &path);
        info!(
            worker = id,
            path = %path.display(),
            ok = result.is_ok(),
            "processed archive"
        );

        if results.send(Outcome { path, result }).is_err() {
            warn!(worker = id, "result channel closed, stopping worker");
            return;
        }
    }
    debug!(worker = id, "job channel drained");
}

/// Runs the extractor, converting a panic into a per-job failure.
fn extract_guarded<E: Extractor>(extractor: &E, path: &Path) -> Result<Record, ExtractError> {
    panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(path))).unwrap_or_else(|_| {
        Err(ExtractError::WorkerPanicked {
            path: path.to_path_buf(),
        })
    })
}
