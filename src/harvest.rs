//! End-to-end harvest: discover archives, extract them, persist the points.
//!
//! Pipeline-level failures (discovery, lost worker outcomes, database
//! creation, schema creation, an aborting insert) end the run with a
//! [`HarvestError`]. Archives that fail to extract are reported in the
//! [`HarvestSummary`] and never stop the run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::db::{Database, DbError, new_database_path};
use crate::discover::{DiscoveryError, discover};
use crate::extract::{Extractor, FailureKind, KmzExtractor};
use crate::pipeline::{Harvested, PoolError, WorkerPool, default_worker_count};
use crate::record::Extracted;
use crate::store::{InsertPolicy, InsertReport, PersistenceError, PointStore, insert_all};

/// Settings for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Number of extraction workers.
    pub workers: usize,
    /// Directory receiving the generated database file.
    pub output_dir: PathBuf,
    /// Behaviour when a record cannot be inserted.
    pub insert_policy: InsertPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            output_dir: PathBuf::from("."),
            insert_policy: InsertPolicy::default(),
        }
    }
}

/// Failures that abort a harvest.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Archive discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The worker pool configuration is invalid.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The destination database could not be created.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Schema creation failed.
    #[error("failed to create schema: {0}")]
    Schema(#[source] PersistenceError),

    /// A record could not be inserted under [`InsertPolicy::Abort`].
    #[error("failed to persist point: {0}")]
    Insert(#[source] PersistenceError),

    /// Some archives never produced an outcome.
    #[error("{missing} of {expected} archives produced no outcome")]
    LostOutcomes {
        /// Archives without an outcome.
        missing: usize,
        /// Archives handed to the pool.
        expected: usize,
    },

    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One archive or record that did not become a row.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    /// Originating archive, when known.
    pub path: Option<PathBuf>,
    /// Failure classification.
    pub kind: String,
    /// Human-readable reason.
    pub message: String,
}

/// Result of a completed harvest.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    /// The generated database file.
    pub database: PathBuf,
    /// Archives found by discovery.
    pub discovered: usize,
    /// Archives that produced a record.
    pub extracted: usize,
    /// Rows written to the database.
    pub persisted: usize,
    /// Everything that did not become a row.
    pub failures: Vec<FailureReport>,
}

impl HarvestSummary {
    /// Counts failures of the given extraction kind.
    #[must_use]
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        let label = kind.to_string();
        self.failures.iter().filter(|f| f.kind == label).count()
    }
}

/// Runs harvests with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Harvester<E = KmzExtractor> {
    pool: WorkerPool<E>,
    config: HarvestConfig,
}

impl Harvester<KmzExtractor> {
    /// Creates a KMZ harvester.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Pool`] if the worker count is out of range.
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        Self::with_extractor(config, KmzExtractor)
    }
}

impl<E> Harvester<E>
where
    E: Extractor + Clone + Send + 'static,
{
    /// Creates a harvester driving a custom extractor.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Pool`] if the worker count is out of range.
    pub fn with_extractor(config: HarvestConfig, extractor: E) -> Result<Self, HarvestError> {
        let pool = WorkerPool::with_extractor(config.workers, extractor)?;
        Ok(Self { pool, config })
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvests every archive under `root` into a new database file.
    ///
    /// # Errors
    ///
    /// Returns a [`HarvestError`] for pipeline-level failures. Per-archive
    /// extraction failures are listed in the summary instead.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn run(&self, root: &Path) -> Result<HarvestSummary, HarvestError> {
        let archives = discover(root)?;
        let discovered = archives.len();
        info!(archives = discovered, "discovery complete");

        let pool = self.pool.clone();
        let harvested = tokio::task::spawn_blocking(move || pool.run(archives)).await?;
        ensure_complete(&harvested, discovered)?;

        for Extracted { path, record } in &harvested.records {
            debug!(path = %path.display(), ?record, "extracted record");
        }

        let database = new_database_path(&self.config.output_dir);
        let db = Database::create(&database).await?;
        info!(path = %database.display(), "database created");

        let store = PointStore::new(db);
        let persisted = persist(&store, &harvested.records, self.config.insert_policy).await;
        store.database().clone().close().await;
        let report = persisted?;

        let mut failures: Vec<FailureReport> = harvested
            .failures
            .iter()
            .map(|failure| FailureReport {
                path: Some(failure.path.clone()),
                kind: failure.error.kind().to_string(),
                message: failure.error.to_string(),
            })
            .collect();
        failures.extend(report.rejected.iter().map(|rejected| FailureReport {
            path: Some(rejected.path.clone()),
            kind: "persistence".to_string(),
            message: rejected.error.to_string(),
        }));

        let summary = HarvestSummary {
            database,
            discovered,
            extracted: harvested.records.len(),
            persisted: report.inserted.len(),
            failures,
        };

        info!(
            database = %summary.database.display(),
            discovered = summary.discovered,
            extracted = summary.extracted,
            persisted = summary.persisted,
            failed = summary.failures.len(),
            "harvest complete"
        );

        Ok(summary)
    }
}

/// Fails when the pool answered fewer jobs than it was given.
fn ensure_complete(harvested: &Harvested, expected: usize) -> Result<(), HarvestError> {
    let missing = expected.saturating_sub(harvested.total());
    if missing > 0 {
        return Err(HarvestError::LostOutcomes { missing, expected });
    }
    Ok(())
}

async fn persist(
    store: &PointStore,
    records: &[Extracted],
    policy: InsertPolicy,
) -> Result<InsertReport, HarvestError> {
    store.create_schema().await.map_err(HarvestError::Schema)?;
    insert_all(store, records, policy)
        .await
        .map_err(HarvestError::Insert)
}
