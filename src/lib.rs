//! Placemarks Core Library
//!
//! This library turns a directory tree of KMZ archives into geocoded point
//! rows in a fresh `SQLite` database.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`discover`] - Recursive discovery of `.kmz` archives
//! - [`extract`] - ZIP unpacking and KML placemark lookups
//! - [`pipeline`] - Worker pool and outcome aggregation
//! - [`record`] - Extracted records and coordinate parsing
//! - [`db`] - Database file creation and connection
//! - [`store`] - Points schema and insertion
//! - [`harvest`] - End-to-end orchestration of a run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod db;
pub mod discover;
pub mod extract;
pub mod harvest;
pub mod pipeline;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use discover::{ARCHIVE_SUFFIX, DiscoveryError, discover};
pub use extract::{
    ExtractError, Extractor, FailureKind, Field, INNER_DOCUMENT_SUFFIX, KmzExtractor,
    extract_archive,
};
pub use harvest::{FailureReport, HarvestConfig, HarvestError, HarvestSummary, Harvester};
pub use pipeline::{
    Failure, Harvested, MAX_WORKERS, Outcome, PoolError, WorkerPool, default_worker_count,
};
pub use record::{CoordinateError, Extracted, Position, Record, parse_coordinates};
pub use store::{
    InsertPolicy, InsertReport, PersistedPoint, PersistenceError, PointRepository, PointStore,
    insert_all,
};
