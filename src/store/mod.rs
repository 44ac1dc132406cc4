//! `SQLite` persistence for extracted placemarks.
//!
//! Each [`Record`] becomes one row of the `points` table:
//!
//! | column        | type | source                               |
//! |---------------|------|--------------------------------------|
//! | `id`          | TEXT | UUID v4 generated at insertion       |
//! | `name`        | TEXT | `Record::name`                       |
//! | `description` | TEXT | `Record::description`                |
//! | `latitude`    | REAL | second field of `Record::coordinates`|
//! | `longitude`   | REAL | first field of `Record::coordinates` |
//!
//! # Example
//!
//! ```ignore
//! use placemarks_core::{Database, PointStore, Record};
//!
//! let store = PointStore::new(Database::new_in_memory().await?);
//! store.create_schema().await?;
//! let id = store.insert(&Record::new("10.5,-23.1", "", "Harbour")).await?;
//! ```

mod error;
mod repository;

pub use error::PersistenceError;
pub use repository::PointRepository;

use std::path::PathBuf;

use sqlx::Row;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::record::{Extracted, Record};

const CREATE_POINTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS points (
    id TEXT NOT NULL PRIMARY KEY,
    name TEXT,
    description TEXT,
    latitude REAL,
    longitude REAL
)";

// One statement text for every row: the connection's statement cache keeps a
// single prepared statement for the whole run.
const INSERT_POINT: &str =
    "INSERT INTO points (id, name, description, latitude, longitude) VALUES (?, ?, ?, ?, ?)";

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// A row of the `points` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedPoint {
    pub id: String,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl PersistedPoint {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        }
    }
}

/// What to do when a single record cannot be inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Stop at the first failed insertion and return its error.
    #[default]
    Abort,
    /// Log the failure, remember it, and continue with the next record.
    Skip,
}

/// A record that was not persisted under [`InsertPolicy::Skip`].
#[derive(Debug)]
pub struct RejectedRecord {
    /// Archive the record was read from.
    pub path: PathBuf,
    pub record: Record,
    pub error: PersistenceError,
}

/// Outcome of inserting a batch of records.
#[derive(Debug, Default)]
pub struct InsertReport {
    /// Identifiers of persisted rows, in insertion order.
    pub inserted: Vec<Uuid>,
    /// Records skipped because their insertion failed.
    pub rejected: Vec<RejectedRecord>,
}

/// `SQLite`-backed point store.
#[derive(Debug, Clone)]
pub struct PointStore {
    db: Database,
}

impl PointStore {
    /// Creates a store over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Ensures the `points` table exists.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the statement fails.
    #[instrument(skip(self))]
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(CREATE_POINTS_TABLE)
            .execute(self.db.pool())
            .await?;
        debug!("points table ready");
        Ok(())
    }

    /// Inserts `record` under a new UUID and returns that UUID.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidCoordinates`] if the coordinate text
    /// lacks a numeric longitude and latitude, or
    /// [`PersistenceError::Database`] if the store rejects the row.
    #[instrument(skip(self, record), fields(name = %record.name))]
    pub async fn insert(&self, record: &Record) -> Result<Uuid> {
        let position = record
            .position()
            .map_err(|source| PersistenceError::InvalidCoordinates {
                name: record.name.clone(),
                coordinates: record.coordinates.clone(),
                source,
            })?;

        let id = Uuid::new_v4();
        sqlx::query(INSERT_POINT)
            .bind(id.to_string())
            .bind(&record.name)
            .bind(&record.description)
            .bind(position.latitude)
            .bind(position.longitude)
            .execute(self.db.pool())
            .await?;

        debug!(%id, "point inserted");
        Ok(id)
    }

    /// Returns the number of persisted points.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the query fails.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM points")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Returns every persisted point, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the query fails.
    pub async fn list(&self) -> Result<Vec<PersistedPoint>> {
        let rows = sqlx::query(
            "SELECT id, name, description, latitude, longitude FROM points ORDER BY name, id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(PersistedPoint::from_row).collect())
    }
}

/// Inserts `records` one by one, following `policy` on failure.
///
/// # Errors
///
/// Under [`InsertPolicy::Abort`], returns the first insertion error; rows
/// inserted before it stay persisted. Under [`InsertPolicy::Skip`] this never
/// fails: rejected records are listed in the report instead.
#[instrument(skip(repository, records), fields(records = records.len()))]
pub async fn insert_all<R>(
    repository: &R,
    records: &[Extracted],
    policy: InsertPolicy,
) -> Result<InsertReport>
where
    R: PointRepository + ?Sized,
{
    let mut report = InsertReport {
        inserted: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };

    for Extracted { path, record } in records {
        match repository.insert(record).await {
            Ok(id) => report.inserted.push(id),
            Err(error) => match policy {
                InsertPolicy::Abort => {
                    warn!(
                        path = %path.display(),
                        name = %record.name,
                        error = %error,
                        "point not persisted, aborting"
                    );
                    return Err(error);
                }
                InsertPolicy::Skip => {
                    warn!(
                        path = %path.display(),
                        name = %record.name,
                        error = %error,
                        "point not persisted"
                    );
                    report.rejected.push(RejectedRecord {
                        path: path.clone(),
                        record: record.clone(),
                        error,
                    });
                }
            },
        }
    }

    Ok(report)
}
