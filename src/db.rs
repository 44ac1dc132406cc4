//! Database connection management.
//!
//! Every harvest writes into a brand-new `SQLite` file named after a random
//! UUID. The connection pool is limited to a single connection: rows are
//! written sequentially after extraction finished, so one writer is all the
//! store ever sees.
//!
//! Files are addressed through [`SqliteConnectOptions::filename`] rather than
//! a `sqlite:` URL, so `?` and `%` in directory names are taken literally.
//!
//! # Example
//!
//! ```no_run
//! use placemarks_core::{Database, db::new_database_path};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let path = new_database_path(Path::new("."));
//! let db = Database::create(&path).await?;
//! // Use db for queries...
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Extension of generated database files.
pub const DATABASE_EXTENSION: &str = "db";

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Refused to reuse an existing file as the destination store.
    #[error("database file {} already exists", path.display())]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },
}

/// Returns a fresh `<uuid>.db` path inside `dir`.
#[must_use]
pub fn new_database_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.{DATABASE_EXTENSION}", Uuid::new_v4()))
}

/// Database connection wrapper with a single-connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database file at `db_path` and connects to it.
    ///
    /// # Errors
    ///
    /// Returns `DbError::AlreadyExists` if a file is already present at
    /// `db_path`, or `DbError::Connection` if the file cannot be created.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn create(db_path: &Path) -> Result<Self, DbError> {
        if db_path.exists() {
            return Err(DbError::AlreadyExists {
                path: db_path.to_path_buf(),
            });
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        Self::connect(options).await
    }

    /// Opens an existing database file without creating it.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the file is missing or unreadable.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn open(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new().filename(db_path);

        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Creates an in-memory database for testing.
    ///
    /// The database exists only for the lifetime of the connection.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Gracefully closes all connections in the pool.
    ///
    /// Call before exiting so the file is fully flushed.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}
