//! Error types for point persistence.

use thiserror::Error;

use crate::record::CoordinateError;

/// Errors raised while creating the schema or inserting points.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store rejected the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The record's coordinate text cannot be turned into a position.
    #[error("invalid coordinates '{coordinates}' for point '{name}': {source}")]
    InvalidCoordinates {
        /// Name of the offending record.
        name: String,
        /// The raw coordinate text.
        coordinates: String,
        /// Why parsing failed.
        #[source]
        source: CoordinateError,
    },
}
