//! Repository seam for point persistence.
//!
//! The harvest flow depends on this trait rather than on [`PointStore`]
//! directly, so insertion policy can be exercised against any backend.

use async_trait::async_trait;
use uuid::Uuid;

use super::{PersistenceError, PointStore};
use crate::record::Record;

/// Data-access contract for persisted points.
#[async_trait]
pub trait PointRepository: Send + Sync {
    /// Ensures the points table exists. Safe to call repeatedly.
    async fn create_schema(&self) -> Result<(), PersistenceError>;

    /// Persists one record under a newly generated identifier.
    async fn insert(&self, record: &Record) -> Result<Uuid, PersistenceError>;
}

#[async_trait]
impl PointRepository for PointStore {
    async fn create_schema(&self) -> Result<(), PersistenceError> {
        PointStore::create_schema(self).await
    }

    async fn insert(&self, record: &Record) -> Result<Uuid, PersistenceError> {
        PointStore::insert(self, record).await
    }
}
