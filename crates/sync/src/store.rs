//! Storage access used by the synchronizers.
//!
//! The synchronizers only see `list`/`find`/`upsert` operations. The
//! PostgreSQL repositories implement them here; tests substitute in-memory
//! doubles.

use async_trait::async_trait;

use domain::models::{Dustbox, DustboxReading};
use persistence::repositories::{DustboxReadingRepository, DustboxRepository};

/// Store of known dustboxes.
#[async_trait]
pub trait DustboxStore: Send + Sync {
    /// List known dustboxes, restricted to `ids` when given.
    async fn list(&self, ids: Option<&[String]>) -> Result<Vec<Dustbox>, sqlx::Error>;

    /// Insert a dustbox or update it in place, keyed by its upstream ID.
    async fn upsert(&self, dustbox: &Dustbox) -> Result<(), sqlx::Error>;
}

/// Store of dustbox readings.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Look up a reading by its upstream ID.
    async fn find(&self, id: &str) -> Result<Option<DustboxReading>, sqlx::Error>;

    /// Insert a reading or overwrite its measurement fields.
    async fn upsert(&self, reading: &DustboxReading) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DustboxStore for DustboxRepository {
    async fn list(&self, ids: Option<&[String]>) -> Result<Vec<Dustbox>, sqlx::Error> {
        let entities = match ids {
            Some(ids) => self.list_by_ids(ids).await?,
            None => self.list_all().await?,
        };
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn upsert(&self, dustbox: &Dustbox) -> Result<(), sqlx::Error> {
        DustboxRepository::upsert(self, dustbox).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for DustboxReadingRepository {
    async fn find(&self, id: &str) -> Result<Option<DustboxReading>, sqlx::Error> {
        Ok(self.find_by_id(id).await?.map(Into::into))
    }

    async fn upsert(&self, reading: &DustboxReading) -> Result<(), sqlx::Error> {
        DustboxReadingRepository::upsert(self, reading).await?;
        Ok(())
    }
}
