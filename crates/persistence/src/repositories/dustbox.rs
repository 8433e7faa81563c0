//! Dustbox repository for database operations.

use sqlx::PgPool;

use crate::entities::DustboxEntity;
use domain::models::Dustbox;

/// Repository for dustbox-related database operations.
#[derive(Clone)]
pub struct DustboxRepository {
    pool: PgPool,
}

impl DustboxRepository {
    /// Creates a new DustboxRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a dustbox by its upstream ID.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<DustboxEntity>, sqlx::Error> {
        sqlx::query_as::<_, DustboxEntity>(
            r#"
            SELECT id, created_at, description, device_number, entries_number,
                   last_entry_at, longitude, latitude, public_key, slug, title, updated_at
            FROM dustboxes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Upsert a dustbox (insert or update on conflict).
    /// Returns the dustbox entity after upsert.
    pub async fn upsert(&self, dustbox: &Dustbox) -> Result<DustboxEntity, sqlx::Error> {
        let (longitude, latitude) = match dustbox.coordinates() {
            Some((x, y)) => (Some(x), Some(y)),
            None => (None, None),
        };

        sqlx::query_as::<_, DustboxEntity>(
            r#"
            INSERT INTO dustboxes (id, created_at, description, device_number, entries_number,
                                   last_entry_at, longitude, latitude, public_key, slug, title, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                created_at = EXCLUDED.created_at,
                description = EXCLUDED.description,
                device_number = EXCLUDED.device_number,
                entries_number = EXCLUDED.entries_number,
                last_entry_at = EXCLUDED.last_entry_at,
                longitude = EXCLUDED.longitude,
                latitude = EXCLUDED.latitude,
                public_key = EXCLUDED.public_key,
                slug = EXCLUDED.slug,
                title = EXCLUDED.title,
                updated_at = EXCLUDED.updated_at
            RETURNING id, created_at, description, device_number, entries_number,
                      last_entry_at, longitude, latitude, public_key, slug, title, updated_at
            "#,
        )
        .bind(&dustbox.id)
        .bind(dustbox.created_at)
        .bind(&dustbox.description)
        .bind(&dustbox.device_number)
        .bind(dustbox.entries_number)
        .bind(dustbox.last_entry_at)
        .bind(longitude)
        .bind(latitude)
        .bind(&dustbox.public_key)
        .bind(&dustbox.slug)
        .bind(&dustbox.title)
        .bind(dustbox.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    /// List every known dustbox, sorted by ID for a stable sync order.
    pub async fn list_all(&self) -> Result<Vec<DustboxEntity>, sqlx::Error> {
        sqlx::query_as::<_, DustboxEntity>(
            r#"
            SELECT id, created_at, description, device_number, entries_number,
                   last_entry_at, longitude, latitude, public_key, slug, title, updated_at
            FROM dustboxes
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// List the dustboxes with the given upstream IDs.
    pub async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<DustboxEntity>, sqlx::Error> {
        sqlx::query_as::<_, DustboxEntity>(
            r#"
            SELECT id, created_at, description, device_number, entries_number,
                   last_entry_at, longitude, latitude, public_key, slug, title, updated_at
            FROM dustboxes
            WHERE id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}
