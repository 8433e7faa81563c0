//! Dustbox reading repository for database operations.

use sqlx::PgPool;

use crate::entities::DustboxReadingEntity;
use domain::models::DustboxReading;

/// Repository for dustbox-reading database operations.
#[derive(Clone)]
pub struct DustboxReadingRepository {
    pool: PgPool,
}

impl DustboxReadingRepository {
    /// Creates a new DustboxReadingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a reading by its upstream ID.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<DustboxReadingEntity>, sqlx::Error> {
        sqlx::query_as::<_, DustboxReadingEntity>(
            r#"
            SELECT id, created_at, humidity, pm1, pm2_5, pm10, temperature, dustbox_id
            FROM dustbox_readings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Upsert a reading (insert or overwrite measurement fields on conflict).
    /// The reading's identity never changes; only its measurements do.
    pub async fn upsert(
        &self,
        reading: &DustboxReading,
    ) -> Result<DustboxReadingEntity, sqlx::Error> {
        sqlx::query_as::<_, DustboxReadingEntity>(
            r#"
            INSERT INTO dustbox_readings (id, created_at, humidity, pm1, pm2_5, pm10, temperature, dustbox_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                created_at = EXCLUDED.created_at,
                humidity = EXCLUDED.humidity,
                pm1 = EXCLUDED.pm1,
                pm2_5 = EXCLUDED.pm2_5,
                pm10 = EXCLUDED.pm10,
                temperature = EXCLUDED.temperature,
                dustbox_id = EXCLUDED.dustbox_id
            RETURNING id, created_at, humidity, pm1, pm2_5, pm10, temperature, dustbox_id
            "#,
        )
        .bind(&reading.id)
        .bind(reading.created_at)
        .bind(reading.humidity)
        .bind(reading.pm1)
        .bind(reading.pm2_5)
        .bind(reading.pm10)
        .bind(reading.temperature)
        .bind(&reading.dustbox_id)
        .fetch_one(&self.pool)
        .await
    }
}
