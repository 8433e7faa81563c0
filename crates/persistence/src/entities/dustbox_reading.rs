//! Dustbox reading entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the dustbox_readings table.
#[derive(Debug, Clone, FromRow)]
pub struct DustboxReadingEntity {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub humidity: Option<f64>,
    pub pm1: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    pub dustbox_id: String,
}

impl From<DustboxReadingEntity> for domain::models::DustboxReading {
    fn from(entity: DustboxReadingEntity) -> Self {
        Self {
            id: entity.id,
            created_at: entity.created_at,
            humidity: entity.humidity,
            pm1: entity.pm1,
            pm2_5: entity.pm2_5,
            pm10: entity.pm10,
            temperature: entity.temperature,
            dustbox_id: entity.dustbox_id,
        }
    }
}
