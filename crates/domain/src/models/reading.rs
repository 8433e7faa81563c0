//! Dustbox reading domain model.

use chrono::{DateTime, Utc};

/// One timestamped measurement sample from a dustbox.
///
/// Each measurement field is independently nullable: the upstream serves
/// null or empty strings for sensors that produced no value, and that is
/// distinct from a reading of zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DustboxReading {
    /// Upstream reading ID, treated as an opaque string.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub humidity: Option<f64>,
    pub pm1: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    /// The dustbox this reading belongs to.
    pub dustbox_id: String,
}
