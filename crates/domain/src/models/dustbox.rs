//! Dustbox domain model.

use chrono::{DateTime, Utc};
use geo::Point;

/// A registered air-quality sensor, tracked by its upstream stream ID.
///
/// Dustboxes are created on first sync encounter and updated in place on
/// every run after that; they are never deleted by the sync service.
#[derive(Debug, Clone, PartialEq)]
pub struct Dustbox {
    /// Upstream stream ID, treated as an opaque string.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub device_number: Option<String>,
    /// Reading count reported by the upstream for this stream.
    pub entries_number: i32,
    /// When the upstream last received a reading. Absent when the upstream
    /// reports the stream has never produced one.
    pub last_entry_at: Option<DateTime<Utc>>,
    /// Installation site, absent when the upstream holds no usable pair of
    /// coordinates.
    pub location: Option<Point<f64>>,
    pub public_key: String,
    pub slug: String,
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Dustbox {
    /// Longitude/latitude pair, if the dustbox has a location.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.location.map(|point| (point.x(), point.y()))
    }
}
