//! Dustbox entity (database row mapping).

use chrono::{DateTime, Utc};
use geo::Point;
use sqlx::FromRow;

/// Database row mapping for the dustboxes table.
///
/// The location is stored as a pair of nullable coordinate columns; the
/// domain model folds them back into a single optional point.
#[derive(Debug, Clone, FromRow)]
pub struct DustboxEntity {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub device_number: Option<String>,
    pub entries_number: i32,
    pub last_entry_at: Option<DateTime<Utc>>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub public_key: String,
    pub slug: String,
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DustboxEntity> for domain::models::Dustbox {
    fn from(entity: DustboxEntity) -> Self {
        let location = match (entity.longitude, entity.latitude) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };

        Self {
            id: entity.id,
            created_at: entity.created_at,
            description: entity.description,
            device_number: entity.device_number,
            entries_number: entity.entries_number,
            last_entry_at: entity.last_entry_at,
            location,
            public_key: entity.public_key,
            slug: entity.slug,
            title: entity.title,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_dustbox_entity() -> DustboxEntity {
        DustboxEntity {
            id: "7a3e1c9e-8f1d-4b6a-9c2e-5d8f0a1b2c3d".to_string(),
            created_at: Utc.with_ymd_and_hms(2020, 4, 29, 9, 58, 14).unwrap(),
            description: "Rooftop monitor".to_string(),
            device_number: Some("DB-0042".to_string()),
            entries_number: 1_280,
            last_entry_at: Some(Utc.with_ymd_and_hms(2021, 1, 5, 16, 30, 0).unwrap()),
            longitude: Some(-0.6989764),
            latitude: Some(52.2552717),
            public_key: "pk-test".to_string(),
            slug: "rooftop-monitor".to_string(),
            title: "Rooftop Monitor".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_dustbox_entity_to_domain() {
        let entity = create_test_dustbox_entity();
        let dustbox: domain::models::Dustbox = entity.clone().into();

        assert_eq!(dustbox.id, entity.id);
        assert_eq!(dustbox.created_at, entity.created_at);
        assert_eq!(dustbox.description, entity.description);
        assert_eq!(dustbox.device_number, entity.device_number);
        assert_eq!(dustbox.entries_number, entity.entries_number);
        assert_eq!(dustbox.last_entry_at, entity.last_entry_at);
        assert_eq!(dustbox.coordinates(), Some((-0.6989764, 52.2552717)));
        assert_eq!(dustbox.title, entity.title);
    }

    #[test]
    fn test_dustbox_entity_without_location() {
        let mut entity = create_test_dustbox_entity();
        entity.longitude = None;
        entity.latitude = None;

        let dustbox: domain::models::Dustbox = entity.into();
        assert!(dustbox.location.is_none());
    }

    #[test]
    fn test_dustbox_entity_half_location_is_absent() {
        let mut entity = create_test_dustbox_entity();
        entity.latitude = None;

        let dustbox: domain::models::Dustbox = entity.into();
        assert!(dustbox.location.is_none());
    }
}
