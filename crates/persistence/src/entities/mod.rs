//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod dustbox;
pub mod dustbox_reading;

pub use dustbox::DustboxEntity;
pub use dustbox_reading::DustboxReadingEntity;
