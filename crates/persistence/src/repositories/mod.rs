//! Repository implementations for database operations.

pub mod dustbox;
pub mod dustbox_reading;

pub use dustbox::DustboxRepository;
pub use dustbox_reading::DustboxReadingRepository;
