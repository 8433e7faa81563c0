//! Domain layer for the Airsift data sync service.
//!
//! This crate contains the domain models (`Dustbox`, `DustboxReading`)
//! shared between the persistence layer and the synchronizers.

pub mod models;
