//! Shared utilities for the Airsift data sync service.
//!
//! This crate provides common functionality used across the other crates:
//! - Conversions from loosely typed upstream API values (timestamps,
//!   measurements, counts, coordinates) into domain types

pub mod convert;
