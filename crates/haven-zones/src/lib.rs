//! Detection-zone filtering for the Haven pipeline.
//!
//! This crate provides:
//! - Crossing-number point-in-polygon tests over normalized coordinates
//! - A fail-open `ZoneFilter` with a per-camera compiled-polygon cache
//! - The `ZoneStore` trait (JSON text at the persistence boundary) with a
//!   validated write path and an in-memory implementation

pub mod error;
pub mod filter;
pub mod geometry;
pub mod store;

pub use error::{ZoneError, ZoneResult};
pub use filter::{CompiledZone, CompiledZoneSet, ZoneFilter};
pub use geometry::{point_in_polygon, polygon_centroid};
pub use store::{InMemoryZoneStore, ZoneListUpdate, ZoneStore};
