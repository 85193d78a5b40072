// src/geo/mod.rs
//! Geographic samples and route distance math

pub mod distance;
pub mod point;

pub use distance::{haversine_km, route_distance_km, RunningDistance, EARTH_RADIUS_KM};
pub use point::GeoPoint;
