// src/lib.rs
//! Habitumap Library
//!
//! Records GPS routes into tracking sessions, measures them with the
//! haversine formula, and resets daily habits once per local day.

pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod geo;
pub mod habits;
pub mod provider;
pub mod reset;
pub mod route;
pub mod session;
pub mod store;
pub mod tracker;

// Re-export main types for convenience
pub use error::{Result, TrackerError};
pub use geo::GeoPoint;
pub use reset::DailyResetScheduler;
pub use route::Route;
pub use session::TrackingSession;
pub use tracker::Tracker;
