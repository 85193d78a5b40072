// src/route.rs
//! Finished route records

use crate::geo::{distance::format_km, GeoPoint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A recorded route. Immutable history: only deleted as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Local calendar date the route was stopped on, `YYYY-MM-DD`.
    pub date: String,
    /// Elapsed time label, `"{h}h {m}m"`.
    pub duration: String,
    pub distance_km: f64,
    /// Number of annotated points.
    pub point_count: usize,
    /// Samples followed by annotations.
    pub coordinates: Vec<GeoPoint>,
}

impl Route {
    pub fn distance_label(&self) -> String {
        format_km(self.distance_km, 2)
    }

    /// Coordinates carrying a note or photo.
    pub fn annotations(&self) -> impl Iterator<Item = &GeoPoint> {
        self.coordinates.iter().filter(|p| p.is_annotated())
    }
}

/// Format elapsed time as whole hours and minutes; seconds are truncated.
pub fn format_duration(elapsed: Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    format!("{}h {}m", hours, minutes)
}

/// Totals over a route history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub route_count: usize,
    pub total_distance_km: f64,
    pub total_points: usize,
}

impl RouteSummary {
    pub fn from_routes(routes: &[Route]) -> Self {
        routes.iter().fold(Self::default(), |acc, route| Self {
            route_count: acc.route_count + 1,
            total_distance_km: acc.total_distance_km + route.distance_km,
            total_points: acc.total_points + route.point_count,
        })
    }

    pub fn distance_label(&self) -> String {
        format_km(self.total_distance_km, 1)
    }
}
