// src/geo/distance.rs
//! Great-circle distance over point sequences
//!
//! Every consecutive pair contributes to a route's length, including GPS
//! jumps. Stored routes were measured this way, so no filtering is applied.

use super::point::GeoPoint;

/// Mean Earth radius used for all distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_coords_km(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Haversine distance between raw coordinates in kilometers.
pub fn haversine_coords_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let half_lat = (d_lat / 2.0).sin();
    let half_lon = (d_lon / 2.0).sin();

    let a = half_lat * half_lat
        + lat1.to_radians().cos() * lat2.to_radians().cos() * half_lon * half_lon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of consecutive haversine distances, left to right.
pub fn route_distance_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .fold(0.0, |total, pair| total + haversine_km(&pair[0], &pair[1]))
}

/// Incremental form of [`route_distance_km`]: pushing points one at a time
/// yields the same total as recomputing over the whole sequence.
#[derive(Debug, Clone, Default)]
pub struct RunningDistance {
    last: Option<(f64, f64)>,
    total_km: f64,
}

impl RunningDistance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the running state from an existing sequence.
    pub fn from_points(points: &[GeoPoint]) -> Self {
        let mut running = Self::new();
        for point in points {
            running.push(point);
        }
        running
    }

    /// Add a point and return the updated total.
    pub fn push(&mut self, point: &GeoPoint) -> f64 {
        let current = (point.latitude(), point.longitude());
        if let Some((lat, lon)) = self.last {
            self.total_km += haversine_coords_km(lat, lon, current.0, current.1);
        }
        self.last = Some(current);
        self.total_km
    }

    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Format a distance for display, rounding only here.
pub fn format_km(km: f64, decimals: usize) -> String {
    format!("{:.*} km", decimals, km)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon, Utc::now()).unwrap()
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(route_distance_km(&[]), 0.0);
        assert_eq!(route_distance_km(&[point(10.0, 20.0)]), 0.0);
    }

    #[test]
    fn test_symmetry_and_identity() {
        let a = point(-6.2, 106.8);
        let b = point(-7.25, 112.75);
        assert_eq!(haversine_km(&a, &b), haversine_km(&b, &a));
        assert_eq!(haversine_km(&a, &a), 0.0);
    }

    #[test]
    fn test_known_equator_distance() {
        let a = point(0.0, 0.0);
        let b = point(0.01, 0.0);
        let d = haversine_km(&a, &b);
        assert!((d - 1.11).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_one_degree_longitude() {
        let d = haversine_coords_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.195).abs() < 0.2);
    }

    #[test]
    fn test_three_points_sum_exactly() {
        let p1 = point(48.117, 11.517);
        let p2 = point(48.120, 11.530);
        let p3 = point(48.100, 11.500);
        let expected = haversine_km(&p1, &p2) + haversine_km(&p2, &p3);
        assert_eq!(route_distance_km(&[p1, p2, p3]), expected);
    }

    #[test]
    fn test_jumps_are_not_filtered() {
        let p1 = point(0.0, 0.0);
        let jump = point(10.0, 10.0);
        let p3 = point(0.0, 0.001);
        let total = route_distance_km(&[p1.clone(), jump.clone(), p3.clone()]);
        assert!(total > haversine_km(&p1, &p3) * 1000.0);
    }

    #[test]
    fn test_running_matches_full_recompute() {
        let points: Vec<GeoPoint> = (0..50)
            .map(|i| point(-6.2 + i as f64 * 0.0007, 106.8 + (i % 7) as f64 * 0.0011))
            .collect();

        let mut running = RunningDistance::new();
        for (i, p) in points.iter().enumerate() {
            let total = running.push(p);
            assert_eq!(total, route_distance_km(&points[..=i]));
        }
        assert_eq!(RunningDistance::from_points(&points).total_km(), running.total_km());
    }

    #[test]
    fn test_running_reset() {
        let mut running = RunningDistance::new();
        running.push(&point(0.0, 0.0));
        running.push(&point(0.0, 1.0));
        running.reset();
        assert_eq!(running.total_km(), 0.0);
        assert_eq!(running.push(&point(5.0, 5.0)), 0.0);
    }

    #[test]
    fn test_format_km() {
        assert_eq!(format_km(1.23456, 2), "1.23 km");
        assert_eq!(format_km(0.0, 1), "0.0 km");
    }
}
