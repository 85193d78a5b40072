// src/provider/mod.rs
//! Location providers that feed samples into a tracking session

pub mod gpsd;
pub mod replay;

use crate::{error::Result, geo::GeoPoint};
use chrono::Duration;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{sync::mpsc, task::JoinHandle};

pub use gpsd::GpsdProvider;
pub use replay::ReplayProvider;

/// A device location source.
#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    /// Whether location can be used at all (permission, device reachable).
    async fn request_capability(&mut self) -> bool;

    /// A single fix, right now.
    async fn current_point(&mut self) -> Result<GeoPoint>;

    /// Deliver samples to `on_point` until the returned handle is dropped
    /// or unsubscribed.
    async fn subscribe(&mut self, on_point: mpsc::UnboundedSender<GeoPoint>) -> Result<Subscription>;
}

/// Owned handle to a running delivery task.
#[derive(Debug)]
pub struct Subscription {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(running: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            running,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Delivery thresholds: a point passes once both the time and the distance
/// since the last delivered point reach their minimums.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<GeoPoint>,
}

impl Throttle {
    pub fn new(min_interval_secs: u64, min_distance_m: f64) -> Self {
        Self {
            min_interval: Duration::seconds(min_interval_secs as i64),
            min_distance_m: min_distance_m.max(0.0),
            last: None,
        }
    }

    /// No throttling at all.
    pub fn none() -> Self {
        Self::new(0, 0.0)
    }

    pub fn accept(&mut self, point: &GeoPoint) -> bool {
        if let Some(ref last) = self.last {
            if point.timestamp().signed_duration_since(last.timestamp()) < self.min_interval {
                return false;
            }
            if crate::geo::haversine_km(last, point) * 1000.0 < self.min_distance_m {
                return false;
            }
        }

        self.last = Some(point.clone());
        true
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(5, 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point_at(lat: f64, secs: i64) -> GeoPoint {
        GeoPoint::new(lat, 0.0, Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()).unwrap()
    }

    #[test]
    fn test_throttle_time_and_distance() {
        let mut throttle = Throttle::default();
        assert!(throttle.accept(&point_at(0.0, 0)));
        // Far enough but too soon
        assert!(!throttle.accept(&point_at(0.001, 2)));
        // Late enough but only ~5.5 m away
        assert!(!throttle.accept(&point_at(0.00005, 10)));
        // ~111 m and 10 s later
        assert!(throttle.accept(&point_at(0.001, 10)));
    }

    #[test]
    fn test_throttle_none_accepts_everything() {
        let mut throttle = Throttle::none();
        assert!(throttle.accept(&point_at(0.0, 0)));
        assert!(throttle.accept(&point_at(0.0, 0)));
    }

    #[tokio::test]
    async fn test_subscription_drop_stops_task() {
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let subscription = Subscription::new(Arc::clone(&running), task);
        assert!(subscription.is_active());

        drop(subscription);
        assert!(!running.load(Ordering::Relaxed));
    }
}
