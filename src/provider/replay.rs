// src/provider/replay.rs
//! Replays a recorded list of fixes as if they came from a device

use super::{LocationProvider, Subscription};
use crate::{
    error::{Result, TrackerError},
    geo::GeoPoint,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::mpsc;

/// One entry of a replay file. A missing timestamp means "now".
#[derive(Debug, Deserialize)]
struct ReplayFix {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ReplayProvider {
    points: Arc<Vec<GeoPoint>>,
    delay: Duration,
    granted: bool,
    delivered: Arc<AtomicUsize>,
}

impl ReplayProvider {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self {
            points: Arc::new(points),
            delay: Duration::ZERO,
            granted: true,
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load a JSON array of `{latitude, longitude, timestamp?}` objects.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let fixes: Vec<ReplayFix> = serde_json::from_str(&contents)
            .map_err(|e| TrackerError::Parse(format!("Failed to parse replay file: {}", e)))?;

        let points = fixes
            .into_iter()
            .map(|fix| GeoPoint::new(fix.latitude, fix.longitude, fix.timestamp.unwrap_or_else(Utc::now)))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(path = %path.display(), points = points.len(), "Loaded replay");
        Ok(Self::new(points))
    }

    /// Wait this long between delivered points.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate a denied location permission.
    pub fn denied(mut self) -> Self {
        self.granted = false;
        self
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl LocationProvider for ReplayProvider {
    async fn request_capability(&mut self) -> bool {
        self.granted
    }

    /// The most recently delivered fix, or the first one before any delivery.
    async fn current_point(&mut self) -> Result<GeoPoint> {
        let index = self.delivered().saturating_sub(1);
        self.points
            .get(index)
            .cloned()
            .ok_or_else(|| TrackerError::Connection("Replay has no points".to_string()))
    }

    async fn subscribe(&mut self, on_point: mpsc::UnboundedSender<GeoPoint>) -> Result<Subscription> {
        if !self.granted {
            return Err(TrackerError::CapabilityDenied("Replay permission denied".to_string()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let points = Arc::clone(&self.points);
        let delivered = Arc::clone(&self.delivered);
        let delay = self.delay;

        let task = tokio::spawn(async move {
            for point in points.iter() {
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if on_point.send(point.clone()).is_err() {
                    break;
                }
                delivered.fetch_add(1, Ordering::SeqCst);
            }
            flag.store(false, Ordering::Relaxed);
        });

        Ok(Subscription::new(running, task))
    }
}
