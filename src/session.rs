// src/session.rs
//! In-progress route recording

use crate::{
    clock::date_string,
    error::{Result, TrackerError},
    geo::{distance::format_km, GeoPoint, RunningDistance},
    route::{format_duration, Route},
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active { started_at: DateTime<FixedOffset> },
}

/// Recording state for one route. Samples define the path and feed the
/// distance; annotations are a separate list that never affects it.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    state: SessionState,
    samples: Vec<GeoPoint>,
    annotations: Vec<GeoPoint>,
    distance: RunningDistance,
}

/// Persisted form of an active session, for restart recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub started_at: DateTime<FixedOffset>,
    pub samples: Vec<GeoPoint>,
    pub annotations: Vec<GeoPoint>,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            samples: Vec::new(),
            annotations: Vec::new(),
            distance: RunningDistance::new(),
        }
    }

    /// Rebuild an active session from a snapshot. Distance is recomputed
    /// from the samples.
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self> {
        for point in snapshot.samples.iter().chain(snapshot.annotations.iter()) {
            point.validate()?;
        }

        Ok(Self {
            state: SessionState::Active { started_at: snapshot.started_at },
            distance: RunningDistance::from_points(&snapshot.samples),
            samples: snapshot.samples,
            annotations: snapshot.annotations,
        })
    }

    /// Idle -> Active. Clears anything left from a previous recording.
    pub fn start(&mut self, now: DateTime<FixedOffset>) -> Result<()> {
        if self.is_active() {
            return Err(TrackerError::AlreadyTracking);
        }

        self.samples.clear();
        self.annotations.clear();
        self.distance.reset();
        self.state = SessionState::Active { started_at: now };
        Ok(())
    }

    /// Append a path sample and return the updated distance.
    pub fn append_sample(&mut self, point: GeoPoint) -> Result<f64> {
        if !self.is_active() {
            return Err(TrackerError::NotTracking);
        }

        let total = self.distance.push(&point);
        self.samples.push(point);
        Ok(total)
    }

    pub fn append_annotation(&mut self, point: GeoPoint) -> Result<()> {
        if !self.is_active() {
            return Err(TrackerError::NotTracking);
        }

        self.annotations.push(point);
        Ok(())
    }

    /// Active -> Idle, handing the recording over as a [`Route`].
    pub fn stop(&mut self, now: DateTime<FixedOffset>) -> Result<Route> {
        let started_at = match self.state {
            SessionState::Active { started_at } => started_at,
            SessionState::Idle => return Err(TrackerError::NotTracking),
        };

        let samples = std::mem::take(&mut self.samples);
        let annotations = std::mem::take(&mut self.annotations);
        let point_count = annotations.len();
        let distance_km = self.distance.total_km();

        let mut coordinates = samples;
        coordinates.extend(annotations);

        self.distance.reset();
        self.state = SessionState::Idle;

        Ok(Route {
            id: now.timestamp_millis().to_string(),
            created_at: now.with_timezone(&Utc),
            date: date_string(now.date_naive()),
            duration: format_duration(now.signed_duration_since(started_at)),
            distance_km,
            point_count,
            coordinates,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        match self.state {
            SessionState::Active { started_at } => Some(started_at),
            SessionState::Idle => None,
        }
    }

    pub fn samples(&self) -> &[GeoPoint] {
        &self.samples
    }

    pub fn annotations(&self) -> &[GeoPoint] {
        &self.annotations
    }

    pub fn cumulative_distance_km(&self) -> f64 {
        self.distance.total_km()
    }

    pub fn elapsed(&self, now: DateTime<FixedOffset>) -> Duration {
        self.started_at()
            .map(|start| now.signed_duration_since(start))
            .unwrap_or_else(Duration::zero)
    }

    pub fn duration_label(&self, now: DateTime<FixedOffset>) -> String {
        format_duration(self.elapsed(now))
    }

    /// Snapshot of an active session; `None` while idle.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.started_at().map(|started_at| SessionSnapshot {
            started_at,
            samples: self.samples.clone(),
            annotations: self.annotations.clone(),
        })
    }

    pub fn status(&self, now: DateTime<FixedOffset>) -> TrackingStatus {
        TrackingStatus {
            active: self.is_active(),
            duration: self.duration_label(now),
            distance: format_km(self.cumulative_distance_km(), 2),
            distance_km: self.cumulative_distance_km(),
            samples: self.samples.len(),
            points: self.annotations.len(),
        }
    }
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Display-ready view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingStatus {
    pub active: bool,
    pub duration: String,
    pub distance: String,
    pub distance_km: f64,
    pub samples: usize,
    pub points: usize,
}
