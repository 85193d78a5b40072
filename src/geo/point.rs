// src/geo/point.rs
//! Timestamped latitude/longitude samples

use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_POINT_ID: AtomicI64 = AtomicI64::new(0);

/// Issue a capture id: epoch milliseconds, bumped so ids never repeat
/// within this process.
fn next_point_id() -> String {
    let candidate = Utc::now().timestamp_millis();
    let mut last = LAST_POINT_ID.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last + 1);
        match LAST_POINT_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// A single location sample. Immutable once built; annotated copies get a
/// fresh id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    id: String,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    photo_ref: Option<String>,
}

impl GeoPoint {
    /// Build a validated point with a newly issued id.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Result<Self> {
        Self::with_id(next_point_id(), latitude, longitude, timestamp)
    }

    /// Build a validated point with a caller-supplied id (restored data).
    pub fn with_id(
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if !Self::is_valid_coordinate(latitude, longitude) {
            return Err(TrackerError::InvalidCoordinate { latitude, longitude });
        }

        Ok(Self {
            id: id.into(),
            latitude,
            longitude,
            timestamp,
            note: None,
            photo_ref: None,
        })
    }

    pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
    }

    /// Derive an annotation from this fix: same place and time, new id.
    pub fn with_note(&self, note: Option<String>, photo_ref: Option<String>) -> Self {
        Self {
            id: next_point_id(),
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            note: note.filter(|n| !n.trim().is_empty()),
            photo_ref,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn photo_ref(&self) -> Option<&str> {
        self.photo_ref.as_deref()
    }

    /// Copy with any photo reference replaced by a placeholder.
    pub fn without_photo(&self, placeholder: &str) -> Self {
        Self {
            photo_ref: self.photo_ref.as_ref().map(|_| placeholder.to_string()),
            ..self.clone()
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.note.is_some() || self.photo_ref.is_some()
    }

    /// Validate a point that arrived through deserialization.
    pub fn validate(&self) -> Result<()> {
        if Self::is_valid_coordinate(self.latitude, self.longitude) {
            Ok(())
        } else {
            Err(TrackerError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}
