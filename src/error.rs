// src/error.rs
//! Error types for route tracking and daily resets

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Location capability denied: {0}")]
    CapabilityDenied(String),

    #[error("Not tracking: start a session first")]
    NotTracking,

    #[error("A tracking session is already active")]
    AlreadyTracking,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Other(String),
}

impl TrackerError {
    /// True for calls made in the wrong session state.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, TrackerError::NotTracking | TrackerError::AlreadyTracking)
    }

    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        TrackerError::Persistence(format!("{}: {}", context, err))
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(error: anyhow::Error) -> Self {
        TrackerError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_grouping() {
        assert!(TrackerError::NotTracking.is_precondition_violation());
        assert!(TrackerError::AlreadyTracking.is_precondition_violation());
        assert!(!TrackerError::Persistence("disk full".to_string()).is_precondition_violation());
        assert!(!TrackerError::CapabilityDenied("no fix".to_string()).is_precondition_violation());
    }

    #[test]
    fn test_display_messages() {
        let err = TrackerError::persistence("Failed to write routes", "disk full");
        assert_eq!(err.to_string(), "Persistence error: Failed to write routes: disk full");

        let err = TrackerError::InvalidCoordinate { latitude: 91.0, longitude: 0.0 };
        assert!(err.to_string().contains("91"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: TrackerError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, TrackerError::Other(ref msg) if msg == "boom"));
    }
}
