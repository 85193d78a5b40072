// src/config.rs
//! Configuration stored as JSON in the user's config directory

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub provider: String, // "gpsd", "replay"
    pub gpsd_host: String,
    pub gpsd_port: u16,
    pub replay_file: Option<PathBuf>,
    pub replay_delay_ms: u64,
    pub min_time_secs: u64,
    pub min_distance_m: f64,
    pub reset_check_secs: u64,
    pub data_dir: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            provider: "gpsd".to_string(),
            gpsd_host: "localhost".to_string(),
            gpsd_port: 2947,
            replay_file: None,
            replay_delay_ms: 1000,
            min_time_secs: 5,
            min_distance_m: 10.0,
            reset_check_secs: 60,
            data_dir: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| TrackerError::Other(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| TrackerError::Other(format!("Failed to parse config file: {}", e)))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TrackerError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| TrackerError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn home_dir() -> Result<PathBuf> {
        std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| TrackerError::Other("HOME environment variable not set".to_string()))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(".config").join("habitumap").join("config.json"))
    }

    /// Where routes, habits and the reset cursor live.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match self.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(Self::home_dir()?.join(".local").join("share").join("habitumap")),
        }
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.provider = "gpsd".to_string();
        self.gpsd_host = host;
        self.gpsd_port = port;
    }

    /// Update replay settings
    pub fn update_replay(&mut self, file: PathBuf, delay_ms: u64) {
        self.provider = "replay".to_string();
        self.replay_file = Some(file);
        self.replay_delay_ms = delay_ms;
    }

    /// Update sample delivery thresholds
    pub fn update_thresholds(&mut self, min_time_secs: u64, min_distance_m: f64) {
        self.min_time_secs = min_time_secs;
        self.min_distance_m = min_distance_m.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.provider, "gpsd");
        assert_eq!(config.gpsd_port, 2947);
        assert_eq!(config.min_time_secs, 5);
        assert_eq!(config.min_distance_m, 10.0);
        assert_eq!(config.reset_check_secs, 60);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = TrackerConfig::from_json(r#"{"provider":"replay","replay_file":"/tmp/walk.json"}"#).unwrap();
        assert_eq!(config.provider, "replay");
        assert_eq!(config.replay_file, Some(PathBuf::from("/tmp/walk.json")));
        assert_eq!(config.gpsd_host, "localhost");
    }

    #[test]
    fn test_bad_json() {
        assert!(TrackerConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_update_replay() {
        let mut config = TrackerConfig::default();
        config.update_replay(PathBuf::from("walk.json"), 250);
        assert_eq!(config.provider, "replay");
        assert_eq!(config.replay_delay_ms, 250);
    }

    #[test]
    fn test_update_thresholds_clamps() {
        let mut config = TrackerConfig::default();
        config.update_thresholds(2, -4.0);
        assert_eq!(config.min_time_secs, 2);
        assert_eq!(config.min_distance_m, 0.0);
    }

    #[test]
    fn test_explicit_data_dir() {
        let config = TrackerConfig {
            data_dir: Some(PathBuf::from("/var/lib/habitumap")),
            ..TrackerConfig::default()
        };
        assert_eq!(config.resolve_data_dir().unwrap(), PathBuf::from("/var/lib/habitumap"));
    }
}
