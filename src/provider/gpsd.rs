// src/provider/gpsd.rs
//! gpsd client producing GeoPoints

use super::{LocationProvider, Subscription, Throttle};
use crate::{
    error::{Result, TrackerError},
    geo::GeoPoint,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};

const FIX_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct GpsdProvider {
    host: String,
    port: u16,
    min_time_secs: u64,
    min_distance_m: f64,
}

/// Connect to a gpsd daemon and enable JSON watch mode
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    stream
        .write_all(b"?WATCH={\"enable\":true,\"json\":true}\n")
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse one gpsd JSON line. Only TPV reports with a 2D/3D fix yield a point.
pub fn parse_gpsd_line(line: &str) -> Result<Option<GeoPoint>> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| TrackerError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    match msg.class.as_str() {
        "TPV" => parse_tpv_message(&msg.data),
        "VERSION" => {
            if let Some(version) = msg.data.get("release").and_then(|v| v.as_str()) {
                tracing::info!(version, "Connected to gpsd");
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn parse_tpv_message(msg_data: &HashMap<String, serde_json::Value>) -> Result<Option<GeoPoint>> {
    let mode = msg_data.get("mode").and_then(|v| v.as_u64()).unwrap_or(0);
    if mode < 2 {
        return Ok(None);
    }

    let (lat, lon) = match (
        msg_data.get("lat").and_then(|v| v.as_f64()),
        msg_data.get("lon").and_then(|v| v.as_f64()),
    ) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Ok(None),
    };

    let timestamp = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    GeoPoint::new(lat, lon, timestamp).map(Some)
}

/// Read lines until the first usable fix.
async fn read_fix(reader: &mut BufReader<TcpStream>) -> Result<GeoPoint> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(TrackerError::Connection("gpsd closed the connection".to_string()));
        }
        match parse_gpsd_line(line.trim()) {
            Ok(Some(point)) => return Ok(point),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "Skipping gpsd line"),
        }
    }
}

impl GpsdProvider {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            min_time_secs: 5,
            min_distance_m: 10.0,
        }
    }

    pub fn with_thresholds(mut self, min_time_secs: u64, min_distance_m: f64) -> Self {
        self.min_time_secs = min_time_secs;
        self.min_distance_m = min_distance_m;
        self
    }
}

impl LocationProvider for GpsdProvider {
    async fn request_capability(&mut self) -> bool {
        match connect_gpsd(&self.host, self.port).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "gpsd unavailable");
                false
            }
        }
    }

    async fn current_point(&mut self) -> Result<GeoPoint> {
        let mut reader = connect_gpsd(&self.host, self.port).await?;

        tokio::time::timeout(FIX_TIMEOUT, read_fix(&mut reader))
            .await
            .map_err(|_| TrackerError::Connection("Timed out waiting for a GPS fix".to_string()))?
    }

    async fn subscribe(&mut self, on_point: mpsc::UnboundedSender<GeoPoint>) -> Result<Subscription> {
        let mut reader = connect_gpsd(&self.host, self.port).await?;
        let running = Arc::new(AtomicBool::new(true));
        let mut throttle = Throttle::new(self.min_time_secs, self.min_distance_m);

        let flag = Arc::clone(&running);
        let task = tokio::spawn(async move {
            let mut line = String::new();

            while flag.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        let point = match parse_gpsd_line(line.trim()) {
                            Ok(Some(point)) => point,
                            Ok(None) => continue,
                            Err(e) => {
                                tracing::debug!(error = %e, "Skipping gpsd line");
                                continue;
                            }
                        };

                        if throttle.accept(&point) && on_point.send(point).is_err() {
                            break; // receiver gone
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Error reading from gpsd");
                        break;
                    }
                }
            }
            flag.store(false, Ordering::Relaxed);
        });

        Ok(Subscription::new(running, task))
    }
}
