// src/wifi/observation.rs
//! Accepted, geotagged access point sightings

use super::scan::EncryptionKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiObservation {
    pub ssid: String,
    pub bssid: String,
    pub channel: u8,
    pub rssi: i32,
    pub encryption: EncryptionKind,
    pub vendor: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,          // meters, heuristic
    pub sightings: u32,
}

impl WifiObservation {
    pub fn is_open(&self) -> bool {
        self.encryption.is_open()
    }

    /// Distance in meters from this sighting to a position
    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        crate::geo::distance(self.latitude, self.longitude, lat, lon)
    }
}
