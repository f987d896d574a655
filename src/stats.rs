// src/stats.rs
//! Running session statistics

use crate::{bounded::BoundedLog, geo, wifi::WifiObservation};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SessionStats {
    session_start: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub total_networks: u64,
    pub open_networks: u64,
    pub secured_networks: u64,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    seen_bssids: HashSet<String>,
}

impl SessionStats {
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            session_start,
            elapsed_seconds: 0,
            total_networks: 0,
            open_networks: 0,
            secured_networks: 0,
            distance_km: 0.0,
            avg_speed_kmh: 0.0,
            seen_bssids: HashSet::new(),
        }
    }

    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    /// Count an accepted observation. Called exactly once per acceptance.
    pub fn record(&mut self, observation: &WifiObservation) {
        self.total_networks += 1;
        if observation.is_open() {
            self.open_networks += 1;
        } else {
            self.secured_networks += 1;
        }
        self.seen_bssids.insert(observation.bssid.clone());
    }

    /// Distinct BSSIDs accepted this session, unaffected by log eviction
    pub fn unique_networks(&self) -> usize {
        self.seen_bssids.len()
    }

    /// Recompute the time and distance derived figures
    pub fn refresh(&mut self, now: DateTime<Utc>, log: &BoundedLog<WifiObservation>) {
        self.elapsed_seconds = now.signed_duration_since(self.session_start).num_seconds().max(0);
        self.distance_km = path_length_m(log) / 1000.0;

        let hours = self.elapsed_seconds as f64 / 3600.0;
        self.avg_speed_kmh = if hours > 0.0 { self.distance_km / hours } else { 0.0 };
    }

    /// Format elapsed time as `1h 2m 3s`
    pub fn format_duration(&self) -> String {
        let total_seconds = self.elapsed_seconds;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Sum of distances between consecutive log entries
fn path_length_m(log: &BoundedLog<WifiObservation>) -> f64 {
    log.iter()
        .zip(log.iter().skip(1))
        .map(|(a, b)| geo::distance(a.latitude, a.longitude, b.latitude, b.longitude))
        .sum()
}
