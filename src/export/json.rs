// src/export/json.rs
//! One-shot JSON session summary

use crate::{error::Result, stats::SessionStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub total_networks: u64,
    pub unique_networks: usize,
    pub open_networks: u64,
    pub secured_networks: u64,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub duration_sec: i64,
    pub csv_file: String,
    pub gpx_file: String,
}

impl SessionSummary {
    pub fn from_stats(stats: &SessionStats, session_end: DateTime<Utc>, csv_file: String, gpx_file: String) -> Self {
        Self {
            session_start: stats.session_start(),
            session_end,
            total_networks: stats.total_networks,
            unique_networks: stats.unique_networks(),
            open_networks: stats.open_networks,
            secured_networks: stats.secured_networks,
            distance_km: stats.distance_km,
            avg_speed_kmh: stats.avg_speed_kmh,
            duration_sec: stats.elapsed_seconds,
            csv_file,
            gpx_file,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_field_names() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let mut stats = SessionStats::new(start);
        stats.elapsed_seconds = 90;
        let summary = SessionSummary::from_stats(&stats, start, "a.csv".into(), "a.gpx".into());

        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "session_start",
            "session_end",
            "total_networks",
            "unique_networks",
            "open_networks",
            "secured_networks",
            "distance_km",
            "avg_speed_kmh",
            "duration_sec",
            "csv_file",
            "gpx_file",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(object.len(), 11);
        assert_eq!(value["duration_sec"], 90);
        assert_eq!(value["session_start"], "2024-06-15T12:00:00Z");
    }
}
