// src/wifi/correlator.rs
//! Fuses scan batches with the current fix and filters out repeat sightings

use super::{
    observation::WifiObservation,
    oui,
    scan::{normalize_bssid, ScanResult},
};
use crate::{bounded::BoundedLog, geo, gps::GpsFix};
use chrono::{DateTime, Utc};
use tracing::debug;

/// SSID prefixes of auto-generated networks that are never worth logging
pub const DEFAULT_IGNORE_PREFIXES: &[&str] = &[
    "DIRECT-",
    "HP-Print-",
    "AndroidAP",
    "Chromecast",
    "ESP_",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatorConfig {
    /// Minimum movement between batches and between sightings of one BSSID.
    ///
    /// Every batch with a valid fix moves the reference position, gated or
    /// not, so the gate compares consecutive scans. Anything slower than
    /// `min_distance_m` per scan interval (12 km/h with the 10 m and 3 s
    /// defaults) logs only its first batch; walking surveys need a smaller
    /// value such as 3 m.
    pub min_distance_m: f64,
    /// How many recent log entries are searched for a repeat BSSID
    pub dedup_window: usize,
    /// Session log capacity, oldest entries are evicted beyond this
    pub capacity: usize,
    pub ignore_prefixes: Vec<String>,
    /// Bump the sighting count of the matched entry on a duplicate
    pub count_resightings: bool,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 10.0,
            dedup_window: 50,
            capacity: 500,
            ignore_prefixes: DEFAULT_IGNORE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            count_resightings: true,
        }
    }
}

/// Why a batch produced nothing, or how it fared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub hidden_or_ignored: usize,
    pub duplicates: usize,
    /// No valid fix, batch skipped
    pub no_fix: bool,
    /// Not far enough from the last batch position, batch skipped
    pub gated: bool,
}

pub struct Correlator {
    config: CorrelatorConfig,
    log: BoundedLog<WifiObservation>,
    last_position: Option<(f64, f64)>,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self {
            log: BoundedLog::new(config.capacity),
            config,
            last_position: None,
        }
    }

    /// Run one scan batch against the current fix. Accepted observations are
    /// appended to the session log and also returned for persistence.
    pub fn process(
        &mut self,
        fix: &GpsFix,
        batch: &[ScanResult],
        now: DateTime<Utc>,
    ) -> (Vec<WifiObservation>, BatchOutcome) {
        let mut outcome = BatchOutcome::default();

        if !fix.fix_valid {
            outcome.no_fix = true;
            return (Vec::new(), outcome);
        }

        let here = (fix.latitude, fix.longitude);
        let gated = self
            .last_position
            .map(|(lat, lon)| geo::distance(lat, lon, here.0, here.1) < self.config.min_distance_m)
            .unwrap_or(false);
        // Throttles on movement per scan interval, so the position is updated even when gated
        self.last_position = Some(here);
        if gated {
            outcome.gated = true;
            return (Vec::new(), outcome);
        }

        let accuracy = fix.estimated_accuracy();
        let mut accepted = Vec::new();

        for result in batch {
            if self.is_ignored(&result.ssid) {
                outcome.hidden_or_ignored += 1;
                continue;
            }

            let bssid = normalize_bssid(&result.bssid);
            if self.is_duplicate(&bssid, here.0, here.1) {
                outcome.duplicates += 1;
                continue;
            }

            let observation = WifiObservation {
                ssid: result.ssid.clone(),
                vendor: oui::lookup_vendor(&bssid).to_string(),
                bssid,
                channel: result.channel,
                rssi: result.rssi,
                encryption: result.encryption,
                latitude: here.0,
                longitude: here.1,
                altitude: fix.altitude,
                timestamp: now,
                accuracy,
                sightings: 1,
            };

            if let Some(evicted) = self.log.push(observation.clone()) {
                debug!("Session log full, evicted {} ({})", evicted.bssid, evicted.ssid);
            }
            accepted.push(observation);
        }

        outcome.accepted = accepted.len();
        (accepted, outcome)
    }

    fn is_ignored(&self, ssid: &str) -> bool {
        ssid.is_empty()
            || self
                .config
                .ignore_prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && ssid.starts_with(prefix.as_str()))
    }

    /// Search the dedup window for a nearby sighting of the same BSSID
    fn is_duplicate(&mut self, bssid: &str, lat: f64, lon: f64) -> bool {
        let min_distance = self.config.min_distance_m;
        let count_resightings = self.config.count_resightings;
        let matched = self
            .log
            .recent_mut(self.config.dedup_window)
            .find(|entry| entry.bssid == bssid && entry.distance_to(lat, lon) < min_distance);

        match matched {
            Some(entry) => {
                if count_resightings {
                    entry.sightings = entry.sightings.saturating_add(1);
                }
                true
            }
            None => false,
        }
    }

    pub fn log(&self) -> &BoundedLog<WifiObservation> {
        &self.log
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Drop the session log and forget the last position
    pub fn reset(&mut self) {
        self.log.clear();
        self.last_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::scan::EncryptionKind;
    use chrono::TimeZone;

    const BSSID: &str = "AA:BB:CC:DD:EE:FF";
    const M_PER_DEG: f64 = geo::EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn fix_at(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            latitude: lat,
            longitude: lon,
            altitude: 520.0,
            satellites: 9,
            hdop: 1.0,
            fix_quality: 1,
            fix_valid: true,
            ..GpsFix::default()
        }
    }

    /// A fix `meters` north of the base point
    fn fix_north(meters: f64) -> GpsFix {
        fix_at(48.0 + meters / M_PER_DEG, 11.0)
    }

    fn network(ssid: &str, bssid: &str) -> ScanResult {
        ScanResult::new(ssid, bssid, 6, -65, EncryptionKind::Wpa2Psk)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_fix_skips_batch() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        let mut fix = fix_north(0.0);
        fix.fix_valid = false;

        let (accepted, outcome) = correlator.process(&fix, &[network("Home", BSSID)], now());
        assert!(accepted.is_empty());
        assert!(outcome.no_fix);
        assert!(correlator.log().is_empty());
    }

    #[test]
    fn test_accepts_and_stamps_observation() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        let (accepted, outcome) =
            correlator.process(&fix_north(0.0), &[network("Home", "b8:27:eb:01:02:03")], now());

        assert_eq!(outcome.accepted, 1);
        let obs = &accepted[0];
        assert_eq!(obs.bssid, "B8:27:EB:01:02:03");
        assert_eq!(obs.vendor, "Raspberry Pi");
        assert!((obs.accuracy - 3.5).abs() < 1e-9);
        assert_eq!(obs.altitude, 520.0);
        assert_eq!(obs.timestamp, now());
        assert_eq!(obs.sightings, 1);
        assert_eq!(correlator.log().len(), 1);
    }

    #[test]
    fn test_hidden_and_ignored_networks_skipped() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        let batch = [
            network("", "00:00:00:00:00:01"),
            network("DIRECT-xy-Printer", "00:00:00:00:00:02"),
            network("direct-lowercase", "00:00:00:00:00:03"),
        ];
        let (accepted, outcome) = correlator.process(&fix_north(0.0), &batch, now());

        assert_eq!(outcome.hidden_or_ignored, 2);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].ssid, "direct-lowercase");
    }

    #[test]
    fn test_same_position_logged_once() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        let batch = [network("Home", BSSID), network("Home", "aa:bb:cc:dd:ee:ff")];

        let (accepted, outcome) = correlator.process(&fix_north(0.0), &batch, now());
        assert_eq!(accepted.len(), 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(correlator.log().len(), 1);
        assert_eq!(correlator.log().last().unwrap().sightings, 2);

        let (accepted, outcome) = correlator.process(&fix_north(0.0), &batch, now());
        assert!(accepted.is_empty());
        assert!(outcome.gated);
        assert_eq!(correlator.log().len(), 1);
    }

    #[test]
    fn test_moving_past_threshold_logs_again() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        let (accepted, _) = correlator.process(&fix_north(15.0), &[network("Home", BSSID)], now());

        assert_eq!(accepted.len(), 1);
        assert_eq!(correlator.log().len(), 2);
    }

    #[test]
    fn test_returning_to_logged_spot_is_duplicate() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        correlator.process(&fix_north(15.0), &[network("Other", "11:22:33:44:55:66")], now());

        let (accepted, outcome) = correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        assert!(accepted.is_empty());
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_dedup_window_limits_lookback() {
        let config = CorrelatorConfig { dedup_window: 1, ..CorrelatorConfig::default() };
        let mut correlator = Correlator::new(config);
        correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        correlator.process(&fix_north(15.0), &[network("Other", "11:22:33:44:55:66")], now());

        // The original sighting is outside the one-entry window now
        let (accepted, _) = correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn test_straight_line_15m_steps_all_accepted() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        for step in 0..3 {
            correlator.process(&fix_north(step as f64 * 15.0), &[network("Home", BSSID)], now());
        }
        assert_eq!(correlator.log().len(), 3);
    }

    #[test]
    fn test_straight_line_5m_steps_only_first_accepted() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        for step in 0..3 {
            correlator.process(&fix_north(step as f64 * 5.0), &[network("Home", BSSID)], now());
        }
        assert_eq!(correlator.log().len(), 1);
    }

    #[test]
    fn test_resighting_count_disabled() {
        let config = CorrelatorConfig {
            count_resightings: false,
            ..CorrelatorConfig::default()
        };
        let mut correlator = Correlator::new(config);
        let batch = [network("Home", BSSID), network("Home", "aa:bb:cc:dd:ee:ff")];

        let (accepted, outcome) = correlator.process(&fix_north(0.0), &batch, now());
        assert_eq!(accepted.len(), 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(correlator.log().last().unwrap().sightings, 1);
    }

    #[test]
    fn test_slow_movement_below_threshold_logs_first_batch_only() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        for step in 0..20u32 {
            let bssid = format!("00:11:22:33:44:{:02X}", step);
            correlator.process(&fix_north(step as f64 * 6.0), &[network("Cafe", &bssid)], now());
        }
        assert_eq!(correlator.log().len(), 1);

        let walking = CorrelatorConfig {
            min_distance_m: 3.0,
            ..CorrelatorConfig::default()
        };
        let mut correlator = Correlator::new(walking);
        for step in 0..20u32 {
            let bssid = format!("00:11:22:33:44:{:02X}", step);
            correlator.process(&fix_north(step as f64 * 6.0), &[network("Cafe", &bssid)], now());
        }
        assert_eq!(correlator.log().len(), 20);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let config = CorrelatorConfig { capacity: 2, ..CorrelatorConfig::default() };
        let mut correlator = Correlator::new(config);
        let batch = [
            network("A", "00:00:00:00:00:0A"),
            network("B", "00:00:00:00:00:0B"),
            network("C", "00:00:00:00:00:0C"),
        ];
        correlator.process(&fix_north(0.0), &batch, now());

        let ssids: Vec<_> = correlator.log().iter().map(|o| o.ssid.as_str()).collect();
        assert_eq!(ssids, vec!["B", "C"]);
    }

    #[test]
    fn test_reset_forgets_position() {
        let mut correlator = Correlator::new(CorrelatorConfig::default());
        correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        correlator.reset();

        let (accepted, outcome) = correlator.process(&fix_north(0.0), &[network("Home", BSSID)], now());
        assert!(!outcome.gated);
        assert_eq!(accepted.len(), 1);
    }
}
