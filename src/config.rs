// src/config.rs
//! Configuration management, stored as JSON in the user's config directory

use crate::{
    error::{Result, WardriveError},
    export::DeviceInfo,
    geo::Viewport,
    map::projector::DEFAULT_ZOOM,
    session::SessionConfig,
    wifi::{correlator::DEFAULT_IGNORE_PREFIXES, CorrelatorConfig},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardriveConfig {
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    /// Replay NMEA from a file instead of a serial port
    pub nmea_file: Option<String>,
    /// JSON-lines scan batches, one array per line
    pub scan_file: Option<String>,
    /// Replay pace, 1.0 is one GGA fix per second
    pub replay_speed: f64,
    pub output_dir: String,
    pub device_name: String,
    pub scan_interval_secs: u64,
    pub tick_ms: u64,
    pub min_distance_m: f64,
    pub dedup_window: usize,
    pub log_capacity: usize,
    pub map_points: usize,
    pub map_zoom: f64,
    pub ignore_prefixes: Vec<String>,
    pub verify_checksum: bool,
    pub count_resightings: bool,
}

impl Default for WardriveConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            serial_baudrate: 9600,
            nmea_file: None,
            scan_file: None,
            replay_speed: 1.0,
            output_dir: "wardrive-logs".to_string(),
            device_name: "wardrive".to_string(),
            scan_interval_secs: 3,
            tick_ms: 100,
            min_distance_m: 10.0,
            dedup_window: 50,
            log_capacity: 500,
            map_points: 100,
            map_zoom: DEFAULT_ZOOM,
            ignore_prefixes: DEFAULT_IGNORE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            verify_checksum: true,
            count_resightings: true,
        }
    }
}

impl WardriveConfig {
    /// Load configuration from the config file, defaults if it does not exist
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| WardriveError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| WardriveError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WardriveError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(&config_path, contents)
            .map_err(|e| WardriveError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// `$HOME/.config/wardrive/config.json`
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| WardriveError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("wardrive").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_distance_m.is_finite() && self.min_distance_m >= 0.0) {
            return Err(WardriveError::Config("min_distance_m must be a non-negative number".to_string()));
        }
        if self.scan_interval_secs == 0 {
            return Err(WardriveError::Config("scan_interval_secs must be at least 1".to_string()));
        }
        if self.log_capacity == 0 || self.map_points == 0 {
            return Err(WardriveError::Config("log_capacity and map_points must be positive".to_string()));
        }
        if !(self.replay_speed.is_finite() && self.replay_speed > 0.0) {
            return Err(WardriveError::Config("replay_speed must be positive".to_string()));
        }
        if !(self.map_zoom.is_finite() && self.map_zoom > 0.0) {
            return Err(WardriveError::Config("map_zoom must be positive".to_string()));
        }
        Ok(())
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
        self.nmea_file = None;
    }

    pub fn correlator_config(&self) -> CorrelatorConfig {
        CorrelatorConfig {
            min_distance_m: self.min_distance_m,
            dedup_window: self.dedup_window,
            capacity: self.log_capacity,
            ignore_prefixes: self.ignore_prefixes.clone(),
            count_resightings: self.count_resightings,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            scan_interval: chrono::Duration::seconds(self.scan_interval_secs as i64),
            correlator: self.correlator_config(),
            verify_checksum: self.verify_checksum,
            map_zoom: self.map_zoom,
            map_points: self.map_points,
            viewport: Viewport::DEFAULT,
            device: DeviceInfo {
                device: self.device_name.clone(),
                ..DeviceInfo::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WardriveConfig::default();
        assert_eq!(config.scan_interval_secs, 3);
        assert_eq!(config.min_distance_m, 10.0);
        assert_eq!(config.dedup_window, 50);
        assert_eq!(config.log_capacity, 500);
        assert_eq!(config.map_points, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WardriveConfig::from_json(r#"{"min_distance_m": 25.0, "serial_port": "/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(config.min_distance_m, 25.0);
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.log_capacity, 500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(WardriveConfig::from_json(r#"{"scan_interval_secs": 0}"#).is_err());
        assert!(WardriveConfig::from_json(r#"{"min_distance_m": -1.0}"#).is_err());
        assert!(WardriveConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_update_serial() {
        let mut config = WardriveConfig::default();
        config.nmea_file = Some("drive.nmea".to_string());
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.serial_port, Some("/dev/ttyUSB0".to_string()));
        assert_eq!(config.serial_baudrate, 115200);
        assert!(config.nmea_file.is_none());
    }

    #[test]
    fn test_session_config_mapping() {
        let mut config = WardriveConfig::default();
        config.device_name = "m5-rig".to_string();
        config.scan_interval_secs = 5;
        let session = config.session_config();
        assert_eq!(session.scan_interval, chrono::Duration::seconds(5));
        assert_eq!(session.device.device, "m5-rig");
        assert_eq!(session.correlator.capacity, 500);
    }
}
