// src/lib.rs
//! Wardriving library
//!
//! Correlates Wi-Fi scan results with an NMEA GPS fix, keeps a bounded log of
//! geotagged sightings and exports them as WiGLE CSV, GPX and a JSON summary.

pub mod bounded;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod geo;
pub mod gps;
pub mod logging;
pub mod map;
pub mod monitor;
pub mod session;
pub mod source;
pub mod stats;
pub mod wifi;

// Re-export main types for convenience
pub use config::WardriveConfig;
pub use error::{Result, WardriveError};
pub use export::SessionSummary;
pub use gps::{GpsFix, NmeaDecoder};
pub use monitor::Monitor;
pub use session::{Command, DisplayMode, Session, SessionConfig};
pub use wifi::{ScanResult, WifiObservation};
