// src/wifi/mod.rs
//! WiFi scan intake, vendor lookup and sighting correlation

pub mod correlator;
pub mod observation;
pub mod oui;
pub mod scan;

pub use correlator::{BatchOutcome, Correlator, CorrelatorConfig};
pub use observation::WifiObservation;
pub use scan::{EncryptionKind, ScanProvider, ScanResult};
