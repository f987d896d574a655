// src/wifi/scan.rs
//! Raw scan results handed over by the radio scanner

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionKind {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
    WapiPsk,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EncryptionKind {
    pub fn is_open(&self) -> bool {
        matches!(self, EncryptionKind::Open)
    }

    /// Label used inside the bracketed WiGLE `AuthMode` column
    pub fn wigle_label(&self) -> &'static str {
        match self {
            EncryptionKind::Open => "OPEN",
            EncryptionKind::Wep => "WEP",
            EncryptionKind::WpaPsk => "WPA-PSK",
            EncryptionKind::Wpa2Psk => "WPA2-PSK",
            EncryptionKind::WpaWpa2Psk => "WPA-WPA2-PSK",
            EncryptionKind::Wpa2Enterprise => "WPA2-EAP",
            EncryptionKind::Wpa3Psk => "WPA3-PSK",
            EncryptionKind::Wpa2Wpa3Psk => "WPA2-WPA3-PSK",
            EncryptionKind::WapiPsk => "WAPI-PSK",
            EncryptionKind::Unknown => "UNKNOWN",
        }
    }

    /// Short label for the live view
    pub fn short_label(&self) -> &'static str {
        match self {
            EncryptionKind::Open => "OPEN",
            EncryptionKind::Wep => "WEP",
            EncryptionKind::WpaPsk => "WPA",
            EncryptionKind::Wpa2Psk | EncryptionKind::WpaWpa2Psk => "WPA2",
            EncryptionKind::Wpa2Enterprise => "WPA2E",
            EncryptionKind::Wpa3Psk | EncryptionKind::Wpa2Wpa3Psk => "WPA3",
            EncryptionKind::WapiPsk => "WAPI",
            EncryptionKind::Unknown => "?",
        }
    }
}

/// One access point as reported by a single scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub ssid: String,
    pub bssid: String,
    #[serde(default)]
    pub channel: u8,
    pub rssi: i32,   // dBm
    #[serde(default, alias = "encryptionKind", alias = "auth")]
    pub encryption: EncryptionKind,
}

impl ScanResult {
    pub fn new(ssid: &str, bssid: &str, channel: u8, rssi: i32, encryption: EncryptionKind) -> Self {
        Self {
            ssid: ssid.to_string(),
            bssid: bssid.to_string(),
            channel,
            rssi,
            encryption,
        }
    }
}

/// Canonical `AA:BB:CC:DD:EE:FF` form of a MAC address string
pub fn normalize_bssid(bssid: &str) -> String {
    bssid.trim().replace('-', ":").to_ascii_uppercase()
}

/// Source of scan batches, e.g. a radio driver or a recorded capture
pub trait ScanProvider {
    /// Run (or fetch) one scan. An empty batch is a valid answer.
    fn scan(&mut self) -> Vec<ScanResult>;
}
