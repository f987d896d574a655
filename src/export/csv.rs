// src/export/csv.rs
//! WiGLE 1.4 CSV formatting

use super::DeviceInfo;
use crate::wifi::WifiObservation;

pub const COLUMNS: &str = "MAC,SSID,AuthMode,FirstSeen,Channel,RSSI,CurrentLatitude,CurrentLongitude,AltitudeMeters,AccuracyMeters,Type";

/// Metadata line followed by the column header
pub fn header(info: &DeviceInfo) -> String {
    format!(
        "WigleWifi-1.4,appRelease={},model={},release={},device={},display=wardrive,board={},brand=wardrive\n{}\n",
        info.app_release, info.model, info.app_release, info.device, info.board, COLUMNS
    )
}

/// One data row, newline terminated
pub fn row(observation: &WifiObservation) -> String {
    format!(
        "{},{},[{}],{},{},{},{:.6},{:.6},{:.1},{:.1},WIFI\n",
        observation.bssid,
        quote(&observation.ssid),
        observation.encryption.wigle_label(),
        observation.timestamp.format("%Y-%m-%d %H:%M:%S"),
        observation.channel,
        observation.rssi,
        observation.latitude,
        observation.longitude,
        observation.altitude,
        observation.accuracy,
    )
}

/// Always quote; line breaks cannot be represented in a WiGLE row
fn quote(s: &str) -> String {
    let cleaned: String = s.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();
    format!("\"{}\"", cleaned.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::EncryptionKind;
    use chrono::{TimeZone, Utc};

    fn observation(ssid: &str) -> WifiObservation {
        WifiObservation {
            ssid: ssid.to_string(),
            bssid: "AA:BB:CC:DD:EE:FF".to_string(),
            channel: 6,
            rssi: -61,
            encryption: EncryptionKind::Wpa2Psk,
            vendor: "Unknown".to_string(),
            latitude: 48.1173,
            longitude: 11.516_666_7,
            altitude: 545.4,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 5).unwrap(),
            accuracy: 3.5,
            sightings: 1,
        }
    }

    #[test]
    fn test_header_lines() {
        let header = header(&DeviceInfo::default());
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("WigleWifi-1.4,appRelease="));
        assert_eq!(lines[1], COLUMNS);
    }

    #[test]
    fn test_row_format() {
        assert_eq!(
            row(&observation("CoffeeShop")),
            "AA:BB:CC:DD:EE:FF,\"CoffeeShop\",[WPA2-PSK],2024-06-15 12:00:05,6,-61,48.117300,11.516667,545.4,3.5,WIFI\n"
        );
    }

    #[test]
    fn test_ssid_escaping() {
        let line = row(&observation("Say \"hi\", ok"));
        assert!(line.contains("\"Say \"\"hi\"\", ok\""));
        assert_eq!(row(&observation("two\nlines")).lines().count(), 1);
    }
}
