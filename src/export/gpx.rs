// src/export/gpx.rs
//! GPX 1.1 track formatting and recovery of unterminated files

use crate::error::Result;
use crate::wifi::WifiObservation;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::info;

pub const FOOTER: &str = "    </trkseg>\n  </trk>\n</gpx>\n";

/// Document prolog up to and including the opening `<trkseg>`
pub fn header(track_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="wardrive" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>{}</name>
    <trkseg>
"#,
        escape_xml(track_name)
    )
}

pub fn track_point(observation: &WifiObservation) -> String {
    format!(
        r#"      <trkpt lat="{:.6}" lon="{:.6}">
        <ele>{:.1}</ele>
        <time>{}</time>
        <extensions>
          <wifi>
            <ssid>{}</ssid>
            <bssid>{}</bssid>
            <rssi>{}</rssi>
            <channel>{}</channel>
          </wifi>
        </extensions>
      </trkpt>
"#,
        observation.latitude,
        observation.longitude,
        observation.altitude,
        observation.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        escape_xml(&observation.ssid),
        escape_xml(&observation.bssid),
        observation.rssi,
        observation.channel,
    )
}

pub fn is_terminated(contents: &str) -> bool {
    contents.trim_end().ends_with("</gpx>")
}

/// Append the closing tags to every `.gpx` file in `dir` that a crash left open.
/// Returns the repaired paths.
pub fn recover_unterminated(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut repaired = Vec::new();
    if !dir.exists() {
        return Ok(repaired);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("gpx") {
            continue;
        }
        let contents = fs::read_to_string(&path)?;
        if contents.is_empty() || is_terminated(&contents) {
            continue;
        }

        let mut file = OpenOptions::new().append(true).open(&path)?;
        if !contents.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.write_all(FOOTER.as_bytes())?;
        info!("Recovered unterminated GPX file {}", path.display());
        repaired.push(path);
    }

    Ok(repaired)
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::EncryptionKind;
    use chrono::{TimeZone, Utc};

    fn observation() -> WifiObservation {
        WifiObservation {
            ssid: "Tom & Jerry's".to_string(),
            bssid: "AA:BB:CC:DD:EE:FF".to_string(),
            channel: 11,
            rssi: -72,
            encryption: EncryptionKind::Open,
            vendor: "Unknown".to_string(),
            latitude: 48.1173,
            longitude: 11.5167,
            altitude: 545.4,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 5).unwrap(),
            accuracy: 3.5,
            sightings: 1,
        }
    }

    #[test]
    fn test_document_structure() {
        let doc = format!("{}{}{}", header("Drive <1>"), track_point(&observation()), FOOTER);
        assert!(doc.contains("<gpx version=\"1.1\""));
        assert!(doc.contains("<name>Drive &lt;1&gt;</name>"));
        assert!(doc.contains("<trkpt lat=\"48.117300\" lon=\"11.516700\">"));
        assert!(doc.contains("<time>2024-06-15T12:00:05Z</time>"));
        assert!(doc.contains("<ssid>Tom &amp; Jerry&apos;s</ssid>"));
        assert!(doc.contains("<channel>11</channel>"));
        assert!(is_terminated(&doc));
        assert!(!is_terminated(&header("x")));
    }

    #[test]
    fn test_recover_unterminated() {
        let dir = tempfile::tempdir().unwrap();
        let open = dir.path().join("open.gpx");
        let closed = dir.path().join("closed.gpx");
        let other = dir.path().join("notes.csv");
        fs::write(&open, format!("{}{}", header("a"), track_point(&observation()))).unwrap();
        fs::write(&closed, format!("{}{}", header("b"), FOOTER)).unwrap();
        fs::write(&other, "MAC,SSID\n").unwrap();

        let repaired = recover_unterminated(dir.path()).unwrap();
        assert_eq!(repaired, vec![open.clone()]);
        assert!(is_terminated(&fs::read_to_string(&open).unwrap()));
        assert_eq!(fs::read_to_string(&other).unwrap(), "MAC,SSID\n");

        assert!(recover_unterminated(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_recover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(recover_unterminated(&dir.path().join("nope")).unwrap().is_empty());
    }
}
