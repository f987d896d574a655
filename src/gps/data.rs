// src/gps/data.rs
//! GPS fix state

/// Most recent position/velocity state assembled from NMEA sentences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,    // meters above mean sea level
    pub speed: f64,       // km/h
    pub course: f64,      // degrees
    pub satellites: u8,
    pub hdop: f64,
    pub fix_quality: u8,
    pub fix_valid: bool,
    pub time: String,     // HHMMSS (UTC)
    pub date: String,     // DDMMYY (UTC)
}

impl GpsFix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meters-accuracy heuristic for the current fix
    pub fn estimated_accuracy(&self) -> f64 {
        super::accuracy::estimate(self.hdop, self.satellites)
    }

    /// Get fix type description
    pub fn get_fix_description(&self) -> String {
        match self.fix_quality {
            0 => "No fix".to_string(),
            1 => "GPS".to_string(),
            2 => "DGPS".to_string(),
            3 => "PPS".to_string(),
            4 => "RTK".to_string(),
            5 => "Float RTK".to_string(),
            6 => "Estimated".to_string(),
            7 => "Manual".to_string(),
            8 => "Simulation".to_string(),
            q => format!("Unknown ({})", q),
        }
    }

    /// `HH:MM:SS` view of the UTC time field, if one has been received
    pub fn format_time(&self) -> Option<String> {
        let t = self.time.as_bytes();
        if t.len() < 6 {
            return None;
        }
        Some(format!("{}:{}:{}", &self.time[0..2], &self.time[2..4], &self.time[4..6]))
    }

    /// Format coordinate for display
    pub fn format_coordinate(&self, value: f64) -> String {
        if self.fix_valid {
            format!("{:>12.6}°", value)
        } else {
            "No fix".to_string()
        }
    }
}
