// src/gps/nmea.rs
//! NMEA 0183 sentence decoding
//!
//! Bytes are accumulated into lines, each line is tokenized by index over the
//! raw byte slice and parsed into a typed [`Sentence`]. Only a successfully
//! parsed sentence is applied to the fix, so a corrupt or truncated line never
//! leaves the fix half-updated.

use super::data::GpsFix;
use std::fmt;
use tracing::trace;

/// Longest line accepted before the buffer is treated as noise and dropped.
/// NMEA caps sentences at 82 characters.
pub const MAX_LINE_LEN: usize = 120;

const KNOTS_TO_KMH: f64 = 1.852;

/// Minimum comma-delimited field counts, sentence id included
const GGA_MIN_FIELDS: usize = 14;
const RMC_MIN_FIELDS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum NmeaError {
    /// Not a sentence type this decoder handles
    Unsupported,
    /// Line does not start with `$`
    MissingStart,
    TooFewFields { required: usize, found: usize },
    Checksum { expected: u8, computed: u8 },
    InvalidField(&'static str),
    OutOfRange(&'static str),
}

impl fmt::Display for NmeaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmeaError::Unsupported => write!(f, "unsupported sentence"),
            NmeaError::MissingStart => write!(f, "missing '$' start delimiter"),
            NmeaError::TooFewFields { required, found } => {
                write!(f, "expected at least {} fields, found {}", required, found)
            }
            NmeaError::Checksum { expected, computed } => {
                write!(f, "checksum mismatch: sentence says {:02X}, computed {:02X}", expected, computed)
            }
            NmeaError::InvalidField(name) => write!(f, "invalid {} field", name),
            NmeaError::OutOfRange(name) => write!(f, "{} out of range", name),
        }
    }
}

impl std::error::Error for NmeaError {}

/// Fix data carried by a GGA sentence. `None` means the receiver left the field empty.
#[derive(Debug, Clone, PartialEq)]
pub struct GgaData {
    pub time: Option<String>,
    pub position: Option<(f64, f64)>,
    pub fix_quality: u8,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,
}

/// Velocity and date carried by an RMC sentence
#[derive(Debug, Clone, PartialEq)]
pub struct RmcData {
    pub speed_kmh: Option<f64>,
    pub course: Option<f64>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(GgaData),
    Rmc(RmcData),
}

/// XOR of all bytes between `$` and `*`
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Comma-delimited fields of one sentence, addressed by index
struct Fields<'a> {
    line: &'a [u8],
    bounds: Vec<(usize, usize)>,
}

impl<'a> Fields<'a> {
    fn split(line: &'a [u8]) -> Self {
        let mut bounds = Vec::with_capacity(20);
        let mut start = 0;
        for (i, &b) in line.iter().enumerate() {
            if b == b',' {
                bounds.push((start, i));
                start = i + 1;
            }
        }
        bounds.push((start, line.len()));
        Self { line, bounds }
    }

    fn len(&self) -> usize {
        self.bounds.len()
    }

    fn get(&self, index: usize) -> &'a [u8] {
        match self.bounds.get(index) {
            Some(&(start, end)) => &self.line[start..end],
            None => &[],
        }
    }

    fn str(&self, index: usize) -> Option<&'a str> {
        std::str::from_utf8(self.get(index)).ok()
    }

    /// Parse a field, returning `Ok(None)` when it is empty
    fn parse<T: std::str::FromStr>(&self, index: usize, name: &'static str) -> Result<Option<T>, NmeaError> {
        let raw = self.get(index);
        if raw.is_empty() {
            return Ok(None);
        }
        self.str(index)
            .and_then(|s| s.parse::<T>().ok())
            .map(Some)
            .ok_or(NmeaError::InvalidField(name))
    }

    /// Like `parse::<f64>`, but `inf` and `NaN` spellings are out of range
    fn float(&self, index: usize, name: &'static str) -> Result<Option<f64>, NmeaError> {
        match self.parse::<f64>(index, name)? {
            Some(v) if !v.is_finite() => Err(NmeaError::OutOfRange(name)),
            value => Ok(value),
        }
    }
}

/// Split off and verify the `*hh` suffix, returning the sentence without it
fn strip_checksum(line: &[u8], verify: bool) -> Result<&[u8], NmeaError> {
    let Some(star) = line.iter().position(|&b| b == b'*') else {
        return Ok(line);
    };
    let body = &line[..star];
    if verify {
        let hex = std::str::from_utf8(&line[star + 1..])
            .ok()
            .map(str::trim)
            .filter(|h| h.len() == 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or(NmeaError::InvalidField("checksum"))?;
        let computed = checksum(&body[1..]);
        if computed != hex {
            return Err(NmeaError::Checksum { expected: hex, computed });
        }
    }
    Ok(body)
}

/// Parse one complete line (without terminator) into a typed sentence
pub fn parse_sentence(line: &[u8], verify_checksum: bool) -> Result<Sentence, NmeaError> {
    if line.first() != Some(&b'$') {
        return Err(NmeaError::MissingStart);
    }
    let prefix = line.get(..6).ok_or(NmeaError::Unsupported)?;
    let is_gga = prefix == b"$GPGGA" || prefix == b"$GNGGA";
    let is_rmc = prefix == b"$GPRMC" || prefix == b"$GNRMC";
    if !is_gga && !is_rmc {
        return Err(NmeaError::Unsupported);
    }

    let body = strip_checksum(line, verify_checksum)?;
    let fields = Fields::split(body);

    if is_gga {
        parse_gga(&fields).map(Sentence::Gga)
    } else {
        parse_rmc(&fields).map(Sentence::Rmc)
    }
}

fn require_fields(fields: &Fields<'_>, required: usize) -> Result<(), NmeaError> {
    if fields.len() < required {
        return Err(NmeaError::TooFewFields { required, found: fields.len() });
    }
    Ok(())
}

/// Parse GGA (Global Positioning System Fix Data)
fn parse_gga(fields: &Fields<'_>) -> Result<GgaData, NmeaError> {
    require_fields(fields, GGA_MIN_FIELDS)?;

    let time = parse_digits(fields.get(1), 6, "time")?;
    let latitude = parse_coordinate(fields.get(2), fields.get(3), 2, b'N', b'S', 90.0, "latitude")?;
    let longitude = parse_coordinate(fields.get(4), fields.get(5), 3, b'E', b'W', 180.0, "longitude")?;
    let position = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        (None, None) => None,
        _ => return Err(NmeaError::InvalidField("position")),
    };

    let fix_quality = fields.parse::<u8>(6, "fix quality")?.unwrap_or(0);
    // A fix without coordinates would mark whatever position was held before as valid
    if fix_quality != 0 && position.is_none() {
        return Err(NmeaError::InvalidField("position"));
    }

    Ok(GgaData {
        time,
        position,
        fix_quality,
        satellites: fields.parse::<u8>(7, "satellites")?,
        hdop: fields.float(8, "hdop")?,
        altitude: fields.float(9, "altitude")?,
    })
}

/// Parse RMC (Recommended Minimum Course)
fn parse_rmc(fields: &Fields<'_>) -> Result<RmcData, NmeaError> {
    require_fields(fields, RMC_MIN_FIELDS)?;

    let speed_knots = fields.float(7, "speed")?;
    let course = fields.float(8, "course")?;
    if let Some(c) = course {
        if !(0.0..=360.0).contains(&c) {
            return Err(NmeaError::OutOfRange("course"));
        }
    }

    Ok(RmcData {
        speed_kmh: speed_knots.map(|knots| knots * KNOTS_TO_KMH),
        course,
        date: parse_digits(fields.get(9), 6, "date")?,
    })
}

/// Take the leading `count` ASCII digits of a field (`123519.00` -> `123519`)
fn parse_digits(raw: &[u8], count: usize, name: &'static str) -> Result<Option<String>, NmeaError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let digits = raw.get(..count).ok_or(NmeaError::InvalidField(name))?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(NmeaError::InvalidField(name));
    }
    Ok(Some(String::from_utf8_lossy(digits).into_owned()))
}

/// Decode a `(d)ddmm.mmmm` coordinate with its hemisphere letter
fn parse_coordinate(
    raw: &[u8],
    hemisphere: &[u8],
    degree_digits: usize,
    positive: u8,
    negative: u8,
    limit: f64,
    name: &'static str,
) -> Result<Option<f64>, NmeaError> {
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.len() <= degree_digits {
        return Err(NmeaError::InvalidField(name));
    }

    let (deg_raw, min_raw) = raw.split_at(degree_digits);
    if !deg_raw.iter().all(u8::is_ascii_digit) {
        return Err(NmeaError::InvalidField(name));
    }
    let degrees = deg_raw.iter().fold(0.0, |acc, d| acc * 10.0 + (d - b'0') as f64);
    let minutes = std::str::from_utf8(min_raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or(NmeaError::InvalidField(name))?;
    if !(0.0..60.0).contains(&minutes) {
        return Err(NmeaError::OutOfRange(name));
    }

    let value = degrees + minutes / 60.0;
    if value > limit {
        return Err(NmeaError::OutOfRange(name));
    }

    match hemisphere {
        [h] if *h == positive => Ok(Some(value)),
        [h] if *h == negative => Ok(Some(-value)),
        _ => Err(NmeaError::InvalidField(name)),
    }
}

/// Apply a parsed sentence to the fix. Fields the receiver left empty keep their prior value.
pub fn apply(fix: &mut GpsFix, sentence: Sentence) {
    match sentence {
        Sentence::Gga(gga) => {
            if let Some(time) = gga.time {
                fix.time = time;
            }
            if let Some((lat, lon)) = gga.position {
                fix.latitude = lat;
                fix.longitude = lon;
            }
            fix.fix_quality = gga.fix_quality;
            fix.fix_valid = gga.fix_quality != 0;
            if let Some(sats) = gga.satellites {
                fix.satellites = sats;
            }
            if let Some(hdop) = gga.hdop {
                fix.hdop = hdop;
            }
            if let Some(alt) = gga.altitude {
                fix.altitude = alt;
            }
        }
        Sentence::Rmc(rmc) => {
            if let Some(speed) = rmc.speed_kmh {
                fix.speed = speed;
            }
            if let Some(course) = rmc.course {
                fix.course = course;
            }
            if let Some(date) = rmc.date {
                fix.date = date;
            }
        }
    }
}

/// Streaming decoder: feed raw serial bytes, read back the latest fix
#[derive(Debug, Clone)]
pub struct NmeaDecoder {
    buffer: Vec<u8>,
    discarding: bool,
    verify_checksum: bool,
    fix: GpsFix,
    applied: u64,
    rejected: u64,
}

impl NmeaDecoder {
    pub fn new(verify_checksum: bool) -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
            discarding: false,
            verify_checksum,
            fix: GpsFix::new(),
            applied: 0,
            rejected: 0,
        }
    }

    /// Consume bytes, applying every complete sentence. Returns how many were applied.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut applied = 0;
        for &byte in bytes {
            match byte {
                b'\r' => {}
                b'\n' => {
                    if !self.discarding && self.process_line() {
                        applied += 1;
                    }
                    self.buffer.clear();
                    self.discarding = false;
                }
                _ if self.discarding => {}
                _ => {
                    if self.buffer.len() >= MAX_LINE_LEN {
                        trace!("NMEA line exceeded {} bytes, dropping", MAX_LINE_LEN);
                        self.buffer.clear();
                        self.discarding = true;
                        self.rejected += 1;
                    } else {
                        self.buffer.push(byte);
                    }
                }
            }
        }
        applied
    }

    fn process_line(&mut self) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        match parse_sentence(&self.buffer, self.verify_checksum) {
            Ok(sentence) => {
                apply(&mut self.fix, sentence);
                self.applied += 1;
                true
            }
            Err(NmeaError::Unsupported) => false,
            Err(e) => {
                trace!("Dropping NMEA sentence: {}", e);
                self.rejected += 1;
                false
            }
        }
    }

    pub fn fix(&self) -> &GpsFix {
        &self.fix
    }

    /// Sentences applied since creation
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Sentences dropped as malformed, including oversized lines
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }
}

impl Default for NmeaDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}
