// src/session.rs
//! The wardriving session: one context object that owns the decoder, the
//! correlator, the export writer, the live map and the statistics, and
//! advances all of them in a single synchronous `update()` tick.

use crate::{
    bounded::BoundedLog,
    clock::Clock,
    error::{Result, WardriveError},
    export::{session_basename, DeviceInfo, SessionSummary, SessionWriter, StorageSink},
    geo::Viewport,
    gps::{GpsFix, NmeaDecoder},
    map::MapProjector,
    source::ByteSource,
    stats::SessionStats,
    wifi::{BatchOutcome, Correlator, CorrelatorConfig, ScanProvider, WifiObservation},
};
use chrono::{DateTime, Duration, Utc};
use std::{fmt, str::FromStr};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum time between two scan batches
    pub scan_interval: Duration,
    pub correlator: CorrelatorConfig,
    pub verify_checksum: bool,
    pub map_zoom: f64,
    pub map_points: usize,
    pub viewport: Viewport,
    pub device: DeviceInfo,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::seconds(3),
            correlator: CorrelatorConfig::default(),
            verify_checksum: true,
            map_zoom: crate::map::projector::DEFAULT_ZOOM,
            map_points: 100,
            viewport: Viewport::DEFAULT,
            device: DeviceInfo::default(),
        }
    }
}

/// Which live view the display layer should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Networks,
    Map,
    Stats,
}

impl DisplayMode {
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Networks => DisplayMode::Map,
            DisplayMode::Map => DisplayMode::Stats,
            DisplayMode::Stats => DisplayMode::Networks,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DisplayMode::Networks => "NETWORKS",
            DisplayMode::Map => "MAP",
            DisplayMode::Stats => "STATISTICS",
        }
    }
}

/// Commands coming from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SwitchMode,
    ZoomIn,
    ZoomOut,
    Recenter,
    Export,
    ResetSession,
}

impl FromStr for Command {
    type Err = WardriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "switch-mode" => Ok(Command::SwitchMode),
            "zoom-in" => Ok(Command::ZoomIn),
            "zoom-out" => Ok(Command::ZoomOut),
            "recenter" => Ok(Command::Recenter),
            "export" => Ok(Command::Export),
            "reset-session" => Ok(Command::ResetSession),
            other => Err(WardriveError::Other(format!("Unknown command: {}", other))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::SwitchMode => "switch-mode",
            Command::ZoomIn => "zoom-in",
            Command::ZoomOut => "zoom-out",
            Command::Recenter => "recenter",
            Command::Export => "export",
            Command::ResetSession => "reset-session",
        };
        write!(f, "{}", name)
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// NMEA sentences applied to the fix
    pub sentences: usize,
    /// Present when a scan batch was taken this tick
    pub batch: Option<BatchOutcome>,
    /// Some export writes are queued waiting for storage
    pub storage_degraded: bool,
}

pub struct Session {
    config: SessionConfig,
    clock: Box<dyn Clock>,
    source: Box<dyn ByteSource>,
    scanner: Box<dyn ScanProvider>,
    sink: Box<dyn StorageSink>,
    decoder: NmeaDecoder,
    correlator: Correlator,
    writer: SessionWriter,
    /// Writers of earlier sessions that still have queued writes
    draining: Vec<SessionWriter>,
    map: MapProjector,
    stats: SessionStats,
    mode: DisplayMode,
    last_scan: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
    resets: u32,
    read_buf: Vec<u8>,
}

impl Session {
    /// Start a session and open its export files
    pub fn new(
        config: SessionConfig,
        clock: Box<dyn Clock>,
        source: Box<dyn ByteSource>,
        scanner: Box<dyn ScanProvider>,
        sink: Box<dyn StorageSink>,
    ) -> Self {
        let started = clock.now();
        let mut session = Self {
            decoder: NmeaDecoder::new(config.verify_checksum),
            correlator: Correlator::new(config.correlator.clone()),
            writer: SessionWriter::new(config.device.clone(), started, &session_basename(started)),
            draining: Vec::new(),
            map: MapProjector::new(config.viewport, config.map_zoom, config.map_points),
            stats: SessionStats::new(started),
            mode: DisplayMode::default(),
            last_scan: None,
            summary: None,
            resets: 0,
            read_buf: Vec::with_capacity(512),
            config,
            clock,
            source,
            scanner,
            sink,
        };
        session.open_writer();
        session
    }

    fn open_writer(&mut self) {
        info!("Session started, writing {} and {}", self.writer.csv_name(), self.writer.gpx_name());
        if let Err(e) = self.writer.begin(self.sink.as_mut()) {
            warn!("Could not open session files, will retry: {}", e);
        }
    }

    /// One cooperative step: decode pending NMEA, take a scan batch if one is
    /// due, persist accepted sightings and refresh the statistics.
    pub fn update(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.read_buf.clear();
        self.source.read_available(&mut self.read_buf);
        report.sentences = self.decoder.feed(&self.read_buf);

        self.retry_storage();

        let now = self.clock.now();
        if self.is_active() && self.scan_due(now) {
            self.last_scan = Some(now);
            let batch = self.scanner.scan();
            let (accepted, outcome) = self.correlator.process(self.decoder.fix(), &batch, now);
            if outcome.accepted > 0 {
                debug!("Accepted {} of {} scan results", outcome.accepted, batch.len());
            }
            for observation in &accepted {
                self.stats.record(observation);
                self.map.plot(observation);
                if let Err(e) = self.writer.record(self.sink.as_mut(), observation) {
                    warn!("Observation {} kept in memory: {}", observation.bssid, e);
                }
            }
            report.batch = Some(outcome);
        }

        self.stats.refresh(now, self.correlator.log());
        report.storage_degraded = self.is_degraded();
        report
    }

    fn scan_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_scan {
            None => true,
            // A clock that jumped backwards must not stall scanning
            Some(last) => now < last || now.signed_duration_since(last) >= self.config.scan_interval,
        }
    }

    fn retry_storage(&mut self) {
        let sink = self.sink.as_mut();
        if self.writer.is_degraded() && self.writer.retry_pending(sink).is_ok() {
            info!("Storage recovered, queued writes flushed");
        }
        self.draining.retain_mut(|writer| writer.retry_pending(sink).is_err());
    }

    /// Apply a user command. `Export` returns the written summary.
    pub fn handle(&mut self, command: Command) -> Result<Option<SessionSummary>> {
        debug!("Command: {}", command);
        match command {
            Command::SwitchMode => self.mode = self.mode.next(),
            Command::ZoomIn => self.map.zoom_in(),
            Command::ZoomOut => self.map.zoom_out(),
            Command::Recenter => self.recenter(),
            Command::Export => return self.export().map(Some),
            Command::ResetSession => self.reset(),
        }
        Ok(None)
    }

    /// Center the map on the current fix, or on the newest sighting without one
    fn recenter(&mut self) {
        let fix = self.decoder.fix();
        let target = if fix.fix_valid {
            Some((fix.latitude, fix.longitude))
        } else {
            self.correlator.log().last().map(|o| (o.latitude, o.longitude))
        };
        if let Some((lat, lon)) = target {
            self.map.recenter(lat, lon);
        }
    }

    /// Finalize the GPX file, write the JSON summary and stop logging.
    /// Exporting an already stopped session returns the original summary.
    pub fn export(&mut self) -> Result<SessionSummary> {
        if let Some(summary) = &self.summary {
            let summary = summary.clone();
            self.writer.retry_pending(self.sink.as_mut())?;
            return Ok(summary);
        }

        let now = self.clock.now();
        self.stats.refresh(now, self.correlator.log());
        let summary = SessionSummary::from_stats(
            &self.stats,
            now,
            self.sink.location(self.writer.csv_name()),
            self.sink.location(self.writer.gpx_name()),
        );
        self.summary = Some(summary.clone());

        self.writer.finalize(self.sink.as_mut(), &summary)?;
        info!(
            "Session exported: {} networks, {:.2} km, {}",
            summary.total_networks,
            summary.distance_km,
            self.sink.location(self.writer.json_name())
        );
        Ok(summary)
    }

    /// Close the current session and start a fresh one with new files
    pub fn reset(&mut self) {
        if let Err(e) = self.export() {
            warn!("Export before reset incomplete: {}", e);
        }

        let now = self.clock.now();
        self.resets += 1;
        let mut base = session_basename(now);
        if self.writer.csv_name().starts_with(&base) {
            base = format!("{}_{}", base, self.resets + 1);
        }
        let previous = std::mem::replace(&mut self.writer, SessionWriter::new(self.config.device.clone(), now, &base));
        if previous.is_degraded() {
            self.draining.push(previous);
        }

        self.correlator.reset();
        self.map.clear();
        self.stats = SessionStats::new(now);
        self.last_scan = None;
        self.summary = None;
        self.open_writer();
    }

    /// False once the session has been exported
    pub fn is_active(&self) -> bool {
        self.summary.is_none()
    }

    pub fn is_degraded(&self) -> bool {
        self.writer.is_degraded() || !self.draining.is_empty()
    }

    pub fn fix(&self) -> &GpsFix {
        self.decoder.fix()
    }

    pub fn decoder(&self) -> &NmeaDecoder {
        &self.decoder
    }

    pub fn log(&self) -> &BoundedLog<WifiObservation> {
        self.correlator.log()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn map(&self) -> &MapProjector {
        &self.map
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn csv_location(&self) -> String {
        self.sink.location(self.writer.csv_name())
    }

    pub fn gpx_location(&self) -> String {
        self.sink.location(self.writer.gpx_name())
    }
}
