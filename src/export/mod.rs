// src/export/mod.rs
//! Streaming session export: WiGLE CSV and GPX appended per observation,
//! JSON summary written once at the end.
//!
//! A failed write is not lost. It stays queued in memory, the writer reports
//! itself as degraded, and the queue is retried in order before every later
//! write and at finalize. Each file queues at most `DEFAULT_QUEUE_LIMIT`
//! chunks; past that the oldest appended rows are dropped and counted.

pub mod csv;
pub mod gpx;
pub mod json;

use crate::{
    error::{Result, WardriveError},
    wifi::WifiObservation,
};
use chrono::{DateTime, Utc};
use std::{
    collections::VecDeque,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
};
use tracing::{debug, warn};

pub use json::SessionSummary;

/// Queued writes kept per file while storage is unavailable
pub const DEFAULT_QUEUE_LIMIT: usize = 10_000;

/// Identification written into the CSV metadata line
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub app_release: String,
    pub model: String,
    pub device: String,
    pub board: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            app_release: env!("CARGO_PKG_VERSION").to_string(),
            model: "wardrive".to_string(),
            device: "wardrive".to_string(),
            board: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Where export files end up
pub trait StorageSink {
    /// Create or truncate `name` with `contents`
    fn create(&mut self, name: &str, contents: &[u8]) -> io::Result<()>;

    /// Append `contents` to `name`
    fn append(&mut self, name: &str, contents: &[u8]) -> io::Result<()>;

    /// Human readable location of `name`, used in the JSON summary
    fn location(&self, name: &str) -> String;
}

/// Files in a directory on the local filesystem
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl StorageSink for FsSink {
    fn create(&mut self, name: &str, contents: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(name), contents)
    }

    fn append(&mut self, name: &str, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(self.path(name))?;
        file.write_all(contents)?;
        file.flush()
    }

    fn location(&self, name: &str) -> String {
        self.path(name).display().to_string()
    }
}

#[derive(Debug)]
struct Chunk {
    truncate: bool,
    data: String,
}

/// One output file plus its queue of writes that have not reached storage yet
#[derive(Debug)]
struct ExportStream {
    name: String,
    pending: VecDeque<Chunk>,
    limit: usize,
    dropped: u64,
}

impl ExportStream {
    fn new(name: String) -> Self {
        Self {
            name,
            pending: VecDeque::new(),
            limit: DEFAULT_QUEUE_LIMIT,
            dropped: 0,
        }
    }

    fn write(&mut self, sink: &mut dyn StorageSink, data: String, truncate: bool) -> Result<()> {
        self.pending.push_back(Chunk { truncate, data });
        self.enforce_limit();
        self.flush(sink)
    }

    /// Drop the oldest appended chunks over the limit. File-creating chunks stay.
    fn enforce_limit(&mut self) {
        while self.pending.len() > self.limit {
            let Some(index) = self.pending.iter().position(|chunk| !chunk.truncate) else {
                break;
            };
            self.pending.remove(index);
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 1000 == 0 {
                warn!("Write queue for {} full, {} writes dropped so far", self.name, self.dropped);
            }
        }
    }

    /// Push queued chunks to the sink in order, stopping at the first failure
    fn flush(&mut self, sink: &mut dyn StorageSink) -> Result<()> {
        while let Some(chunk) = self.pending.front() {
            let written = if chunk.truncate {
                sink.create(&self.name, chunk.data.as_bytes())
            } else {
                sink.append(&self.name, chunk.data.as_bytes())
            };
            if let Err(source) = written {
                warn!("Write to {} failed ({} chunks queued): {}", self.name, self.pending.len(), source);
                return Err(WardriveError::Storage { file: self.name.clone(), source });
            }
            self.pending.pop_front();
        }
        Ok(())
    }
}

/// Session file base name, e.g. `wardrive_20240615_120000`
pub fn session_basename(started: DateTime<Utc>) -> String {
    format!("wardrive_{}", started.format("%Y%m%d_%H%M%S"))
}

/// The CSV, GPX and JSON outputs of one session. The storage sink is passed
/// in per call so a session can swap writers without giving up its sink.
pub struct SessionWriter {
    device: DeviceInfo,
    started: DateTime<Utc>,
    csv: ExportStream,
    gpx: ExportStream,
    json: ExportStream,
    records: u64,
    closed: bool,
}

impl SessionWriter {
    /// Files are named `<base>.csv`, `<base>.gpx` and `<base>.json`
    pub fn new(device: DeviceInfo, started: DateTime<Utc>, base: &str) -> Self {
        Self {
            device,
            started,
            csv: ExportStream::new(format!("{}.csv", base)),
            gpx: ExportStream::new(format!("{}.gpx", base)),
            json: ExportStream::new(format!("{}.json", base)),
            records: 0,
            closed: false,
        }
    }

    /// Cap the per-file retry queue, at least one chunk
    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        for stream in [&mut self.csv, &mut self.gpx, &mut self.json] {
            stream.limit = limit.max(1);
        }
        self
    }

    /// Write the CSV and GPX headers
    pub fn begin(&mut self, sink: &mut dyn StorageSink) -> Result<()> {
        let csv_header = csv::header(&self.device);
        let gpx_header = gpx::header(&format!("Wardrive {}", self.started.format("%Y-%m-%d %H:%M:%S UTC")));
        let csv_result = self.csv.write(sink, csv_header, true);
        let gpx_result = self.gpx.write(sink, gpx_header, true);
        debug!("Opened session files {} and {}", self.csv.name, self.gpx.name);
        csv_result.and(gpx_result)
    }

    /// Append one accepted observation to the CSV and GPX streams
    pub fn record(&mut self, sink: &mut dyn StorageSink, observation: &WifiObservation) -> Result<()> {
        if self.closed {
            return Err(WardriveError::SessionClosed);
        }
        self.records += 1;
        let csv_result = self.csv.write(sink, csv::row(observation), false);
        let gpx_result = self.gpx.write(sink, gpx::track_point(observation), false);
        csv_result.and(gpx_result)
    }

    /// Close the GPX track, write the JSON summary and refuse further records
    pub fn finalize(&mut self, sink: &mut dyn StorageSink, summary: &SessionSummary) -> Result<()> {
        if self.closed {
            return self.retry_pending(sink);
        }
        self.closed = true;

        let gpx_result = self.gpx.write(sink, gpx::FOOTER.to_string(), false);
        let csv_result = self.csv.flush(sink);
        let json_result = summary.to_json().and_then(|body| self.json.write(sink, body, true));
        gpx_result.and(csv_result).and(json_result)
    }

    /// Try to drain every queued write
    pub fn retry_pending(&mut self, sink: &mut dyn StorageSink) -> Result<()> {
        let csv_result = self.csv.flush(sink);
        let gpx_result = self.gpx.flush(sink);
        let json_result = self.json.flush(sink);
        csv_result.and(gpx_result).and(json_result)
    }

    /// True while any write is waiting for storage to come back
    pub fn is_degraded(&self) -> bool {
        self.pending_writes() > 0
    }

    pub fn pending_writes(&self) -> usize {
        self.csv.pending.len() + self.gpx.pending.len() + self.json.pending.len()
    }

    /// Writes given up because the retry queue was full
    pub fn dropped_writes(&self) -> u64 {
        self.csv.dropped + self.gpx.dropped + self.json.dropped
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Observations handed to the writer, whether or not they reached storage yet
    pub fn record_count(&self) -> u64 {
        self.records
    }

    pub fn csv_name(&self) -> &str {
        &self.csv.name
    }

    pub fn gpx_name(&self) -> &str {
        &self.gpx.name
    }

    pub fn json_name(&self) -> &str {
        &self.json.name
    }
}
