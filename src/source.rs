// src/source.rs
//! Input adapters: raw NMEA bytes and scan batches

use crate::{
    error::{Result, WardriveError},
    wifi::{ScanProvider, ScanResult},
};
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::warn;

/// Non-blocking supplier of raw NMEA bytes
pub trait ByteSource: Send {
    /// Append whatever bytes are available right now to `buf`
    fn read_available(&mut self, buf: &mut Vec<u8>);
}

/// Bytes forwarded from a reader task (serial port, replay file)
impl ByteSource for UnboundedReceiver<Vec<u8>> {
    fn read_available(&mut self, buf: &mut Vec<u8>) {
        loop {
            match self.try_recv() {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// Scan batches pushed by an external scanner; only the newest waiting batch is used
impl ScanProvider for UnboundedReceiver<Vec<ScanResult>> {
    fn scan(&mut self) -> Vec<ScanResult> {
        let mut latest = None;
        while let Ok(batch) = self.try_recv() {
            latest = Some(batch);
        }
        latest.unwrap_or_default()
    }
}

/// Scanner stand-in that never sees anything
#[derive(Debug, Default)]
pub struct NoScanner;

impl ScanProvider for NoScanner {
    fn scan(&mut self) -> Vec<ScanResult> {
        Vec::new()
    }
}

/// Replays recorded scans from a JSON-lines file, one batch (a JSON array) per line
pub struct JsonLinesScanner {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonLinesScanner {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            WardriveError::Config(format!("Failed to open scan file {}: {}", path.display(), e))
        })?;
        Ok(Self { lines: BufReader::new(file).lines(), line_no: 0 })
    }
}

impl ScanProvider for JsonLinesScanner {
    fn scan(&mut self) -> Vec<ScanResult> {
        loop {
            let Some(line) = self.lines.next() else {
                return Vec::new();
            };
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Error reading scan file: {}", e);
                    return Vec::new();
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return match serde_json::from_str(&line) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("Skipping scan batch on line {}: {}", self.line_no, e);
                    Vec::new()
                }
            };
        }
    }
}
