// src/monitor.rs
//! Runtime driver: feeds NMEA bytes into a session, ticks it, and hands
//! the result to the terminal display

use crate::{
    clock::SystemClock,
    config::WardriveConfig,
    display::terminal::{Input, TerminalDisplay},
    error::{Result, WardriveError},
    export::{gpx, FsSink, SessionSummary},
    session::{Command, Session},
    source::{JsonLinesScanner, NoScanner},
    wifi::ScanProvider,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    sync::mpsc::{unbounded_channel, UnboundedSender},
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, warn};

/// Where NMEA bytes come from
#[derive(Debug, Clone)]
pub enum NmeaInput {
    Serial { port: String, baudrate: u32 },
    /// Recorded NMEA log, replayed at roughly one fix per second times `speed`
    Replay { path: PathBuf, speed: f64 },
}

impl NmeaInput {
    pub fn from_config(config: &WardriveConfig) -> Result<Self> {
        if let Some(path) = &config.nmea_file {
            return Ok(NmeaInput::Replay { path: PathBuf::from(path), speed: config.replay_speed });
        }
        match &config.serial_port {
            Some(port) => Ok(NmeaInput::Serial { port: port.clone(), baudrate: config.serial_baudrate }),
            None => Err(WardriveError::Config(
                "No GPS input configured: pass --port or --nmea-file".to_string(),
            )),
        }
    }
}

/// Ticks a session until stopped, then exports it
pub struct Monitor {
    config: WardriveConfig,
    running: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(config: WardriveConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stop the monitor
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Check if the monitor is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run until the user quits (display) or Ctrl+C (headless)
    pub async fn run(&self, show_display: bool) -> Result<SessionSummary> {
        let output_dir = PathBuf::from(&self.config.output_dir);
        match gpx::recover_unterminated(&output_dir) {
            Ok(repaired) if !repaired.is_empty() => {
                info!("Closed {} GPX file(s) left open by an earlier run", repaired.len())
            }
            Ok(_) => {}
            Err(e) => warn!("Could not check {} for open GPX files: {}", output_dir.display(), e),
        }

        let (tx, rx) = unbounded_channel();
        match NmeaInput::from_config(&self.config)? {
            NmeaInput::Serial { port, baudrate } => self.spawn_serial_reader(&port, baudrate, tx)?,
            NmeaInput::Replay { path, speed } => self.spawn_replay(&path, speed, tx).await?,
        }

        let scanner: Box<dyn ScanProvider> = match &self.config.scan_file {
            Some(path) => Box::new(JsonLinesScanner::open(Path::new(path))?),
            None => {
                warn!("No scan source configured, only GPS will be tracked");
                Box::new(NoScanner)
            }
        };

        let mut session = Session::new(
            self.config.session_config(),
            Box::new(SystemClock),
            Box::new(rx),
            scanner,
            Box::new(FsSink::new(&output_dir)),
        );

        if show_display {
            self.run_with_display(&mut session)?;
        } else {
            self.run_headless(&mut session).await;
        }

        self.stop();
        let summary = session.export()?;
        info!(
            "Wrote {} and {} ({} networks, {:.2} km)",
            summary.csv_file, summary.gpx_file, summary.total_networks, summary.distance_km
        );
        Ok(summary)
    }

    fn run_with_display(&self, session: &mut Session) -> Result<()> {
        let mut display = TerminalDisplay::new();
        display.enter()?;
        let result = tokio::task::block_in_place(|| self.display_loop(&mut display, session));
        display.leave()?;
        result
    }

    fn display_loop(&self, display: &mut TerminalDisplay, session: &mut Session) -> Result<()> {
        let tick = Duration::from_millis(self.config.tick_ms.max(10));
        while self.is_running() {
            // Polling for input doubles as the tick delay
            match display.poll_input(tick)? {
                Some(Input::Quit) => break,
                Some(Input::Command(command)) => self.apply(session, command),
                None => {}
            }
            session.update();
            display.render(session)?;
        }
        Ok(())
    }

    async fn run_headless(&self, session: &mut Session) {
        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                running.store(false, Ordering::Relaxed);
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.tick_ms.max(10)));
        let mut last_total = 0;
        while self.is_running() {
            ticker.tick().await;
            let report = session.update();
            let total = session.stats().total_networks;
            if total != last_total {
                info!(
                    "{} networks logged ({} open), {:.2} km, storage {}",
                    total,
                    session.stats().open_networks,
                    session.stats().distance_km,
                    if report.storage_degraded { "DEGRADED" } else { "ok" }
                );
                last_total = total;
            }
        }
    }

    fn apply(&self, session: &mut Session, command: Command) {
        match session.handle(command) {
            Ok(Some(summary)) => info!("Exported session to {}", summary.csv_file),
            Ok(None) => {}
            Err(e) => error!("{} failed: {}", command, e),
        }
    }

    /// Forward raw bytes from a serial GPS receiver
    fn spawn_serial_reader(&self, port: &str, baudrate: u32, tx: UnboundedSender<Vec<u8>>) -> Result<()> {
        info!("Connecting to GPS on {} at {} baud...", port, baudrate);

        let mut serial = tokio_serial::new(port, baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}", port);
                e
            })?;

        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            while running.load(Ordering::Relaxed) {
                match serial.read(&mut buf).await {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(e) => {
                        error!("Error reading from serial port: {}", e);
                        break;
                    }
                }
            }
            debug!("Serial reader stopped");
        });

        Ok(())
    }

    /// Replay a recorded NMEA log, pausing after each GGA sentence
    async fn spawn_replay(&self, path: &Path, speed: f64, tx: UnboundedSender<Vec<u8>>) -> Result<()> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| WardriveError::Config(format!("Failed to open NMEA file {}: {}", path.display(), e)))?;
        info!("Replaying NMEA from {}", path.display());

        let pause = Duration::from_secs_f64(1.0 / speed.max(0.01));
        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            let mut lines = BufReader::new(file).lines();
            while running.load(Ordering::Relaxed) {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let is_gga = line.contains("GGA,");
                        if tx.send(format!("{}\n", line).into_bytes()).is_err() {
                            break;
                        }
                        if is_gga {
                            tokio::time::sleep(pause).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading NMEA file: {}", e);
                        break;
                    }
                }
            }
            info!("NMEA replay finished");
        });

        Ok(())
    }
}

/// List available serial ports
pub async fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_prefers_replay_file() {
        let mut config = WardriveConfig::default();
        config.serial_port = Some("/dev/ttyUSB0".to_string());
        config.nmea_file = Some("drive.nmea".to_string());
        assert!(matches!(NmeaInput::from_config(&config).unwrap(), NmeaInput::Replay { .. }));
    }

    #[test]
    fn test_input_serial() {
        let mut config = WardriveConfig::default();
        config.update_serial("/dev/ttyACM0".to_string(), 38400);
        match NmeaInput::from_config(&config).unwrap() {
            NmeaInput::Serial { port, baudrate } => {
                assert_eq!(port, "/dev/ttyACM0");
                assert_eq!(baudrate, 38400);
            }
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn test_input_missing() {
        assert!(NmeaInput::from_config(&WardriveConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_missing_serial_port_is_serial_error() {
        let mut config = WardriveConfig::default();
        config.update_serial("/dev/wardrive-no-such-port".to_string(), 9600);
        let monitor = Monitor::new(config);
        let (tx, _rx) = unbounded_channel();

        let err = monitor.spawn_serial_reader("/dev/wardrive-no-such-port", 9600, tx).unwrap_err();
        assert!(matches!(err, WardriveError::Serial(_)));
    }

    #[tokio::test]
    async fn test_headless_replay_session() {
        let dir = tempfile::tempdir().unwrap();
        let nmea = dir.path().join("drive.nmea");
        std::fs::write(
            &nmea,
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\n",
        )
        .unwrap();

        let mut config = WardriveConfig::default();
        config.nmea_file = Some(nmea.display().to_string());
        config.output_dir = dir.path().join("out").display().to_string();
        config.tick_ms = 10;

        let monitor = Arc::new(Monitor::new(config));
        let stopper = Arc::clone(&monitor);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.stop();
        });

        let summary = monitor.run(false).await.unwrap();
        assert_eq!(summary.total_networks, 0);
        let gpx = std::fs::read_to_string(&summary.gpx_file).unwrap();
        assert!(gpx::is_terminated(&gpx));
    }
}
