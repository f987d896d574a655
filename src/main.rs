// src/main.rs
//! wardrive - log Wi-Fi networks against a serial NMEA GPS

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::info;
use wardrive::{logging, monitor, Monitor, WardriveConfig};

#[derive(Parser, Debug)]
#[command(name = "wardrive", version, about = "Wi-Fi wardriving logger with NMEA GPS")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Serial port of the GPS receiver
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Replay NMEA sentences from a file instead of a serial port
    #[arg(long)]
    nmea_file: Option<String>,

    /// Replay speed multiplier for --nmea-file
    #[arg(long)]
    replay_speed: Option<f64>,

    /// JSON-lines file of scan batches
    #[arg(long)]
    scan_file: Option<String>,

    /// Directory for CSV, GPX, JSON and log files
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Minimum movement in meters before a new batch is accepted
    #[arg(long)]
    min_distance: Option<f64>,

    /// Seconds between scans
    #[arg(long)]
    scan_interval: Option<u64>,

    /// Log to stderr instead of drawing the terminal display
    #[arg(long)]
    headless: bool,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,
}

impl Cli {
    fn apply(&self, config: &mut WardriveConfig) {
        if let Some(port) = &self.port {
            config.update_serial(port.clone(), self.baud.unwrap_or(config.serial_baudrate));
        } else if let Some(baud) = self.baud {
            config.serial_baudrate = baud;
        }
        if let Some(path) = &self.nmea_file {
            config.nmea_file = Some(path.clone());
        }
        if let Some(speed) = self.replay_speed {
            config.replay_speed = speed;
        }
        if let Some(path) = &self.scan_file {
            config.scan_file = Some(path.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(meters) = self.min_distance {
            config.min_distance_m = meters;
        }
        if let Some(secs) = self.scan_interval {
            config.scan_interval_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::ListPorts) = cli.command {
        monitor::list_serial_ports().await?;
        return Ok(());
    }

    let mut config = WardriveConfig::load().context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate()?;
    if cli.save_config {
        config.save()?;
    }

    let _guard = logging::init_logging(Path::new(&config.output_dir), cli.headless)
        .context("Failed to initialize logging")?;
    info!("wardrive v{} starting, output in {}", env!("CARGO_PKG_VERSION"), config.output_dir);

    let monitor = Monitor::new(config);
    let summary = monitor.run(!cli.headless).await?;

    println!("Session saved:");
    println!("  {}", summary.csv_file);
    println!("  {}", summary.gpx_file);
    println!(
        "  {} networks ({} open), {:.2} km in {} s",
        summary.total_networks, summary.open_networks, summary.distance_km, summary.duration_sec
    );

    Ok(())
}
