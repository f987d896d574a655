// src/display/terminal.rs
//! Terminal display for a running session

use crate::{
    error::Result,
    map::MapProjector,
    session::{Command, DisplayMode, Session},
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

const RULE_WIDTH: usize = 64;
const NETWORK_ROWS: usize = 12;
const MAP_COLS: usize = 64;
const MAP_ROWS: usize = 20;
const RENDER_INTERVAL: Duration = Duration::from_millis(500);

/// What a key press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Quit,
}

/// Map a key press to an input, `None` for keys without a binding
pub fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Quit),
        KeyCode::Char('m') | KeyCode::Tab => Some(Input::Command(Command::SwitchMode)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Input::Command(Command::ZoomIn)),
        KeyCode::Char('-') => Some(Input::Command(Command::ZoomOut)),
        KeyCode::Char('c') => Some(Input::Command(Command::Recenter)),
        KeyCode::Char('e') => Some(Input::Command(Command::Export)),
        KeyCode::Char('r') => Some(Input::Command(Command::ResetSession)),
        _ => None,
    }
}

/// One screen line
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub color: Option<Color>,
    pub text: String,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self { color: None, text: text.into() }
    }

    fn colored(color: Color, text: impl Into<String>) -> Self {
        Self { color: Some(color), text: text.into() }
    }
}

pub struct TerminalDisplay {
    last_render: Option<Instant>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self { last_render: None }
    }

    /// Switch the terminal into raw mode on the alternate screen
    pub fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide, DisableLineWrap)?;
        Ok(())
    }

    /// Restore the terminal
    pub fn leave(&mut self) -> Result<()> {
        execute!(io::stdout(), Show, EnableLineWrap, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        Ok(())
    }

    /// Wait up to `timeout` for a key press
    pub fn poll_input(&mut self, timeout: Duration) -> Result<Option<Input>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => {
                let input = map_key(key);
                if input.is_some() {
                    // Redraw right away so the key has visible effect
                    self.last_render = None;
                }
                Ok(input)
            }
            Event::Resize(_, _) => {
                self.last_render = None;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Draw the session, at most every `RENDER_INTERVAL`
    pub fn render(&mut self, session: &Session) -> Result<()> {
        if let Some(last) = self.last_render {
            if last.elapsed() < RENDER_INTERVAL {
                return Ok(());
            }
        }
        self.last_render = Some(Instant::now());

        let mut stdout = io::stdout();
        queue!(stdout, Clear(ClearType::All))?;
        for (row, line) in compose(session).iter().enumerate() {
            queue!(stdout, MoveTo(0, row as u16))?;
            match line.color {
                Some(color) => queue!(stdout, SetForegroundColor(color), Print(&line.text), ResetColor)?,
                None => queue!(stdout, Print(&line.text))?,
            }
        }
        stdout.flush()?;
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the whole screen for the current mode
pub fn compose(session: &Session) -> Vec<Line> {
    let mut lines = Vec::new();
    let mode = session.mode();

    lines.push(Line::colored(Color::Green, "=".repeat(RULE_WIDTH)));
    lines.push(Line::colored(Color::Green, format!("WARDRIVE - {}", mode.title())));
    lines.push(Line::colored(Color::Green, "=".repeat(RULE_WIDTH)));

    compose_status(session, &mut lines);
    lines.push(Line::plain(""));

    match mode {
        DisplayMode::Networks => compose_networks(session, &mut lines),
        DisplayMode::Map => compose_map(session.map(), &mut lines),
        DisplayMode::Stats => compose_stats(session, &mut lines),
    }

    lines.push(Line::plain(""));
    lines.push(Line::colored(Color::Green, "=".repeat(RULE_WIDTH)));
    lines.push(Line::plain("m mode  +/- zoom  c recenter  e export  r new session  q quit"));
    lines
}

fn compose_status(session: &Session, lines: &mut Vec<Line>) {
    let fix = session.fix();
    if fix.fix_valid {
        lines.push(Line::colored(
            Color::Yellow,
            format!(
                "GPS: {}  {} {}  sats {}  ~{:.0} m",
                fix.get_fix_description(),
                fix.format_coordinate(fix.latitude),
                fix.format_coordinate(fix.longitude),
                fix.satellites,
                fix.estimated_accuracy()
            ),
        ));
    } else {
        lines.push(Line::colored(Color::Red, format!("GPS: NO FIX  (sats {})", fix.satellites)));
    }

    let stats = session.stats();
    lines.push(Line::plain(format!(
        "Networks: {}  Open: {}  Distance: {:.2} km  Time: {}",
        stats.total_networks,
        stats.open_networks,
        stats.distance_km,
        stats.format_duration()
    )));

    if !session.is_active() {
        lines.push(Line::colored(Color::Cyan, "Session exported, press r to start a new one"));
    } else if session.is_degraded() {
        lines.push(Line::colored(Color::Red, "STORAGE DEGRADED: writes queued in memory"));
    }
}

fn compose_networks(session: &Session, lines: &mut Vec<Line>) {
    lines.push(Line::colored(
        Color::Cyan,
        format!("{:<24} {:>4} {:>5}  {:<6} {}", "SSID", "CH", "RSSI", "AUTH", "VENDOR"),
    ));

    let log = session.log();
    if log.is_empty() {
        lines.push(Line::plain("  waiting for networks..."));
        return;
    }
    for obs in log.recent(NETWORK_ROWS) {
        let ssid: String = obs.ssid.chars().take(24).collect();
        let text = format!(
            "{:<24} {:>4} {:>5}  {:<6} {}",
            ssid,
            obs.channel,
            obs.rssi,
            obs.encryption.short_label(),
            obs.vendor
        );
        if obs.is_open() {
            lines.push(Line::colored(Color::Yellow, text));
        } else {
            lines.push(Line::plain(text));
        }
    }
}

fn compose_map(map: &MapProjector, lines: &mut Vec<Line>) {
    lines.push(Line::colored(
        Color::Cyan,
        format!("zoom {:.4} deg  points {}  (* secured, o open)", map.zoom(), map.point_count()),
    ));
    for row in map_grid(map) {
        lines.push(Line::plain(row));
    }
}

/// Downsample the map viewport into a character grid, center marked `+`
pub fn map_grid(map: &MapProjector) -> Vec<String> {
    let viewport = map.viewport();
    let mut grid = vec![vec![' '; MAP_COLS]; MAP_ROWS];
    grid[MAP_ROWS / 2][MAP_COLS / 2] = '+';

    for point in map.points() {
        if !viewport.contains(point.x, point.y) {
            continue;
        }
        let col = point.x as usize * MAP_COLS / viewport.width as usize;
        let row = point.y as usize * MAP_ROWS / viewport.height as usize;
        let cell = &mut grid[row.min(MAP_ROWS - 1)][col.min(MAP_COLS - 1)];
        // Open networks win a shared cell
        if point.open {
            *cell = 'o';
        } else if *cell != 'o' {
            *cell = '*';
        }
    }

    grid.into_iter()
        .map(|row| format!("|{}|", row.into_iter().collect::<String>()))
        .collect()
}

fn compose_stats(session: &Session, lines: &mut Vec<Line>) {
    let stats = session.stats();
    let fix = session.fix();
    let decoder = session.decoder();

    lines.push(Line::colored(Color::Magenta, "SESSION:"));
    lines.push(Line::plain(format!("  Elapsed:        {}", stats.format_duration())));
    lines.push(Line::plain(format!("  Networks:       {}", stats.total_networks)));
    lines.push(Line::plain(format!("  Unique BSSIDs:  {}", stats.unique_networks())));
    lines.push(Line::plain(format!("  Open:           {}", stats.open_networks)));
    lines.push(Line::plain(format!("  Secured:        {}", stats.secured_networks)));
    lines.push(Line::plain(format!("  Distance:       {:.2} km", stats.distance_km)));
    lines.push(Line::plain(format!("  Average speed:  {:.1} km/h", stats.avg_speed_kmh)));
    lines.push(Line::plain(""));

    lines.push(Line::colored(Color::Magenta, "GPS:"));
    lines.push(Line::plain(format!("  Fix:            {}", fix.get_fix_description())));
    lines.push(Line::plain(format!("  Satellites:     {}", fix.satellites)));
    lines.push(Line::plain(format!("  HDOP:           {:.1}", fix.hdop)));
    lines.push(Line::plain(format!("  Altitude:       {:.1} m", fix.altitude)));
    lines.push(Line::plain(format!("  Speed:          {:.1} km/h", fix.speed)));
    lines.push(Line::plain(format!(
        "  UTC:            {}",
        fix.format_time().unwrap_or_else(|| "--:--:--".to_string())
    )));
    lines.push(Line::plain(format!(
        "  Sentences:      {} ok, {} rejected",
        decoder.applied_count(),
        decoder.rejected_count()
    )));
    lines.push(Line::plain(""));

    lines.push(Line::colored(Color::Magenta, "FILES:"));
    lines.push(Line::plain(format!("  {}", session.csv_location())));
    lines.push(Line::plain(format!("  {}", session.gpx_location())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        export::mocks::MemorySink,
        geo::Viewport,
        session::SessionConfig,
        source::NoScanner,
        wifi::{EncryptionKind, WifiObservation},
    };
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc::unbounded_channel;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn observation(lat: f64, lon: f64, open: bool) -> WifiObservation {
        WifiObservation {
            ssid: "Cafe".to_string(),
            bssid: "00:11:22:33:44:55".to_string(),
            channel: 6,
            rssi: -60,
            encryption: if open { EncryptionKind::Open } else { EncryptionKind::Wpa2Psk },
            vendor: "Unknown".to_string(),
            latitude: lat,
            longitude: lon,
            altitude: 0.0,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            accuracy: 5.0,
            sightings: 1,
        }
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(map_key(key(KeyCode::Char('m'))), Some(Input::Command(Command::SwitchMode)));
        assert_eq!(map_key(key(KeyCode::Char('+'))), Some(Input::Command(Command::ZoomIn)));
        assert_eq!(map_key(key(KeyCode::Char('-'))), Some(Input::Command(Command::ZoomOut)));
        assert_eq!(map_key(key(KeyCode::Char('c'))), Some(Input::Command(Command::Recenter)));
        assert_eq!(map_key(key(KeyCode::Char('e'))), Some(Input::Command(Command::Export)));
        assert_eq!(map_key(key(KeyCode::Char('r'))), Some(Input::Command(Command::ResetSession)));
        assert_eq!(map_key(key(KeyCode::Char('q'))), Some(Input::Quit));
        assert_eq!(map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Input::Quit));
        assert_eq!(map_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_map_grid_marks_points() {
        let mut map = MapProjector::new(Viewport::DEFAULT, 0.01, 10);
        assert!(map.plot(&observation(48.0, 11.0, false)));
        // Roughly a quarter viewport to the east
        map.plot(&observation(48.0, 11.0025, true));

        let grid = map_grid(&map);
        assert_eq!(grid.len(), MAP_ROWS);
        assert!(grid.iter().all(|row| row.chars().count() == MAP_COLS + 2));
        // The first point sits on the center cell
        let center_row: Vec<char> = grid[MAP_ROWS / 2].chars().collect();
        assert_eq!(center_row[MAP_COLS / 2 + 1], '*');
        assert!(grid[MAP_ROWS / 2].contains('o'));
    }

    #[test]
    fn test_compose_without_fix() {
        let (_tx, rx) = unbounded_channel::<Vec<u8>>();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());
        let session = Session::new(
            SessionConfig::default(),
            Box::new(clock),
            Box::new(rx),
            Box::new(NoScanner),
            Box::new(MemorySink::new()),
        );

        let lines = compose(&session);
        assert!(lines.iter().any(|l| l.text.contains("NO FIX")));
        assert!(lines.iter().any(|l| l.text.contains("waiting for networks")));
        assert!(lines[1].text.contains("NETWORKS"));
    }
}
