// src/map/projector.rs
//! Projects accepted observations into a small screen-space point buffer

use crate::{
    bounded::BoundedLog,
    geo::{self, Viewport},
    wifi::WifiObservation,
};

pub const DEFAULT_ZOOM: f64 = 0.01;
pub const MIN_ZOOM: f64 = 0.0005;
pub const MAX_ZOOM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub x: i32,
    pub y: i32,
    pub rssi: i32,
    pub open: bool,
}

pub struct MapProjector {
    viewport: Viewport,
    center: Option<(f64, f64)>,
    zoom: f64,
    points: BoundedLog<MapPoint>,
}

impl MapProjector {
    pub fn new(viewport: Viewport, zoom: f64, capacity: usize) -> Self {
        Self {
            viewport,
            center: None,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            points: BoundedLog::new(capacity),
        }
    }

    /// Project an observation and keep it if it lands on screen.
    /// The first plotted observation fixes the center if none is set yet.
    pub fn plot(&mut self, observation: &WifiObservation) -> bool {
        let (center_lat, center_lon) =
            *self.center.get_or_insert((observation.latitude, observation.longitude));
        let (x, y) = geo::project_in(
            self.viewport,
            observation.latitude,
            observation.longitude,
            center_lat,
            center_lon,
            self.zoom,
        );
        if !self.viewport.contains(x, y) {
            return false;
        }
        self.points.push(MapPoint {
            latitude: observation.latitude,
            longitude: observation.longitude,
            x,
            y,
            rssi: observation.rssi,
            open: observation.is_open(),
        });
        true
    }

    /// Move the center and start a fresh buffer
    pub fn recenter(&mut self, lat: f64, lon: f64) {
        self.center = Some((lat, lon));
        self.points.clear();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom / 2.0);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom * 2.0);
    }

    /// Change scale, re-projecting kept points and dropping those pushed off screen
    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return;
        }
        self.zoom = zoom;

        let Some((center_lat, center_lon)) = self.center else {
            return;
        };
        let viewport = self.viewport;
        let mut kept = BoundedLog::new(self.points.capacity());
        for point in self.points.iter() {
            let (x, y) = geo::project_in(viewport, point.latitude, point.longitude, center_lat, center_lon, zoom);
            if viewport.contains(x, y) {
                kept.push(MapPoint { x, y, ..point.clone() });
            }
        }
        self.points = kept;
    }

    pub fn clear(&mut self) {
        self.center = None;
        self.points.clear();
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> Option<(f64, f64)> {
        self.center
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn points(&self) -> impl Iterator<Item = &MapPoint> {
        self.points.iter()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl Default for MapProjector {
    fn default() -> Self {
        Self::new(Viewport::DEFAULT, DEFAULT_ZOOM, 100)
    }
}
