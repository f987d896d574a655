// src/geo.rs
//! Geodesic helpers: great-circle distance and a flat screen projection

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Screen area the projection maps onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const DEFAULT: Viewport = Viewport { width: 320, height: 240 };

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Great-circle distance in meters between two points (Haversine)
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Project a point onto the default viewport.
///
/// `zoom` is the number of degrees spanned by the full screen width. This is a
/// linear equirectangular mapping with the same scale on both axes and north
/// up; it is only reasonable for small spans away from the poles.
pub fn project(lat: f64, lon: f64, center_lat: f64, center_lon: f64, zoom: f64) -> (i32, i32) {
    project_in(Viewport::DEFAULT, lat, lon, center_lat, center_lon, zoom)
}

/// Project a point onto an explicit viewport
pub fn project_in(
    viewport: Viewport,
    lat: f64,
    lon: f64,
    center_lat: f64,
    center_lon: f64,
    zoom: f64,
) -> (i32, i32) {
    let px_per_degree = viewport.width as f64 / zoom;
    let x = viewport.width as f64 / 2.0 + (lon - center_lon) * px_per_degree;
    let y = viewport.height as f64 / 2.0 - (lat - center_lat) * px_per_degree;
    (x.round() as i32, y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Meters per degree of latitude on the reference sphere
    const M_PER_DEG: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    #[test]
    fn test_distance_identical_points() {
        assert_eq!(distance(48.1173, 11.5167, 48.1173, 11.5167), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let ab = distance(48.1173, 11.5167, 48.2, 11.6);
        let ba = distance(48.2, 11.6, 48.1173, 11.5167);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_distance_reference_15km() {
        // Due north along a meridian the great-circle distance is exact
        let expected = 15_000.0;
        let d = distance(48.0, 11.0, 48.0 + expected / M_PER_DEG, 11.0);
        assert!((d - expected).abs() / expected < 0.01, "got {}", d);
    }

    #[test]
    fn test_distance_known_cities() {
        // Munich Marienplatz to Munich Airport, roughly 28.5 km
        let d = distance(48.1374, 11.5755, 48.3538, 11.7861);
        assert!((d - 28_500.0).abs() / 28_500.0 < 0.02, "got {}", d);
    }

    #[test]
    fn test_distance_monotonic() {
        let near = distance(0.0, 0.0, 0.0, 0.001);
        let far = distance(0.0, 0.0, 0.0, 0.002);
        assert!(far > near);
    }

    #[test]
    fn test_project_center() {
        assert_eq!(project(48.0, 11.0, 48.0, 11.0, 0.01), (160, 120));
    }

    #[test]
    fn test_project_north_is_up_east_is_right() {
        let (x, y) = project(48.001, 11.001, 48.0, 11.0, 0.01);
        assert_eq!(x, 160 + 32);
        assert_eq!(y, 120 - 32);
    }

    #[test]
    fn test_viewport_contains() {
        let vp = Viewport::DEFAULT;
        assert!(vp.contains(0, 0));
        assert!(vp.contains(319, 239));
        assert!(!vp.contains(320, 10));
        assert!(!vp.contains(-1, 10));
    }
}
