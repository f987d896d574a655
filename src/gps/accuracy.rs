// src/gps/accuracy.rs
//! Horizontal accuracy heuristic
//!
//! This is a rough proxy derived from HDOP and satellite count. It is not a
//! calibrated error model and must not be read as a confidence interval.

/// Returned when too few satellites are in use for the estimate to mean anything
pub const UNUSABLE_ACCURACY_M: f64 = 999.0;

/// Meters of error assumed per unit of HDOP
const METERS_PER_HDOP: f64 = 5.0;

/// Estimate horizontal accuracy in meters
pub fn estimate(hdop: f64, satellites: u8) -> f64 {
    if satellites < 4 {
        return UNUSABLE_ACCURACY_M;
    }

    let base = hdop * METERS_PER_HDOP;
    if satellites >= 8 {
        base * 0.7
    } else if satellites >= 6 {
        base * 0.9
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_satellites() {
        assert_eq!(estimate(0.5, 3), 999.0);
        assert_eq!(estimate(20.0, 0), 999.0);
    }

    #[test]
    fn test_many_satellites() {
        assert!((estimate(1.0, 9) - 3.5).abs() < 1e-9);
        assert!((estimate(1.0, 8) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_medium_satellites() {
        assert!((estimate(2.0, 6) - 9.0).abs() < 1e-9);
        assert!((estimate(2.0, 7) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_satellites_unscaled() {
        assert!((estimate(1.2, 4) - 6.0).abs() < 1e-9);
        assert!((estimate(1.2, 5) - 6.0).abs() < 1e-9);
    }
}
